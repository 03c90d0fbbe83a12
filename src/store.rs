//! SQLite-backed record store.
//!
//! Layout is fixed: one `images` row per record holding the ciphertext and
//! the salt/IV that produced it.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::StoreError;
use crate::record::{EncryptedRecord, SealedImage};

const SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS images (id INTEGER PRIMARY KEY, image_blob BLOB, salt BLOB, iv BLOB)";

pub struct RecordStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl RecordStore {
    /// Opens (or creates) the database at `path` and ensures the table exists.
    ///
    /// Creates parent directories if they don't exist.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute(SCHEMA, [])?;
        debug!("opened record store at {}", path.display());

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute(SCHEMA, [])?;
        Ok(Self { conn, path: None })
    }

    /// Returns the database path, or `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Inserts a sealed image and returns its assigned id.
    pub fn insert(&self, sealed: &SealedImage) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO images (image_blob, salt, iv) VALUES (?1, ?2, ?3)",
            params![sealed.ciphertext(), &sealed.salt()[..], &sealed.iv()[..]],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("stored image #{id} ({} bytes)", sealed.len());
        Ok(id)
    }

    pub fn get(&self, id: i64) -> Result<EncryptedRecord, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT image_blob, salt, iv FROM images WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        blob_column(row, 0)?,
                        blob_column(row, 1)?,
                        blob_column(row, 2)?,
                    ))
                },
            )
            .optional()?;

        let (blob, salt, iv) = row.ok_or(StoreError::RecordNotFound(id))?;
        to_record(id, blob, salt, iv)
    }

    /// Loads every row in id order.
    ///
    /// The outer result fails on database errors; each inner result fails
    /// only for that row, so one damaged record doesn't hide the rest.
    pub fn records(&self) -> Result<Vec<Result<EncryptedRecord, StoreError>>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, image_blob, salt, iv FROM images ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                blob_column(row, 1)?,
                blob_column(row, 2)?,
                blob_column(row, 3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, blob, salt, iv) = row?;
            records.push(to_record(id, blob, salt, iv));
        }
        Ok(records)
    }

    pub fn ids(&self) -> Result<Vec<i64>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT id FROM images ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// Ciphertext sizes per id, read without touching any key material.
    pub fn blob_sizes(&self) -> Result<Vec<(i64, usize)>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, length(image_blob) FROM images ORDER BY id")?;
        let sizes = stmt
            .query_map([], |row| {
                let len: Option<i64> = row.get(1)?;
                Ok((row.get::<_, i64>(0)?, len.unwrap_or(0) as usize))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sizes)
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    pub fn remove(&self, id: i64) -> Result<(), StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM images WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::RecordNotFound(id));
        }
        debug!("removed image #{id}");
        Ok(())
    }
}

// NULL columns come back empty and are then rejected by length checks
fn blob_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Vec<u8>> {
    Ok(row.get::<_, Option<Vec<u8>>>(idx)?.unwrap_or_default())
}

fn to_record(
    id: i64,
    blob: Vec<u8>,
    salt: Vec<u8>,
    iv: Vec<u8>,
) -> Result<EncryptedRecord, StoreError> {
    let sealed = SealedImage::from_parts(blob, &salt, &iv)
        .map_err(|source| StoreError::MalformedRecord { id, source })?;
    Ok(EncryptedRecord::new(id, sealed))
}
