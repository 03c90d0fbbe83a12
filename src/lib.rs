pub mod crypto;
pub mod error;
pub mod export;
pub mod gallery;
pub mod media;
pub mod record;
pub mod session;
pub mod store;

pub use crate::crypto::{KdfParams, decrypt, derive_key, encrypt};
pub use crate::error::{CryptoError, MediaError, StoreError};
pub use crate::gallery::{Gallery, GalleryImage, Skipped};
pub use crate::record::{EncryptedRecord, SealedImage};
pub use crate::session::Session;
pub use crate::store::RecordStore;

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use log::{debug, info};
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// An unlocked vault: a record store plus the session that reads and
/// writes it.
pub struct ImageVault {
    store: RecordStore,
    session: Session,
}

impl ImageVault {
    pub fn new(store: RecordStore, session: Session) -> Self {
        Self { store, session }
    }

    pub fn open(session: Session, path: &Path) -> Result<Self> {
        let store = RecordStore::open(path)
            .with_context(|| format!("failed to open image database {}", path.display()))?;
        Ok(Self { store, session })
    }

    pub fn open_in_memory(session: Session) -> Result<Self> {
        let store = RecordStore::open_in_memory()?;
        Ok(Self { store, session })
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Normalises `bytes` to PNG, encrypts and stores them.
    pub fn import_bytes(&self, bytes: &[u8]) -> Result<i64> {
        let png = Zeroizing::new(media::normalize_to_png(bytes)?);
        let sealed = self
            .session
            .encrypt(&png)
            .context("failed to encrypt image")?;
        let id = self.store.insert(&sealed)?;
        Ok(id)
    }

    pub fn import_file(&self, path: &Path) -> Result<i64> {
        if !media::is_supported_path(path) {
            bail!(
                "unsupported image file '{}' (expected one of: {})",
                path.display(),
                media::SUPPORTED_EXTENSIONS.join(", ")
            );
        }

        let bytes = Zeroizing::new(
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?,
        );
        let id = self
            .import_bytes(&bytes)
            .with_context(|| format!("failed to import {}", path.display()))?;
        info!("imported {} as #{id}", path.display());
        Ok(id)
    }

    /// Imports each file in order, stopping at the first failure.
    pub fn import_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<i64>> {
        paths.iter().map(|p| self.import_file(p.as_ref())).collect()
    }

    /// Decrypts a record. The result is not checked; see [`ImageVault::export`].
    pub fn read(&self, id: i64) -> Result<Zeroizing<Vec<u8>>> {
        let record = self.store.get(id)?;
        let plaintext = self
            .session
            .decrypt(record.sealed())
            .with_context(|| format!("failed to decrypt image #{id}"))?;
        Ok(plaintext)
    }

    /// Decrypts a record, checks it decodes as an image and writes it to
    /// `out` atomically.
    pub fn export(&self, id: i64, out: &Path) -> Result<media::ImageInfo> {
        let plaintext = self.read(id)?;
        let info = media::validate(&plaintext).with_context(|| {
            format!("image #{id} did not decrypt to a valid image; possibly wrong passphrase or corrupted data")
        })?;

        export::write_atomic(out, &plaintext)
            .with_context(|| format!("failed to write {}", out.display()))?;
        debug!("exported image #{id} to {}", out.display());
        Ok(info)
    }

    pub fn remove(&self, id: i64) -> Result<()> {
        self.store.remove(id)?;
        Ok(())
    }

    pub fn ids(&self) -> Result<Vec<i64>> {
        Ok(self.store.ids()?)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.store.len()?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.store.is_empty()?)
    }

    pub fn gallery(&self) -> Result<Gallery> {
        Ok(Gallery::load(&self.store, &self.session)?)
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    let project_dirs =
        ProjectDirs::from("", "", "imgvault").context("could not determine platform directories")?;

    Ok(project_dirs.data_dir().join("images.db"))
}
