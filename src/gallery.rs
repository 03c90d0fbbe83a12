//! Decrypted, navigable view over every record in the store.

use log::{debug, warn};
use rayon::prelude::*;
use zeroize::Zeroizing;

use crate::error::StoreError;
use crate::media::{self, ImageInfo};
use crate::session::Session;
use crate::store::RecordStore;

pub struct GalleryImage {
    id: i64,
    bytes: Zeroizing<Vec<u8>>,
    info: ImageInfo,
}

impl GalleryImage {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn info(&self) -> ImageInfo {
        self.info
    }
}

/// A record that could not be shown, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub id: i64,
    pub reason: String,
}

pub struct Gallery {
    images: Vec<GalleryImage>,
    skipped: Vec<Skipped>,
    current: usize,
}

impl Gallery {
    /// Decrypts and validates every record.
    ///
    /// Records that are malformed, fail to decrypt, or don't decode as an
    /// image afterwards (typically: written under another passphrase) are
    /// logged and skipped. Only database failures abort the load.
    pub fn load(store: &RecordStore, session: &Session) -> Result<Self, StoreError> {
        let records = store.records()?;
        debug!("loading gallery from {} records", records.len());

        let outcomes: Vec<Result<GalleryImage, Skipped>> = records
            .into_par_iter()
            .map(|record| -> Result<GalleryImage, Skipped> {
                let record = record.map_err(|e| Skipped {
                    id: record_id(&e),
                    reason: e.to_string(),
                })?;
                let id = record.id();

                let bytes = session.decrypt(record.sealed()).map_err(|e| Skipped {
                    id,
                    reason: e.to_string(),
                })?;
                let info = media::validate(&bytes).map_err(|e| Skipped {
                    id,
                    reason: e.to_string(),
                })?;

                Ok(GalleryImage { id, bytes, info })
            })
            .collect();

        let mut images = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(image) => images.push(image),
                Err(s) => {
                    warn!("skipping image #{}: {}", s.id, s.reason);
                    skipped.push(s);
                }
            }
        }

        Ok(Self {
            images,
            skipped,
            current: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn images(&self) -> &[GalleryImage] {
        &self.images
    }

    pub fn skipped(&self) -> &[Skipped] {
        &self.skipped
    }

    pub fn position(&self) -> Option<usize> {
        (!self.images.is_empty()).then_some(self.current)
    }

    pub fn current(&self) -> Option<&GalleryImage> {
        self.images.get(self.current)
    }

    /// Advances to the next image, wrapping to the first.
    pub fn next(&mut self) -> Option<&GalleryImage> {
        if self.images.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.images.len();
        self.current()
    }

    /// Steps back to the previous image, wrapping to the last.
    pub fn previous(&mut self) -> Option<&GalleryImage> {
        if self.images.is_empty() {
            return None;
        }
        self.current = (self.current + self.images.len() - 1) % self.images.len();
        self.current()
    }
}

fn record_id(err: &StoreError) -> i64 {
    match err {
        StoreError::RecordNotFound(id) | StoreError::MalformedRecord { id, .. } => *id,
        _ => -1,
    }
}
