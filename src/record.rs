//! Encrypted record types.
//!
//! A record binds a ciphertext to the salt and IV needed to reverse it.

use crate::crypto::{IV_LEN, SALT_LEN};
use crate::error::CryptoError;

/// Ciphertext plus the parameters it was produced with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedImage {
    ciphertext: Vec<u8>,
    salt: [u8; SALT_LEN],
    iv: [u8; IV_LEN],
}

impl SealedImage {
    pub fn new(ciphertext: Vec<u8>, salt: [u8; SALT_LEN], iv: [u8; IV_LEN]) -> Self {
        Self {
            ciphertext,
            salt,
            iv,
        }
    }

    /// Rebuilds a sealed image from raw stored columns.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if the salt or IV is not 16 bytes.
    pub fn from_parts(ciphertext: Vec<u8>, salt: &[u8], iv: &[u8]) -> Result<Self, CryptoError> {
        let salt: [u8; SALT_LEN] = salt.try_into().map_err(|_| {
            CryptoError::InvalidParameter(format!(
                "stored salt must be {SALT_LEN} bytes, got {}",
                salt.len()
            ))
        })?;
        let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| {
            CryptoError::InvalidParameter(format!(
                "stored iv must be {IV_LEN} bytes, got {}",
                iv.len()
            ))
        })?;

        Ok(Self::new(ciphertext, salt, iv))
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    /// Plaintext length; CTR mode adds no padding.
    pub fn len(&self) -> usize {
        self.ciphertext.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ciphertext.is_empty()
    }
}

/// A sealed image as persisted, with its row id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedRecord {
    id: i64,
    sealed: SealedImage,
}

impl EncryptedRecord {
    pub fn new(id: i64, sealed: SealedImage) -> Self {
        Self { id, sealed }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn sealed(&self) -> &SealedImage {
        &self.sealed
    }

    pub fn into_sealed(self) -> SealedImage {
        self.sealed
    }
}
