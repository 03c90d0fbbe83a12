use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::{KEY_LEN, PBKDF2_ITERATIONS, SALT_LEN};
use crate::error::CryptoError;

/// A 32-byte key, wiped from memory when dropped.
pub type DerivedKey = Zeroizing<[u8; KEY_LEN]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: PBKDF2_ITERATIONS,
        }
    }
}

impl KdfParams {
    /// Iteration counts are not stored with records; data written with one
    /// count can only be read back with the same count.
    pub fn new(iterations: u32) -> Result<Self, CryptoError> {
        let params = Self { iterations };
        params.validate()?;
        Ok(params)
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn validate(&self) -> Result<(), CryptoError> {
        if self.iterations < 1 {
            return Err(CryptoError::InvalidParameter(
                "pbkdf2 iteration count must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

/// Derive the 32-byte record key from a passphrase and a 16-byte salt
/// using PBKDF2-HMAC-SHA256 at the default cost.
///
/// Passphrase strength is not checked here.
pub fn derive_key(passphrase: &str, salt: &[u8]) -> Result<DerivedKey, CryptoError> {
    derive_key_with(passphrase, salt, KdfParams::default())
}

pub fn derive_key_with(
    passphrase: &str,
    salt: &[u8],
    kdf: KdfParams,
) -> Result<DerivedKey, CryptoError> {
    kdf.validate()?;

    if salt.len() != SALT_LEN {
        return Err(CryptoError::InvalidParameter(format!(
            "salt must be {SALT_LEN} bytes, got {}",
            salt.len()
        )));
    }

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, kdf.iterations, &mut *key);

    Ok(key)
}
