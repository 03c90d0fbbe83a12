//! Session-scoped passphrase handling.

use std::collections::HashMap;

use parking_lot::Mutex;
use zeroize::Zeroizing;

use crate::crypto::{self, DerivedKey, KdfParams, SALT_LEN};
use crate::error::CryptoError;
use crate::record::SealedImage;

/// Holds the passphrase for the lifetime of one unlocked session.
///
/// The passphrase is wiped when the session is dropped. Cached keys are
/// keyed by salt and only ever derived from this session's passphrase.
pub struct Session {
    passphrase: Zeroizing<String>,
    kdf: KdfParams,
    key_cache: Option<Mutex<HashMap<[u8; SALT_LEN], DerivedKey>>>,
}

impl Session {
    pub fn new(passphrase: Zeroizing<String>) -> Result<Self, CryptoError> {
        Self::with_kdf(passphrase, KdfParams::default())
    }

    /// The vault does not store `kdf`; reads must use the params the
    /// records were written with.
    pub fn with_kdf(passphrase: Zeroizing<String>, kdf: KdfParams) -> Result<Self, CryptoError> {
        if passphrase.is_empty() {
            return Err(CryptoError::InvalidParameter(
                "passphrase cannot be empty".into(),
            ));
        }
        kdf.validate()?;

        Ok(Self {
            passphrase,
            kdf,
            key_cache: None,
        })
    }

    /// Keep derived keys for the rest of the session so re-reading a record
    /// skips the PBKDF2 cost.
    pub fn cache_keys(mut self) -> Self {
        self.key_cache = Some(Mutex::new(HashMap::new()));
        self
    }

    pub fn kdf(&self) -> KdfParams {
        self.kdf
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<SealedImage, CryptoError> {
        let (ciphertext, salt, iv) = crypto::encrypt_with(plaintext, &self.passphrase, self.kdf)?;
        Ok(SealedImage::new(ciphertext, salt, iv))
    }

    pub fn decrypt(&self, sealed: &SealedImage) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let Some(cache) = &self.key_cache else {
            return crypto::decrypt_with(
                sealed.ciphertext(),
                &self.passphrase,
                sealed.salt(),
                sealed.iv(),
                self.kdf,
            );
        };

        let key = self.cached_key(cache, sealed.salt())?;
        let mut plaintext = Zeroizing::new(sealed.ciphertext().to_vec());
        crypto::apply_keystream(&key, sealed.iv(), &mut plaintext)?;
        Ok(plaintext)
    }

    fn cached_key(
        &self,
        cache: &Mutex<HashMap<[u8; SALT_LEN], DerivedKey>>,
        salt: &[u8; SALT_LEN],
    ) -> Result<DerivedKey, CryptoError> {
        if let Some(key) = cache.lock().get(salt) {
            return Ok(key.clone());
        }

        // derive outside the lock so parallel loads don't serialize on PBKDF2
        let key = crypto::derive_key_with(&self.passphrase, salt, self.kdf)?;
        cache.lock().insert(*salt, key.clone());
        Ok(key)
    }

    pub fn cached_key_count(&self) -> usize {
        self.key_cache.as_ref().map_or(0, |c| c.lock().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(pw: &str) -> Session {
        Session::with_kdf(Zeroizing::new(pw.to_string()), KdfParams::new(1_000).unwrap()).unwrap()
    }

    #[test]
    fn empty_passphrase_is_rejected() {
        match Session::new(Zeroizing::new(String::new())) {
            Err(CryptoError::InvalidParameter(_)) => {}
            Err(e) => panic!("expected InvalidParameter, got: {e:?}"),
            Ok(_) => panic!("expected InvalidParameter, got a session"),
        }
    }

    #[test]
    fn session_roundtrip() {
        let s = session("pw");
        let sealed = s.encrypt(b"image bytes").unwrap();
        assert_eq!(sealed.len(), 11);
        assert_eq!(s.decrypt(&sealed).unwrap().as_slice(), b"image bytes");
    }

    #[test]
    fn other_session_gets_garbage() {
        let sealed = session("pw").encrypt(b"image bytes").unwrap();
        let out = session("not-pw").decrypt(&sealed).unwrap();
        assert_ne!(out.as_slice(), b"image bytes");
    }

    #[test]
    fn cached_decrypt_matches_uncached() {
        let plain = session("pw");
        let cached = session("pw").cache_keys();
        let sealed = plain.encrypt(b"some payload").unwrap();

        assert_eq!(cached.cached_key_count(), 0);
        assert_eq!(*cached.decrypt(&sealed).unwrap(), *plain.decrypt(&sealed).unwrap());
        assert_eq!(cached.cached_key_count(), 1);

        // second read hits the cache
        assert_eq!(cached.decrypt(&sealed).unwrap().as_slice(), b"some payload");
        assert_eq!(cached.cached_key_count(), 1);
    }

    #[test]
    fn cache_keys_per_salt() {
        let s = session("pw").cache_keys();
        let a = s.encrypt(b"a").unwrap();
        let b = s.encrypt(b"b").unwrap();

        assert_eq!(s.decrypt(&a).unwrap().as_slice(), b"a");
        assert_eq!(s.decrypt(&b).unwrap().as_slice(), b"b");
        assert_eq!(s.cached_key_count(), 2);
    }
}
