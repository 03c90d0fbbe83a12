//! AES-256-CTR payload cipher.
//!
//! The 16-byte IV is the initial counter block, incremented as a 128-bit
//! big-endian integer. There is no authentication tag: decrypting with the
//! wrong passphrase, salt or IV succeeds and returns garbage of the same
//! length. Callers that need to tell good output from bad must inspect the
//! plaintext themselves (see `media::validate`).

use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use getrandom::fill;
use zeroize::Zeroizing;

use super::kdf::{KdfParams, derive_key_with};
use super::{IV_LEN, KEY_LEN, SALT_LEN};
use crate::error::CryptoError;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// Fill buffer with cryptographically secure random bytes
fn secure_random(buf: &mut [u8]) -> Result<(), CryptoError> {
    fill(buf).map_err(|e| CryptoError::Cipher(format!("OS random generator unavailable: {e}")))
}

/// Generate salt
pub fn generate_salt() -> Result<[u8; SALT_LEN], CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    secure_random(&mut salt)?;
    Ok(salt)
}

/// Generate IV
pub fn generate_iv() -> Result<[u8; IV_LEN], CryptoError> {
    let mut iv = [0u8; IV_LEN];
    secure_random(&mut iv)?;
    Ok(iv)
}

/// XOR `data` in place with the AES-256-CTR keystream for `key` and `iv`.
///
/// Encryption and decryption are the same operation.
pub fn apply_keystream(key: &[u8; KEY_LEN], iv: &[u8], data: &mut [u8]) -> Result<(), CryptoError> {
    if iv.len() != IV_LEN {
        return Err(CryptoError::InvalidParameter(format!(
            "iv must be {IV_LEN} bytes, got {}",
            iv.len()
        )));
    }

    let mut cipher = Aes256Ctr::new_from_slices(key, iv)
        .map_err(|e| CryptoError::Cipher(format!("cipher init failed: {e}")))?;

    cipher
        .try_apply_keystream(data)
        .map_err(|e| CryptoError::Cipher(format!("keystream exhausted: {e}")))
}

/// Encrypt a payload under a passphrase.
///
/// Returns `(ciphertext, salt, iv)`. Salt and IV are drawn fresh and
/// independently for every call.
pub fn encrypt(
    plaintext: &[u8],
    passphrase: &str,
) -> Result<(Vec<u8>, [u8; SALT_LEN], [u8; IV_LEN]), CryptoError> {
    encrypt_with(plaintext, passphrase, KdfParams::default())
}

pub fn encrypt_with(
    plaintext: &[u8],
    passphrase: &str,
    kdf: KdfParams,
) -> Result<(Vec<u8>, [u8; SALT_LEN], [u8; IV_LEN]), CryptoError> {
    let salt = generate_salt()?;
    let iv = generate_iv()?;
    let key = derive_key_with(passphrase, &salt, kdf)?;

    let mut ciphertext = plaintext.to_vec();
    apply_keystream(&key, &iv, &mut ciphertext)?;

    Ok((ciphertext, salt, iv))
}

/// Decrypt a payload with the passphrase, salt and IV it was written with.
///
/// A wrong passphrase is not an error: the result is simply not the
/// original plaintext.
pub fn decrypt(
    ciphertext: &[u8],
    passphrase: &str,
    salt: &[u8],
    iv: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    decrypt_with(ciphertext, passphrase, salt, iv, KdfParams::default())
}

pub fn decrypt_with(
    ciphertext: &[u8],
    passphrase: &str,
    salt: &[u8],
    iv: &[u8],
    kdf: KdfParams,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if iv.len() != IV_LEN {
        return Err(CryptoError::InvalidParameter(format!(
            "iv must be {IV_LEN} bytes, got {}",
            iv.len()
        )));
    }

    let key = derive_key_with(passphrase, salt, kdf)?;

    let mut plaintext = Zeroizing::new(ciphertext.to_vec());
    apply_keystream(&key, iv, &mut plaintext)?;
    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> KdfParams {
        KdfParams::new(1_000).unwrap()
    }

    #[test]
    fn hello_roundtrip_and_wrong_passphrase() {
        let (ciphertext, salt, iv) = encrypt(b"hello", "correct-horse").unwrap();
        assert_eq!(ciphertext.len(), 5);

        let plaintext = decrypt(&ciphertext, "correct-horse", &salt, &iv).unwrap();
        assert_eq!(plaintext.as_slice(), b"hello");

        let garbage = decrypt(&ciphertext, "wrong-password", &salt, &iv).unwrap();
        assert_eq!(garbage.len(), 5);
        assert_ne!(garbage.as_slice(), b"hello");
    }

    #[test]
    fn roundtrip_various_sizes() {
        for len in [0usize, 1, 15, 16, 17, 4096, 100_003] {
            let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let (ciphertext, salt, iv) = encrypt_with(&data, "pw", fast()).unwrap();
            assert_eq!(ciphertext.len(), data.len());

            let plaintext = decrypt_with(&ciphertext, "pw", &salt, &iv, fast()).unwrap();
            assert_eq!(*plaintext, data);
        }
    }

    #[test]
    fn salt_and_iv_are_fresh_per_call() {
        let data = vec![0u8; 64];

        let (c1, s1, i1) = encrypt_with(&data, "pw", fast()).unwrap();
        let (c2, s2, i2) = encrypt_with(&data, "pw", fast()).unwrap();

        assert_ne!(s1, s2);
        assert_ne!(i1, i2);
        assert_ne!(s1, i1);
        assert_ne!(c1, c2);
    }

    #[test]
    fn wrong_passphrase_yields_different_bytes() {
        let data = b"\x89PNG\r\n\x1a\n not really an image but long enough".to_vec();
        let (ciphertext, salt, iv) = encrypt_with(&data, "right", fast()).unwrap();

        let out = decrypt_with(&ciphertext, "wrong", &salt, &iv, fast()).unwrap();
        assert_eq!(out.len(), data.len());
        assert_ne!(*out, data);
    }

    #[test]
    fn decrypt_rejects_bad_parameter_lengths() {
        let (ciphertext, salt, iv) = encrypt_with(b"abc", "pw", fast()).unwrap();

        match decrypt_with(&ciphertext, "pw", &salt[..8], &iv, fast()) {
            Err(CryptoError::InvalidParameter(_)) => {}
            other => panic!("expected InvalidParameter, got: {other:?}"),
        }

        match decrypt_with(&ciphertext, "pw", &salt, &iv[..12], fast()) {
            Err(CryptoError::InvalidParameter(_)) => {}
            other => panic!("expected InvalidParameter, got: {other:?}"),
        }
    }

    #[test]
    fn keystream_matches_sp800_38a_ctr_aes256() {
        // NIST SP 800-38A, F.5.5 CTR-AES256.Encrypt, blocks 1 and 2
        let key: [u8; KEY_LEN] = hex::decode(
            "603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4",
        )
        .unwrap()
        .try_into()
        .unwrap();
        let iv = hex::decode("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff").unwrap();
        let mut data =
            hex::decode("6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51")
                .unwrap();

        apply_keystream(&key, &iv, &mut data).unwrap();

        assert_eq!(
            hex::encode(&data),
            "601ec313775789a5b7a7f504bbf3d228f443e3ca4d62b59aca84e990cacaf5c5"
        );
    }

    #[test]
    fn salt_and_iv_have_expected_length() {
        assert_eq!(generate_salt().unwrap().len(), SALT_LEN);
        assert_eq!(generate_iv().unwrap().len(), IV_LEN);
    }
}
