//! Cryptographic primitives for the image vault.
//!
//! Provides passphrase-based key derivation and the payload cipher.

pub mod cipher;
pub mod kdf;

pub use cipher::{
    apply_keystream, decrypt, decrypt_with, encrypt, encrypt_with, generate_iv, generate_salt,
};
pub use kdf::{DerivedKey, KdfParams, derive_key, derive_key_with};

/// Length of the salt (16 bytes).
pub const SALT_LEN: usize = 16;
/// Length of the IV / initial counter block (16 bytes for AES-CTR).
pub const IV_LEN: usize = 16;
/// Length of the derived key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// PBKDF2-HMAC-SHA256 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 100_000;
