use thiserror::Error;

/// Failures raised by key derivation and the payload cipher.
///
/// A wrong passphrase is deliberately absent: the cipher cannot detect it.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("cipher failure: {0}")]
    Cipher(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("image #{0} not found")]
    RecordNotFound(i64),

    #[error("image #{id} is malformed: {source}")]
    MalformedRecord {
        id: i64,
        #[source]
        source: CryptoError,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("unsupported image file: {0}")]
    Unsupported(String),

    #[error("not a readable image: {0}")]
    Decode(#[from] image::ImageError),
}
