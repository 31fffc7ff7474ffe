use thiserror::Error;

/// Errors raised while decoding a seed URL.
#[derive(Error, Debug)]
pub enum SeedError {
    /// The URL does not start with `rum://seed?`.
    #[error("Invalid seed URL: missing rum://seed? prefix")]
    InvalidSeedFormat,

    /// A required query parameter is absent, repeated or undecodable.
    #[error("Malformed seed field `{0}`")]
    MalformedField(String),
}

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed: invalid ciphertext or wrong key")]
    DecryptionFailed,

    #[error("Invalid key length")]
    InvalidKeyLength,
}

/// Errors raised while building, sealing or opening transactions.
#[derive(Error, Debug)]
pub enum TrxError {
    /// The signing key is not 32 bytes after normalization.
    #[error("Invalid signing key: expected a 32-byte secp256k1 scalar")]
    InvalidSigningKey,

    /// Neither or both of object/person content were supplied.
    #[error("Exactly one of object or person content is required")]
    MissingContent,

    /// Decrypt was called on a record without a data field.
    #[error("Trx carries no data field")]
    MissingData,

    /// The decrypted payload's type tag is neither Object nor Person.
    #[error("Unknown content type tag {0}")]
    UnknownContentType(u32),

    /// A like was requested with a label other than Like/Dislike.
    #[error("Like kind must be Like or Dislike, got `{0}`")]
    InvalidLikeKind(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Signature error: {0}")]
    Signature(String),
}
