/// Required prefix of every shareable seed URL
pub const SEED_URL_PREFIX: &str = "rum://seed?";

/// AES-256-GCM nonce size in bytes
pub const NONCE_SIZE: usize = 12;

/// AES-256-GCM authentication tag size in bytes
pub const TAG_SIZE: usize = 16;

/// Symmetric cipher key size in bytes
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// secp256k1 private scalar size in bytes
pub const SIGNING_KEY_SIZE: usize = 32;

/// Compressed SEC1 public key size in bytes
pub const COMPRESSED_PUBKEY_SIZE: usize = 33;

/// Version string stamped into every outbound trx
pub const TRX_VERSION: &str = "1.0.0";

/// Trx expiry window: 30 seconds, in nanoseconds
pub const TRX_EXPIRE_NANOS: i64 = 30_000_000_000;

/// Content marker for a deleted note
pub const DELETED_MARKER: &str = "OBJECT_STATUS_DELETED";
