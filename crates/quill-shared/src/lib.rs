// Shared building blocks for the quill light node: seed decoding, the AEAD
// envelope, the secp256k1 signer, the trx codec and content classification.

pub mod classify;
pub mod constants;
pub mod content;
pub mod crypto;
pub mod error;
pub mod seed;
pub mod signer;
pub mod trx;

pub use classify::{classify, classify_item, TrxKind};
pub use content::{
    ContentPayload, ImageAttachment, InReplyTo, ObjectContent, PersonContent, TypeUrl,
};
pub use crypto::SymmetricKey;
pub use error::{CryptoError, SeedError, TrxError};
pub use seed::SeedDescriptor;
pub use signer::{KeyMaterial, Signer};
pub use trx::{
    ContentItem, DecryptedRecord, EncryptedTrx, NonceSource, SignedTrx, Timestamp, TrxCodec,
    TrxEnvelope,
};
