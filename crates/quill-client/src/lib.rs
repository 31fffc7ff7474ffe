// Client for reading and writing one private group through a node, end to
// end encrypted: seeds in, signed sealed trxs out, full-history traversal
// back.

pub mod chain;
pub mod client;
pub mod error;
pub mod profiles;
pub mod traverse;

pub use client::{ContentParams, LightClient, NoteDraft, ProfileDraft};
pub use error::{ClientError, Result};
pub use profiles::{Profile, ProfileBook};
pub use traverse::{ContentStream, FetchPage, TraverseOptions};

pub use quill_media::ImageSource;
pub use quill_shared::{
    classify, classify_item, ContentItem, DecryptedRecord, EncryptedTrx, SeedDescriptor, Signer,
    TrxKind,
};
