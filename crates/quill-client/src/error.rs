use thiserror::Error;

use quill_media::MediaError;
use quill_net::NetError;
use quill_shared::{CryptoError, SeedError, TrxError};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Seed error: {0}")]
    Seed(#[from] SeedError),

    #[error("Trx error: {0}")]
    Trx(#[from] TrxError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Network error: {0}")]
    Net(#[from] NetError),

    #[error("Invalid node endpoint: {0}")]
    Endpoint(String),

    #[error("Unexpected node response: {0}")]
    Response(String),

    /// An edit was attempted on a trx published by someone else.
    #[error("Not the sender of the trx")]
    NotTrxSender,
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
