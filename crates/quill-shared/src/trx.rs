use std::sync::atomic::{AtomicU64, Ordering};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::constants::{TRX_EXPIRE_NANOS, TRX_VERSION};
use crate::content::{ContentPayload, TypeUrl, TAG_OBJECT, TAG_PERSON};
use crate::crypto::{self, SymmetricKey};
use crate::error::TrxError;
use crate::signer::{self, Signer};

/// The inner trx record, serialized to bincode both unsigned (for hashing)
/// and signed (for the wire). Field names follow the ledger's JSON spelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignedTrx {
    pub trx_id: String,
    pub group_id: String,
    /// First AEAD layer: the sealed content payload.
    pub data: Vec<u8>,
    #[serde(rename = "TimeStamp")]
    pub timestamp: i64,
    pub version: String,
    pub expired: i64,
    pub nonce: u64,
    pub sender_pubkey: String,
    /// Empty while the trx is being hashed for signing.
    pub sender_sign: Vec<u8>,
}

/// What actually goes over the wire to the node: the group id plus the
/// double-sealed trx, base64.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrxEnvelope {
    pub group_id: String,
    pub trx_item: String,
}

/// A trx as the node returns it: still sealed, fields base64 strings.
/// Anything the node omits defaults, so partial records still parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EncryptedTrx {
    pub trx_id: String,
    pub group_id: String,
    pub data: Option<String>,
    #[serde(rename = "TimeStamp")]
    pub timestamp: i64,
    pub version: String,
    pub expired: i64,
    pub nonce: u64,
    pub sender_pubkey: String,
    pub sender_sign: Option<String>,
}

impl EncryptedTrx {
    /// Recompute the unsigned-trx digest and check the attached signature
    /// against the sender pubkey. Decryption never calls this; callers who
    /// care about authorship opt in.
    pub fn verify_sender(&self) -> Result<(), TrxError> {
        let data_b64 = self.data.as_deref().ok_or(TrxError::MissingData)?;
        let data = STANDARD
            .decode(data_b64)
            .map_err(|err| TrxError::Serialization(err.to_string()))?;
        let sign_b64 = self
            .sender_sign
            .as_deref()
            .ok_or_else(|| TrxError::Signature("trx carries no signature".into()))?;
        let signature = STANDARD
            .decode(sign_b64)
            .map_err(|err| TrxError::Serialization(err.to_string()))?;

        let unsigned = SignedTrx {
            trx_id: self.trx_id.clone(),
            group_id: self.group_id.clone(),
            data,
            timestamp: self.timestamp,
            version: self.version.clone(),
            expired: self.expired,
            nonce: self.nonce,
            sender_pubkey: self.sender_pubkey.clone(),
            sender_sign: Vec::new(),
        };
        let digest = unsigned_digest(&unsigned)?;
        signer::verify_signature(&self.sender_pubkey, &digest, &signature)
    }
}

/// A trx after both AEAD layers are opened: readable content plus the
/// metadata a timeline needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptedRecord {
    pub trx_id: String,
    /// The sender pubkey, url-safe base64.
    pub publisher: String,
    /// Untyped JSON with only the fields the sender set.
    pub content: serde_json::Value,
    pub type_url: TypeUrl,
    pub timestamp: i64,
}

/// One fetched record: decrypted when the group key opens it, otherwise the
/// sealed form is passed through untouched.
pub type ContentItem = Result<DecryptedRecord, EncryptedTrx>;

/// Strictly increasing trx nonce, shared by every trx the codec seals.
#[derive(Debug, Default)]
pub struct NonceSource(AtomicU64);

impl NonceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// First call returns 1; every later call is strictly larger.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Caller-supplied trx time, either already-numeric or free text.
#[derive(Debug, Clone)]
pub enum Timestamp {
    Nanos(i64),
    Text(String),
}

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Self::Nanos(value)
    }
}

impl From<&str> for Timestamp {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Timestamp {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

/// Normalize any accepted time form to 19-digit nanoseconds. Unparseable
/// input falls back to now rather than erroring.
pub fn normalize_timestamp(timestamp: Option<Timestamp>) -> i64 {
    match timestamp {
        None => now_nanos(),
        Some(Timestamp::Nanos(nanos)) => widen_digits(&nanos.to_string()),
        Some(Timestamp::Text(text)) => match parse_calendar(&text) {
            Some(nanos) => nanos,
            None => widen_digits(&text),
        },
    }
}

/// `YYYY-MM-DD HH:MM` with `/` accepted for `-`; longer strings are cut to
/// the minute. Interpreted as UTC.
fn parse_calendar(text: &str) -> Option<i64> {
    let normalized = text.trim().replace('/', "-");
    let head = normalized.get(..16)?;
    let parsed = NaiveDateTime::parse_from_str(head, "%Y-%m-%d %H:%M").ok()?;
    Some(widen_digits(&parsed.and_utc().timestamp().to_string()))
}

/// Drop any decimal point, then truncate or right-pad with zeros to 19
/// digits so seconds, millis and nanos all land on the same scale.
fn widen_digits(text: &str) -> i64 {
    let mut digits: String = text.trim().chars().filter(|c| *c != '.').collect();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return now_nanos();
    }
    if digits.len() > 19 {
        digits.truncate(19);
    } else {
        while digits.len() < 19 {
            digits.push('0');
        }
    }
    digits.parse().unwrap_or_else(|_| now_nanos())
}

fn unsigned_digest(trx: &SignedTrx) -> Result<[u8; 32], TrxError> {
    let bytes =
        bincode::serialize(trx).map_err(|err| TrxError::Serialization(err.to_string()))?;
    Ok(Sha256::digest(&bytes).into())
}

/// Seals and opens trxs for one group. Owns the group cipher key and the
/// nonce counter; signing identity is passed per call.
pub struct TrxCodec {
    group_id: Uuid,
    cipher_key: SymmetricKey,
    nonce: NonceSource,
}

impl TrxCodec {
    pub fn new(group_id: Uuid, cipher_key: SymmetricKey) -> Self {
        Self {
            group_id,
            cipher_key,
            nonce: NonceSource::new(),
        }
    }

    pub fn group_id(&self) -> Uuid {
        self.group_id
    }

    /// The full outbound pipeline: seal the payload, build and sign the trx,
    /// then seal the signed trx again.
    pub fn encrypt(
        &self,
        signer: &Signer,
        payload: &ContentPayload,
        timestamp: Option<Timestamp>,
    ) -> Result<TrxEnvelope, TrxError> {
        let data = crypto::encrypt(&self.cipher_key, &payload.to_bytes()?)?;
        let timestamp = normalize_timestamp(timestamp);

        let mut trx = SignedTrx {
            trx_id: Uuid::new_v4().to_string(),
            group_id: self.group_id.to_string(),
            data,
            timestamp,
            version: TRX_VERSION.to_string(),
            expired: timestamp + TRX_EXPIRE_NANOS,
            nonce: self.nonce.next(),
            sender_pubkey: signer.pubkey_b64(),
            sender_sign: Vec::new(),
        };
        let digest = unsigned_digest(&trx)?;
        trx.sender_sign = signer.sign_digest(&digest)?;

        let signed =
            bincode::serialize(&trx).map_err(|err| TrxError::Serialization(err.to_string()))?;
        let wrapper = serde_json::json!({ "TrxBytes": STANDARD.encode(signed) });
        let sealed = crypto::encrypt(&self.cipher_key, wrapper.to_string().as_bytes())?;

        Ok(TrxEnvelope {
            group_id: self.group_id.to_string(),
            trx_item: STANDARD.encode(sealed),
        })
    }

    /// Open a fetched trx's data layer and recover its content. The payload's
    /// own leading tag decides the shape; an unrecognized tag is
    /// `UnknownContentType`, not a parse error.
    pub fn decrypt(&self, trx: &EncryptedTrx) -> Result<DecryptedRecord, TrxError> {
        let data_b64 = trx.data.as_deref().ok_or(TrxError::MissingData)?;
        let sealed = STANDARD
            .decode(data_b64)
            .map_err(|err| TrxError::Serialization(err.to_string()))?;
        let plain = crypto::decrypt(&self.cipher_key, &sealed)?;

        if plain.len() < 4 {
            return Err(TrxError::Serialization("payload too short".into()));
        }
        let mut tag = [0u8; 4];
        tag.copy_from_slice(&plain[..4]);
        let tag = u32::from_le_bytes(tag);
        if tag != TAG_OBJECT && tag != TAG_PERSON {
            return Err(TrxError::UnknownContentType(tag));
        }

        let payload = ContentPayload::from_bytes(&plain)?;
        Ok(DecryptedRecord {
            trx_id: trx.trx_id.clone(),
            publisher: trx.sender_pubkey.clone(),
            content: payload.to_value(),
            type_url: payload.type_url(),
            timestamp: trx.timestamp,
        })
    }

    /// Seal an API request body: JSON text through the group AEAD, base64.
    pub fn seal_request(&self, request: &serde_json::Value) -> Result<String, TrxError> {
        let sealed = crypto::encrypt(&self.cipher_key, request.to_string().as_bytes())?;
        Ok(STANDARD.encode(sealed))
    }
}
