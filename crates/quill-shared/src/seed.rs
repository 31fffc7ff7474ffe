use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::constants::{SEED_URL_PREFIX, SYMMETRIC_KEY_SIZE};
use crate::crypto::SymmetricKey;
use crate::error::SeedError;

/// Everything a client needs to join and read one group, decoded from a
/// shareable `rum://seed?...` URL. Immutable once decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedDescriptor {
    pub group_id: Uuid,
    pub group_name: String,
    pub app_key: String,
    /// Owner's compressed secp256k1 public key, standard base64.
    pub owner_pubkey: String,
    /// 32-byte AES-256-GCM group cipher key.
    pub cipher_key: SymmetricKey,
    /// Node endpoint, URL-unescaped but otherwise carried through as-is.
    /// May embed a `jwt` bearer token; extracting it is the caller's job.
    pub endpoint_url: String,
    /// Group creation time, big-endian integer from the `t` field.
    pub created_at: i64,
    /// Absent on some seed variants; only this field may be missing.
    pub genesis_block_id: Option<Uuid>,
}

impl SeedDescriptor {
    /// Decode a seed URL into its connection and cryptographic parameters.
    ///
    /// Every key must appear exactly once; a repeated key is a decode error,
    /// not a silent pick. All binary fields are url-safe base64 without
    /// padding, so padding is restored before decoding.
    pub fn decode(seed_url: &str) -> Result<Self, SeedError> {
        if !seed_url.starts_with(SEED_URL_PREFIX) {
            return Err(SeedError::InvalidSeedFormat);
        }
        let url = Url::parse(seed_url).map_err(|_| SeedError::InvalidSeedFormat)?;

        let mut query: HashMap<String, String> = HashMap::new();
        for (key, value) in url.query_pairs() {
            if query.insert(key.to_string(), value.to_string()).is_some() {
                return Err(SeedError::MalformedField(key.to_string()));
            }
        }

        let cipher_bytes = decode_b64url(required(&query, "c")?, "c")?;
        if cipher_bytes.len() != SYMMETRIC_KEY_SIZE {
            return Err(SeedError::MalformedField("c".into()));
        }
        let mut cipher_key = [0u8; SYMMETRIC_KEY_SIZE];
        cipher_key.copy_from_slice(&cipher_bytes);

        let genesis_block_id = match query.get("b") {
            Some(value) => Some(decode_uuid(value, "b")?),
            None => None,
        };

        Ok(Self {
            group_id: decode_uuid(required(&query, "g")?, "g")?,
            group_name: required(&query, "a")?.to_string(),
            app_key: required(&query, "y")?.to_string(),
            owner_pubkey: decode_pubkey(required(&query, "k")?)?,
            cipher_key,
            endpoint_url: required(&query, "u")?.to_string(),
            created_at: decode_timestamp(required(&query, "t")?)?,
            genesis_block_id,
        })
    }

    /// Hex form of the cipher key, for transport-neutral storage.
    pub fn cipher_key_hex(&self) -> String {
        hex::encode(self.cipher_key)
    }
}

fn required<'a>(query: &'a HashMap<String, String>, key: &str) -> Result<&'a str, SeedError> {
    query
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| SeedError::MalformedField(key.to_string()))
}

/// Restore padding (`(4 - len % 4) % 4` pad characters) and decode url-safe
/// base64.
fn decode_b64url(value: &str, field: &str) -> Result<Vec<u8>, SeedError> {
    use base64::engine::general_purpose::URL_SAFE;
    use base64::Engine;

    let pad = (4 - value.len() % 4) % 4;
    let mut padded = value.to_string();
    padded.push_str(&"=".repeat(pad));
    URL_SAFE
        .decode(padded)
        .map_err(|_| SeedError::MalformedField(field.to_string()))
}

fn decode_uuid(value: &str, field: &str) -> Result<Uuid, SeedError> {
    let bytes = decode_b64url(value, field)?;
    Uuid::from_slice(&bytes).map_err(|_| SeedError::MalformedField(field.to_string()))
}

/// Big-endian unsigned integer, at most 8 bytes.
fn decode_timestamp(value: &str) -> Result<i64, SeedError> {
    let bytes = decode_b64url(value, "t")?;
    if bytes.len() > 8 {
        return Err(SeedError::MalformedField("t".into()));
    }
    let mut out: i64 = 0;
    for byte in bytes {
        out = (out << 8) | i64::from(byte);
    }
    Ok(out)
}

/// The owner pubkey travels url-safe; re-encode the raw compressed key as
/// standard base64, which is how the ledger spells pubkeys everywhere else.
fn decode_pubkey(value: &str) -> Result<String, SeedError> {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    let bytes = decode_b64url(value, "k")?;
    Ok(STANDARD.encode(bytes))
}
