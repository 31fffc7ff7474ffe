use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use crate::constants::SIGNING_KEY_SIZE;
use crate::error::TrxError;

/// Accepted signing-key inputs, resolved once into a 32-byte scalar.
#[derive(Debug, Clone)]
pub enum KeyMaterial {
    /// Hex string, with or without a `0x` prefix.
    Hex(String),
    /// Raw scalar bytes.
    Raw(Vec<u8>),
    /// Unsigned integer form, widened big-endian into 32 bytes.
    Uint(u128),
}

impl From<&str> for KeyMaterial {
    fn from(value: &str) -> Self {
        Self::Hex(value.to_string())
    }
}

impl From<Vec<u8>> for KeyMaterial {
    fn from(value: Vec<u8>) -> Self {
        Self::Raw(value)
    }
}

impl From<[u8; 32]> for KeyMaterial {
    fn from(value: [u8; 32]) -> Self {
        Self::Raw(value.to_vec())
    }
}

impl From<u128> for KeyMaterial {
    fn from(value: u128) -> Self {
        Self::Uint(value)
    }
}

/// A group member's signing identity: a secp256k1 private scalar.
/// The compressed public key is the member's ledger-wide name.
#[derive(Clone)]
pub struct Signer {
    key: SigningKey,
}

impl Signer {
    /// Generate a fresh random identity.
    pub fn generate() -> Self {
        Self {
            key: SigningKey::random(&mut OsRng),
        }
    }

    /// Build a signer from any accepted key-material form.
    pub fn new(material: impl Into<KeyMaterial>) -> Result<Self, TrxError> {
        let bytes = normalize_key(material.into())?;
        let key = SigningKey::from_slice(&bytes).map_err(|_| TrxError::InvalidSigningKey)?;
        Ok(Self { key })
    }

    pub fn from_hex(hex_key: &str) -> Result<Self, TrxError> {
        Self::new(KeyMaterial::Hex(hex_key.to_string()))
    }

    /// The private scalar, `0x`-prefixed hex.
    pub fn secret_hex(&self) -> String {
        format!("0x{}", hex::encode(self.key.to_bytes()))
    }

    /// Compressed SEC1 public key as url-safe base64: the form every trx
    /// carries in its SenderPubkey field.
    pub fn pubkey_b64(&self) -> String {
        use base64::engine::general_purpose::URL_SAFE;
        use base64::Engine;
        URL_SAFE.encode(self.key.verifying_key().to_encoded_point(true).as_bytes())
    }

    /// Sign a 32-byte digest, yielding the 65-byte recoverable form r || s || v.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<Vec<u8>, TrxError> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest)
            .map_err(|err| TrxError::Signature(err.to_string()))?;
        let mut out = signature.to_bytes().to_vec();
        out.push(recovery_id.to_byte());
        Ok(out)
    }
}

fn normalize_key(material: KeyMaterial) -> Result<[u8; SIGNING_KEY_SIZE], TrxError> {
    let bytes = match material {
        KeyMaterial::Hex(hex_key) => {
            let trimmed = hex_key.trim();
            let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
            hex::decode(stripped).map_err(|_| TrxError::InvalidSigningKey)?
        }
        KeyMaterial::Raw(bytes) => bytes,
        KeyMaterial::Uint(value) => {
            let mut out = [0u8; SIGNING_KEY_SIZE];
            out[SIGNING_KEY_SIZE - 16..].copy_from_slice(&value.to_be_bytes());
            return Ok(out);
        }
    };
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| TrxError::InvalidSigningKey)
}

/// Check a 65-byte recoverable signature (r || s || v) over `digest` against a
/// base64 compressed public key. Opt-in: the codec never calls this itself.
pub fn verify_signature(
    pubkey_b64: &str,
    digest: &[u8; 32],
    signature: &[u8],
) -> Result<(), TrxError> {
    let pubkey_bytes = decode_pubkey_b64(pubkey_b64)?;
    let verifying_key = VerifyingKey::from_sec1_bytes(&pubkey_bytes)
        .map_err(|_| TrxError::Signature("invalid sender pubkey".into()))?;

    if signature.len() < 64 {
        return Err(TrxError::Signature("signature too short".into()));
    }
    let signature = Signature::from_slice(&signature[..64])
        .map_err(|err| TrxError::Signature(err.to_string()))?;

    verifying_key
        .verify_prehash(digest, &signature)
        .map_err(|_| TrxError::Signature("signature does not match sender".into()))
}

/// Pubkeys appear both url-safe (on trxs) and standard (in seeds); accept
/// either alphabet.
fn decode_pubkey_b64(pubkey_b64: &str) -> Result<Vec<u8>, TrxError> {
    use base64::engine::general_purpose::{STANDARD, URL_SAFE};
    use base64::Engine;

    URL_SAFE
        .decode(pubkey_b64)
        .or_else(|_| STANDARD.decode(pubkey_b64))
        .map_err(|_| TrxError::Signature("pubkey is not valid base64".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::COMPRESSED_PUBKEY_SIZE;

    #[test]
    fn test_hex_forms_equivalent() {
        let signer = Signer::generate();
        let hex_key = signer.secret_hex();

        let with_prefix = Signer::from_hex(&hex_key).unwrap();
        let without_prefix = Signer::from_hex(hex_key.trim_start_matches("0x")).unwrap();

        assert_eq!(with_prefix.pubkey_b64(), signer.pubkey_b64());
        assert_eq!(without_prefix.pubkey_b64(), signer.pubkey_b64());
    }

    #[test]
    fn test_raw_bytes_form() {
        let signer = Signer::generate();
        let raw = hex::decode(signer.secret_hex().trim_start_matches("0x")).unwrap();
        let restored = Signer::new(raw).unwrap();
        assert_eq!(restored.pubkey_b64(), signer.pubkey_b64());
    }

    #[test]
    fn test_uint_form() {
        let signer = Signer::new(42u128).unwrap();
        let mut expected = [0u8; 32];
        expected[31] = 42;
        let same = Signer::new(expected).unwrap();
        assert_eq!(signer.pubkey_b64(), same.pubkey_b64());
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(matches!(
            Signer::new(vec![1u8; 31]),
            Err(TrxError::InvalidSigningKey)
        ));
        assert!(matches!(
            Signer::from_hex("0xdeadbeef"),
            Err(TrxError::InvalidSigningKey)
        ));
        assert!(matches!(
            Signer::from_hex("not hex"),
            Err(TrxError::InvalidSigningKey)
        ));
    }

    #[test]
    fn test_pubkey_is_compressed() {
        use base64::engine::general_purpose::URL_SAFE;
        use base64::Engine;

        let signer = Signer::generate();
        let bytes = URL_SAFE.decode(signer.pubkey_b64()).unwrap();
        assert_eq!(bytes.len(), COMPRESSED_PUBKEY_SIZE);
        assert!(bytes[0] == 0x02 || bytes[0] == 0x03);
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let signer = Signer::generate();
        let digest = [7u8; 32];

        let signature = signer.sign_digest(&digest).unwrap();
        assert_eq!(signature.len(), 65);

        verify_signature(&signer.pubkey_b64(), &digest, &signature).unwrap();

        // wrong digest must fail
        assert!(verify_signature(&signer.pubkey_b64(), &[8u8; 32], &signature).is_err());

        // wrong key must fail
        let other = Signer::generate();
        assert!(verify_signature(&other.pubkey_b64(), &digest, &signature).is_err());
    }
}
