use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::TrxError;

/// One image carried inside a trx.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    pub name: String,
    /// MIME string, e.g. `image/jpeg`.
    pub media_type: String,
    pub content: Vec<u8>,
}

/// Reference to the trx a note replies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InReplyTo {
    pub trxid: String,
}

/// Object-shaped content: notes, edits, deletes, replies, likes.
///
/// `kind` is the wire-level `type` string. For a Note, `id` present means the
/// trx edits or deletes the trx it names; for a Like/Dislike, `id` is the
/// liked trx.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectContent {
    pub kind: String,
    pub id: Option<String>,
    pub content: Option<String>,
    pub name: Option<String>,
    pub image: Vec<ImageAttachment>,
    pub inreplyto: Option<InReplyTo>,
}

impl ObjectContent {
    pub fn note() -> Self {
        Self {
            kind: "Note".to_string(),
            ..Self::default()
        }
    }

    /// A Like/Dislike pointing at `target`. Any other label is
    /// `InvalidLikeKind`; input is case-insensitive, the wire form is
    /// title-cased.
    pub fn like(target: &str, kind: &str) -> Result<Self, TrxError> {
        let wire_kind = match kind.to_lowercase().as_str() {
            "like" => "Like",
            "dislike" => "Dislike",
            _ => return Err(TrxError::InvalidLikeKind(kind.to_string())),
        };
        Ok(Self {
            kind: wire_kind.to_string(),
            id: Some(target.to_string()),
            ..Self::default()
        })
    }
}

/// Person-shaped content: a profile update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonContent {
    pub name: Option<String>,
    pub image: Option<ImageAttachment>,
    /// Opaque wallet descriptor; the client never interprets it.
    pub wallet: Option<String>,
}

/// Which of the two payload shapes a decrypted trx carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeUrl {
    Object,
    Person,
}

impl std::fmt::Display for TypeUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Object => write!(f, "Object"),
            Self::Person => write!(f, "Person"),
        }
    }
}

/// Binary enum tags as written by the serializer. Decode dispatches on these
/// explicitly so an unknown shape fails as `UnknownContentType` instead of a
/// generic parse error.
pub const TAG_OBJECT: u32 = 0;
pub const TAG_PERSON: u32 = 1;

/// The tagged union sealed inside every trx. The serialized form records its
/// own variant, so decryption recovers the shape without external metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContentPayload {
    Object(ObjectContent),
    Person(PersonContent),
}

impl ContentPayload {
    /// Exactly one of the two shapes must be supplied.
    pub fn from_parts(
        object: Option<ObjectContent>,
        person: Option<PersonContent>,
    ) -> Result<Self, TrxError> {
        match (object, person) {
            (Some(object), None) => Ok(Self::Object(object)),
            (None, Some(person)) => Ok(Self::Person(person)),
            _ => Err(TrxError::MissingContent),
        }
    }

    pub fn type_url(&self) -> TypeUrl {
        match self {
            Self::Object(_) => TypeUrl::Object,
            Self::Person(_) => TypeUrl::Person,
        }
    }

    /// Serialize to the self-describing binary form (bincode; the leading u32
    /// is the variant tag).
    pub fn to_bytes(&self) -> Result<Vec<u8>, TrxError> {
        bincode::serialize(self).map_err(|err| TrxError::Serialization(err.to_string()))
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, TrxError> {
        bincode::deserialize(data).map_err(|err| TrxError::Serialization(err.to_string()))
    }

    /// Untyped JSON view with only the present fields, which is what
    /// classification and callers inspect. Image bytes become standard
    /// base64 strings.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Object(object) => {
                let mut map = Map::new();
                map.insert("type".into(), json!(object.kind));
                if let Some(id) = &object.id {
                    map.insert("id".into(), json!(id));
                }
                if let Some(content) = &object.content {
                    map.insert("content".into(), json!(content));
                }
                if let Some(name) = &object.name {
                    map.insert("name".into(), json!(name));
                }
                if !object.image.is_empty() {
                    let images: Vec<Value> = object.image.iter().map(image_value).collect();
                    map.insert("image".into(), Value::Array(images));
                }
                if let Some(inreplyto) = &object.inreplyto {
                    map.insert("inreplyto".into(), json!({ "trxid": inreplyto.trxid }));
                }
                Value::Object(map)
            }
            Self::Person(person) => {
                let mut map = Map::new();
                if let Some(name) = &person.name {
                    map.insert("name".into(), json!(name));
                }
                if let Some(image) = &person.image {
                    map.insert("image".into(), image_value(image));
                }
                if let Some(wallet) = &person.wallet {
                    map.insert("wallet".into(), json!(wallet));
                }
                Value::Object(map)
            }
        }
    }
}

fn image_value(image: &ImageAttachment) -> Value {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    json!({
        "name": image.name,
        "mediaType": image.media_type,
        "content": STANDARD.encode(&image.content),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_roundtrip() {
        let payload = ContentPayload::Object(ObjectContent {
            kind: "Note".into(),
            content: Some("hello ledger".into()),
            image: vec![ImageAttachment {
                name: "a.png".into(),
                media_type: "image/png".into(),
                content: vec![1, 2, 3],
            }],
            ..ObjectContent::default()
        });

        let bytes = payload.to_bytes().unwrap();
        let restored = ContentPayload::from_bytes(&bytes).unwrap();
        assert_eq!(payload, restored);
    }

    #[test]
    fn test_binary_form_carries_tag() {
        let object = ContentPayload::Object(ObjectContent::note()).to_bytes().unwrap();
        let person = ContentPayload::Person(PersonContent::default()).to_bytes().unwrap();

        assert_eq!(u32::from_le_bytes(object[..4].try_into().unwrap()), TAG_OBJECT);
        assert_eq!(u32::from_le_bytes(person[..4].try_into().unwrap()), TAG_PERSON);
    }

    #[test]
    fn test_exactly_one_shape() {
        assert!(matches!(
            ContentPayload::from_parts(None, None),
            Err(TrxError::MissingContent)
        ));
        assert!(matches!(
            ContentPayload::from_parts(
                Some(ObjectContent::note()),
                Some(PersonContent::default())
            ),
            Err(TrxError::MissingContent)
        ));
        assert!(ContentPayload::from_parts(Some(ObjectContent::note()), None).is_ok());
    }

    #[test]
    fn test_like_kind_validation() {
        assert_eq!(ObjectContent::like("t1", "LIKE").unwrap().kind, "Like");
        assert_eq!(ObjectContent::like("t1", "dislike").unwrap().kind, "Dislike");
        assert!(matches!(
            ObjectContent::like("t1", "love"),
            Err(TrxError::InvalidLikeKind(kind)) if kind == "love"
        ));
    }

    #[test]
    fn test_value_has_only_present_fields() {
        let mut note = ObjectContent::note();
        note.content = Some("text".into());
        let value = ContentPayload::Object(note).to_value();

        assert_eq!(value["type"], "Note");
        assert_eq!(value["content"], "text");
        assert!(value.get("image").is_none());
        assert!(value.get("inreplyto").is_none());
        assert!(value.get("id").is_none());
    }
}
