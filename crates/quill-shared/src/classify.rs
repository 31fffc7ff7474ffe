use serde::{Deserialize, Serialize};

use crate::content::TypeUrl;
use crate::trx::{ContentItem, DecryptedRecord};

/// Closed taxonomy of everything a group ledger can carry, as seen by a
/// reader. The reply variants below `Reply` only appear when classification
/// runs in deep mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrxKind {
    /// The group key does not open this record.
    Encrypted,
    Person,
    /// Chain-management request; content `type` is an integer.
    Announce,
    Reply,
    ReplyImageOnly,
    ReplyImageText,
    ReplyTextOnly,
    ImageOnly,
    ImageText,
    TextOnly,
    Like,
    Dislike,
    File,
    Other,
}

impl std::fmt::Display for TrxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Encrypted => "encrypted",
            Self::Person => "person",
            Self::Announce => "announce",
            Self::Reply => "reply",
            Self::ReplyImageOnly => "reply_image_only",
            Self::ReplyImageText => "reply_image_text",
            Self::ReplyTextOnly => "reply_text_only",
            Self::ImageOnly => "image_only",
            Self::ImageText => "image_text",
            Self::TextOnly => "text_only",
            Self::Like => "like",
            Self::Dislike => "dislike",
            Self::File => "file",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Classify a decrypted record by field presence alone. Pure and total:
/// every record maps to some kind, unrecognized shapes land on `Other`.
///
/// With `deep_reply` a reply is refined by what it carries, mirroring how
/// plain notes split into image/text kinds.
pub fn classify(record: &DecryptedRecord, deep_reply: bool) -> TrxKind {
    if record.type_url == TypeUrl::Person {
        return TrxKind::Person;
    }

    let content = &record.content;
    let kind = match content.get("type") {
        Some(value) if value.is_i64() || value.is_u64() => return TrxKind::Announce,
        Some(value) => value.as_str().unwrap_or(""),
        None => return TrxKind::Other,
    };

    if kind == "Note" {
        let has_image = content.get("image").is_some();
        let has_text = content.get("content").is_some();
        if content.get("inreplyto").is_some() {
            if !deep_reply {
                return TrxKind::Reply;
            }
            return if has_image {
                if has_text {
                    TrxKind::ReplyImageText
                } else {
                    TrxKind::ReplyImageOnly
                }
            } else {
                TrxKind::ReplyTextOnly
            };
        }
        if has_image {
            return if has_text {
                TrxKind::ImageText
            } else {
                TrxKind::ImageOnly
            };
        }
        return TrxKind::TextOnly;
    }

    match kind.to_lowercase().as_str() {
        "like" => TrxKind::Like,
        "dislike" => TrxKind::Dislike,
        "file" => TrxKind::File,
        _ => TrxKind::Other,
    }
}

/// Classify a fetched item; records the key never opened are `Encrypted`.
pub fn classify_item(item: &ContentItem, deep_reply: bool) -> TrxKind {
    match item {
        Ok(record) => classify(record, deep_reply),
        Err(_) => TrxKind::Encrypted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(type_url: TypeUrl, content: serde_json::Value) -> DecryptedRecord {
        DecryptedRecord {
            trx_id: "t1".into(),
            publisher: "pk".into(),
            content,
            type_url,
            timestamp: 0,
        }
    }

    #[test]
    fn test_person_wins_over_content() {
        let r = record(TypeUrl::Person, json!({"name": "ann"}));
        assert_eq!(classify(&r, false), TrxKind::Person);
    }

    #[test]
    fn test_integer_type_is_announce() {
        let r = record(TypeUrl::Object, json!({"type": 4}));
        assert_eq!(classify(&r, false), TrxKind::Announce);
    }

    #[test]
    fn test_note_shapes() {
        let text = record(TypeUrl::Object, json!({"type": "Note", "content": "hi"}));
        assert_eq!(classify(&text, false), TrxKind::TextOnly);

        let image = record(TypeUrl::Object, json!({"type": "Note", "image": [{}]}));
        assert_eq!(classify(&image, false), TrxKind::ImageOnly);

        let both = record(
            TypeUrl::Object,
            json!({"type": "Note", "content": "hi", "image": [{}]}),
        );
        assert_eq!(classify(&both, false), TrxKind::ImageText);

        // bare note with neither field still lands somewhere
        let bare = record(TypeUrl::Object, json!({"type": "Note"}));
        assert_eq!(classify(&bare, false), TrxKind::TextOnly);
    }

    #[test]
    fn test_reply_depth() {
        let reply = record(
            TypeUrl::Object,
            json!({"type": "Note", "content": "hi", "inreplyto": {"trxid": "t0"}}),
        );
        assert_eq!(classify(&reply, false), TrxKind::Reply);
        assert_eq!(classify(&reply, true), TrxKind::ReplyTextOnly);

        let with_image = record(
            TypeUrl::Object,
            json!({"type": "Note", "image": [{}], "inreplyto": {"trxid": "t0"}}),
        );
        assert_eq!(classify(&with_image, false), TrxKind::Reply);
        assert_eq!(classify(&with_image, true), TrxKind::ReplyImageOnly);

        let with_both = record(
            TypeUrl::Object,
            json!({"type": "Note", "content": "hi", "image": [{}], "inreplyto": {"trxid": "t0"}}),
        );
        assert_eq!(classify(&with_both, true), TrxKind::ReplyImageText);
    }

    #[test]
    fn test_string_kinds() {
        for (label, expected) in [
            ("Like", TrxKind::Like),
            ("Dislike", TrxKind::Dislike),
            ("File", TrxKind::File),
            ("Whatever", TrxKind::Other),
        ] {
            let r = record(TypeUrl::Object, json!({"type": label}));
            assert_eq!(classify(&r, false), expected);
        }
        // no type field at all
        let r = record(TypeUrl::Object, json!({}));
        assert_eq!(classify(&r, false), TrxKind::Other);
    }

    #[test]
    fn test_undecryptable_item_is_encrypted() {
        let item: ContentItem = Err(crate::trx::EncryptedTrx::default());
        assert_eq!(classify_item(&item, true), TrxKind::Encrypted);
    }
}
