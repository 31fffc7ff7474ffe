use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use quill_shared::TrxKind;

use crate::client::LightClient;
use crate::error::Result;
use crate::traverse::TraverseOptions;

/// Latest known profile fields for one publisher. Later records overwrite
/// earlier ones field by field, so a name-only update keeps the old avatar.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub name: Option<String>,
    /// The image map as published: `{name, mediaType, content}`.
    pub image: Option<Value>,
    pub wallet: Option<Value>,
}

/// Aggregated profiles plus the resume point of the walk that produced
/// them. Feed a saved book back in to only process new records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileBook {
    pub profiles: HashMap<String, Profile>,
    pub progress_trx: Option<String>,
}

impl LightClient {
    /// Fold every person record since `book.progress_trx` into the book.
    /// `senders` narrows the walk to those publishers; empty keeps all.
    pub fn collect_profiles(&self, mut book: ProfileBook, senders: &[String]) -> Result<ProfileBook> {
        let options = TraverseOptions {
            start_cursor: book.progress_trx.clone(),
            senders: senders.to_vec(),
            kinds: vec![TrxKind::Person],
            ..TraverseOptions::default()
        };

        for item in self.traverse(options) {
            let record = match item? {
                Ok(record) => record,
                Err(_) => continue,
            };
            book.progress_trx = Some(record.trx_id.clone());

            let profile = book.profiles.entry(record.publisher.clone()).or_default();
            if let Some(name) = record.content.get("name").and_then(Value::as_str) {
                profile.name = Some(name.to_string());
            }
            if let Some(image) = record.content.get("image") {
                profile.image = Some(image.clone());
            }
            if let Some(wallet) = record.content.get("wallet") {
                profile.wallet = Some(wallet.clone());
            }
        }
        Ok(book)
    }
}
