use serde_json::{json, Value};
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use quill_media::{pack_images, pack_profile_image, ImageSource};
use quill_net::{endpoints, Transport};
use quill_shared::constants::DELETED_MARKER;
use quill_shared::trx::Timestamp;
use quill_shared::{
    ContentItem, ContentPayload, DecryptedRecord, EncryptedTrx, InReplyTo, ObjectContent,
    PersonContent, SeedDescriptor, Signer, TrxError,
};

use crate::error::{ClientError, Result};
use crate::traverse::{ContentStream, FetchPage, TraverseOptions};

/// A note to publish: text, optional title, optional attachments. At least
/// one of text or images is required.
#[derive(Debug, Default)]
pub struct NoteDraft {
    pub content: Option<String>,
    pub name: Option<String>,
    pub images: Vec<ImageSource>,
    pub timestamp: Option<Timestamp>,
}

impl NoteDraft {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }
}

/// A profile update. At least one of name or image is required.
#[derive(Debug, Default)]
pub struct ProfileDraft {
    pub name: Option<String>,
    pub image: Option<ImageSource>,
    pub wallet: Option<String>,
    pub timestamp: Option<Timestamp>,
}

/// One page request against the group content endpoint.
#[derive(Debug, Clone)]
pub struct ContentParams {
    pub start_trx: Option<String>,
    pub num: u64,
    pub reverse: bool,
    pub include_start_trx: bool,
}

impl Default for ContentParams {
    fn default() -> Self {
        Self {
            start_trx: None,
            num: 20,
            reverse: false,
            include_start_trx: false,
        }
    }
}

/// One client per group: the node transport plus the group's trx codec.
/// Stateless between calls apart from the codec's nonce counter.
pub struct LightClient {
    pub(crate) transport: Transport,
    pub(crate) group_id: Uuid,
    pub(crate) codec: quill_shared::TrxCodec,
}

impl LightClient {
    pub fn from_seed_url(seed_url: &str) -> Result<Self> {
        Self::from_seed(SeedDescriptor::decode(seed_url)?)
    }

    /// The seed's endpoint carries both the node address and an optional
    /// `jwt` token; the API base is always `{scheme}://{authority}/api/v1`.
    pub fn from_seed(seed: SeedDescriptor) -> Result<Self> {
        let endpoint = Url::parse(&seed.endpoint_url)
            .map_err(|_| ClientError::Endpoint(seed.endpoint_url.clone()))?;
        let host = endpoint
            .host_str()
            .ok_or_else(|| ClientError::Endpoint(seed.endpoint_url.clone()))?;

        let mut api_base = format!("{}://{}", endpoint.scheme(), host);
        if let Some(port) = endpoint.port() {
            api_base.push_str(&format!(":{port}"));
        }
        api_base.push_str("/api/v1");

        let jwt = endpoint
            .query_pairs()
            .find(|(key, _)| key == "jwt")
            .map(|(_, value)| value.to_string());

        info!(group_id = %seed.group_id, api_base = %api_base, "joining group");
        Ok(Self {
            transport: Transport::new(api_base, jwt)?,
            group_id: seed.group_id,
            codec: quill_shared::TrxCodec::new(seed.group_id, seed.cipher_key),
        })
    }

    pub fn group_id(&self) -> Uuid {
        self.group_id
    }

    /// Publish a new note.
    pub fn post(&self, signer: &Signer, draft: NoteDraft) -> Result<Value> {
        let object = self.note_object(ObjectContent::note(), draft.content, draft.name, draft.images)?;
        self.send(signer, Some(object), None, draft.timestamp)
    }

    /// Publish a replacement for an earlier note. With `check_sender` the
    /// original trx is fetched first and the edit is refused unless the
    /// signer published it.
    pub fn edit(
        &self,
        signer: &Signer,
        trx_id: &str,
        check_sender: bool,
        draft: NoteDraft,
    ) -> Result<Value> {
        if check_sender {
            let original = self.fetch_trx_raw(trx_id)?;
            if original.sender_pubkey != signer.pubkey_b64() {
                return Err(ClientError::NotTrxSender);
            }
        }
        let mut object = ObjectContent::note();
        object.id = Some(trx_id.to_string());
        let object = self.note_object(object, draft.content, draft.name, draft.images)?;
        self.send(signer, Some(object), None, draft.timestamp)
    }

    /// Publish a tombstone for an earlier note.
    pub fn delete(
        &self,
        signer: &Signer,
        trx_id: &str,
        timestamp: Option<Timestamp>,
    ) -> Result<Value> {
        let mut object = ObjectContent::note();
        object.id = Some(trx_id.to_string());
        object.content = Some(DELETED_MARKER.to_string());
        self.send(signer, Some(object), None, timestamp)
    }

    /// Publish a reply to an earlier note.
    pub fn reply(&self, signer: &Signer, trx_id: &str, draft: NoteDraft) -> Result<Value> {
        let mut object = ObjectContent::note();
        object.inreplyto = Some(InReplyTo {
            trxid: trx_id.to_string(),
        });
        let object = self.note_object(object, draft.content, draft.name, draft.images)?;
        self.send(signer, Some(object), None, draft.timestamp)
    }

    /// Publish a Like or Dislike for an earlier trx.
    pub fn like(
        &self,
        signer: &Signer,
        trx_id: &str,
        kind: &str,
        timestamp: Option<Timestamp>,
    ) -> Result<Value> {
        let object = ObjectContent::like(trx_id, kind).map_err(ClientError::Trx)?;
        self.send(signer, Some(object), None, timestamp)
    }

    /// Publish a profile update for the signer.
    pub fn update_profile(&self, signer: &Signer, draft: ProfileDraft) -> Result<Value> {
        if draft.name.is_none() && draft.image.is_none() && draft.wallet.is_none() {
            return Err(ClientError::Trx(TrxError::MissingContent));
        }
        let person = PersonContent {
            name: draft.name,
            image: draft.image.map(pack_profile_image).transpose()?,
            wallet: draft.wallet,
        };
        self.send(signer, None, Some(person), draft.timestamp)
    }

    /// Seal, sign and submit a trx carrying exactly one content shape.
    pub fn send(
        &self,
        signer: &Signer,
        object: Option<ObjectContent>,
        person: Option<PersonContent>,
        timestamp: Option<Timestamp>,
    ) -> Result<Value> {
        let payload = ContentPayload::from_parts(object, person).map_err(ClientError::Trx)?;
        let envelope = self.codec.encrypt(signer, &payload, timestamp)?;
        let body = serde_json::to_value(&envelope)
            .map_err(|err| ClientError::Response(err.to_string()))?;
        Ok(self
            .transport
            .post(&endpoints::post_trx(&self.group_id.to_string()), &body)?)
    }

    /// Fetch one trx in its sealed form.
    pub fn fetch_trx_raw(&self, trx_id: &str) -> Result<EncryptedTrx> {
        let value = self
            .transport
            .get(&endpoints::trx(&self.group_id.to_string(), trx_id))?;
        serde_json::from_value(value).map_err(|err| ClientError::Response(err.to_string()))
    }

    /// Fetch one trx and open it with the group key.
    pub fn fetch_trx(&self, trx_id: &str) -> Result<DecryptedRecord> {
        let raw = self.fetch_trx_raw(trx_id)?;
        Ok(self.codec.decrypt(&raw)?)
    }

    /// Fetch one page of group content. Records the group key does not open
    /// come back in sealed form rather than failing the page.
    pub fn get_content(&self, params: &ContentParams) -> Result<Vec<ContentItem>> {
        let body = self.content_request(params)?;
        let response = self
            .transport
            .post(&endpoints::group_content(&self.group_id.to_string()), &body)?;
        if response.is_null() {
            return Ok(Vec::new());
        }
        let rows = response
            .as_array()
            .ok_or_else(|| ClientError::Response("content response is not a list".into()))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let trx: EncryptedTrx = serde_json::from_value(row.clone())
                .map_err(|err| ClientError::Response(err.to_string()))?;
            match self.codec.decrypt(&trx) {
                Ok(record) => items.push(Ok(record)),
                Err(err) => {
                    warn!(trx_id = %trx.trx_id, error = %err, "record left sealed");
                    items.push(Err(trx));
                }
            }
        }
        Ok(items)
    }

    /// Walk the group's full history from `options.start_cursor` forward.
    pub fn traverse(&self, options: TraverseOptions) -> ContentStream<'_, Self> {
        ContentStream::new(self, options)
    }

    /// The sealed request body for the content endpoint. Boolean flags
    /// travel as the strings `"true"`/`"false"`; sender filtering is done
    /// client-side, so the wire filter stays empty.
    fn content_request(&self, params: &ContentParams) -> Result<Value> {
        let mut req = json!({
            "group_id": self.group_id.to_string(),
            "reverse": bool_str(params.reverse),
            "num": params.num,
            "include_start_trx": bool_str(params.include_start_trx),
            "senders": [],
        });
        if let Some(start_trx) = &params.start_trx {
            req["start_trx"] = json!(start_trx);
        }
        let sealed = self.codec.seal_request(&json!({ "Req": req }))?;
        Ok(json!({ "Req": sealed }))
    }

    fn note_object(
        &self,
        mut object: ObjectContent,
        content: Option<String>,
        name: Option<String>,
        images: Vec<ImageSource>,
    ) -> Result<ObjectContent> {
        if content.is_none() && images.is_empty() {
            return Err(ClientError::Trx(TrxError::MissingContent));
        }
        object.content = content;
        object.name = name;
        if !images.is_empty() {
            object.image = pack_images(images)?;
        }
        Ok(object)
    }
}

impl FetchPage for LightClient {
    fn fetch_page(&self, params: &ContentParams) -> Result<Vec<ContentItem>> {
        self.get_content(params)
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
