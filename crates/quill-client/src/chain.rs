//! Chain metadata queries. Each query seals a small request object with the
//! group key and tags it with the node's request-type string.

use serde_json::{json, Value};

use quill_net::endpoints;

use crate::client::LightClient;
use crate::error::Result;

impl LightClient {
    fn chain_data(&self, req: Value, req_type: &str) -> Result<Value> {
        let payload = json!({
            "Req": self.codec.seal_request(&req)?,
            "ReqType": req_type,
        });
        Ok(self
            .transport
            .post(&endpoints::chain_data(&self.group_id.to_string()), &payload)?)
    }

    fn group_req(&self) -> Value {
        json!({ "GroupId": self.group_id.to_string() })
    }

    pub fn group_info(&self) -> Result<Value> {
        self.chain_data(self.group_req(), "group_info")
    }

    /// Authorization mode applied to one trx type.
    pub fn auth_type(&self, trx_type: &str) -> Result<Value> {
        let mut req = self.group_req();
        req["TrxType"] = json!(trx_type);
        self.chain_data(req, "auth_type")
    }

    pub fn auth_allowlist(&self) -> Result<Value> {
        self.chain_data(self.group_req(), "auth_allowlist")
    }

    pub fn auth_denylist(&self) -> Result<Value> {
        self.chain_data(self.group_req(), "auth_denylist")
    }

    pub fn appconfig_keylist(&self) -> Result<Value> {
        self.chain_data(self.group_req(), "appconfig_listlist")
    }

    pub fn appconfig_item(&self, key: &str) -> Result<Value> {
        let mut req = self.group_req();
        req["Key"] = json!(key);
        self.chain_data(req, "appconfig_item_bykey")
    }

    pub fn group_producer(&self) -> Result<Value> {
        self.chain_data(self.group_req(), "group_producer")
    }

    pub fn announced_producer(&self) -> Result<Value> {
        self.chain_data(self.group_req(), "announced_producer")
    }

    pub fn announced_user(&self, pubkey: &str) -> Result<Value> {
        let mut req = self.group_req();
        req["SignPubkey"] = json!(pubkey);
        self.chain_data(req, "announced_user")
    }
}
