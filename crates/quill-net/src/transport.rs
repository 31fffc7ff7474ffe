use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("quill/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum NetError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Bad response: {0}")]
    BadResponse(String),
}

/// A blocking HTTP client bound to one node API base. The optional JWT is
/// sent as a bearer token on every request.
pub struct Transport {
    http: Client,
    api_base: String,
    jwt: Option<String>,
}

impl Transport {
    pub fn new(api_base: impl Into<String>, jwt: Option<String>) -> Result<Self, NetError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            jwt,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn get(&self, endpoint: &str) -> Result<Value, NetError> {
        self.request(Method::GET, endpoint, None)
    }

    pub fn post(&self, endpoint: &str, payload: &Value) -> Result<Value, NetError> {
        self.request(Method::POST, endpoint, Some(payload))
    }

    fn request(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<&Value>,
    ) -> Result<Value, NetError> {
        let url = format!("{}{}", self.api_base, endpoint);
        debug!(%method, %url, "node request");

        let mut request = self.http.request(method, &url);
        if let Some(jwt) = &self.jwt {
            request = request.bearer_auth(jwt);
        }
        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            warn!(%status, %url, "node returned error status");
        }
        serde_json::from_str(&body).map_err(|_| {
            let mut snippet = body;
            snippet.truncate(200);
            NetError::BadResponse(format!("{status}: {snippet}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_trailing_slash_trimmed() {
        let transport = Transport::new("https://node.example.net/api/v1/", None).unwrap();
        assert_eq!(transport.api_base(), "https://node.example.net/api/v1");
    }
}
