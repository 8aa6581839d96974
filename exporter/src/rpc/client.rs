//! Blocking HTTP client for the node RPC API.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::auth::AuthStrategy;
use super::error::RpcError;
use crate::config::RpcConfig;

/// Longest response body kept in error messages.
const MAX_ERROR_BODY: usize = 256;

/// Blocking RPC client.
///
/// The client is `Send + Sync` and keeps a cookie store, so a session
/// established by [`super::SessionAuth`] is reused by the request that
/// follows the login. It must be created and dropped outside of an async
/// context, since `reqwest::blocking` runs its own runtime.
pub struct RpcClient {
    base_url: String,
    client: Client,
    auth: Box<dyn AuthStrategy>,
}

impl RpcClient {
    /// Constructs a client pointing at `base_url`.
    ///
    /// `base_url` should be the root of the node API, e.g.
    /// `"http://localhost:11380"`. A trailing slash is ignored.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        auth: Box<dyn AuthStrategy>,
    ) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(RpcError::Client)?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            auth,
        })
    }

    pub fn from_config(cfg: &RpcConfig, auth: Box<dyn AuthStrategy>) -> Result<Self, RpcError> {
        Self::new(cfg.base_url.clone(), cfg.timeout, auth)
    }

    pub fn auth_name(&self) -> &'static str {
        self.auth.name()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Authenticates, then `GET`s `path` and decodes the JSON body as `T`.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RpcError> {
        self.auth.handshake(&self.client, &self.base_url)?;

        let url = self.endpoint(path);
        let resp = self
            .auth
            .apply(self.client.get(&url).query(query))
            .send()
            .map_err(|e| RpcError::Transport {
                url: url.clone(),
                source: e,
            })?;

        let status = resp.status();
        let body = resp.text().map_err(|e| RpcError::Transport {
            url: url.clone(),
            source: e,
        })?;

        if !status.is_success() {
            return Err(RpcError::Status {
                url,
                status,
                body: truncate_body(&body).to_string(),
            });
        }

        debug!(%url, %body, "rpc response");

        serde_json::from_str(&body).map_err(|e| RpcError::Decode { url, source: e })
    }
}

/// Cuts `body` down to at most [`MAX_ERROR_BODY`] bytes on a char boundary.
pub(crate) fn truncate_body(body: &str) -> &str {
    let body = body.trim();
    if body.len() <= MAX_ERROR_BODY {
        return body;
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
