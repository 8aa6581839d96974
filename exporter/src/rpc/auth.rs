//! Authentication strategies for the node RPC API.

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use tracing::debug;

use super::client::truncate_body;
use super::error::RpcError;
use crate::config::Profile;

/// Login name of the node's built-in admin account.
pub const ADMIN_USER: &str = "mmx-admin";

/// Header carrying the API token in token mode.
pub const API_TOKEN_HEADER: &str = "x-api-token";

/// Attaches credentials to outgoing RPC requests.
///
/// `handshake` runs once before every call and may talk to the node itself
/// (e.g. to establish a session); `apply` decorates the request that
/// follows.
pub trait AuthStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Performs any exchange needed before a request can be authorised.
    fn handshake(&self, client: &Client, base_url: &str) -> Result<(), RpcError>;

    /// Adds credentials to a request about to be sent.
    fn apply(&self, request: RequestBuilder) -> RequestBuilder;
}

/// Cookie-session authentication.
///
/// Logs in with the admin password before each call; the session cookie is
/// kept by the client's cookie store. Nothing is remembered across a failed
/// login, so the next call simply logs in again.
pub struct SessionAuth {
    user: String,
    password: String,
}

impl SessionAuth {
    pub fn new(password: impl Into<String>) -> Self {
        Self::with_user(ADMIN_USER, password)
    }

    pub fn with_user(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl AuthStrategy for SessionAuth {
    fn name(&self) -> &'static str {
        "session"
    }

    fn handshake(&self, client: &Client, base_url: &str) -> Result<(), RpcError> {
        let url = format!("{base_url}/server/login");

        // Send failures carry `url` without the query; the password must not
        // reach the logs.
        let resp = client
            .get(&url)
            .query(&[
                ("user", self.user.as_str()),
                ("passwd_plain", self.password.as_str()),
            ])
            .send()
            .map_err(|e| RpcError::Transport {
                url,
                source: e.without_url(),
            })?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().unwrap_or_default();
            return Err(RpcError::Auth(format!(
                "login returned HTTP {status}: {}",
                truncate_body(&body)
            )));
        }

        debug!(user = %self.user, "logged in to node");
        Ok(())
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        request
    }
}

/// Header-token authentication; no handshake.
pub struct TokenAuth {
    token: String,
}

impl TokenAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl AuthStrategy for TokenAuth {
    fn name(&self) -> &'static str {
        "token"
    }

    fn handshake(&self, _client: &Client, _base_url: &str) -> Result<(), RpcError> {
        Ok(())
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_TOKEN_HEADER, self.token.as_str())
    }
}

/// Auth strategy matching a deployment profile.
pub fn auth_for_profile(profile: Profile, credential: String) -> Box<dyn AuthStrategy> {
    match profile {
        Profile::Session => Box::new(SessionAuth::new(credential)),
        Profile::Token => Box::new(TokenAuth::new(credential)),
    }
}
