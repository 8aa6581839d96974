use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by [`super::RpcClient`] calls.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Could not construct the underlying HTTP client.
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),
    /// Transport-level failure (connection refused, timeout, ...).
    ///
    /// `url` never carries a query string for the login call, and the
    /// underlying cause is only reachable through `source()`.
    #[error("GET {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The pre-call authentication handshake was refused or failed.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// The node answered with a non-success HTTP status.
    #[error("GET {url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },
    /// The response body was not the JSON document we expected.
    #[error("failed to decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl RpcError {
    /// Whether the node rejected our credential.
    pub fn is_auth(&self) -> bool {
        match self {
            RpcError::Auth(_) => true,
            RpcError::Status { status, .. } => {
                *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
            }
            _ => false,
        }
    }
}
