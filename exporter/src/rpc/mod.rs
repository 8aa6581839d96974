//! Client for the MMX node's HTTP RPC API.
//!
//! Every call is a blocking `GET` against the node's local base URL that
//! returns a JSON document. Credentials are attached by an [`AuthStrategy`]:
//!
//! - [`SessionAuth`] logs in with the admin password before each call and
//!   relies on the client's cookie store to carry the session,
//! - [`TokenAuth`] sends the API token as a request header.

pub mod auth;
pub mod client;
pub mod error;

pub use auth::{AuthStrategy, SessionAuth, TokenAuth, auth_for_profile};
pub use client::RpcClient;
pub use error::RpcError;

#[cfg(test)]
pub(crate) mod test_server;
