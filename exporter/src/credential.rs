//! Loading of the RPC credential.
//!
//! The node writes its admin password (or API token) to a plain text file.
//! A missing or unreadable file is not fatal: the exporter starts with an
//! empty credential and every authenticated call fails, and is logged, at the
//! point of use.

use std::path::Path;

use tracing::{error, info};

/// Reads the secret stored in `path`, trimmed of surrounding whitespace.
///
/// Returns an empty string if the file cannot be read.
pub fn load_credential(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            info!(path = %path.display(), "loaded RPC credential");
            contents.trim().to_string()
        }
        Err(e) => {
            error!(
                path = %path.display(),
                error = %e,
                "failed to read RPC credential file, continuing without credential"
            );
            String::new()
        }
    }
}
