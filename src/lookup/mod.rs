//! HTTP clients for the upstream RFC services.
//!
//! Two upstreams serve everything this crate needs: the IETF Datatracker
//! metadata index (search and per-document records, JSON) and the RFC Editor
//! plaintext repository (full document bodies). Both are public and need no
//! credentials. Every operation is a single GET; failures are reported once,
//! with no retry, and callers render them as text.

mod datatracker;
mod rfc_editor;

pub use datatracker::{DatatrackerClient, DATATRACKER_API_BASE};
pub use rfc_editor::{RfcEditorClient, RFC_EDITOR_BASE};

use http::StatusCode;
use reqwest::Client;
use std::time::Duration;

/// Errors that can occur when talking to an upstream service
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// Network or transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status from the upstream
    #[error("Upstream returned status {status} for {url}")]
    Status { status: StatusCode, url: String },

    /// Parsing error (JSON or body decoding)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl LookupError {
    /// Whether the upstream answered 404 for the requested document.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        LookupError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(err: serde_json::Error) -> Self {
        LookupError::Parse(format!("JSON: {}", err))
    }
}

/// Build the HTTP client shared by all upstream calls
pub fn build_http_client(timeout: Duration, connect_timeout: Duration) -> Client {
    Client::builder()
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .expect("Failed to create HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        let err = LookupError::Status {
            status: StatusCode::NOT_FOUND,
            url: "http://example.test/doc".to_string(),
        };
        assert!(err.is_not_found());

        let err = LookupError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            url: "http://example.test/doc".to_string(),
        };
        assert!(!err.is_not_found());

        assert!(!LookupError::Network("timed out".to_string()).is_not_found());
    }
}
