//! RFC Editor plaintext repository client.

use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

use crate::lookup::LookupError;
use crate::models::RfcNumber;

/// Default base URL of the RFC Editor text repository.
pub const RFC_EDITOR_BASE: &str = "https://www.rfc-editor.org/rfc";

/// Client for the RFC Editor full-text repository
#[derive(Debug, Clone)]
pub struct RfcEditorClient {
    client: Arc<Client>,
    base_url: String,
}

impl RfcEditorClient {
    /// Create a client against the public RFC Editor repository
    pub fn new(client: Arc<Client>) -> Self {
        Self::with_base_url(client, RFC_EDITOR_BASE)
    }

    /// Create a client against a custom base URL (used by tests)
    pub fn with_base_url(client: Arc<Client>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Fetch the full plaintext body of an RFC.
    ///
    /// The body is returned untruncated; length capping is the formatter's job.
    pub async fn fetch_text(&self, number: RfcNumber) -> Result<String, LookupError> {
        let url = format!("{}/{}.txt", self.base_url, number.doc_name());
        debug!(url = %url, "fetching full text");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::Network(format!("Failed to fetch RFC text: {}", e)))?;

        if !response.status().is_success() {
            return Err(LookupError::Status {
                status: response.status(),
                url,
            });
        }

        response
            .text()
            .await
            .map_err(|e| LookupError::Parse(format!("Failed to read body: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rfc7540.txt")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("Hypertext Transfer Protocol Version 2 (HTTP/2)\n")
            .create_async()
            .await;

        let client = RfcEditorClient::with_base_url(Arc::new(Client::new()), server.url());
        let body = client.fetch_text(RfcNumber::new(7540)).await.unwrap();

        mock.assert_async().await;
        assert!(body.starts_with("Hypertext Transfer Protocol"));
    }

    #[tokio::test]
    async fn test_fetch_text_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rfc999999.txt")
            .with_status(404)
            .with_body("Not Found")
            .create_async()
            .await;

        let client = RfcEditorClient::with_base_url(Arc::new(Client::new()), server.url());
        let err = client.fetch_text(RfcNumber::new(999999)).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
