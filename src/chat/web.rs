//! Generic URL fetching for the simplified chat mode.
//!
//! Instead of RFC-shaped operations, the model gets one tool that downloads
//! any http(s) URL and a system prompt that teaches it where RFC content
//! lives. Nothing here knows about RFC numbers or the datatracker schema.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tracing::debug;
use url::Url;

use crate::format;
use crate::lookup::LookupError;
use crate::tools::{DispatchError, ToolProvider, ToolSpec};

/// Operation name for the generic fetch.
pub const FETCH_URL: &str = "fetch_url";

static SPECS: OnceLock<Vec<ToolSpec>> = OnceLock::new();

fn fetch_specs() -> &'static [ToolSpec] {
    SPECS.get_or_init(|| {
        vec![ToolSpec {
            name: FETCH_URL,
            description: "Fetch the content of a URL and return it as text",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "The URL to fetch"
                    }
                },
                "required": ["url"]
            }),
        }]
    })
}

/// Single-tool provider backing the simplified chat mode
#[derive(Debug, Clone)]
pub struct WebTools {
    client: Arc<Client>,
}

impl WebTools {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// Download one page as text.
    ///
    /// Transport and upstream-status failures come back as readable text
    /// the model can react to; only caller mistakes (bad scheme, unparsable
    /// URL) are dispatch errors.
    async fn fetch(&self, url: &str) -> Result<String, DispatchError> {
        let parsed = Url::parse(url).map_err(|e| DispatchError::InvalidArguments {
            message: format!("Invalid URL '{}': {}", url, e),
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(DispatchError::InvalidArguments {
                message: format!("Unsupported URL scheme '{}'", parsed.scheme()),
            });
        }

        debug!(url = %parsed, "fetching page for model");
        let response = match self.client.get(parsed).send().await {
            Ok(response) => response,
            Err(e) => return Ok(fetch_failure(LookupError::from(e))),
        };
        let status = response.status();
        if !status.is_success() {
            return Ok(fetch_failure(LookupError::Status {
                status,
                url: url.to_string(),
            }));
        }
        match response.text().await {
            Ok(body) => Ok(format::clip_body(&body)),
            Err(e) => Ok(fetch_failure(LookupError::from(e))),
        }
    }
}

fn fetch_failure(error: LookupError) -> String {
    format!("Error fetching URL: {}", error)
}

#[async_trait]
impl ToolProvider for WebTools {
    fn specs(&self) -> Vec<ToolSpec> {
        fetch_specs().to_vec()
    }

    async fn call(&self, name: &str, args: &Value) -> Result<String, DispatchError> {
        if name != FETCH_URL {
            return Err(DispatchError::UnknownOperation {
                name: name.to_string(),
            });
        }
        let url = args
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DispatchError::missing("url"))?;
        self.fetch(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn web_tools() -> WebTools {
        WebTools::new(Arc::new(Client::new()))
    }

    #[test]
    fn test_advertises_single_fetch_tool() {
        let specs = web_tools().specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "fetch_url");
        assert_eq!(specs[0].input_schema["required"], json!(["url"]));
    }

    #[tokio::test]
    async fn test_fetches_page_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rfc/rfc9000.txt")
            .with_status(200)
            .with_body("QUIC: A UDP-Based Multiplexed and Secure Transport")
            .create_async()
            .await;

        let tools = web_tools();
        let url = format!("{}/rfc/rfc9000.txt", server.url());
        let text = tools
            .call(FETCH_URL, &json!({ "url": url }))
            .await
            .unwrap();

        assert_eq!(text, "QUIC: A UDP-Based Multiplexed and Secure Transport");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_long_page_is_clipped() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/big")
            .with_status(200)
            .with_body("x".repeat(format::MAX_TEXT_CHARS + 500))
            .create_async()
            .await;

        let tools = web_tools();
        let url = format!("{}/big", server.url());
        let text = tools.call(FETCH_URL, &json!({ "url": url })).await.unwrap();

        assert!(text.ends_with(format::TRUNCATION_MARKER));
        assert_eq!(
            text.len(),
            format::MAX_TEXT_CHARS + format::TRUNCATION_MARKER.len()
        );
    }

    #[tokio::test]
    async fn test_upstream_error_becomes_text() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/gone")
            .with_status(404)
            .with_body("not here")
            .create_async()
            .await;

        let tools = web_tools();
        let url = format!("{}/gone", server.url());
        let text = tools.call(FETCH_URL, &json!({ "url": url })).await.unwrap();

        assert!(text.starts_with("Error fetching URL:"));
        assert!(text.contains("404"));
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let err = web_tools()
            .call(FETCH_URL, &json!({ "url": "ftp://example.com/file" }))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::InvalidArguments {
                message: "Unsupported URL scheme 'ftp'".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_missing_url_parameter() {
        let err = web_tools().call(FETCH_URL, &json!({})).await.unwrap_err();
        assert_eq!(
            err,
            DispatchError::InvalidArguments {
                message: "Missing 'url' parameter".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_name() {
        let err = web_tools()
            .call("download_everything", &json!({ "url": "http://x" }))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::UnknownOperation {
                name: "download_everything".to_string(),
            }
        );
    }
}
