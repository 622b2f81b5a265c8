//! The tool surface: operation names, input schemas, parsing and dispatch.
//!
//! The three operations form a closed set, so dispatch is an enum rather
//! than a name-keyed registry: adding an operation extends [`ToolCall`] and
//! the compiler points at every match that needs updating. The schema table
//! is built once and never mutated.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::format;
use crate::lookup::{DatatrackerClient, LookupError, RfcEditorClient};
use crate::models::{RfcNumber, SearchQuery, DEFAULT_SEARCH_LIMIT};

/// Operation name for keyword search.
pub const SEARCH_RFCS: &str = "search_rfcs";
/// Operation name for metadata lookup.
pub const GET_RFC: &str = "get_rfc";
/// Operation name for full-text retrieval.
pub const GET_RFC_TEXT: &str = "get_rfc_text";

/// Errors a caller can make when invoking the tool surface
///
/// Operation failures (network, upstream status) are not here; those come
/// back as readable result text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The operation name is not one this crate advertises
    #[error("Unknown tool: {name}")]
    UnknownOperation { name: String },

    /// A required argument is missing or has the wrong type
    #[error("{message}")]
    InvalidArguments { message: String },
}

impl DispatchError {
    pub(crate) fn missing(parameter: &str) -> Self {
        DispatchError::InvalidArguments {
            message: format!("Missing '{}' parameter", parameter),
        }
    }
}

/// Description of one operation as advertised to callers.
///
/// The same record serializes into the MCP tool listing and the model
/// runtime's `tools` array.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

static SPECS: OnceLock<Vec<ToolSpec>> = OnceLock::new();

/// The advertised operations. Built on first use, immutable afterwards.
pub fn tool_specs() -> &'static [ToolSpec] {
    SPECS.get_or_init(|| {
        vec![
            ToolSpec {
                name: SEARCH_RFCS,
                description: "Search for RFCs by keyword or topic",
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Search query (e.g., 'HTTP', 'DNS', 'TCP')"
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of results to return",
                            "default": DEFAULT_SEARCH_LIMIT
                        }
                    },
                    "required": ["query"]
                }),
            },
            ToolSpec {
                name: GET_RFC,
                description: "Fetch detailed information about a specific RFC by number or name",
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "rfc_identifier": {
                            "type": "string",
                            "description": "RFC number or name (e.g., '7540', 'RFC7540', 'rfc7540')"
                        }
                    },
                    "required": ["rfc_identifier"]
                }),
            },
            ToolSpec {
                name: GET_RFC_TEXT,
                description: "Fetch the full text content of an RFC",
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "rfc_number": {
                            "type": "integer",
                            "description": "RFC number (e.g., 7540)"
                        }
                    },
                    "required": ["rfc_number"]
                }),
            },
        ]
    })
}

/// One parsed tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    /// Keyword search over the metadata index
    SearchRfcs { query: String, limit: usize },
    /// Metadata lookup; the identifier is still free-form here
    GetRfc { identifier: String },
    /// Full-text retrieval by number
    GetRfcText { number: u64 },
}

impl ToolCall {
    /// Map an operation name plus JSON arguments onto a variant.
    pub fn parse(name: &str, args: &Value) -> Result<Self, DispatchError> {
        match name {
            SEARCH_RFCS => {
                let query = args
                    .get("query")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| DispatchError::missing("query"))?
                    .to_string();
                let limit = args
                    .get("limit")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(DEFAULT_SEARCH_LIMIT as u64) as usize;
                Ok(ToolCall::SearchRfcs { query, limit })
            }
            GET_RFC => {
                let identifier = args
                    .get("rfc_identifier")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| DispatchError::missing("rfc_identifier"))?
                    .to_string();
                Ok(ToolCall::GetRfc { identifier })
            }
            GET_RFC_TEXT => {
                let number = args
                    .get("rfc_number")
                    .and_then(|v| v.as_u64())
                    .ok_or_else(|| DispatchError::missing("rfc_number"))?;
                Ok(ToolCall::GetRfcText { number })
            }
            other => Err(DispatchError::UnknownOperation {
                name: other.to_string(),
            }),
        }
    }

    /// The operation name this call answers to.
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::SearchRfcs { .. } => SEARCH_RFCS,
            ToolCall::GetRfc { .. } => GET_RFC,
            ToolCall::GetRfcText { .. } => GET_RFC_TEXT,
        }
    }
}

/// The advertised tool surface, as seen by a model runtime or MCP client
#[async_trait]
pub trait ToolProvider: Send + Sync + std::fmt::Debug {
    /// Operations to advertise
    fn specs(&self) -> Vec<ToolSpec>;

    /// Execute one named operation
    async fn call(&self, name: &str, args: &Value) -> Result<String, DispatchError>;
}

/// Executes parsed tool calls against the upstream services
///
/// Stateless between invocations: each dispatch is one lookup plus one
/// formatting pass, independent of every other call.
#[derive(Debug, Clone)]
pub struct ToolSet {
    datatracker: DatatrackerClient,
    rfc_editor: RfcEditorClient,
}

impl ToolSet {
    pub fn new(datatracker: DatatrackerClient, rfc_editor: RfcEditorClient) -> Self {
        Self {
            datatracker,
            rfc_editor,
        }
    }

    /// Run one parsed call.
    ///
    /// Lookup failures come back as readable text, never as errors; the
    /// conversational caller shows the text either way.
    pub async fn dispatch(&self, call: ToolCall) -> String {
        debug!(tool = call.name(), "dispatching tool call");
        match call {
            ToolCall::SearchRfcs { query, limit } => self.search_rfcs(&query, limit).await,
            ToolCall::GetRfc { identifier } => self.get_rfc(&identifier).await,
            ToolCall::GetRfcText { number } => self.get_rfc_text(RfcNumber::new(number)).await,
        }
    }

    /// Parse and run a named call. Unknown names and malformed arguments are
    /// the caller's mistake and surface as errors instead of result text.
    pub async fn dispatch_named(&self, name: &str, args: &Value) -> Result<String, DispatchError> {
        let call = ToolCall::parse(name, args)?;
        Ok(self.dispatch(call).await)
    }

    async fn search_rfcs(&self, query: &str, limit: usize) -> String {
        let search = SearchQuery::new(query).limit(limit);
        match self.datatracker.search(&search).await {
            Ok(results) => format::search_results(&results),
            Err(e) => {
                warn!(error = %e, query = query, "search failed");
                format!("Error searching RFCs: {}", e)
            }
        }
    }

    async fn get_rfc(&self, identifier: &str) -> String {
        let number: RfcNumber = match identifier.parse() {
            Ok(number) => number,
            Err(e) => return format!("{}", e),
        };
        match self.datatracker.fetch_metadata(number).await {
            Ok(meta) => format::metadata(&meta),
            Err(e) if e.is_not_found() => format!(
                "RFC '{}' not found. Please check the RFC number.",
                number.doc_name()
            ),
            Err(e @ LookupError::Status { .. }) => format!("HTTP error fetching RFC: {}", e),
            Err(e) => {
                warn!(error = %e, rfc = %number, "metadata fetch failed");
                format!("Error fetching RFC: {}", e)
            }
        }
    }

    async fn get_rfc_text(&self, number: RfcNumber) -> String {
        match self.rfc_editor.fetch_text(number).await {
            Ok(body) => format::document_text(number, &body),
            Err(e) if e.is_not_found() => format!("RFC {} text not found.", number),
            Err(e @ LookupError::Status { .. }) => format!("HTTP error fetching RFC text: {}", e),
            Err(e) => {
                warn!(error = %e, rfc = %number, "text fetch failed");
                format!("Error fetching RFC text: {}", e)
            }
        }
    }
}

#[async_trait]
impl ToolProvider for ToolSet {
    fn specs(&self) -> Vec<ToolSpec> {
        tool_specs().to_vec()
    }

    async fn call(&self, name: &str, args: &Value) -> Result<String, DispatchError> {
        self.dispatch_named(name, args).await
    }
}
