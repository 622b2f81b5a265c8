//! Anthropic Messages API client.
//!
//! Speaks `POST /v1/messages` directly over HTTP, both the plain variant and
//! the server-sent-events streaming variant driving the interactive chat.
//! [`StreamAccumulator`] reassembles streamed events into complete assistant
//! messages, including tool-use blocks whose input arrives as JSON fragments.

use async_stream::stream;
use futures_util::stream::Stream;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::tools::ToolSpec;

/// Model used when neither configuration nor `--model` names one.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

/// Generation budget per assistant turn unless configured otherwise.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Errors from the Messages API client
#[derive(Debug, Error)]
pub enum AnthropicError {
    #[error("Missing ANTHROPIC_API_KEY environment variable")]
    MissingApiKey,

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    #[error("Rate limited - too many requests")]
    RateLimited,

    #[error("Unauthorized - invalid API key")]
    Unauthorized,

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Stream failed: {0}")]
    StreamFailed(String),
}

/// Stream of parsed server-sent events from one messages request.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, AnthropicError>> + Send>>;

/// Client for the Anthropic Messages API
#[derive(Clone)]
pub struct AnthropicClient {
    client: Arc<Client>,
    api_key: String,
    api_url: String,
}

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

impl AnthropicClient {
    /// Create a client reading the API key from [`API_KEY_ENV`].
    pub fn from_env() -> Result<Self, AnthropicError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or(AnthropicError::MissingApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Create a client with an explicit API key against the public API.
    pub fn new(api_key: String) -> Self {
        Self::with_api_url(api_key, ANTHROPIC_API_BASE.to_string())
    }

    /// Create a client against a custom API base URL (configuration or tests).
    pub fn with_api_url(api_key: String, api_url: String) -> Self {
        // Only the connect phase is bounded; a streamed completion can stay
        // open far longer than any sensible request timeout.
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client: Arc::new(client),
            api_key,
            api_url,
        }
    }

    async fn post_messages(
        &self,
        request: &MessagesRequest,
    ) -> Result<reqwest::Response, AnthropicError> {
        debug!(model = %request.model, stream = request.stream, "sending messages request");
        self.client
            .post(format!("{}/messages", self.api_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| AnthropicError::RequestFailed(e.to_string()))
    }

    /// Create a message and wait for the complete response.
    pub async fn messages(
        &self,
        request: MessagesRequest,
    ) -> Result<MessagesResponse, AnthropicError> {
        let response = self.post_messages(&request).await?;
        match response.status() {
            StatusCode::OK => response
                .json::<MessagesResponse>()
                .await
                .map_err(|e| AnthropicError::ResponseParseFailed(e.to_string())),
            StatusCode::TOO_MANY_REQUESTS => Err(AnthropicError::RateLimited),
            StatusCode::UNAUTHORIZED => Err(AnthropicError::Unauthorized),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(AnthropicError::ApiError {
                    status: status.as_u16(),
                    message: body,
                })
            }
        }
    }

    /// Create a message and stream events as they arrive.
    pub async fn messages_stream(
        &self,
        request: MessagesRequest,
    ) -> Result<EventStream, AnthropicError> {
        let mut request = request;
        request.stream = true;

        let response = self.post_messages(&request).await?;
        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(AnthropicError::RateLimited),
            StatusCode::UNAUTHORIZED => return Err(AnthropicError::Unauthorized),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(AnthropicError::ApiError {
                    status: status.as_u16(),
                    message: body,
                });
            }
            _ => {}
        }

        let byte_stream = response.bytes_stream();
        Ok(Box::pin(stream! {
            let mut lines = LineBuffer::default();
            for await chunk in byte_stream {
                match chunk {
                    Ok(bytes) => {
                        // SSE frames are newline-delimited; payload lines
                        // carry a "data: " prefix.
                        for line in lines.push(&bytes) {
                            if let Some(data) = line.strip_prefix("data: ") {
                                if data == "[DONE]" {
                                    break;
                                }
                                match serde_json::from_str::<StreamEvent>(data) {
                                    Ok(event) => yield Ok(event),
                                    Err(e) => yield Err(AnthropicError::ResponseParseFailed(
                                        e.to_string(),
                                    )),
                                }
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(AnthropicError::StreamFailed(e.to_string()));
                        break;
                    }
                }
            }
        }))
    }
}

/// Splits a stream of raw bytes into trimmed lines.
///
/// Bytes accumulate until a newline arrives. A UTF-8 sequence can straddle
/// chunk boundaries but never a newline, so complete lines always decode
/// cleanly.
#[derive(Debug, Default)]
struct LineBuffer {
    bytes: Vec<u8>,
}

impl LineBuffer {
    /// Append one chunk and return every line it completed.
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.bytes.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.bytes.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.bytes.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..pos]).trim().to_string());
        }
        lines
    }
}

/// Reassembles streamed events into a complete assistant message.
///
/// Feed every event from [`AnthropicClient::messages_stream`] through
/// [`push`](Self::push); text deltas worth showing immediately are handed
/// back. Call [`finish`](Self::finish) once the stream ends to obtain the
/// assembled message and the reported stop reason.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    blocks: Vec<PendingBlock>,
    stop_reason: Option<StopReason>,
}

#[derive(Debug)]
enum PendingBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        initial_input: Value,
        input_json: String,
    },
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one stream event, returning any printable text delta.
    pub fn push(&mut self, event: StreamEvent) -> Result<Option<String>, AnthropicError> {
        match event {
            StreamEvent::MessageStart { .. }
            | StreamEvent::ContentBlockStop { .. }
            | StreamEvent::MessageStop
            | StreamEvent::Ping => Ok(None),

            StreamEvent::ContentBlockStart { content_block, .. } => {
                let pending = match content_block {
                    ContentBlock::Text { text } => PendingBlock::Text { text },
                    ContentBlock::ToolUse { id, name, input } => PendingBlock::ToolUse {
                        id,
                        name,
                        initial_input: input,
                        input_json: String::new(),
                    },
                    ContentBlock::ToolResult { .. } => {
                        return Err(AnthropicError::ResponseParseFailed(
                            "unexpected tool_result block in assistant stream".to_string(),
                        ))
                    }
                };
                self.blocks.push(pending);
                Ok(None)
            }

            StreamEvent::ContentBlockDelta { index, delta } => {
                let block = self.blocks.get_mut(index).ok_or_else(|| {
                    AnthropicError::ResponseParseFailed(format!(
                        "delta for unknown content block {}",
                        index
                    ))
                })?;
                match (block, delta) {
                    (PendingBlock::Text { text }, ContentDelta::TextDelta { text: piece }) => {
                        text.push_str(&piece);
                        Ok(Some(piece))
                    }
                    (
                        PendingBlock::ToolUse { input_json, .. },
                        ContentDelta::InputJsonDelta { partial_json },
                    ) => {
                        input_json.push_str(&partial_json);
                        Ok(None)
                    }
                    _ => Err(AnthropicError::ResponseParseFailed(
                        "content delta does not match its block type".to_string(),
                    )),
                }
            }

            StreamEvent::MessageDelta { delta } => {
                if let Some(reason) = delta.stop_reason {
                    self.stop_reason = Some(reason);
                }
                Ok(None)
            }

            StreamEvent::Error { error } => Err(AnthropicError::StreamFailed(format!(
                "{}: {}",
                error.error_type, error.message
            ))),
        }
    }

    /// Consume the accumulator, yielding the assembled assistant message and
    /// the stop reason the API reported, if any.
    pub fn finish(self) -> Result<(Message, Option<StopReason>), AnthropicError> {
        let mut content = Vec::with_capacity(self.blocks.len());
        for block in self.blocks {
            match block {
                PendingBlock::Text { text } => content.push(ContentBlock::Text { text }),
                PendingBlock::ToolUse {
                    id,
                    name,
                    initial_input,
                    input_json,
                } => {
                    // Tool input streams as JSON fragments; an empty fragment
                    // run means the start event already carried the input.
                    let input = if input_json.trim().is_empty() {
                        initial_input
                    } else {
                        serde_json::from_str(&input_json).map_err(|e| {
                            AnthropicError::ResponseParseFailed(format!(
                                "invalid tool input JSON: {}",
                                e
                            ))
                        })?
                    };
                    content.push(ContentBlock::ToolUse { id, name, input });
                }
            }
        }
        Ok((
            Message {
                role: Role::Assistant,
                content,
            },
            self.stop_reason,
        ))
    }
}

// ===== Messages API Types =====

/// Request payload for the messages endpoint
#[derive(Clone, Debug, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolSpec>>,
    pub stream: bool,
}

impl MessagesRequest {
    /// Create a request with the default model and token budget.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            messages,
            max_tokens: DEFAULT_MAX_TOKENS,
            system: None,
            tools: None,
            stream: false,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = Some(tools);
        self
    }
}

/// Complete response from a non-streaming request
#[derive(Clone, Debug, Deserialize)]
pub struct MessagesResponse {
    pub id: String,
    pub model: String,
    pub role: Role,
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
    pub usage: Usage,
}

/// One message in the conversation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// A user message holding one text block.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// An assistant message holding one text block.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }
}

/// Message role
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Content block types carried by messages
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    /// A tool invocation requested by the model
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    /// The result of a tool invocation, echoed back in a user message
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

/// Why the model stopped generating
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    ToolUse,
}

/// Token usage reported with a response
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Streaming event types from the messages endpoint
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart { message: MessageStart },
    ContentBlockStart { index: usize, content_block: ContentBlock },
    ContentBlockDelta { index: usize, delta: ContentDelta },
    ContentBlockStop { index: usize },
    MessageDelta { delta: MessageDelta },
    MessageStop,
    /// Periodic heartbeat; carries nothing
    Ping,
    /// Mid-stream failure reported by the API
    Error { error: StreamErrorPayload },
}

/// Metadata sent when a streamed message opens
#[derive(Clone, Debug, Deserialize)]
pub struct MessageStart {
    pub id: String,
    pub model: String,
    pub role: Role,
}

/// Incremental content updates
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
}

/// Trailing metadata update carrying the stop reason
#[derive(Clone, Debug, Deserialize)]
pub struct MessageDelta {
    pub stop_reason: Option<StopReason>,
    pub stop_sequence: Option<String>,
}

/// Error payload of a mid-stream `error` event
#[derive(Clone, Debug, Deserialize)]
pub struct StreamErrorPayload {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}
