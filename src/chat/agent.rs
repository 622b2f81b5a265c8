//! The agent loop: model turns interleaved with tool execution.
//!
//! One user input becomes one or more model round trips. Text streams out as
//! it arrives; when the model requests tools, they run against the advertised
//! [`ToolProvider`] and their results go back in a `tool_result` user message
//! until the model answers without requesting anything.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use futures_util::StreamExt;

use crate::chat::anthropic::{
    AnthropicClient, AnthropicError, ContentBlock, EventStream, Message, MessagesRequest, Role,
    StreamAccumulator, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
};
use crate::tools::ToolProvider;

/// Tool rounds allowed per user input before the turn is abandoned.
pub const DEFAULT_MAX_STEPS: usize = 8;

/// Errors that end an agent turn
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Api(#[from] AnthropicError),

    #[error("agent exceeded the maximum number of tool interactions")]
    TooManySteps,
}

/// Source of streamed model turns.
///
/// Production uses [`AnthropicClient`]; tests script turns without a network.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn stream_turn(&self, request: MessagesRequest) -> Result<EventStream, AnthropicError>;
}

#[async_trait]
impl ModelProvider for AnthropicClient {
    async fn stream_turn(&self, request: MessagesRequest) -> Result<EventStream, AnthropicError> {
        self.messages_stream(request).await
    }
}

/// Progress notifications emitted while a turn runs.
///
/// Text deltas arrive in order and concatenate to the turn's reply; tool
/// notifications bracket each dispatched call.
#[derive(Debug, PartialEq, Eq)]
pub enum AgentEvent<'a> {
    TextDelta(&'a str),
    ToolStarted { name: &'a str },
    ToolFinished { name: &'a str },
}

/// Per-session generation settings
#[derive(Clone, Debug)]
pub struct AgentOptions {
    pub model: String,
    pub max_tokens: u32,
    pub system_prompt: String,
    pub max_steps: usize,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: String::new(),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

/// Drives model turns against an advertised tool set
pub struct Agent<P: ModelProvider> {
    provider: P,
    tools: Arc<dyn ToolProvider>,
    options: AgentOptions,
}

impl<P: ModelProvider> Agent<P> {
    pub fn new(provider: P, tools: Arc<dyn ToolProvider>, options: AgentOptions) -> Self {
        Self {
            provider,
            tools,
            options,
        }
    }

    /// Run one user turn to completion.
    ///
    /// Appends the user input, every assistant message, and every tool-result
    /// message to `history`, and returns the concatenated reply text. Tool
    /// failures the model can react to (unknown names, bad arguments) come
    /// back to it as error-flagged tool results rather than ending the turn.
    /// Hitting the tool-interaction limit fails the turn, but only after the
    /// pending tool calls are answered with error results, keeping the
    /// history valid for the next turn.
    pub async fn run_turn(
        &self,
        history: &mut Vec<Message>,
        input: &str,
        observer: &mut dyn FnMut(AgentEvent<'_>),
    ) -> Result<String, AgentError> {
        history.push(Message::user(input));
        info!(turn_messages = history.len(), "agent turn started");

        let mut reply = String::new();
        let mut steps = 0usize;

        loop {
            let mut request = MessagesRequest::new(history.clone())
                .with_model(self.options.model.clone())
                .with_max_tokens(self.options.max_tokens)
                .with_tools(self.tools.specs());
            if !self.options.system_prompt.is_empty() {
                request = request.with_system(self.options.system_prompt.clone());
            }

            let mut stream = self.provider.stream_turn(request).await?;
            let mut accumulator = StreamAccumulator::new();
            while let Some(event) = stream.next().await {
                if let Some(piece) = accumulator.push(event?)? {
                    reply.push_str(&piece);
                    observer(AgentEvent::TextDelta(&piece));
                }
            }
            let (message, stop_reason) = accumulator.finish()?;
            debug!(?stop_reason, blocks = message.content.len(), "model turn finished");

            let requested: Vec<(String, String, Value)> = message
                .content
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolUse { id, name, input } => {
                        Some((id.clone(), name.clone(), input.clone()))
                    }
                    _ => None,
                })
                .collect();

            history.push(message);

            if requested.is_empty() {
                return Ok(reply);
            }
            if steps >= self.options.max_steps {
                warn!(steps, "tool interaction limit reached");
                // The pending tool_use blocks still get answered; a history
                // with an unanswered tool_use is rejected on the next request.
                let results = requested
                    .into_iter()
                    .map(|(id, _, _)| ContentBlock::ToolResult {
                        tool_use_id: id,
                        content: "Tool interaction limit reached".to_string(),
                        is_error: true,
                    })
                    .collect();
                history.push(Message {
                    role: Role::User,
                    content: results,
                });
                return Err(AgentError::TooManySteps);
            }
            steps += 1;

            let mut results = Vec::with_capacity(requested.len());
            for (id, name, input) in requested {
                observer(AgentEvent::ToolStarted { name: &name });
                let (content, is_error) = match self.tools.call(&name, &input).await {
                    Ok(text) => (text, false),
                    Err(e) => {
                        warn!(tool = %name, error = %e, "tool dispatch refused");
                        (e.to_string(), true)
                    }
                };
                observer(AgentEvent::ToolFinished { name: &name });
                results.push(ContentBlock::ToolResult {
                    tool_use_id: id,
                    content,
                    is_error,
                });
            }
            history.push(Message {
                role: Role::User,
                content: results,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::anthropic::{ContentDelta, MessageDelta, StopReason, StreamEvent};
    use crate::tools::{DispatchError, ToolSpec};
    use std::sync::Mutex;

    /// Yields pre-scripted event sequences and records every request.
    struct ScriptedProvider {
        turns: Mutex<Vec<Vec<StreamEvent>>>,
        requests: Mutex<Vec<MessagesRequest>>,
    }

    impl ScriptedProvider {
        fn new(turns: Vec<Vec<StreamEvent>>) -> Self {
            Self {
                turns: Mutex::new(turns),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelProvider for ScriptedProvider {
        async fn stream_turn(
            &self,
            request: MessagesRequest,
        ) -> Result<EventStream, AnthropicError> {
            self.requests.lock().unwrap().push(request);
            let events = self.turns.lock().unwrap().remove(0);
            Ok(Box::pin(futures_util::stream::iter(
                events.into_iter().map(Ok),
            )))
        }
    }

    /// Answers every known call with canned text.
    #[derive(Debug)]
    struct StubTools {
        calls: Mutex<Vec<(String, Value)>>,
    }

    impl StubTools {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ToolProvider for StubTools {
        fn specs(&self) -> Vec<ToolSpec> {
            crate::tools::tool_specs().to_vec()
        }

        async fn call(&self, name: &str, args: &Value) -> Result<String, DispatchError> {
            self.calls
                .lock()
                .unwrap()
                .push((name.to_string(), args.clone()));
            match name {
                "search_rfcs" => Ok("Found 1 RFCs matching 'QUIC':\n\n**rfc9000** - QUIC"
                    .to_string()),
                other => Err(DispatchError::UnknownOperation {
                    name: other.to_string(),
                }),
            }
        }
    }

    fn text_turn(text: &str) -> Vec<StreamEvent> {
        vec![
            StreamEvent::ContentBlockStart {
                index: 0,
                content_block: ContentBlock::Text {
                    text: String::new(),
                },
            },
            StreamEvent::ContentBlockDelta {
                index: 0,
                delta: ContentDelta::TextDelta {
                    text: text.to_string(),
                },
            },
            StreamEvent::ContentBlockStop { index: 0 },
            StreamEvent::MessageDelta {
                delta: MessageDelta {
                    stop_reason: Some(StopReason::EndTurn),
                    stop_sequence: None,
                },
            },
            StreamEvent::MessageStop,
        ]
    }

    fn tool_turn(name: &str, input: Value) -> Vec<StreamEvent> {
        vec![
            StreamEvent::ContentBlockStart {
                index: 0,
                content_block: ContentBlock::ToolUse {
                    id: "toolu_1".to_string(),
                    name: name.to_string(),
                    input,
                },
            },
            StreamEvent::ContentBlockStop { index: 0 },
            StreamEvent::MessageDelta {
                delta: MessageDelta {
                    stop_reason: Some(StopReason::ToolUse),
                    stop_sequence: None,
                },
            },
            StreamEvent::MessageStop,
        ]
    }

    fn agent_with(
        turns: Vec<Vec<StreamEvent>>,
        tools: Arc<dyn ToolProvider>,
        max_steps: usize,
    ) -> Agent<ScriptedProvider> {
        Agent::new(
            ScriptedProvider::new(turns),
            tools,
            AgentOptions {
                max_steps,
                ..AgentOptions::default()
            },
        )
    }

    #[tokio::test]
    async fn test_plain_text_turn() {
        let agent = agent_with(
            vec![text_turn("HTTP/2 is defined in RFC 7540.")],
            Arc::new(StubTools::new()),
            DEFAULT_MAX_STEPS,
        );

        let mut history = Vec::new();
        let mut deltas = Vec::new();
        let reply = agent
            .run_turn(&mut history, "which RFC defines HTTP/2?", &mut |event| {
                if let AgentEvent::TextDelta(text) = event {
                    deltas.push(text.to_string());
                }
            })
            .await
            .unwrap();

        assert_eq!(reply, "HTTP/2 is defined in RFC 7540.");
        assert_eq!(deltas.concat(), reply);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], Message::user("which RFC defines HTTP/2?"));
        assert_eq!(history[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_tool_round_feeds_result_back() {
        let tools = Arc::new(StubTools::new());
        let agent = agent_with(
            vec![
                tool_turn("search_rfcs", serde_json::json!({"query": "QUIC"})),
                text_turn("QUIC lives in RFC 9000."),
            ],
            tools.clone(),
            DEFAULT_MAX_STEPS,
        );

        let mut history = Vec::new();
        let mut events = Vec::new();
        let reply = agent
            .run_turn(&mut history, "find the QUIC RFC", &mut |event| {
                events.push(format!("{:?}", event));
            })
            .await
            .unwrap();

        assert_eq!(reply, "QUIC lives in RFC 9000.");
        // user, assistant tool_use, user tool_result, assistant text
        assert_eq!(history.len(), 4);
        assert_eq!(
            history[2].content,
            vec![ContentBlock::ToolResult {
                tool_use_id: "toolu_1".to_string(),
                content: "Found 1 RFCs matching 'QUIC':\n\n**rfc9000** - QUIC".to_string(),
                is_error: false,
            }]
        );

        let calls = tools.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "search_rfcs");
        assert_eq!(calls[0].1, serde_json::json!({"query": "QUIC"}));

        assert!(events.contains(&r#"ToolStarted { name: "search_rfcs" }"#.to_string()));
        assert!(events.contains(&r#"ToolFinished { name: "search_rfcs" }"#.to_string()));
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_error_result() {
        let agent = agent_with(
            vec![
                tool_turn("drop_tables", serde_json::json!({})),
                text_turn("That tool does not exist."),
            ],
            Arc::new(StubTools::new()),
            DEFAULT_MAX_STEPS,
        );

        let mut history = vec![
            Message::user("earlier question"),
            Message::assistant("earlier answer"),
        ];
        let reply = agent
            .run_turn(&mut history, "do something odd", &mut |_| {})
            .await
            .unwrap();

        assert_eq!(reply, "That tool does not exist.");
        assert_eq!(
            history[4].content,
            vec![ContentBlock::ToolResult {
                tool_use_id: "toolu_1".to_string(),
                content: "Unknown tool: drop_tables".to_string(),
                is_error: true,
            }]
        );
    }

    #[tokio::test]
    async fn test_tool_round_limit() {
        let agent = agent_with(
            vec![
                tool_turn("search_rfcs", serde_json::json!({"query": "a"})),
                tool_turn("search_rfcs", serde_json::json!({"query": "b"})),
            ],
            Arc::new(StubTools::new()),
            1,
        );

        let mut history = Vec::new();
        let err = agent
            .run_turn(&mut history, "loop forever", &mut |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::TooManySteps));

        // user, assistant tool_use, user tool_result, assistant tool_use,
        // user error tool_result.
        assert_eq!(history.len(), 5);
        assert_eq!(history[4].role, Role::User);
        assert_eq!(
            history[4].content,
            vec![ContentBlock::ToolResult {
                tool_use_id: "toolu_1".to_string(),
                content: "Tool interaction limit reached".to_string(),
                is_error: true,
            }]
        );

        // No tool_use may stay unanswered; the next request replays this
        // history.
        for (i, message) in history.iter().enumerate() {
            for block in &message.content {
                if let ContentBlock::ToolUse { id, .. } = block {
                    let answered = history.get(i + 1).is_some_and(|next| {
                        next.content.iter().any(|b| {
                            matches!(
                                b,
                                ContentBlock::ToolResult { tool_use_id, .. } if tool_use_id == id
                            )
                        })
                    });
                    assert!(answered, "tool_use {} is unanswered", id);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_requests_advertise_tools_and_history() {
        let provider = ScriptedProvider::new(vec![
            tool_turn("search_rfcs", serde_json::json!({"query": "QUIC"})),
            text_turn("done"),
        ]);
        let agent = Agent::new(
            provider,
            Arc::new(StubTools::new()) as Arc<dyn ToolProvider>,
            AgentOptions {
                system_prompt: "you analyze RFCs".to_string(),
                ..AgentOptions::default()
            },
        );

        let mut history = Vec::new();
        agent
            .run_turn(&mut history, "find QUIC", &mut |_| {})
            .await
            .unwrap();

        let requests = agent.provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].system.as_deref(), Some("you analyze RFCs"));
        assert_eq!(requests[0].tools.as_ref().map(Vec::len), Some(3));
        assert_eq!(requests[0].messages.len(), 1);
        // The second request replays the full exchange so far.
        assert_eq!(requests[1].messages.len(), 3);
        assert!(matches!(
            requests[1].messages[2].content[0],
            ContentBlock::ToolResult { .. }
        ));
    }
}
