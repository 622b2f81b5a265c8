//! Conversational front ends over the agent loop.
//!
//! Two modes share one session driver. The full mode advertises the three
//! RFC operations and dispatches them in-process; the simplified mode gives
//! the model a single generic fetch tool and a system prompt teaching it
//! where RFC content lives on the public web.

pub mod agent;
pub mod anthropic;
pub mod web;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tracing::info;

use crate::chat::agent::{Agent, AgentEvent, AgentOptions};
use crate::chat::anthropic::{AnthropicClient, Message, API_KEY_ENV};
use crate::chat::web::WebTools;
use crate::config::Config;
use crate::lookup::{build_http_client, DatatrackerClient, RfcEditorClient};
use crate::tools::{ToolProvider, ToolSet};
use crate::ui;

/// System prompt for the full agent mode.
pub const RFC_SYSTEM_PROMPT: &str = "\
You are an expert RFC analysis assistant with deep knowledge of IETF standards and protocols.

Your capabilities:
- Search for RFCs by keywords using the search_rfcs tool
- Retrieve detailed RFC metadata using the get_rfc tool
- Fetch full RFC text content using the get_rfc_text tool
- Analyze RFC content, explain technical concepts, and answer questions
- Compare multiple RFCs and identify relationships between standards
- Help users understand RFC status, obsolescence, and updates

**IMPORTANT: You have FULL ACCESS to all RFC tools. When asked about RFC content:**
1. ALWAYS use get_rfc_text to fetch the full RFC text when users ask for detailed information
2. You have permission to fetch ANY publicly available RFC
3. There are NO access restrictions - all RFCs are public documents
4. If get_rfc_text fails, report the actual error, don't assume there are restrictions

When analyzing RFCs:
1. Always provide accurate RFC numbers and titles
2. Explain technical concepts in clear, accessible language
3. Cite specific sections when referencing RFC content
4. Note RFC status (Proposed Standard, Draft Standard, Internet Standard, etc.)
5. Identify related RFCs, updates, and obsoletes relationships

Be concise but thorough in your analysis.";

/// System prompt for the simplified mode.
pub const SIMPLE_SYSTEM_PROMPT: &str = "\
You are an expert RFC analysis assistant with deep knowledge of IETF standards and protocols.

Your capabilities:
- Fetch RFC full text with the fetch_url tool from https://www.rfc-editor.org/rfc/rfc[number].txt
- Look up RFC metadata by fetching https://datatracker.ietf.org/doc/rfc[number]/
- Search for RFCs by topic by fetching https://datatracker.ietf.org/api/v1/doc/document/?type=rfc&name__icontains=[topic]&format=json
- Leverage your training knowledge of major RFCs and protocols
- Analyze RFC content, explain technical concepts, and answer questions

**How to find RFCs:**
1. For specific RFC numbers: fetch https://www.rfc-editor.org/rfc/rfc7540.txt directly
2. For topics: fetch the datatracker search URL with the topic as the name filter
3. For metadata (authors, status, dates): prefer datatracker.ietf.org

**When analyzing RFCs:**
1. Always provide accurate RFC numbers and titles
2. Explain technical concepts in clear, accessible language
3. Cite specific sections when referencing RFC content
4. Note RFC status (Proposed Standard, Internet Standard, etc.)
5. Identify related RFCs, updates, and obsoletes relationships
6. If you don't have information in your training data, fetch it

Be concise but thorough in your analysis.";

/// Run an interactive chat session on stdin/stdout.
///
/// Turn-level failures (rate limits, upstream errors) print and leave the
/// session running; only input/output failures end it. A missing API key
/// prints setup instructions and returns without starting the loop.
pub async fn run(
    config: &Config,
    simple: bool,
    model_override: Option<String>,
) -> std::io::Result<()> {
    let api_key = match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.is_empty() => key,
        _ => {
            println!("Error: ANTHROPIC_API_KEY environment variable not set.");
            println!("Get your API key from https://console.anthropic.com/");
            println!("\nTo set it:");
            println!("  export ANTHROPIC_API_KEY='your-api-key-here'");
            return Ok(());
        }
    };
    let provider = match &config.chat.api_base {
        Some(base) => AnthropicClient::with_api_url(api_key, base.clone()),
        None => AnthropicClient::new(api_key),
    };

    let http = Arc::new(build_http_client(
        Duration::from_secs(config.lookup.timeout_secs),
        Duration::from_secs(config.lookup.connect_timeout_secs),
    ));
    let tools: Arc<dyn ToolProvider> = if simple {
        Arc::new(WebTools::new(http))
    } else {
        Arc::new(ToolSet::new(
            DatatrackerClient::with_base_url(
                http.clone(),
                config.lookup.datatracker_base.clone(),
            ),
            RfcEditorClient::with_base_url(http, config.lookup.rfc_editor_base.clone()),
        ))
    };

    let options = AgentOptions {
        model: model_override.unwrap_or_else(|| config.chat.model.clone()),
        max_tokens: config.chat.max_tokens,
        system_prompt: if simple {
            SIMPLE_SYSTEM_PROMPT
        } else {
            RFC_SYSTEM_PROMPT
        }
        .to_string(),
        ..AgentOptions::default()
    };
    info!(simple, model = %options.model, "chat session starting");
    let agent = Agent::new(provider, tools, options);

    ui::print_banner(simple);

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut history: Vec<Message> = Vec::new();
    let mut turn: u32 = 0;

    loop {
        print!("\n[Turn {}] You: ", turn + 1);
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!("\nGoodbye!");
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        match input.to_lowercase().as_str() {
            "exit" | "quit" => {
                println!("\nGoodbye!");
                break;
            }
            "new" => {
                println!("\n[Starting new conversation...]");
                history.clear();
                turn = 0;
                continue;
            }
            _ => {}
        }

        turn += 1;
        print!("\n[Turn {}] Agent: ", turn);
        std::io::stdout().flush()?;

        let mut spinner: Option<ui::Spinner> = None;
        let result = agent
            .run_turn(&mut history, input, &mut |event| match event {
                AgentEvent::TextDelta(text) => {
                    if let Some(s) = spinner.take() {
                        s.finish_and_clear();
                    }
                    print!("{}", text);
                    let _ = std::io::stdout().flush();
                }
                AgentEvent::ToolStarted { name } => {
                    spinner = Some(ui::Spinner::new(&format!("Running {}...", name)));
                }
                AgentEvent::ToolFinished { .. } => {
                    if let Some(s) = spinner.take() {
                        s.finish_and_clear();
                    }
                }
            })
            .await;
        if let Some(s) = spinner.take() {
            s.finish_and_clear();
        }

        match result {
            Ok(_) => println!(),
            Err(e) => {
                println!("\nError: {}", e);
                println!("You can continue chatting or type 'exit' to quit.");
            }
        }
    }

    Ok(())
}
