use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use rfc_tools::chat;
use rfc_tools::config::{env_config, find_config_file, load_config, Config};
use rfc_tools::format;
use rfc_tools::lookup::{build_http_client, DatatrackerClient, RfcEditorClient};
use rfc_tools::mcp::McpServer;
use rfc_tools::models::{RfcNumber, SearchQuery, SearchResults};
use rfc_tools::tools::{ToolCall, ToolSet};
use rfc_tools::ui;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// RFC Tools - Search, inspect and analyze IETF RFCs
#[derive(Parser, Debug)]
#[command(name = "rfc-tools")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search, inspect and analyze IETF RFCs", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv, -vvv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds (overrides configuration)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Show all environment variables
    #[arg(long, global = true)]
    env: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search for RFCs by keyword
    #[command(alias = "s")]
    Search {
        /// Search query string
        query: String,

        /// Maximum number of results
        #[arg(long, short, default_value_t = 10)]
        limit: usize,
    },

    /// Show metadata for one RFC
    #[command(alias = "g")]
    Get {
        /// RFC identifier (e.g., "7540", "RFC 7540", "rfc7540")
        identifier: String,
    },

    /// Print the full text of one RFC
    #[command(alias = "t")]
    Text {
        /// RFC identifier (e.g., "7540", "RFC 7540", "rfc7540")
        identifier: String,
    },

    /// Start an interactive chat session about RFCs
    Chat {
        /// Give the model a generic web fetch tool instead of the RFC tools
        #[arg(long)]
        simple: bool,

        /// Model to use for this session
        #[arg(long)]
        model: Option<String>,
    },

    /// Run the MCP server (for Claude Desktop and other MCP clients)
    Serve {
        /// Run in stdio mode (for MCP clients like Claude Desktop)
        #[arg(long, default_value_t = true)]
        stdio: bool,

        /// Run in streamable HTTP mode (overrides --stdio)
        #[arg(long)]
        http: bool,

        /// Port for HTTP mode
        #[arg(long, short, default_value_t = 3000)]
        port: u16,

        /// Host to bind to for HTTP mode
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn print_env_vars() {
    println!("RFC Tools - Environment Variables");
    println!();
    println!("Model Runtime:");
    println!("  ANTHROPIC_API_KEY           API key for the Anthropic Messages API (chat command)");
    println!();
    println!("Lookup Settings:");
    println!("  RFC_TOOLS_LOOKUP__DATATRACKER_BASE      Datatracker API base URL");
    println!("  RFC_TOOLS_LOOKUP__RFC_EDITOR_BASE       RFC Editor base URL for plain text");
    println!("  RFC_TOOLS_LOOKUP__TIMEOUT_SECS          Request timeout in seconds (default: 30)");
    println!("  RFC_TOOLS_LOOKUP__CONNECT_TIMEOUT_SECS  Connection timeout in seconds (default: 10)");
    println!();
    println!("Chat Settings:");
    println!("  RFC_TOOLS_CHAT__MODEL       Model identifier for chat sessions");
    println!("  RFC_TOOLS_CHAT__MAX_TOKENS  Token budget per model response (default: 4096)");
    println!("  RFC_TOOLS_CHAT__API_BASE    Override for the Anthropic API base URL");
    println!();
    println!("Logging:");
    println!("  RUST_LOG                    Rust logging level (e.g., debug, info, warn, error)");
    println!("  RFC_TOOLS_LOG_FORMAT        Set to 'json' for JSON log lines on stderr");
    println!();
    println!("Example:");
    println!("  export ANTHROPIC_API_KEY=\"your-api-key-here\"");
    println!("  export RFC_TOOLS_LOOKUP__TIMEOUT_SECS=\"60\"");
    std::process::exit(0);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Show environment variables and exit if requested
    if cli.env {
        print_env_vars();
    }

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("rfc_tools={}", env_filter)),
    );

    // Logs go to stderr so piped command output stays clean
    let json_logs = std::env::var("RFC_TOOLS_LOG_FORMAT").as_deref() == Ok("json");
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    // Load configuration from file if specified or found in default locations
    let mut config = if let Some(config_path) = &cli.config {
        load_config(config_path)?
    } else if let Some(config_path) = find_config_file() {
        tracing::info!("Using config file: {}", config_path.display());
        load_config(&config_path)?
    } else {
        env_config()?
    };
    if let Some(timeout) = cli.timeout {
        config.lookup.timeout_secs = timeout;
    }

    // Execute command
    match cli.command {
        Some(Commands::Search { query, limit }) => {
            let (datatracker, _) = lookup_clients(&config);

            let spinner = (!cli.quiet && ui::is_terminal())
                .then(|| ui::Spinner::new(&format!("Searching RFCs matching '{}'...", query)));
            let results = datatracker
                .search(&SearchQuery::new(&query).limit(limit))
                .await;
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }

            match results {
                Ok(results) => output_search(&results, cli.output),
                // Same text the tool dispatcher would return
                Err(e) => println!("Error searching RFCs: {}", e),
            }
        }

        Some(Commands::Get { identifier }) => {
            let (datatracker, rfc_editor) = lookup_clients(&config);
            let tools = ToolSet::new(datatracker, rfc_editor);

            let spinner = (!cli.quiet && ui::is_terminal())
                .then(|| ui::Spinner::new(&format!("Fetching metadata for '{}'...", identifier)));
            let text = tools.dispatch(ToolCall::GetRfc { identifier }).await;
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }
            println!("{}", text);
        }

        Some(Commands::Text { identifier }) => {
            let (datatracker, rfc_editor) = lookup_clients(&config);
            let tools = ToolSet::new(datatracker, rfc_editor);

            match identifier.parse::<RfcNumber>() {
                Ok(number) => {
                    let spinner = (!cli.quiet && ui::is_terminal())
                        .then(|| ui::Spinner::new(&format!("Fetching RFC {} text...", number)));
                    let text = tools
                        .dispatch(ToolCall::GetRfcText {
                            number: number.get(),
                        })
                        .await;
                    if let Some(spinner) = spinner {
                        spinner.finish_and_clear();
                    }
                    println!("{}", text);
                }
                Err(e) => println!("{}", e),
            }
        }

        Some(Commands::Chat { simple, model }) => {
            chat::run(&config, simple, model).await?;
        }

        Some(Commands::Serve {
            stdio,
            http,
            port,
            host,
        }) => {
            let (datatracker, rfc_editor) = lookup_clients(&config);
            let server = McpServer::new(Arc::new(ToolSet::new(datatracker, rfc_editor)));

            // Use HTTP mode if --http flag is provided, otherwise use --stdio flag
            let use_http = http || !stdio;

            if use_http {
                let addr = format!("{}:{}", host, port);
                tracing::info!("Running MCP server in HTTP mode on {}", addr);
                let (bound_addr, handle) = server.run_http(&addr).await?;
                tracing::info!("MCP server listening on {}", bound_addr);

                // Wait for the server to finish
                handle
                    .await
                    .map_err(|e| anyhow::anyhow!("Server task failed: {}", e))?;
            } else {
                tracing::info!("Running MCP server in stdio mode");
                server.run_stdio().await?;
            }
        }

        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "rfc-tools", &mut std::io::stdout());
        }

        None => {
            // No command provided - show help
            println!("No command provided. Use --help for usage information.");
            println!("Common commands:");
            println!("  search <query>      - Search for RFCs by keyword");
            println!("  get <identifier>    - Show metadata for one RFC");
            println!("  text <identifier>   - Print the full text of one RFC");
            println!("  chat                - Interactive chat session about RFCs");
            println!("  serve               - Run MCP server");
        }
    }

    Ok(())
}

fn lookup_clients(config: &Config) -> (DatatrackerClient, RfcEditorClient) {
    let http = Arc::new(build_http_client(
        Duration::from_secs(config.lookup.timeout_secs),
        Duration::from_secs(config.lookup.connect_timeout_secs),
    ));
    (
        DatatrackerClient::with_base_url(http.clone(), config.lookup.datatracker_base.clone()),
        RfcEditorClient::with_base_url(http, config.lookup.rfc_editor_base.clone()),
    )
}

fn output_search(results: &SearchResults, format: OutputFormat) {
    let actual_format = if format == OutputFormat::Auto {
        if std::io::stdout().is_terminal() {
            OutputFormat::Table
        } else {
            OutputFormat::Json
        }
    } else {
        format
    };

    match actual_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(results).unwrap());
        }
        OutputFormat::Plain => {
            println!("{}", format::search_results(results));
        }
        OutputFormat::Table => {
            use comfy_table::{Attribute, Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Name", "Rev", "Title", "Summary"]);

            for hit in &results.hits {
                let title = clip_cell(&hit.title);
                let summary = clip_cell(hit.summary.as_deref().unwrap_or_default());

                table.add_row(vec![
                    Cell::new(&hit.name).add_attribute(Attribute::Bold),
                    Cell::new(&hit.rev),
                    Cell::new(title),
                    Cell::new(summary),
                ]);
            }
            println!("{table}");

            if let Some(total) = results.total_available {
                if total as usize > results.hits.len() {
                    println!("Showing {} of {} matching RFCs", results.hits.len(), total);
                }
            }
        }
        OutputFormat::Auto => unreachable!(),
    }
}

/// Fit text into a table cell: values over 60 characters are cut at 57 with
/// "..." appended. Cuts land on character boundaries.
fn clip_cell(text: &str) -> String {
    if text.chars().count() <= 60 {
        return text.to_string();
    }
    let end = text
        .char_indices()
        .nth(57)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_version() {
        let version = env!("CARGO_PKG_VERSION");
        assert!(!version.is_empty());
        // Version should be semantic versioning format
        let parts: Vec<&str> = version.split('.').collect();
        assert!(parts.len() >= 2);
        assert!(parts[0].parse::<u32>().is_ok());
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["rfc-tools"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert_eq!(cli.output, OutputFormat::Auto);
        assert_eq!(cli.timeout, None);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["rfc-tools", "-v"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["rfc-tools", "-vv"]);
        assert_eq!(cli.verbose, 2);

        let cli = Cli::parse_from(["rfc-tools", "--verbose"]);
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn test_cli_config_path() {
        let cli = Cli::parse_from(["rfc-tools", "--config", "/path/to/config.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.toml")));
    }

    #[test]
    fn test_cli_search_command() {
        let cli = Cli::parse_from(["rfc-tools", "search", "http semantics"]);
        match &cli.command {
            Some(Commands::Search { query, limit }) => {
                assert_eq!(query, "http semantics");
                assert_eq!(*limit, 10);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_search_with_limit() {
        let cli = Cli::parse_from(["rfc-tools", "search", "quic", "--limit", "25"]);
        match &cli.command {
            Some(Commands::Search { query, limit }) => {
                assert_eq!(query, "quic");
                assert_eq!(*limit, 25);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_get_command_alias() {
        let cli = Cli::parse_from(["rfc-tools", "g", "RFC 7540"]);
        match &cli.command {
            Some(Commands::Get { identifier }) => {
                assert_eq!(identifier, "RFC 7540");
            }
            _ => panic!("Expected Get command"),
        }
    }

    #[test]
    fn test_cli_text_command() {
        let cli = Cli::parse_from(["rfc-tools", "text", "9000"]);
        match &cli.command {
            Some(Commands::Text { identifier }) => {
                assert_eq!(identifier, "9000");
            }
            _ => panic!("Expected Text command"),
        }
    }

    #[test]
    fn test_cli_chat_command() {
        let cli = Cli::parse_from(["rfc-tools", "chat", "--simple"]);
        match &cli.command {
            Some(Commands::Chat { simple, model }) => {
                assert!(*simple);
                assert!(model.is_none());
            }
            _ => panic!("Expected Chat command"),
        }
    }

    #[test]
    fn test_cli_serve_command() {
        let cli = Cli::parse_from(["rfc-tools", "serve"]);
        match &cli.command {
            Some(Commands::Serve {
                stdio, port, host, ..
            }) => {
                assert!(*stdio);
                assert_eq!(*port, 3000);
                assert_eq!(host, "127.0.0.1");
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_serve_http_mode() {
        let cli = Cli::parse_from(["rfc-tools", "serve", "--http", "--port", "8080"]);
        match &cli.command {
            Some(Commands::Serve { http, port, .. }) => {
                assert!(*http);
                assert_eq!(*port, 8080);
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_timeout_override() {
        let cli = Cli::parse_from(["rfc-tools", "--timeout", "60", "search", "dns"]);
        assert_eq!(cli.timeout, Some(60));
    }

    #[test]
    fn test_clip_cell() {
        assert_eq!(clip_cell("short title"), "short title");

        let exact = "a".repeat(60);
        assert_eq!(clip_cell(&exact), exact);

        let long = "b".repeat(61);
        assert_eq!(clip_cell(&long), format!("{}...", "b".repeat(57)));

        // 'é' is two bytes; a byte-indexed cut would split it.
        let accented = "é".repeat(70);
        assert_eq!(clip_cell(&accented), format!("{}...", "é".repeat(57)));
    }
}
