//! Terminal presentation helpers: banner, spinner, output-mode detection.

use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

const BANNER_WIDTH: usize = 60;

/// Welcome banner for a chat session.
pub fn print_banner(simple: bool) {
    let rule = "=".repeat(BANNER_WIDTH);
    println!("{}", rule);
    if simple {
        println!("{}", "RFC Analysis Agent (Simplified Version)".bold());
    } else {
        println!("{}", "RFC Analysis Agent".bold());
    }
    println!("{}", rule);
    if simple {
        println!("\nAI-powered RFC research using a generic web fetch tool");
        println!("No RFC-specific integration - pure LLM + web access");
    } else {
        println!("\nAI-powered assistant for IETF RFC research and analysis");
        println!("Tools run in-process: search_rfcs, get_rfc, get_rfc_text");
    }
    println!("\nCommands:");
    println!("  - Type your question or request");
    println!("  - 'exit' or 'quit' to end the session");
    println!("  - 'new' to start a fresh conversation");
    println!("{}", rule);
    println!();
}

/// A loading spinner with a message, drawn on stderr.
pub struct Spinner {
    pb: indicatif::ProgressBar,
}

impl Spinner {
    /// Create a new spinner with the given message.
    pub fn new(msg: &str) -> Self {
        let pb = indicatif::ProgressBar::new_spinner();
        pb.set_style(
            indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    /// Stop the spinner and erase its line.
    pub fn finish_and_clear(&self) {
        self.pb.finish_and_clear();
    }
}
