//! # RFC Tools
//!
//! Conversational and programmatic access to IETF RFC documents: an MCP
//! server exposing RFC lookup operations, plus an interactive agent that
//! drives the same operations through the Anthropic Messages API.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (RfcNumber, DocumentMetadata, SearchQuery)
//! - [`lookup`]: HTTP clients for the IETF Datatracker and RFC Editor
//! - [`format`]: Markdown rendering of lookup results
//! - [`tools`]: The advertised tool surface and its dispatcher
//! - [`mcp`]: MCP protocol server (stdio and streamable HTTP)
//! - [`chat`]: Messages API client, agent loop and interactive sessions
//! - [`config`]: Configuration management

pub mod chat;
pub mod config;
pub mod format;
pub mod lookup;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod ui;

// Re-export commonly used types
pub use models::{DocumentMetadata, RfcNumber, SearchQuery, SearchResults};
pub use tools::{ToolCall, ToolSet};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
