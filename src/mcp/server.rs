//! MCP server implementation using pmcp (Pragmatic AI's rust-mcp-sdk).
//!
//! Adapts the crate's tool surface onto pmcp's JSON-RPC handling over stdio
//! and streamable HTTP.

use async_trait::async_trait;
use pmcp::{
    server::streamable_http_server::StreamableHttpServer, Error, RequestHandlerExtra, Server,
    ServerCapabilities, ToolHandler, ToolInfo,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::tools::{DispatchError, ToolProvider, ToolSpec};

/// The MCP server for the RFC tool surface
///
/// Serves whatever [`ToolProvider`] it is given; in practice that is the
/// RFC [`crate::tools::ToolSet`]. Each advertised operation becomes one
/// pmcp tool whose result is a single text block.
#[derive(Debug, Clone)]
pub struct McpServer {
    provider: Arc<dyn ToolProvider>,
}

impl McpServer {
    /// Create a new MCP server over the given tool provider
    pub fn new(provider: Arc<dyn ToolProvider>) -> Self {
        Self { provider }
    }

    /// Build a pmcp server with one handler per advertised operation.
    ///
    /// `run_stdio` consumes the pmcp server, so each run mode builds its own.
    fn build_server(&self) -> Result<Server, pmcp::Error> {
        let mut builder = Server::builder()
            .name("rfc-tools")
            .version(env!("CARGO_PKG_VERSION"))
            .capabilities(ServerCapabilities::default());

        for spec in self.provider.specs() {
            let adapter = ToolAdapter {
                spec: spec.clone(),
                provider: self.provider.clone(),
            };
            builder = builder.tool(spec.name, adapter);
        }

        builder.build()
    }

    /// Run the server in stdio mode (for Claude Desktop and other MCP clients)
    pub async fn run_stdio(&self) -> Result<(), pmcp::Error> {
        tracing::info!("Starting MCP server in stdio mode");
        let server = self.build_server()?;
        server.run_stdio().await
    }

    /// Run the server in streamable HTTP mode
    ///
    /// Returns the bound address and the handle of the serving task.
    pub async fn run_http(&self, addr: &str) -> Result<(SocketAddr, JoinHandle<()>), pmcp::Error> {
        tracing::info!("Starting MCP server in HTTP mode on {}", addr);

        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|e| Error::invalid_params(format!("Invalid address: {}", e)))?;

        let server = self.build_server()?;
        let http_server = StreamableHttpServer::new(socket_addr, Arc::new(Mutex::new(server)));
        http_server.start().await
    }
}

/// Wrapper adapting one [`ToolProvider`] operation to pmcp's ToolHandler
#[derive(Clone)]
struct ToolAdapter {
    spec: ToolSpec,
    provider: Arc<dyn ToolProvider>,
}

#[async_trait]
impl ToolHandler for ToolAdapter {
    async fn handle(&self, args: Value, _extra: RequestHandlerExtra) -> Result<Value, Error> {
        let text = self
            .provider
            .call(self.spec.name, &args)
            .await
            .map_err(|e| match e {
                DispatchError::InvalidArguments { .. } => Error::invalid_params(e.to_string()),
                DispatchError::UnknownOperation { .. } => Error::internal(e.to_string()),
            })?;
        Ok(Value::String(text))
    }

    fn metadata(&self) -> Option<ToolInfo> {
        Some(ToolInfo::new(
            self.spec.name.to_string(),
            Some(self.spec.description.to_string()),
            self.spec.input_schema.clone(),
        ))
    }
}
