//! Draftdesk MCP (Model Context Protocol) server
//!
//! Exposes the recipient directory, email-field extraction and the document
//! index as MCP tools over stdio.
//!
//! ## Architecture
//!
//! - `DraftdeskMcpServer`: tool handlers and the `ServerHandler` impl
//! - `bootstrap`: config, database, migrations and embedder wiring
//! - `index`: `DocumentIndex`, the explicit handle over chunks and embedder
//! - `embedder`: HTTP embedding providers (Ollama, OpenAI-compatible)
//!
//! ## Example Usage
//!
//! ```no_run
//! use draftdesk_core::config::LoadOptions;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = draftdesk_mcp::bootstrap(LoadOptions::default()).await?;
//!     app.into_server().run_stdio().await
//! }
//! ```

pub mod bootstrap;
pub mod embedder;
pub mod index;
pub mod logging;
mod server;
mod tools;

pub use bootstrap::{bootstrap, bootstrap_with_config, Application, BootstrapError};
pub use embedder::{build_embedder, OllamaEmbedder, OpenAiEmbedder};
pub use index::{DocumentIndex, IndexReport, IndexStats, SearchReport};
pub use server::*;
pub use tools::*;

use draftdesk_core::errors::{ApplicationError, DomainError};
use draftdesk_db::RepositoryError;
use rmcp::model::{CallToolResult, Content};
use thiserror::Error;
use tracing::warn;

/// Errors specific to MCP server operations
#[derive(Error, Debug)]
pub enum McpError {
    #[error(transparent)]
    Application(#[from] ApplicationError),

    #[error("database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// Convert to JSON-RPC error code
    pub fn error_code(&self) -> i32 {
        match self {
            McpError::Application(ApplicationError::Domain(DomainError::Validation(_))) => -32602,
            McpError::Application(ApplicationError::Domain(_)) => -32600,
            McpError::Application(_) | McpError::Database(_) | McpError::Internal(_) => -32603,
        }
    }

    fn into_application(self) -> ApplicationError {
        match self {
            McpError::Application(error) => error,
            McpError::Database(error) => error.into(),
            McpError::Internal(message) => ApplicationError::Configuration(message),
        }
    }

    /// Tool-level failure payload. The text starts with `Error:` and carries
    /// a user-safe message, the detail and a fresh correlation id.
    pub fn into_tool_result(self, tool: &'static str) -> CallToolResult {
        let correlation_id = uuid::Uuid::new_v4().to_string();
        let code = self.error_code();
        let interface = self.into_application().into_interface(correlation_id.as_str());

        warn!(
            event_name = "mcp.tool.failed",
            correlation_id = %correlation_id,
            tool,
            code,
            error = %interface,
            "tool call failed"
        );

        CallToolResult::error(vec![Content::text(format!(
            "Error: {} {} (code {code}, correlation_id {correlation_id})",
            interface.user_message(),
            interface.message(),
        ))])
    }
}

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;
