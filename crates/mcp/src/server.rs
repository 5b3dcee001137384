//! MCP Server Implementation
//!
//! Tool handlers for the directory, extraction and document index.

use rmcp::{
    model::*,
    schemars::{self, JsonSchema},
    tool, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use draftdesk_core::directory::LookupOutcome;
use draftdesk_core::errors::ApplicationError;
use draftdesk_core::extraction::{EmailExtractor, ExtractedEmail};
use draftdesk_db::{ping, DbPool, DirectoryService, SourceSummary};

use crate::index::{DocumentIndex, IndexReport, SearchReport};
use crate::tools::catalog_lines;
use crate::{McpError, McpResult};

/// Main MCP server for Draftdesk. Every handle it needs is passed in at
/// construction.
#[derive(Clone)]
pub struct DraftdeskMcpServer {
    db_pool: DbPool,
    directory: DirectoryService,
    index: DocumentIndex,
    extractor: EmailExtractor,
}

// ============================================================================
// Tool inputs and outputs
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LookupContactParams {
    #[schemars(description = "Full or partial contact name, case-insensitive")]
    pub name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExtractEmailFieldsParams {
    #[schemars(description = "Free-form text containing To:, Subject: and Message: markers")]
    pub text: String,

    #[schemars(
        description = "Resolve a recipient given by name through the directory",
        default = "default_true"
    )]
    #[serde(default = "default_true")]
    pub resolve_recipient: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct IndexDocumentParams {
    #[schemars(description = "Stable document name; re-indexing a source replaces its chunks")]
    pub source: String,

    #[schemars(description = "Full plain-text document content")]
    pub text: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchDocumentsParams {
    #[schemars(description = "Search query text")]
    pub query: String,

    #[schemars(description = "Number of snippets to return (default 4, max 20)")]
    #[serde(default)]
    pub k: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub database: String,
    pub contacts: u64,
    pub chunks: u64,
    pub sources: u64,
    pub indexed_sources: Vec<SourceSummary>,
    pub embedding_model: String,
    pub dimensions: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExtractionResponse {
    #[serde(flatten)]
    pub email: ExtractedEmail,
    pub resolved_from_directory: bool,
}

// ============================================================================
// Operations
// ============================================================================

impl DraftdeskMcpServer {
    pub fn new(
        db_pool: DbPool,
        directory: DirectoryService,
        index: DocumentIndex,
        extractor: EmailExtractor,
    ) -> Self {
        Self { db_pool, directory, index, extractor }
    }

    /// Run the server with stdio transport
    pub async fn run_stdio(self) -> anyhow::Result<()> {
        info!(event_name = "mcp.server.start", transport = "stdio", "starting MCP server");

        let service = self.serve(rmcp::transport::io::stdio()).await?;
        let _quit = service.waiting().await?;

        info!(event_name = "mcp.server.stopped", "MCP server shutdown complete");
        Ok(())
    }

    pub async fn lookup(&self, name: &str) -> McpResult<LookupOutcome> {
        Ok(self.directory.lookup(name).await?)
    }

    pub async fn connection_status(&self) -> McpResult<ConnectionStatus> {
        ping(&self.db_pool)
            .await
            .map_err(|error| ApplicationError::Persistence(format!("database ping: {error}")))?;

        let contacts = self.directory.repository().count().await?;
        let stats = self.index.stats().await?;
        let indexed_sources = self.index.sources().await?;
        let model = self.index.model_info();

        Ok(ConnectionStatus {
            database: "ok".to_string(),
            contacts,
            chunks: stats.chunks,
            sources: stats.sources,
            indexed_sources,
            embedding_model: model.model,
            dimensions: model.dimensions,
        })
    }

    /// Extracts the draft fields. A recipient given by name is looked up in
    /// the directory when `resolve_recipient` is set.
    pub async fn extract(
        &self,
        text: &str,
        resolve_recipient: bool,
    ) -> McpResult<ExtractionResponse> {
        let mut email = self.extractor.extract(text).map_err(ApplicationError::from)?;
        let mut resolved_from_directory = false;

        if resolve_recipient && email.to.is_none() {
            if let Some(name) = email.recipient_name.clone() {
                if let Some(contact) = self.directory.lookup(&name).await?.contact() {
                    email.resolve_recipient(contact.email.clone());
                    resolved_from_directory = true;
                }
            }
        }

        debug!(
            event_name = "mcp.extract.completed",
            missing = email.missing.len(),
            resolved_from_directory,
            "email fields extracted"
        );
        Ok(ExtractionResponse { email, resolved_from_directory })
    }

    pub async fn index(&self, source: &str, text: &str) -> McpResult<IndexReport> {
        Ok(self.index.index_document(source, text).await?)
    }

    pub async fn search(&self, query: &str, k: Option<usize>) -> McpResult<SearchReport> {
        Ok(self.index.search(query, k).await?)
    }
}

// ============================================================================
// Tools
// ============================================================================

#[tool(tool_box)]
impl DraftdeskMcpServer {
    #[tool(description = "Look up a contact in the directory by full or partial name. \
                          Returns the best match with its email address, or not_found.")]
    pub async fn lookup_contact(
        &self,
        #[tool(aggr)] params: LookupContactParams,
    ) -> Result<CallToolResult, rmcp::Error> {
        debug!(name = %params.name, "lookup_contact called");
        respond("lookup_contact", self.lookup(&params.name).await)
    }

    #[tool(description = "Check that the database is reachable and report directory and \
                          index sizes plus the active embedding model.")]
    pub async fn check_connection(&self) -> Result<CallToolResult, rmcp::Error> {
        respond("check_connection", self.connection_status().await)
    }

    #[tool(description = "Extract recipient, subject and message body from free-form text. \
                          Fields without a marker are reported in `missing`.")]
    pub async fn extract_email_fields(
        &self,
        #[tool(aggr)] params: ExtractEmailFieldsParams,
    ) -> Result<CallToolResult, rmcp::Error> {
        respond("extract_email_fields", self.extract(&params.text, params.resolve_recipient).await)
    }

    #[tool(description = "Split a plain-text document into chunks, embed them and store them \
                          for search. Re-indexing a source replaces its previous chunks.")]
    pub async fn index_document(
        &self,
        #[tool(aggr)] params: IndexDocumentParams,
    ) -> Result<CallToolResult, rmcp::Error> {
        debug!(source = %params.source, bytes = params.text.len(), "index_document called");
        respond("index_document", self.index(&params.source, &params.text).await)
    }

    #[tool(description = "Search indexed documents and return the most relevant snippets.")]
    pub async fn search_documents(
        &self,
        #[tool(aggr)] params: SearchDocumentsParams,
    ) -> Result<CallToolResult, rmcp::Error> {
        debug!(query = %params.query, k = ?params.k, "search_documents called");
        respond("search_documents", self.search(&params.query, params.k).await)
    }
}

// Implement ServerHandler trait for MCP protocol
#[tool(tool_box)]
impl ServerHandler for DraftdeskMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "draftdesk-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
            instructions: Some(format!(
                "Draftdesk MCP server. Use lookup_contact to resolve a recipient's address, \
                 extract_email_fields to turn a drafted reply into structured fields, \
                 index_document and search_documents to ground answers in policy documents, \
                 and check_connection to verify the backing store.\n{}",
                catalog_lines().join("\n")
            )),
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

fn respond<T: Serialize>(
    tool: &'static str,
    result: McpResult<T>,
) -> Result<CallToolResult, rmcp::Error> {
    let rendered = result.and_then(|value| {
        serde_json::to_string_pretty(&value)
            .map_err(|error| McpError::Internal(format!("serialize {tool} result: {error}")))
    });
    match rendered {
        Ok(content) => Ok(CallToolResult::success(vec![Content::text(content)])),
        Err(error) => Ok(error.into_tool_result(tool)),
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use draftdesk_core::config::AppConfig;
    use draftdesk_core::embedding::HashingEmbedder;
    use draftdesk_core::extraction::EmailExtractor;
    use draftdesk_db::repositories::InMemoryChunkRepository;
    use draftdesk_db::{
        connect_with_settings, migrations, DirectoryService, SampleDirectory, SqlContactRepository,
    };
    use rmcp::model::CallToolResult;
    use rmcp::ServerHandler;
    use serde_json::Value;

    use super::*;
    use crate::tools::ALL_TOOL_NAMES;

    async fn server() -> DraftdeskMcpServer {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SampleDirectory::load(&pool).await.expect("seed");

        let directory = DirectoryService::new(Arc::new(SqlContactRepository::new(pool.clone())));
        let index = DocumentIndex::new(
            Arc::new(InMemoryChunkRepository::default()),
            Arc::new(HashingEmbedder::new("feature-hash-v1", 128)),
            &AppConfig::default().retrieval,
        );
        DraftdeskMcpServer::new(pool, directory, index, EmailExtractor::default())
    }

    fn text(result: &CallToolResult) -> String {
        result.content[0].raw.as_text().expect("text content").text.clone()
    }

    fn json(result: &CallToolResult) -> Value {
        assert_ne!(result.is_error, Some(true), "unexpected tool error: {}", text(result));
        serde_json::from_str(&text(result)).expect("tool output is JSON")
    }

    #[tokio::test]
    async fn lookup_contact_finds_ashu() {
        let server = server().await;
        let result = server
            .lookup_contact(LookupContactParams { name: "Ashu".into() })
            .await
            .expect("tool call");

        let payload = json(&result);
        assert_eq!(payload["status"], "found");
        assert_eq!(payload["contact"]["name"], "Ashu");
        assert_eq!(payload["contact"]["email"], "ashu.kumar@oracle.com");
        assert_eq!(payload["match_kind"], "exact");
    }

    #[tokio::test]
    async fn lookup_contact_reports_not_found_without_error() {
        let server = server().await;
        let result = server
            .lookup_contact(LookupContactParams { name: "Zebediah".into() })
            .await
            .expect("tool call");

        assert_eq!(json(&result)["status"], "not_found");
    }

    #[tokio::test]
    async fn blank_lookup_is_not_found() {
        let server = server().await;
        let result = server
            .lookup_contact(LookupContactParams { name: "  ".into() })
            .await
            .expect("tool call");

        assert_ne!(result.is_error, Some(true));
        assert_eq!(json(&result)["status"], "not_found");
    }

    #[tokio::test]
    async fn check_connection_reports_counts() {
        let server = server().await;
        let result = server.check_connection().await.expect("tool call");

        let payload = json(&result);
        assert_eq!(payload["database"], "ok");
        assert_eq!(payload["contacts"], 6);
        assert_eq!(payload["chunks"], 0);
        assert_eq!(payload["indexed_sources"], serde_json::json!([]));
        assert_eq!(payload["embedding_model"], "feature-hash-v1");
        assert_eq!(payload["dimensions"], 128);
    }

    #[tokio::test]
    async fn extract_email_fields_handles_well_formed_text() {
        let server = server().await;
        let result = server
            .extract_email_fields(ExtractEmailFieldsParams {
                text: "To: a@b.com\nSubject: Hi\nMessage: test".into(),
                resolve_recipient: true,
            })
            .await
            .expect("tool call");

        let payload = json(&result);
        assert_eq!(payload["to"], "a@b.com");
        assert_eq!(payload["subject"], "Hi");
        assert_eq!(payload["body"], "test");
        assert_eq!(payload["missing"], Value::Array(Vec::new()));
        assert_eq!(payload["resolved_from_directory"], false);
    }

    #[tokio::test]
    async fn extract_email_fields_resolves_named_recipient() {
        let server = server().await;
        let text = "To: Ashu\nSubject: Leave balance\nMessage: You have 18 days.";

        let resolved = server.extract(text, true).await.expect("extract");
        assert_eq!(resolved.email.to.as_deref(), Some("ashu.kumar@oracle.com"));
        assert!(resolved.resolved_from_directory);
        assert!(resolved.email.is_complete());

        let unresolved = server.extract(text, false).await.expect("extract");
        assert_eq!(unresolved.email.to, None);
        assert_eq!(unresolved.email.recipient_name.as_deref(), Some("Ashu"));
        assert!(!unresolved.resolved_from_directory);
    }

    #[tokio::test]
    async fn extract_email_fields_rejects_empty_text() {
        let server = server().await;
        let result = server
            .extract_email_fields(ExtractEmailFieldsParams {
                text: "   ".into(),
                resolve_recipient: true,
            })
            .await
            .expect("tool call");

        assert_eq!(result.is_error, Some(true));
        assert!(text(&result).contains("input text is empty"));
    }

    #[tokio::test]
    async fn index_then_search_returns_verbatim_snippet() {
        let server = server().await;
        let indexed = server
            .index_document(IndexDocumentParams {
                source: SampleDirectory::POLICY_SOURCE.into(),
                text: SampleDirectory::POLICY_TEXT.into(),
            })
            .await
            .expect("tool call");
        assert_eq!(json(&indexed)["source"], "hr_policy.txt");

        let phrase = "Expense claims must be submitted within 30 days";
        let found = server
            .search_documents(SearchDocumentsParams { query: phrase.into(), k: Some(2) })
            .await
            .expect("tool call");

        let payload = json(&found);
        let hits = payload["hits"].as_array().expect("hits array");
        assert!(!hits.is_empty() && hits.len() <= 2);
        let top = hits[0]["text"].as_str().expect("hit text");
        assert!(top.split_whitespace().collect::<Vec<_>>().join(" ").contains(phrase));
    }

    #[tokio::test]
    async fn server_info_advertises_tools() {
        let info = server().await.get_info();
        assert_eq!(info.server_info.name, "draftdesk-mcp");
        assert!(info.capabilities.tools.is_some());
        let instructions = info.instructions.unwrap_or_default();
        assert!(instructions.contains("documents: index_document, search_documents"));
    }

    #[test]
    fn registered_tools_match_the_catalog() {
        let mut registered = DraftdeskMcpServer::tool_box()
            .list()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect::<Vec<_>>();
        registered.sort_unstable();

        let mut cataloged =
            ALL_TOOL_NAMES.iter().map(|name| name.to_string()).collect::<Vec<_>>();
        cataloged.sort_unstable();

        assert_eq!(registered, cataloged);
    }
}
