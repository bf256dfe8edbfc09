//! MCP Tools Implementation
//!
//! This module provides the `search` and `fetch` tool definitions and the
//! handlers that run them against the corpus.

use crate::corpus::{
    CorpusLoader, DEFAULT_LIMIT, FetchArgs, FetchRequest, FetchResolver, FetchResult, MAX_LIMIT,
    SOURCE_TYPE, SearchArgs, SearchEngine, SearchPage, SearchRequest,
};
use crate::mcp::protocol::*;
use crate::mcp::server::{McpServer, ToolHandler};
use crate::{Error, Result as CorpusResult};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

/// Keyword search tool handler
pub struct SearchHandler {
    engine: SearchEngine,
}

/// Fetch-by-id tool handler
pub struct FetchHandler {
    resolver: FetchResolver,
}

/// Register `search` and `fetch` on `server`, both reading from `loader`
#[inline]
pub async fn register_corpus_tools(server: &McpServer, loader: Arc<CorpusLoader>) -> Result<()> {
    server
        .register_tool(
            SearchHandler::tool_definition(),
            SearchHandler::new(Arc::clone(&loader)),
        )
        .await?;
    server
        .register_tool(FetchHandler::tool_definition(), FetchHandler::new(loader))
        .await?;
    Ok(())
}

impl SearchHandler {
    /// Create a new search handler
    #[inline]
    pub fn new(loader: Arc<CorpusLoader>) -> Self {
        Self {
            engine: SearchEngine::new(loader),
        }
    }

    /// Create the search tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "search".to_string(),
            title: Some("Keyword search".to_string()),
            description: Some(
                "Find items by keyword and return IDs to pass to `fetch`.".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "minLength": 1,
                        "description": "Keywords to match against titles and content"
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": MAX_LIMIT,
                        "default": DEFAULT_LIMIT,
                        "description": "Maximum number of results (default: 10)"
                    },
                    "cursor": {
                        "type": "string",
                        "description": "Opaque cursor from a previous next_cursor"
                    }
                },
                "required": ["query"]
            }),
            output_schema: Some(json!({
                "type": "object",
                "properties": {
                    "results": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "id": {"type": "string"},
                                "title": {"type": "string"},
                                "snippet": {"type": "string"},
                                "url": {"type": "string", "format": "uri"}
                            },
                            "required": ["id", "title"]
                        }
                    },
                    "next_cursor": {"type": "string"}
                },
                "required": ["results"]
            })),
        }
    }

    async fn run(&self, params: &CallToolParams) -> CorpusResult<SearchPage> {
        let args: SearchArgs = parse_arguments(params)?;
        let request = SearchRequest::try_from(args)?;
        debug!(
            "Searching corpus: query='{}', limit={}, offset={}",
            request.query(),
            request.limit(),
            request.cursor().offset()
        );
        self.engine.search(&request).await
    }
}

#[async_trait]
impl ToolHandler for SearchHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let outcome = self.run(&params).await;
        respond("search", outcome)
    }
}

impl FetchHandler {
    /// Create a new fetch handler
    #[inline]
    pub fn new(loader: Arc<CorpusLoader>) -> Self {
        Self {
            resolver: FetchResolver::new(loader),
        }
    }

    /// Create the fetch tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "fetch".to_string(),
            title: Some("Fetch by ID".to_string()),
            description: Some("Return full content for a prior search result.".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "string",
                        "minLength": 1,
                        "description": "Document ID returned by search"
                    }
                },
                "required": ["id"]
            }),
            output_schema: Some(json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string"},
                    "title": {"type": "string"},
                    "content": {"type": "string"},
                    "url": {"type": "string", "format": "uri"},
                    "metadata": {
                        "type": "object",
                        "properties": {
                            "source_type": {"type": "string", "const": SOURCE_TYPE},
                            "length": {"type": "integer", "minimum": 0}
                        },
                        "required": ["source_type", "length"]
                    }
                },
                "required": ["id", "content", "metadata"]
            })),
        }
    }

    async fn run(&self, params: &CallToolParams) -> CorpusResult<FetchResult> {
        let args: FetchArgs = parse_arguments(params)?;
        let request = FetchRequest::try_from(args)?;
        debug!("Fetching document: id='{}'", request.id());
        self.resolver.fetch(&request).await
    }
}

#[async_trait]
impl ToolHandler for FetchHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let outcome = self.run(&params).await;
        respond("fetch", outcome)
    }
}

fn parse_arguments<T: DeserializeOwned>(params: &CallToolParams) -> CorpusResult<T> {
    serde_json::from_value(params.arguments_value())
        .map_err(|e| Error::Validation(format!("invalid arguments: {}", e)))
}

/// Turn a corpus outcome into a tool result; corpus failures are reported to
/// the caller in-band rather than as JSON-RPC errors
fn respond<T: Serialize>(tool: &str, outcome: CorpusResult<T>) -> Result<CallToolResult> {
    match outcome {
        Ok(payload) => Ok(CallToolResult::structured(&payload)?),
        Err(e) => {
            warn!("Tool '{}' failed: {}", tool, e);
            Ok(CallToolResult::error(e.to_string()))
        }
    }
}
