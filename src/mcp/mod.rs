//! MCP (Model Context Protocol) Server Implementation
//!
//! This module provides an MCP server following the JSON-RPC 2.0
//! specification and MCP protocol version 2025-06-18, exposing the corpus
//! through the `search` and `fetch` tools.


pub mod errors;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod validation;

pub use errors::{ErrorHandler, McpError, McpResult};
pub use protocol::{
    CallToolParams, CallToolResult, Implementation, ListToolsResult, MCP_VERSION, Tool,
    ToolContent,
};
pub use server::{ConnectionState, McpServer, MessageHandler, ToolHandler};
pub use tools::{FetchHandler, SearchHandler, register_corpus_tools};
pub use validation::McpValidator;
