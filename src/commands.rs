use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use crate::config::Config;
use crate::corpus::{FetchRequest, FetchResolver, SearchEngine, SearchRequest};
use crate::mcp::{McpServer, register_corpus_tools};

/// Load the configuration file and apply command-line overrides
#[inline]
pub fn load_config(config_path: &Path, corpus_override: Option<PathBuf>) -> Result<Config> {
    let mut config = Config::load(config_path).context("Failed to load configuration")?;

    if let Some(path) = corpus_override {
        config.corpus.path = path;
        config
            .validate()
            .context("Configuration validation failed")?;
    }

    Ok(config)
}

/// Write a default configuration file, refusing to replace an existing one
/// unless `force` is set
#[inline]
pub fn init_config(
    config_path: &Path,
    corpus_override: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file {} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    let mut config = Config::default();
    if let Some(path) = corpus_override {
        config.corpus.path = path;
    }
    config.save(config_path)?;

    info!("Wrote configuration to {}", config_path.display());
    Ok(())
}

/// Create an MCP server with the `search` and `fetch` tools registered
#[inline]
pub async fn build_server(config: &Config) -> Result<Arc<McpServer>> {
    let server = McpServer::new(
        config.server.name.clone(),
        env!("CARGO_PKG_VERSION").to_string(),
    )
    .context("Failed to create MCP server")?
    .with_instructions(config.server.instructions.clone());

    let loader = Arc::new(config.corpus_loader());
    register_corpus_tools(&server, loader)
        .await
        .context("Failed to register corpus tools")?;

    Ok(Arc::new(server))
}

/// Run the MCP server on stdio until the client disconnects or Ctrl+C
#[inline]
pub async fn serve_mcp(config: &Config) -> Result<()> {
    info!(
        "Serving corpus {} (cache: {})",
        config.corpus.path.display(),
        config.corpus.cache
    );

    if !config.corpus.path.exists() {
        // Each tool call re-reads the file, so a missing corpus is not fatal here
        error!(
            "Corpus file {} does not exist; tool calls will fail until it is created",
            config.corpus.path.display()
        );
    }

    let server = build_server(config).await?;
    info!(
        "MCP server initialized with tools: {}",
        server.registered_tools().await.join(", ")
    );

    tokio::select! {
        result = Arc::clone(&server).serve_stdio() => {
            result.context("MCP server failed")?;
            info!("MCP server stopped normally");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt signal, shutting down");
        }
    }

    Ok(())
}

/// Run one search and print the page as JSON
#[inline]
pub async fn run_search(
    config: &Config,
    query: String,
    limit: Option<i64>,
    cursor: Option<&str>,
) -> Result<()> {
    let request = SearchRequest::new(query, limit, cursor)?;
    let engine = SearchEngine::new(Arc::new(config.corpus_loader()));

    let page = engine.search(&request).await?;
    print_json(&page)
}

/// Fetch one document and print it as JSON
#[inline]
pub async fn run_fetch(config: &Config, id: String) -> Result<()> {
    let request = FetchRequest::new(id)?;
    let resolver = FetchResolver::new(Arc::new(config.corpus_loader()));

    let result = resolver.fetch(&request).await?;
    print_json(&result)
}

fn print_json<T: Serialize>(payload: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(payload).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
