use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use search_fetch_mcp::commands::{init_config, load_config, run_fetch, run_search, serve_mcp};
use search_fetch_mcp::config::DEFAULT_CONFIG_FILE;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "search-fetch-mcp")]
#[command(about = "Keyword search and fetch over a local JSON corpus, served over MCP")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Corpus file to serve, overriding the configuration
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,
    /// Use the stdio transport
    #[arg(long, global = true)]
    stdio: bool,
    /// Transport to serve on
    #[arg(long, global = true, value_enum, default_value_t = Transport::Stdio)]
    transport: Transport,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio (default). Stdio is the only transport.
    Serve,
    /// Search the corpus and print the results as JSON
    Search {
        /// Keywords to look for
        query: String,
        /// Maximum number of results (1-50)
        #[arg(long)]
        limit: Option<i64>,
        /// Cursor from a previous page's next_cursor
        #[arg(long)]
        cursor: Option<String>,
    },
    /// Fetch one document by ID and print it as JSON
    Fetch {
        /// Document ID returned by search
        id: String,
    },
    /// Write a default configuration file to the --config path
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    Stdio,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries protocol messages, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        None | Some(Commands::Serve) => {
            debug!(
                "Serve requested with --stdio={} --transport={:?}",
                cli.stdio, cli.transport
            );
            let config = load_config(&cli.config, cli.corpus)?;
            serve_mcp(&config).await?;
        }
        Some(Commands::Search {
            query,
            limit,
            cursor,
        }) => {
            let config = load_config(&cli.config, cli.corpus)?;
            run_search(&config, query, limit, cursor.as_deref()).await?;
        }
        Some(Commands::Fetch { id }) => {
            let config = load_config(&cli.config, cli.corpus)?;
            run_fetch(&config, id).await?;
        }
        Some(Commands::Init { force }) => {
            init_config(&cli.config, cli.corpus, force)?;
        }
    }

    Ok(())
}
