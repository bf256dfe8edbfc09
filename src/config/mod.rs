// Configuration management module
// Settings are read from an optional TOML file in the working directory

pub mod settings;

#[cfg(test)]
mod tests;

pub use settings::{Config, ConfigError, CorpusConfig, DEFAULT_SERVER_NAME, ServerConfig};

/// Configuration file looked up when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "search-fetch-mcp.toml";
