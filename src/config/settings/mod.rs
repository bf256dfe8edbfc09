
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::corpus::{CorpusLoader, DEFAULT_CORPUS_PATH};

/// Server name reported in `serverInfo` unless configured otherwise
pub const DEFAULT_SERVER_NAME: &str = "search-fetch-mcp";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl Default for ServerConfig {
    #[inline]
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVER_NAME.to_string(),
            instructions: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CorpusConfig {
    pub path: PathBuf,
    /// Reuse the parsed corpus while the file's mtime and length are unchanged
    pub cache: bool,
}

impl Default for CorpusConfig {
    #[inline]
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CORPUS_PATH),
            cache: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid server name: {0:?} (cannot be empty)")]
    InvalidServerName(String),
    #[error("Invalid corpus path (cannot be empty)")]
    EmptyCorpusPath,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from `config_path`, falling back to defaults when
    /// the file does not exist
    #[inline]
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save<P: AsRef<Path>>(&self, config_path: P) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_path = config_path.as_ref();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.name.trim().is_empty() {
            return Err(ConfigError::InvalidServerName(self.server.name.clone()));
        }

        if self.corpus.path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyCorpusPath);
        }

        Ok(())
    }

    /// Build the corpus loader described by the `[corpus]` table
    #[inline]
    pub fn corpus_loader(&self) -> CorpusLoader {
        if self.corpus.cache {
            CorpusLoader::cached(&self.corpus.path)
        } else {
            CorpusLoader::new(&self.corpus.path)
        }
    }
}
