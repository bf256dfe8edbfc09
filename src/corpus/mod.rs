//! Document corpus
//!
//! The corpus is a single JSON array of documents on disk. It is read and
//! parsed on every call unless the mtime-guarded cache is enabled.


pub mod fetch;
pub mod search;

pub use fetch::{
    FetchArgs, FetchMetadata, FetchRequest, FetchResolver, FetchResult, SOURCE_TYPE,
};
pub use search::{
    Cursor, DEFAULT_LIMIT, MAX_LIMIT, SearchArgs, SearchEngine, SearchPage, SearchRequest,
    SearchResult,
};

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

/// Corpus location relative to the working directory
pub const DEFAULT_CORPUS_PATH: &str = "data/corpus.json";

/// One searchable unit of content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Document {
    /// Check the field constraints a corpus entry must satisfy
    #[inline]
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("id must not be empty".to_string());
        }
        if self.title.trim().is_empty() {
            return Err(format!("document '{}' has an empty title", self.id));
        }
        if let Some(url) = &self.url {
            Url::parse(url)
                .map_err(|e| format!("document '{}' has invalid url '{}': {}", self.id, url, e))?;
        }
        Ok(())
    }
}

/// Parse and validate the raw corpus text
#[inline]
pub fn parse_corpus(raw: &str) -> std::result::Result<Vec<Document>, String> {
    let documents: Vec<Document> = serde_json::from_str(raw).map_err(|e| e.to_string())?;

    for (index, document) in documents.iter().enumerate() {
        document
            .validate()
            .map_err(|e| format!("entry {}: {}", index, e))?;
    }

    Ok(documents)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

#[derive(Debug)]
struct CachedCorpus {
    stamp: FileStamp,
    documents: Arc<[Document]>,
}

/// Reads the corpus file, optionally through an mtime-guarded cache
#[derive(Debug)]
pub struct CorpusLoader {
    path: PathBuf,
    cache: Option<RwLock<Option<CachedCorpus>>>,
}

impl CorpusLoader {
    /// Create a loader that re-reads the file on every call
    #[inline]
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cache: None,
        }
    }

    /// Create a loader that reuses the parsed corpus while the file's
    /// modification time and length are unchanged
    #[inline]
    pub fn cached<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cache: Some(RwLock::new(None)),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Load every document in the corpus
    #[inline]
    pub async fn load(&self) -> Result<Arc<[Document]>> {
        let Some(cache) = &self.cache else {
            return self.read().await.map(Arc::from);
        };

        let stamp = self.stamp().await?;

        if let Some(stamp) = stamp {
            let guard = cache.read().await;
            if let Some(cached) = guard.as_ref() {
                if cached.stamp == stamp {
                    debug!("Corpus cache hit for {}", self.path.display());
                    return Ok(Arc::clone(&cached.documents));
                }
            }
        }

        let documents: Arc<[Document]> = Arc::from(self.read().await?);

        // Without a modification time there is nothing to invalidate against
        if let Some(stamp) = stamp {
            let mut guard = cache.write().await;
            *guard = Some(CachedCorpus {
                stamp,
                documents: Arc::clone(&documents),
            });
        }

        Ok(documents)
    }

    async fn stamp(&self) -> Result<Option<FileStamp>> {
        let metadata = tokio::fs::metadata(&self.path)
            .await
            .map_err(|source| self.io_error(source))?;

        Ok(metadata.modified().ok().map(|modified| FileStamp {
            modified,
            len: metadata.len(),
        }))
    }

    async fn read(&self) -> Result<Vec<Document>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| self.io_error(source))?;

        let documents = parse_corpus(&raw).map_err(|message| Error::Format {
            path: self.path.clone(),
            message,
        })?;

        debug!(
            "Loaded {} documents from {}",
            documents.len(),
            self.path.display()
        );
        Ok(documents)
    }

    fn io_error(&self, source: std::io::Error) -> Error {
        Error::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl Default for CorpusLoader {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_CORPUS_PATH)
    }
}
