use super::{CorpusLoader, Document};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// `metadata.source_type` reported for every fetched document
pub const SOURCE_TYPE: &str = "demo";

/// A validated fetch request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FetchArgs")]
pub struct FetchRequest {
    id: String,
}

/// Raw fetch arguments as supplied by a client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchArgs {
    pub id: String,
}

impl TryFrom<FetchArgs> for FetchRequest {
    type Error = Error;

    #[inline]
    fn try_from(args: FetchArgs) -> Result<Self> {
        Self::new(args.id)
    }
}

impl FetchRequest {
    #[inline]
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::Validation("id must not be empty".to_string()));
        }
        Ok(Self { id })
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchMetadata {
    pub source_type: String,
    /// Number of characters in `content`
    pub length: usize,
}

/// Full document content returned by `fetch`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub metadata: FetchMetadata,
}

impl From<&Document> for FetchResult {
    #[inline]
    fn from(document: &Document) -> Self {
        Self {
            id: document.id.clone(),
            title: Some(document.title.clone()),
            content: document.content.clone(),
            url: document.url.clone(),
            metadata: FetchMetadata {
                source_type: SOURCE_TYPE.to_string(),
                length: document.content.chars().count(),
            },
        }
    }
}

/// Find a document by exact id
#[inline]
pub fn resolve(documents: &[Document], id: &str) -> Result<FetchResult> {
    documents
        .iter()
        .find(|document| document.id == id)
        .map(FetchResult::from)
        .ok_or_else(|| Error::NotFound { id: id.to_string() })
}

/// Resolves ids against a freshly loaded corpus
#[derive(Debug, Clone)]
pub struct FetchResolver {
    loader: Arc<CorpusLoader>,
}

impl FetchResolver {
    #[inline]
    pub fn new(loader: Arc<CorpusLoader>) -> Self {
        Self { loader }
    }

    #[inline]
    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult> {
        let documents = self.loader.load().await?;
        debug!("Fetching '{}' from {} documents", request.id(), documents.len());
        resolve(&documents, request.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn documents() -> Vec<Document> {
        vec![
            Document {
                id: "a".to_string(),
                title: "Cats".to_string(),
                content: "Cats are great pets.".to_string(),
                url: Some("https://example.com/cats".to_string()),
            },
            Document {
                id: "b".to_string(),
                title: "Crème brûlée".to_string(),
                content: "Crème brûlée - caramelised".to_string(),
                url: None,
            },
        ]
    }

    #[test]
    fn resolve_existing_document() {
        let result = resolve(&documents(), "a").expect("document exists");

        assert_eq!(result.id, "a");
        assert_eq!(result.title.as_deref(), Some("Cats"));
        assert_eq!(result.content, "Cats are great pets.");
        assert_eq!(result.url.as_deref(), Some("https://example.com/cats"));
        assert_eq!(result.metadata.source_type, SOURCE_TYPE);
        assert_eq!(result.metadata.length, result.content.chars().count());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let result = resolve(&documents(), "b").expect("document exists");

        assert_eq!(result.metadata.length, 26);
        assert!(result.content.len() > result.metadata.length);
    }

    #[test]
    fn missing_id_is_not_found() {
        let error = resolve(&documents(), "nonexistent-id").expect_err("should not resolve");

        assert!(matches!(error, Error::NotFound { ref id } if id == "nonexistent-id"));
        assert_eq!(error.to_string(), "No item with id 'nonexistent-id'");
    }

    #[test]
    fn ids_match_exactly() {
        assert!(resolve(&documents(), "A").is_err());
        assert!(resolve(&documents(), " a").is_err());
    }

    #[test]
    fn request_validation() {
        assert!(matches!(FetchRequest::new(""), Err(Error::Validation(_))));
        assert!(matches!(FetchRequest::new("  "), Err(Error::Validation(_))));
        assert_eq!(FetchRequest::new("a").expect("valid id").id(), "a");

        let parsed: std::result::Result<FetchRequest, _> =
            serde_json::from_value(serde_json::json!({ "id": "" }));
        assert!(parsed.is_err());
    }

    #[test]
    fn serialized_shape() {
        let result = resolve(&documents(), "b").expect("document exists");
        let json = serde_json::to_value(&result).expect("serializes");

        assert_eq!(json["metadata"]["source_type"], "demo");
        assert_eq!(json["metadata"]["length"], 26);
        assert!(json.get("url").is_none());
    }
}
