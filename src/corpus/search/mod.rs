//! Keyword search over the corpus
//!
//! Documents match when the lowercased query is a substring of the lowercased
//! `title + "\n" + content`. A match scores 10, plus 5 when the title alone
//! contains the query. Ranking is a stable sort on score, so documents with
//! equal scores keep their corpus order.

#[cfg(test)]
mod tests;

use super::{CorpusLoader, Document};
use crate::{Error, Result};
use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};
use tracing::debug;

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 50;

pub const MATCH_SCORE: u32 = 10;
pub const TITLE_BONUS: u32 = 5;

const SNIPPET_CHARS_BEFORE: usize = 40;
const SNIPPET_CHARS_AFTER: usize = 80;

static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Raw search arguments as supplied by a client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchArgs {
    pub query: String,
    /// Any JSON number; whole floats such as `5.0` are accepted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Opaque pagination token naming the offset of the next page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    offset: usize,
}

impl Cursor {
    const PREFIX: &'static str = "offset:";

    #[inline]
    pub fn new(offset: usize) -> Self {
        Self { offset }
    }

    #[inline]
    pub fn offset(self) -> usize {
        self.offset
    }
}

impl fmt::Display for Cursor {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.offset)
    }
}

impl FromStr for Cursor {
    type Err = Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        s.strip_prefix(Self::PREFIX)
            .and_then(|offset| offset.parse::<usize>().ok())
            .map(Self::new)
            .ok_or_else(|| Error::Validation(format!("invalid cursor '{}'", s)))
    }
}

/// A validated search request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "SearchArgs")]
pub struct SearchRequest {
    query: String,
    limit: usize,
    cursor: Cursor,
}

impl SearchRequest {
    /// Build a request, rejecting blank queries and limits outside 1..=50
    #[inline]
    pub fn new(query: impl Into<String>, limit: Option<i64>, cursor: Option<&str>) -> Result<Self> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(Error::Validation("query must not be empty".to_string()));
        }

        let limit = match limit {
            None => DEFAULT_LIMIT,
            Some(limit) => usize::try_from(limit)
                .ok()
                .filter(|limit| (1..=MAX_LIMIT).contains(limit))
                .ok_or_else(|| {
                    Error::Validation(format!(
                        "limit must be between 1 and {}, got {}",
                        MAX_LIMIT, limit
                    ))
                })?,
        };

        let cursor = cursor.map(str::parse::<Cursor>).transpose()?.unwrap_or_default();

        Ok(Self {
            query,
            limit,
            cursor,
        })
    }

    #[inline]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    #[inline]
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }
}

impl TryFrom<SearchArgs> for SearchRequest {
    type Error = Error;

    #[inline]
    fn try_from(args: SearchArgs) -> Result<Self> {
        let limit = args.limit.as_ref().map(whole_number).transpose()?;
        Self::new(args.query, limit, args.cursor.as_deref())
    }
}

/// Read a JSON number as an integer, accepting floats with no fractional part
fn whole_number(number: &Number) -> Result<i64> {
    number
        .as_i64()
        .or_else(|| {
            number
                .as_f64()
                .filter(|value| value.fract() == 0.0)
                .map(|value| value as i64)
        })
        .ok_or_else(|| Error::Validation(format!("limit must be a whole number, got {}", number)))
}

/// One entry of a search response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One page of ranked results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPage {
    pub results: Vec<SearchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// A document that matched a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<'a> {
    pub document: &'a Document,
    pub score: u32,
    pub snippet: Option<String>,
}

impl From<&Match<'_>> for SearchResult {
    #[inline]
    fn from(hit: &Match<'_>) -> Self {
        Self {
            id: hit.document.id.clone(),
            title: hit.document.title.clone(),
            snippet: hit.snippet.clone(),
            url: hit.document.url.clone(),
        }
    }
}

/// Score every document against `query` and return the matches, best first
#[inline]
pub fn rank<'a>(documents: &'a [Document], query: &str) -> Vec<Match<'a>> {
    let needle = fold_case(query);

    let mut matches: Vec<Match<'a>> = documents
        .iter()
        .filter_map(|document| match_document(document, &needle))
        .collect();

    // `sort_by` is stable
    matches.sort_by(|a, b| b.score.cmp(&a.score));
    matches
}

fn match_document<'a>(document: &'a Document, needle: &[char]) -> Option<Match<'a>> {
    let haystack = Haystack::new(document);
    let position = find(&haystack.folded, needle)?;

    let mut score = MATCH_SCORE;
    if find(&fold_case(&document.title), needle).is_some() {
        score += TITLE_BONUS;
    }

    Some(Match {
        document,
        score,
        snippet: haystack.snippet(position),
    })
}

/// `title + "\n" + content` with a lowercased copy that remembers which
/// original character each folded character came from
struct Haystack {
    original: Vec<char>,
    folded: Vec<char>,
    origin: Vec<usize>,
}

impl Haystack {
    fn new(document: &Document) -> Self {
        let original: Vec<char> = document
            .title
            .chars()
            .chain(std::iter::once('\n'))
            .chain(document.content.chars())
            .collect();

        let mut folded = Vec::with_capacity(original.len());
        let mut origin = Vec::with_capacity(original.len());
        for (index, ch) in original.iter().enumerate() {
            for lower in ch.to_lowercase() {
                folded.push(lower);
                origin.push(index);
            }
        }

        Self {
            original,
            folded,
            origin,
        }
    }

    /// Excerpt around a match at folded index `position`, whitespace collapsed
    fn snippet(&self, position: usize) -> Option<String> {
        let start = position.saturating_sub(SNIPPET_CHARS_BEFORE);
        let end = position
            .saturating_add(SNIPPET_CHARS_AFTER)
            .min(self.folded.len());

        let from = self.origin.get(start).copied()?;
        let to = self
            .origin
            .get(end)
            .copied()
            .unwrap_or(self.original.len());

        let excerpt: String = self.original.get(from..to)?.iter().collect();
        let snippet = WHITESPACE_REGEX.replace_all(&excerpt, " ").trim().to_string();

        (!snippet.is_empty()).then_some(snippet)
    }
}

fn fold_case(text: &str) -> Vec<char> {
    text.chars().flat_map(char::to_lowercase).collect()
}

fn find(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Runs ranked searches against a freshly loaded corpus
#[derive(Debug, Clone)]
pub struct SearchEngine {
    loader: Arc<CorpusLoader>,
}

impl SearchEngine {
    #[inline]
    pub fn new(loader: Arc<CorpusLoader>) -> Self {
        Self { loader }
    }

    /// Return the page of ranked results selected by the request's cursor
    #[inline]
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchPage> {
        let documents = self.loader.load().await?;
        let ranked = rank(&documents, request.query());

        let offset = request.cursor().offset();
        if offset > ranked.len() {
            return Err(Error::Validation(format!(
                "cursor '{}' is past the end of {} results",
                request.cursor(),
                ranked.len()
            )));
        }

        let end = offset.saturating_add(request.limit()).min(ranked.len());
        let results: Vec<SearchResult> = ranked
            .iter()
            .skip(offset)
            .take(request.limit())
            .map(SearchResult::from)
            .collect();
        let next_cursor = (end < ranked.len()).then(|| Cursor::new(end).to_string());

        debug!(
            "Search '{}' (limit={}, offset={}) matched {} of {} documents",
            request.query(),
            request.limit(),
            offset,
            ranked.len(),
            documents.len()
        );

        Ok(SearchPage {
            results,
            next_cursor,
        })
    }
}
