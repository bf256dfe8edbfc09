use super::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn doc(id: &str, title: &str, content: &str) -> Document {
    Document {
        id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        url: None,
    }
}

fn corpus_file(documents: &[Document]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("should create temp file");
    let json = serde_json::to_string(documents).expect("documents serialize");
    file.write_all(json.as_bytes())
        .expect("should write corpus file");
    file
}

fn engine_for(file: &NamedTempFile) -> SearchEngine {
    SearchEngine::new(Arc::new(CorpusLoader::new(file.path())))
}

#[test]
fn cats_scenario() {
    let documents = vec![doc("a", "Cats", "Cats are great pets.")];
    let matches = rank(&documents, "cats");

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].document.id, "a");
    assert_eq!(matches[0].score, MATCH_SCORE + TITLE_BONUS);

    let snippet = matches[0].snippet.as_deref().expect("has snippet");
    assert!(snippet.contains("Cats are great pets."));
    assert_eq!(snippet, "Cats Cats are great pets.");
}

#[test]
fn title_match_outranks_body_match() {
    let documents = vec![
        doc("body", "Pets", "Rust is great for systems programming"),
        doc("title", "Rust book", "A guide"),
    ];
    let matches = rank(&documents, "rust");

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].document.id, "title");
    assert_eq!(matches[0].score, 15);
    assert_eq!(matches[1].document.id, "body");
    assert_eq!(matches[1].score, 10);
}

#[test]
fn non_matching_documents_are_excluded() {
    let documents = vec![
        doc("a", "Dogs", "Dogs bark"),
        doc("b", "Birds", "Birds sing about dogs"),
        doc("c", "Fish", "Fish swim"),
    ];
    let ids: Vec<&str> = rank(&documents, "DOGS")
        .iter()
        .map(|m| m.document.id.as_str())
        .collect();

    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn equal_scores_keep_corpus_order() {
    let documents = vec![
        doc("first", "One", "apple pie"),
        doc("second", "Two", "apple tart"),
        doc("third", "Apple", "crumble"),
        doc("fourth", "Four", "apple juice"),
    ];
    let ids: Vec<&str> = rank(&documents, "apple")
        .iter()
        .map(|m| m.document.id.as_str())
        .collect();

    assert_eq!(ids, vec!["third", "first", "second", "fourth"]);
}

#[test]
fn query_spanning_title_and_content_matches() {
    // The haystack joins title and content with a newline
    let documents = vec![doc("a", "Hello", "world")];
    let matches = rank(&documents, "hello\nworld");

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].score, MATCH_SCORE);
}

#[test]
fn snippet_window_is_clamped_and_collapsed() {
    let prefix = "x".repeat(100);
    let suffix = "y".repeat(200);
    let content = format!("{}  needle\t\n here {}", prefix, suffix);
    let documents = vec![doc("a", "T", &content)];

    let matches = rank(&documents, "needle");
    let snippet = matches[0].snippet.as_deref().expect("has snippet");

    assert!(snippet.starts_with("xxxx"));
    assert!(snippet.contains("needle here"));
    assert!(!snippet.contains("  "));
    // 40 chars before plus 80 after, minus collapsed whitespace
    assert!(snippet.chars().count() <= SNIPPET_CHARS_BEFORE + SNIPPET_CHARS_AFTER);
    assert!(!snippet.contains('T'));
}

#[test]
fn snippet_keeps_original_casing() {
    let documents = vec![doc("a", "Guide", "Learn about TOKIO runtimes")];
    let matches = rank(&documents, "tokio");

    let snippet = matches[0].snippet.as_deref().expect("has snippet");
    assert!(snippet.contains("TOKIO"));
}

#[test]
fn multibyte_text_is_matched_by_character() {
    let documents = vec![doc("a", "Ünïcode", "Straße und ÜBER")];

    assert_eq!(rank(&documents, "über").len(), 1);
    assert_eq!(rank(&documents, "ünï")[0].score, 15);

    let snippet = rank(&documents, "straße")[0]
        .snippet
        .clone()
        .expect("has snippet");
    assert_eq!(snippet, "Ünïcode Straße und ÜBER");
}

#[test]
fn request_validation() {
    assert!(matches!(
        SearchRequest::new("", None, None),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        SearchRequest::new("   \t", None, None),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        SearchRequest::new("cats", Some(0), None),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        SearchRequest::new("cats", Some(51), None),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        SearchRequest::new("cats", Some(-3), None),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        SearchRequest::new("cats", None, Some("bogus")),
        Err(Error::Validation(_))
    ));

    let request = SearchRequest::new("cats", None, None).expect("valid request");
    assert_eq!(request.limit(), DEFAULT_LIMIT);
    assert_eq!(request.cursor().offset(), 0);

    let request = SearchRequest::new("cats", Some(50), Some("offset:7")).expect("valid request");
    assert_eq!(request.limit(), 50);
    assert_eq!(request.cursor().offset(), 7);
}

#[test]
fn cursor_format() {
    let cursor = Cursor::new(20);
    assert_eq!(cursor.to_string(), "offset:20");
    assert_eq!("offset:20".parse::<Cursor>().expect("valid cursor"), cursor);

    assert!("20".parse::<Cursor>().is_err());
    assert!("offset:".parse::<Cursor>().is_err());
    assert!("offset:-1".parse::<Cursor>().is_err());
}

#[test]
fn whole_float_limit_is_accepted() {
    let request: SearchRequest =
        serde_json::from_value(serde_json::json!({"query": "cats", "limit": 5.0}))
            .expect("5.0 is a whole number");
    assert_eq!(request.limit(), 5);

    let args: SearchArgs =
        serde_json::from_value(serde_json::json!({"query": "cats", "limit": 5.5}))
            .expect("any number deserializes");
    assert!(matches!(
        SearchRequest::try_from(args),
        Err(Error::Validation(message)) if message.contains("whole number")
    ));

    let args: SearchArgs =
        serde_json::from_value(serde_json::json!({"query": "cats", "limit": 51.0}))
            .expect("any number deserializes");
    assert!(matches!(
        SearchRequest::try_from(args),
        Err(Error::Validation(message)) if message.contains("between 1 and 50")
    ));
}

#[tokio::test]
async fn limit_truncates_to_best_result() {
    let file = corpus_file(&[
        doc("body", "Pets", "I love cats"),
        doc("title", "Cats", "Felines"),
    ]);
    let engine = engine_for(&file);

    let request = SearchRequest::new("cats", Some(1), None).expect("valid request");
    let page = engine.search(&request).await.expect("search succeeds");

    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].id, "title");
    assert_eq!(page.next_cursor.as_deref(), Some("offset:1"));
}

#[tokio::test]
async fn limit_with_tied_scores_returns_first() {
    let file = corpus_file(&[doc("a", "One", "cats"), doc("b", "Two", "cats")]);
    let engine = engine_for(&file);

    let request = SearchRequest::new("cats", Some(1), None).expect("valid request");
    let page = engine.search(&request).await.expect("search succeeds");

    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].id, "a");
}

#[tokio::test]
async fn default_limit_is_ten() {
    let documents: Vec<Document> = (0..15)
        .map(|i| doc(&format!("d{}", i), "Doc", "shared term"))
        .collect();
    let file = corpus_file(&documents);
    let engine = engine_for(&file);

    let request = SearchRequest::new("shared", None, None).expect("valid request");
    let page = engine.search(&request).await.expect("search succeeds");

    assert_eq!(page.results.len(), DEFAULT_LIMIT);
    assert_eq!(page.next_cursor.as_deref(), Some("offset:10"));
}

#[tokio::test]
async fn cursor_pages_visit_every_result_once() {
    let documents: Vec<Document> = (0..7)
        .map(|i| doc(&format!("d{}", i), "Doc", "paged content"))
        .collect();
    let file = corpus_file(&documents);
    let engine = engine_for(&file);

    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let request =
            SearchRequest::new("paged", Some(3), cursor.as_deref()).expect("valid request");
        let page = engine.search(&request).await.expect("search succeeds");
        assert!(page.results.len() <= 3);
        seen.extend(page.results.into_iter().map(|r| r.id));

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    let expected: Vec<String> = (0..7).map(|i| format!("d{}", i)).collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn cursor_past_end_is_rejected() {
    let file = corpus_file(&[doc("a", "Cats", "cats")]);
    let engine = engine_for(&file);

    let at_end = SearchRequest::new("cats", None, Some("offset:1")).expect("valid request");
    let page = engine.search(&at_end).await.expect("search succeeds");
    assert!(page.results.is_empty());
    assert!(page.next_cursor.is_none());

    let past_end = SearchRequest::new("cats", None, Some("offset:5")).expect("valid request");
    assert!(matches!(
        engine.search(&past_end).await,
        Err(Error::Validation(_))
    ));
}

#[tokio::test]
async fn results_omit_content() {
    let mut with_url = doc("a", "Cats", "Cats are great pets.");
    with_url.url = Some("https://example.com/cats".to_string());
    let file = corpus_file(&[with_url]);
    let engine = engine_for(&file);

    let request = SearchRequest::new("cats", None, None).expect("valid request");
    let page = engine.search(&request).await.expect("search succeeds");

    let json = serde_json::to_value(&page).expect("page serializes");
    let first = &json["results"][0];
    assert_eq!(first["id"], "a");
    assert_eq!(first["url"], "https://example.com/cats");
    assert!(first.get("content").is_none());
    assert!(json.get("next_cursor").is_none());
}

#[tokio::test]
async fn unreadable_corpus_surfaces_io_error() {
    let engine = SearchEngine::new(Arc::new(CorpusLoader::new(
        "/nonexistent/search-fetch-mcp/corpus.json",
    )));

    let request = SearchRequest::new("cats", None, None).expect("valid request");
    assert!(matches!(
        engine.search(&request).await,
        Err(Error::Io { .. })
    ));
}
