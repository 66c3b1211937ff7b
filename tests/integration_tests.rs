//! Integration tests for CrossRef Search
//!
//! These tests drive the search controller and state against a mock CrossRef
//! HTTP server (mockito) and against the in-process mock source.

use crossref_search::models::{SearchFilters, SortBy, UNKNOWN_AUTHORS};
use crossref_search::session::{MessageCategory, Outcome, SearchController, SearchError, SearchState};
use crossref_search::sources::mock::make_work;
use crossref_search::sources::{CrossRefSource, MockSource, WorksPage};
use crossref_search::utils::{FileStore, KeyValueStore, SearchHistory, HISTORY_KEY};
use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn works_body(total: u64, items: serde_json::Value) -> String {
    json!({
        "status": "ok",
        "message-type": "work-list",
        "message": {
            "total-results": total,
            "items": items
        }
    })
    .to_string()
}

fn sample_items() -> serde_json::Value {
    json!([
        {
            "DOI": "10.1000/ml.1",
            "title": ["Deep Learning for Graphs"],
            "author": [
                {"given": "Ada", "family": "Lovelace"},
                {"name": "The Graph Consortium"}
            ],
            "abstract": "<jats:p>We study <jats:italic>graphs</jats:italic>.</jats:p>",
            "published-print": {"date-parts": [[2021, 5]]},
            "is-referenced-by-count": 12,
            "container-title": ["Journal of Machine Learning"],
            "URL": "http://dx.doi.org/10.1000/ml.1",
            "link": [
                {"URL": "https://example.org/ml.1.xml", "content-type": "text/xml"},
                {"URL": "https://example.org/ml.1.pdf", "content-type": "application/pdf"}
            ],
            "subject": ["Artificial Intelligence"]
        },
        {
            "title": ["An Untraceable Preprint"]
        }
    ])
}

fn crossref_controller(server: &Server) -> SearchController<CrossRefSource> {
    let source =
        CrossRefSource::with_base_url(&server.url(), "tests@example.org", Duration::from_secs(5))
            .unwrap();
    SearchController::new(Arc::new(source), Arc::new(SearchHistory::in_memory(20)))
        .mailto("tests@example.org")
}

#[tokio::test]
async fn test_search_sends_expected_parameters() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/works")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("query".into(), "machine learning".into()),
            Matcher::UrlEncoded("rows".into(), "10".into()),
            Matcher::UrlEncoded("offset".into(), "0".into()),
            Matcher::UrlEncoded("sort".into(), "published".into()),
            Matcher::UrlEncoded("order".into(), "desc".into()),
            Matcher::UrlEncoded("filter".into(), "from-pub-date:2020-2023".into()),
            Matcher::UrlEncoded("mailto".into(), "tests@example.org".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(works_body(2, sample_items()))
        .create_async()
        .await;

    let controller = crossref_controller(&server);
    let filters = SearchFilters::new(10)
        .year_from(2020)
        .year_to(2023)
        .sort_by(SortBy::Newest);

    let session = controller
        .execute_search("machine learning", &filters)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(session.total_results, 2);
    assert_eq!(session.total_pages(), 1);
    assert_eq!(controller.history().entries()[0].query, "machine learning");
}

#[tokio::test]
async fn test_results_are_normalized() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/works")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(works_body(2, sample_items()))
        .create_async()
        .await;

    let controller = crossref_controller(&server);
    let session = controller
        .execute_search("graphs", &SearchFilters::default())
        .await
        .unwrap();

    let first = &session.results[0];
    assert_eq!(first.id, "paper-1-10.1000/ml.1");
    assert_eq!(first.authors, "Ada Lovelace, The Graph Consortium");
    assert_eq!(first.r#abstract, "We study graphs.");
    assert_eq!(first.year.value(), Some(2021));
    assert_eq!(first.journal, "Journal of Machine Learning");
    assert_eq!(first.pdf_url, "https://example.org/ml.1.pdf");
    assert_eq!(first.subjects, vec!["Artificial Intelligence"]);

    let second = &session.results[1];
    assert!(second.id.starts_with("paper-2-"));
    assert_eq!(second.authors, UNKNOWN_AUTHORS);
    assert!(!second.has_doi());
    assert_eq!(second.pdf_url, "");
}

#[tokio::test]
async fn test_paging_through_three_pages() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/works")
        .match_query(Matcher::UrlEncoded("rows".into(), "20".into()))
        .with_status(200)
        .with_body(works_body(42, sample_items()))
        .expect(3)
        .create_async()
        .await;

    let controller = crossref_controller(&server);
    let mut state = SearchState::new(SearchFilters::new(20));

    assert_eq!(state.search(&controller, "graphs").await, Outcome::Updated);
    assert_eq!(state.session().total_pages(), 3);
    assert_eq!(state.next_page(&controller).await, Outcome::Updated);
    assert_eq!(state.next_page(&controller).await, Outcome::Updated);
    assert_eq!(state.session().current_page(), 3);

    assert_eq!(state.next_page(&controller).await, Outcome::Unchanged);
    assert_eq!(state.session().current_page(), 3);

    mock.assert_async().await;
    assert_eq!(controller.history().len(), 1);
}

#[tokio::test]
async fn test_server_error_clears_results() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/works")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("oops")
        .create_async()
        .await;

    let controller = crossref_controller(&server);
    let mut state = SearchState::default();

    match state.search(&controller, "graphs").await {
        Outcome::Notice(message) => {
            assert_eq!(message.category, MessageCategory::Api);
            assert!(message.text.contains("500 Internal Server Error"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(state.session().results.is_empty());
    assert_eq!(state.session().total_results, 0);
    assert_eq!(state.failed_request().map(|r| r.query.as_str()), Some("graphs"));
}

#[tokio::test]
async fn test_malformed_body_is_an_api_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/works")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("{\"message\": ")
        .create_async()
        .await;

    let controller = crossref_controller(&server);
    let err = controller
        .execute_search("graphs", &SearchFilters::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::Parse(_)));
    assert_eq!(err.category(), Some(MessageCategory::Api));
}

#[tokio::test]
async fn test_lookup_doi() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/works/10.1000/ml.1")
        .with_status(200)
        .with_body(
            json!({
                "status": "ok",
                "message": sample_items()[0].clone()
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/works/10.1000/missing")
        .with_status(404)
        .with_body("Resource not found.")
        .create_async()
        .await;

    let controller = crossref_controller(&server);

    let record = controller.lookup_doi("10.1000/ml.1").await.unwrap();
    assert_eq!(record.title, "Deep Learning for Graphs");
    assert_eq!(record.doi_link().as_deref(), Some("https://doi.org/10.1000/ml.1"));

    let err = controller.lookup_doi("10.1000/missing").await.unwrap_err();
    assert!(matches!(err, SearchError::Api { status: 404, .. }));
}

#[tokio::test]
async fn test_timeout_leaves_empty_session() {
    let source = Arc::new(MockSource::new());
    source.set_delay("slow topic", Duration::from_millis(500));
    let controller = SearchController::new(source, Arc::new(SearchHistory::in_memory(20)))
        .timeout(Duration::from_millis(50));
    let mut state = SearchState::default();

    match state.search(&controller, "slow topic").await {
        Outcome::Notice(message) => {
            assert_eq!(message.category, MessageCategory::Timeout);
            assert!(message.text.contains("timed out"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(state.session().results.is_empty());
    assert_eq!(state.session().total_pages(), 0);
    assert_eq!(state.session().current_page(), 1);
}

#[tokio::test]
async fn test_newer_search_wins() {
    let source = Arc::new(MockSource::new());
    source.set_page(WorksPage::new(vec![make_work("10.1/x", "X", 2020)], 1));
    source.set_delay("first", Duration::from_millis(300));
    let controller = Arc::new(SearchController::new(
        Arc::clone(&source),
        Arc::new(SearchHistory::in_memory(20)),
    ));

    let first = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            controller
                .execute_search("first", &SearchFilters::default())
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = controller
        .execute_search("second", &SearchFilters::default())
        .await
        .unwrap();

    assert_eq!(second.query, "second");
    assert_eq!(first.await.unwrap(), Err(SearchError::Superseded));
    assert_eq!(controller.history().len(), 2);
}

#[tokio::test]
async fn test_history_persists_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path()));
    let source = Arc::new(MockSource::new());

    {
        let history = Arc::new(SearchHistory::load(Arc::clone(&store), 20));
        let controller = SearchController::new(Arc::clone(&source), history);
        for query in ["alpha", "beta", "  gamma  "] {
            controller
                .execute_search(query, &SearchFilters::default())
                .await
                .unwrap();
        }
    }

    let reloaded = SearchHistory::load(Arc::clone(&store), 20);
    let queries: Vec<String> = reloaded.entries().into_iter().map(|e| e.query).collect();
    assert_eq!(queries, vec!["gamma", "beta", "alpha"]);
    assert!(store.get(HISTORY_KEY).unwrap().is_some());
}

#[tokio::test]
async fn test_lookup_doi_encodes_reserved_characters() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/works/10.1002/x%231")
        .with_status(200)
        .with_body(
            json!({
                "status": "ok",
                "message": {"DOI": "10.1002/x#1", "title": ["Hashed"]}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let controller = crossref_controller(&server);
    let record = controller.lookup_doi("10.1002/x#1").await.unwrap();

    mock.assert_async().await;
    assert_eq!(record.title, "Hashed");
    assert_eq!(record.doi, "10.1002/x#1");
}

#[tokio::test]
async fn test_opening_page_past_the_end_shows_last_page() {
    let mut server = Server::new_async().await;
    let past_end = server
        .mock("GET", "/works")
        .match_query(Matcher::UrlEncoded("offset".into(), "160".into()))
        .with_status(200)
        .with_body(works_body(42, json!([])))
        .create_async()
        .await;
    let last_page = server
        .mock("GET", "/works")
        .match_query(Matcher::UrlEncoded("offset".into(), "40".into()))
        .with_status(200)
        .with_body(works_body(42, sample_items()))
        .create_async()
        .await;

    let controller = crossref_controller(&server);
    let mut state = SearchState::new(SearchFilters::new(20));

    assert_eq!(state.search_at(&controller, "graphs", 9).await, Outcome::Updated);

    past_end.assert_async().await;
    last_page.assert_async().await;
    let session = state.session();
    assert_eq!(session.current_page(), 3);
    assert_eq!(session.total_pages(), 3);
    assert_eq!(session.results.len(), 2);
    assert_eq!(session.results[0].id, "paper-41-10.1000/ml.1");
    assert_eq!(session.display_range(), (41, 42));
}

#[tokio::test]
async fn test_family_only_authors_are_kept() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/works")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(works_body(
            1,
            json!([{"title": ["Poetics"], "author": [{"family": "Aristotle"}]}]),
        ))
        .create_async()
        .await;

    let controller = crossref_controller(&server);
    let session = controller
        .execute_search("poetics", &SearchFilters::default())
        .await
        .unwrap();

    assert_eq!(session.results[0].authors, "Aristotle");
}
