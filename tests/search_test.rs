//! End-to-end tests for the search engine against a mock fetcher

mod common;

use common::{sample_issues, MockFetcher};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use youtrack_search::search::{
    create_issue_search, ProjectScope, SearchConfigBuilder, SearchEngine, SearchError,
    SearchInput, SearchOperator, SearchOptions, SearchQuery, SortOrder,
};

#[tokio::test]
async fn test_two_condition_query_is_sent_verbatim() {
    let fetcher = MockFetcher::returning(sample_issues(2));
    let engine = SearchEngine::with_defaults(fetcher.clone());

    let query = engine
        .create_query()
        .add_condition("project", SearchOperator::Equals, "TEST")
        .unwrap()
        .add_condition("assignee", SearchOperator::Equals, "user1")
        .unwrap();

    let response = engine.search(query).await.unwrap();

    assert_eq!(response.query_used, r#"project : "TEST" and assignee : "user1""#);
    assert_eq!(
        fetcher.last_request().unwrap().query,
        r#"project : "TEST" and assignee : "user1""#
    );
    assert_eq!(response.issues.len(), 2);
    assert!(!response.cache_hit);
}

#[tokio::test]
async fn test_second_identical_search_is_cache_hit() {
    let fetcher = MockFetcher::returning(sample_issues(3));
    let engine = SearchEngine::with_defaults(fetcher.clone());

    let first = engine.search("database timeout").await.unwrap();
    let second = engine.search("database timeout").await.unwrap();

    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(first.issues, second.issues);
    assert_eq!(first.query_used, second.query_used);

    let cache = engine.get_cache_stats().unwrap();
    assert_eq!(cache.entries, 1);
    assert_eq!(cache.hits, 1);

    let analytics = engine.get_analytics_stats().unwrap();
    assert_eq!(analytics.total_searches, 2);
}

#[tokio::test]
async fn test_different_pagination_is_a_different_cache_entry() {
    let fetcher = MockFetcher::returning(sample_issues(1));
    let engine = SearchEngine::with_defaults(fetcher.clone());

    engine.search(SearchQuery::from_text("x").set_pagination(10, 0)).await.unwrap();
    engine.search(SearchQuery::from_text("x").set_pagination(10, 10)).await.unwrap();

    assert_eq!(fetcher.calls(), 2);
    assert_eq!(engine.get_cache_stats().unwrap().entries, 2);
}

#[tokio::test]
async fn test_failed_search_is_recorded_and_not_cached() {
    let fetcher = MockFetcher::failing("API Error");
    let engine = SearchEngine::with_defaults(fetcher.clone());

    let err = engine.search("anything").await.unwrap_err();
    assert!(matches!(err, SearchError::Fetch(_)));
    assert_eq!(err.to_string(), "API Error");

    let analytics = engine.get_analytics_stats().unwrap();
    assert_eq!(analytics.error_counts.get("API Error"), Some(&1));
    assert_eq!(engine.get_cache_stats().unwrap().entries, 0);

    // failures are not cached, so the next attempt fetches again
    engine.search("anything").await.unwrap_err();
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(
        engine.get_analytics_stats().unwrap().error_counts.get("API Error"),
        Some(&2)
    );
}

#[tokio::test]
async fn test_invalid_scope_is_rejected_before_fetching() {
    let fetcher = MockFetcher::returning(Vec::new());
    let engine = SearchEngine::with_defaults(fetcher.clone());

    let err = engine
        .create_query()
        .with_project_scope(ProjectScope::SpecificProjects(vec![]))
        .unwrap_err();
    assert!(matches!(err, SearchError::InvalidQuery(_)));
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_analytics_group_numbered_queries() {
    let engine = SearchEngine::with_defaults(MockFetcher::returning(sample_issues(1)));

    engine.search("TEST-1").await.unwrap();
    engine.search("TEST-2").await.unwrap();

    let stats = engine.get_analytics_stats().unwrap();
    assert_eq!(stats.total_searches, 2);
    assert_eq!(stats.unique_query_patterns, 1);
    assert_eq!(stats.popular_queries[0].count, 2);
    assert_eq!(
        stats.popular_queries[0].name,
        r#"(summary: "test-N" or description: "test-N")"#
    );
    let fields: Vec<&str> = stats.popular_fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(fields, vec!["description", "summary"]);
}

#[tokio::test]
async fn test_response_shape() {
    let fetcher = MockFetcher::returning(sample_issues(4));
    let engine = SearchEngine::with_defaults(fetcher.clone());

    let query = create_issue_search(Some("TEST"), None, None)
        .unwrap()
        .set_pagination(4, 8)
        .set_sorting("created", SortOrder::Descending)
        .exclude_fields(["description"]);
    let response = engine.search(query).await.unwrap();

    // a full page only gives a lower bound
    assert_eq!(response.total_count, 13);
    assert_eq!(response.facets["project"]["TEST"], 4);
    assert_eq!(response.facets["assignee"]["Alice"], 2);
    assert_eq!(response.facets["State"]["Open"], 4);
    assert_eq!(response.suggested_queries.len(), 3);
    assert!(response.suggested_queries[0].starts_with(r#"project : "TEST" and "#));

    let request = fetcher.last_request().unwrap();
    assert_eq!(request.limit, 4);
    assert_eq!(request.offset, 8);
    assert_eq!(request.order_by().as_deref(), Some("created desc"));
    assert!(!request.fields.to_param().contains("description"));
}

#[tokio::test]
async fn test_text_input_with_options() {
    let fetcher = MockFetcher::returning(Vec::new());
    let engine = SearchEngine::with_defaults(fetcher.clone());

    let options = SearchOptions {
        include_archived: Some(false),
        ..Default::default()
    }
    .with_project_scope(ProjectScope::SpecificProjects(vec![
        "API".to_string(),
        "WEB".to_string(),
    ]));

    let response = engine
        .search(SearchInput::Text("login".to_string(), options))
        .await
        .unwrap();

    assert_eq!(
        response.query_used,
        r#"project: ("API", "WEB") and (summary: "login" or description: "login") and project.archived: false"#
    );
    assert_eq!(response.total_count, 0);
}

#[tokio::test]
async fn test_cache_expiry_triggers_refetch() {
    let fetcher = MockFetcher::returning(sample_issues(1));
    let engine = SearchEngine::new(
        fetcher.clone(),
        SearchConfigBuilder::new().cache_ttl_secs(1).build(),
    );

    engine.search("expiring").await.unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let again = engine.search("expiring").await.unwrap();

    assert!(!again.cache_hit);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_concurrent_searches_share_the_engine() {
    let fetcher = MockFetcher::slow(sample_issues(2), Duration::from_millis(20));
    let engine = Arc::new(SearchEngine::with_defaults(fetcher.clone()));

    let tasks = (0..8).map(|i| {
        let engine = engine.clone();
        tokio::spawn(async move { engine.search(format!("query {}", i % 4)).await })
    });

    for result in join_all(tasks).await {
        assert!(result.unwrap().is_ok());
    }

    let stats = engine.get_analytics_stats().unwrap();
    assert_eq!(stats.total_searches, 8);
    assert_eq!(stats.unique_query_patterns, 1);
    assert!(engine.get_cache_stats().unwrap().entries <= 4);
    assert!(fetcher.calls() >= 4);
}

#[test]
fn test_suggestions_without_runtime() {
    let engine = SearchEngine::with_defaults(MockFetcher::returning(Vec::new()));

    assert_eq!(
        engine.get_search_suggestions("assignee:", 5),
        vec!["assignee: Unassigned", "assignee: me"]
    );

    // searching works from a synchronous context through a blocking executor
    let response = tokio_test::block_on(engine.search("*")).unwrap();
    assert_eq!(response.query_used, r#"(summary: "*" or description: "*")"#);
}
