//! HTTP-level tests for the YouTrack fetcher against a mock server

use mockito::Matcher;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use youtrack_search::search::{
    FetchError, FetchRequest, SearchEngine, SearchError, SearchOperator, SearchQuery, SortOrder,
};
use youtrack_search::YouTrackClient;

const TOKEN: &str = "perm:tester.acme.c2VjcmV0LXRva2Vu";

fn client(server: &mockito::Server, max_retries: u32) -> YouTrackClient {
    YouTrackClient::new(format!("{}/api", server.url()), TOKEN, 5, max_retries)
        .unwrap()
        .with_retry_delay(Duration::from_millis(1))
}

fn request_for(query: &SearchQuery) -> FetchRequest {
    FetchRequest::from_query(query)
}

#[tokio::test]
async fn test_fetch_sends_query_parameters_and_token() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/issues")
        .match_header("authorization", format!("Bearer {}", TOKEN).as_str())
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("query".into(), r#"project : "API""#.into()),
            Matcher::UrlEncoded("$top".into(), "25".into()),
            Matcher::UrlEncoded("$skip".into(), "50".into()),
            Matcher::UrlEncoded("$orderBy".into(), "updated asc".into()),
            Matcher::Regex("fields=id%2CidReadable".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"idReadable": "API-1", "summary": "Crash"}]"#)
        .expect(1)
        .create_async()
        .await;

    let query = SearchQuery::new()
        .add_condition("project", SearchOperator::Equals, "API")
        .unwrap()
        .set_pagination(25, 50)
        .set_sorting("updated", SortOrder::Ascending);

    let issues = client(&server, 0).get_issues(&request_for(&query)).await.unwrap();

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0]["idReadable"], "API-1");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_status_codes_map_to_fetch_errors() {
    let cases: [(usize, fn(&FetchError) -> bool); 4] = [
        (400, |e| matches!(e, FetchError::Rejected(_))),
        (401, |e| matches!(e, FetchError::Authentication(_))),
        (403, |e| matches!(e, FetchError::PermissionDenied(_))),
        (404, |e| matches!(e, FetchError::NotFound(_))),
    ];

    for (status, check) in cases {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/issues")
            .match_query(Matcher::Any)
            .with_status(status)
            .with_body("nope")
            .expect(1)
            .create_async()
            .await;

        let err = client(&server, 3)
            .get_issues(&request_for(&SearchQuery::new()))
            .await
            .unwrap_err();

        assert!(check(&err), "status {} gave {:?}", status, err);
        // client errors are never retried
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_server_errors_are_retried_then_returned() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/issues")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("maintenance")
        .expect(3)
        .create_async()
        .await;

    let err = client(&server, 2)
        .get_issues(&request_for(&SearchQuery::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Server { status: 503, .. }));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/issues")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_body("slow down")
        .expect(2)
        .create_async()
        .await;

    let err = client(&server, 1)
        .get_issues(&request_for(&SearchQuery::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::RateLimited(_)));
    assert!(err.is_transient());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_timeouts_are_not_retried() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = accepted.clone();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            // keep the connection open without ever answering
            held.push(socket);
        }
    });

    let client = YouTrackClient::new(format!("http://{}/api", addr), TOKEN, 1, 2)
        .unwrap()
        .with_retry_delay(Duration::from_millis(1));
    let err = client
        .get_issues(&request_for(&SearchQuery::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Timeout(_)), "got {:?}", err);
    assert!(!err.is_transient());
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_truncated_body_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n[{\"idReadable\"",
                )
                .await;
            let _ = socket.shutdown().await;
        }
    });

    let client = YouTrackClient::new(format!("http://{}/api", addr), TOKEN, 5, 0).unwrap();
    let err = client
        .get_issues(&request_for(&SearchQuery::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Network(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_token_never_leaks_into_errors() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/issues")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(format!("token {} is invalid", TOKEN))
        .create_async()
        .await;

    let err = client(&server, 0)
        .get_issues(&request_for(&SearchQuery::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Authentication(_)));
    assert!(!err.to_string().contains(TOKEN));
}

#[tokio::test]
async fn test_non_list_body_is_invalid_response() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/issues")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"error": "unexpected"}"#)
        .create_async()
        .await;

    let err = client(&server, 0)
        .get_issues(&request_for(&SearchQuery::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_engine_over_http_caches_responses() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/issues")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"[{"idReadable": "API-7", "project": {"name": "API"}}]"#)
        .expect(1)
        .create_async()
        .await;

    let engine = SearchEngine::with_defaults(Arc::new(client(&server, 0)));

    let first = engine.search("timeout").await.unwrap();
    let second = engine.search("timeout").await.unwrap();

    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert_eq!(second.facets["project"]["API"], 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_engine_passes_http_errors_through() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/issues")
        .match_query(Matcher::Any)
        .with_status(403)
        .create_async()
        .await;

    let engine = SearchEngine::with_defaults(Arc::new(client(&server, 0)));
    let err = engine.search("secret").await.unwrap_err();

    assert!(matches!(
        err,
        SearchError::Fetch(FetchError::PermissionDenied(_))
    ));
    let stats = engine.get_analytics_stats().unwrap();
    assert_eq!(stats.error_counts.values().sum::<u64>(), 1);
}
