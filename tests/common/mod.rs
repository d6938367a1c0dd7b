//! Common test utilities for search engine tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use youtrack_search::search::{FetchError, FetchRequest, Issue, IssueFetcher};

/// Build an issue record from a JSON object literal
pub fn issue(value: serde_json::Value) -> Issue {
    value.as_object().cloned().unwrap_or_default()
}

/// A page of `count` issues in project `TEST`
pub fn sample_issues(count: usize) -> Vec<Issue> {
    (0..count)
        .map(|i| {
            issue(json!({
                "idReadable": format!("TEST-{}", i + 1),
                "summary": format!("Issue {}", i + 1),
                "created": 1640995200000i64 + i as i64,
                "project": {"name": "TEST", "shortName": "TEST"},
                "assignee": if i % 2 == 0 { json!({"name": "Alice"}) } else { json!(null) },
                "customFields": [
                    {"name": "State", "value": {"name": "Open"}},
                    {"name": "Priority", "value": {"name": if i % 3 == 0 { "High" } else { "Normal" }}}
                ]
            }))
        })
        .collect()
}

/// Fetcher returning a fixed page (or a fixed error) and counting calls
pub struct MockFetcher {
    response: Result<Vec<Issue>, FetchError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<FetchRequest>>,
}

impl MockFetcher {
    pub fn returning(issues: Vec<Issue>) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(issues),
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Err(FetchError::other(message)),
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn slow(issues: Vec<Issue>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(issues),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<FetchRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl IssueFetcher for MockFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Issue>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response.clone()
    }
}
