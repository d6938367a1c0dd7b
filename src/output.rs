//! Shaping of search responses for tool callers

use crate::search::{Facets, SearchQuery, SearchResponse};
use chrono::{TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;

/// Millisecond timestamp fields that get an ISO 8601 companion
const TIMESTAMP_FIELDS: [&str; 3] = ["created", "updated", "resolved"];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

/// Search response as returned to a tool caller
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchToolOutput {
    pub issues: Vec<Value>,
    pub total_count: usize,
    pub execution_time_ms: u64,
    pub query_used: String,
    pub cache_hit: bool,
    pub suggested_queries: Vec<String>,
    pub facets: Facets,
    pub pagination: Pagination,
}

impl SearchToolOutput {
    pub fn new(response: SearchResponse, query: &SearchQuery) -> Self {
        let returned = response.issues.len();
        let issues = response
            .issues
            .into_iter()
            .map(|issue| {
                let mut value = Value::Object(issue);
                add_iso8601_timestamps(&mut value);
                value
            })
            .collect();

        Self {
            issues,
            total_count: response.total_count,
            execution_time_ms: response.execution_time.as_millis() as u64,
            query_used: response.query_used,
            cache_hit: response.cache_hit,
            suggested_queries: response.suggested_queries,
            facets: response.facets,
            pagination: Pagination {
                limit: query.limit(),
                offset: query.offset(),
                has_more: returned >= query.limit(),
            },
        }
    }
}

/// Add `<field>_iso8601` next to integer millisecond `created`, `updated`
/// and `resolved` values, at any depth
pub fn add_iso8601_timestamps(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let mut additions = Vec::new();
            for field in TIMESTAMP_FIELDS {
                if let Some(millis) = map.get(field).and_then(Value::as_i64) {
                    if let Some(time) = Utc.timestamp_millis_opt(millis).single() {
                        additions.push((format!("{}_iso8601", field), time.to_rfc3339()));
                    }
                }
            }
            for (key, iso) in additions {
                map.insert(key, Value::String(iso));
            }
            for nested in map.values_mut() {
                add_iso8601_timestamps(nested);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(add_iso8601_timestamps),
        _ => {}
    }
}
