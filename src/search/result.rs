//! Search result records

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::time::Duration;

/// Issue record as returned by the tracker; the field set is open
pub type Issue = serde_json::Map<String, serde_json::Value>;

/// Grouped counts per facet field: field -> (value -> count)
pub type Facets = BTreeMap<String, BTreeMap<String, u64>>;

/// Result of one search
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchResponse {
    /// Issues in the order the tracker returned them
    pub issues: Vec<Issue>,

    /// Exact when the page was short, otherwise a lower bound
    pub total_count: usize,

    /// Wall time of the fetch that produced the response
    #[serde(rename = "execution_time_ms", serialize_with = "serialize_millis")]
    pub execution_time: Duration,

    /// Rendered query string sent to the tracker
    pub query_used: String,

    /// Set only when the response was served from the cache
    pub cache_hit: bool,

    pub suggested_queries: Vec<String>,

    pub facets: Facets,
}

impl SearchResponse {
    /// Number of issues on this page
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

fn serialize_millis<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64() * 1000.0)
}
