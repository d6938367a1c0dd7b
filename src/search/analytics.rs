//! Search usage analytics: query popularity, field usage, latency and errors

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("digit pattern is valid"));

const TOP_N: usize = 10;

/// Placeholder substituted for digit runs when grouping queries
pub const DIGIT_PLACEHOLDER: &str = "N";

/// Name with an occurrence count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankedCount {
    pub name: String,
    pub count: u64,
}

/// Snapshot of the collected analytics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsStats {
    pub total_searches: u64,
    pub unique_query_patterns: usize,
    /// Mean latency of successful searches, in seconds
    pub average_execution_time: f64,
    /// Slowest successful search, in seconds
    pub max_execution_time: f64,
    pub total_results: u64,
    pub popular_queries: Vec<RankedCount>,
    pub popular_fields: Vec<RankedCount>,
    pub error_counts: BTreeMap<String, u64>,
    pub uptime_seconds: f64,
}

#[derive(Default)]
struct Latency {
    count: u64,
    sum: Duration,
    max: Duration,
}

struct AnalyticsState {
    query_counts: HashMap<String, u64>,
    field_counts: HashMap<String, u64>,
    error_counts: BTreeMap<String, u64>,
    latency: Latency,
    total_results: u64,
    started_at: Instant,
}

impl AnalyticsState {
    fn new() -> Self {
        Self {
            query_counts: HashMap::new(),
            field_counts: HashMap::new(),
            error_counts: BTreeMap::new(),
            latency: Latency::default(),
            total_results: 0,
            started_at: Instant::now(),
        }
    }
}

/// Aggregating recorder for search activity
pub struct SearchAnalytics {
    state: Mutex<AnalyticsState>,
}

impl SearchAnalytics {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AnalyticsState::new()),
        }
    }

    /// Group queries differing only in numbers: lowercase, digit runs -> `N`
    pub fn normalize(query: &str) -> String {
        DIGIT_RUN
            .replace_all(&query.to_lowercase(), DIGIT_PLACEHOLDER)
            .into_owned()
    }

    /// Record one search. The pattern counter always moves; successes feed
    /// latency and field usage, failures feed the error counters only.
    pub fn record(
        &self,
        query: &str,
        execution_time: Duration,
        result_count: usize,
        fields_used: &[String],
        error: Option<&str>,
    ) {
        let pattern = Self::normalize(query);
        let mut state = self.state.lock();
        *state.query_counts.entry(pattern).or_insert(0) += 1;

        match error {
            Some(message) => {
                *state.error_counts.entry(message.to_string()).or_insert(0) += 1;
            }
            None => {
                let latency = &mut state.latency;
                latency.count += 1;
                latency.sum += execution_time;
                latency.max = latency.max.max(execution_time);
                state.total_results += result_count as u64;
                for field in fields_used {
                    *state.field_counts.entry(field.clone()).or_insert(0) += 1;
                }
            }
        }
    }

    pub fn stats(&self) -> AnalyticsStats {
        let state = self.state.lock();
        let latency = &state.latency;

        AnalyticsStats {
            total_searches: state.query_counts.values().sum(),
            unique_query_patterns: state.query_counts.len(),
            average_execution_time: if latency.count == 0 {
                0.0
            } else {
                latency.sum.as_secs_f64() / latency.count as f64
            },
            max_execution_time: latency.max.as_secs_f64(),
            total_results: state.total_results,
            popular_queries: top_n(&state.query_counts),
            popular_fields: top_n(&state.field_counts),
            error_counts: state.error_counts.clone(),
            uptime_seconds: state.started_at.elapsed().as_secs_f64(),
        }
    }

    /// Reset all aggregates and restart the uptime clock
    pub fn clear(&self) {
        *self.state.lock() = AnalyticsState::new();
    }
}

impl Default for SearchAnalytics {
    fn default() -> Self {
        Self::new()
    }
}

/// Highest counts first, ties broken by name
fn top_n(counts: &HashMap<String, u64>) -> Vec<RankedCount> {
    let mut ranked: Vec<RankedCount> = counts
        .iter()
        .map(|(name, count)| RankedCount {
            name: name.clone(),
            count: *count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(TOP_N);
    ranked
}
