//! Prometheus metrics for the search engine.
//!
//! Metrics live in a process-wide registry and are exposed in the text
//! exposition format through [`gather_metrics`].
//!
//! # Example
//! ```no_run
//! use youtrack_search::metrics::SEARCH_REQUESTS_TOTAL;
//!
//! SEARCH_REQUESTS_TOTAL.with_label_values(&["miss"]).inc();
//! ```

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Gauge, HistogramOpts, HistogramVec, Opts, Registry};

const NAMESPACE: &str = "youtrack_search";

/// Outcome label for a search served from the cache
pub const OUTCOME_HIT: &str = "hit";
/// Outcome label for a search that went to the tracker
pub const OUTCOME_MISS: &str = "miss";
/// Outcome label for a failed search
pub const OUTCOME_ERROR: &str = "error";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Total number of searches
    ///
    /// Labels: outcome (hit, miss, error)
    pub static ref SEARCH_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("search_requests_total", "Total number of searches")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create SEARCH_REQUESTS_TOTAL metric");

    /// Search duration in seconds
    ///
    /// Labels: outcome
    pub static ref SEARCH_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "search_duration_seconds",
            "Search duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["outcome"]
    ).expect("Failed to create SEARCH_DURATION_SECONDS metric");

    /// Cache entries removed to make room for new ones
    pub static ref SEARCH_CACHE_EVICTIONS_TOTAL: Counter = Counter::with_opts(
        Opts::new("search_cache_evictions_total", "Cache entries evicted by LRU")
            .namespace(NAMESPACE)
    ).expect("Failed to create SEARCH_CACHE_EVICTIONS_TOTAL metric");

    /// Current number of cached responses
    pub static ref SEARCH_CACHE_ENTRIES: Gauge = Gauge::with_opts(
        Opts::new("search_cache_entries", "Current number of cached search responses")
            .namespace(NAMESPACE)
    ).expect("Failed to create SEARCH_CACHE_ENTRIES metric");
}

/// Register every metric with [`PROMETHEUS_REGISTRY`]
///
/// Fails if called twice in one process.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_DURATION_SECONDS.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_CACHE_EVICTIONS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_CACHE_ENTRIES.clone()))?;

    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

/// Record the outcome and latency of one search
pub fn observe_search(outcome: &str, seconds: f64) {
    SEARCH_REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
    SEARCH_DURATION_SECONDS
        .with_label_values(&[outcome])
        .observe(seconds);
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
