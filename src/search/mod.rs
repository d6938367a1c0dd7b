//! Advanced issue search for YouTrack
//!
//! This module turns typed search conditions into YouTrack query language and
//! runs them through a pluggable fetcher, with:
//!
//! - **Query Builder**: typed operators and values, quoting and negation
//! - **Result Cache**: TTL expiry with batched LRU eviction
//! - **Analytics**: query popularity, field usage, latency and error counts
//! - **Suggestions**: refinements for results, completions for partial queries
//! - **Facets**: grouped counts over the returned page
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 SearchEngine                     │
//! ├─────────────────────────────────────────────────┤
//! │  - search()               - create_query()      │
//! │  - get_search_suggestions()                     │
//! │  - get_cache_stats()      - get_analytics_stats()│
//! └─────────────────────────────────────────────────┘
//!          │                │                │
//!          ▼                ▼                ▼
//!   ┌─────────────┐  ┌─────────────┐  ┌─────────────┐
//!   │ SearchCache │  │  Analytics  │  │ IssueFetcher│
//!   └─────────────┘  └─────────────┘  └─────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use youtrack_search::search::{SearchEngine, SearchOperator, SearchQuery};
//! use youtrack_search::youtrack::YouTrackClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = YouTrackClient::new("https://example.youtrack.cloud/api", "perm:token", 30, 3)?;
//!     let engine = SearchEngine::with_defaults(Arc::new(client));
//!
//!     let query = SearchQuery::new()
//!         .add_condition("project", SearchOperator::Equals, "API")?
//!         .add_text_search("timeout")
//!         .set_pagination(20, 0);
//!
//!     let results = engine.search(query).await?;
//!     println!("Found {} issues", results.total_count);
//!
//!     Ok(())
//! }
//! ```

mod analytics;
mod cache;
mod condition;
mod config;
mod engine;
mod error;
mod facets;
mod fetch;
mod presets;
mod query;
pub mod request;
mod result;
mod suggest;

pub use analytics::{AnalyticsStats, RankedCount, SearchAnalytics};
pub use cache::{CacheStats, SearchCache};
pub use condition::{ConditionValue, Scalar, SearchCondition, SearchOperator};
pub use config::{SearchConfig, SearchConfigBuilder};
pub use engine::{SearchEngine, SearchInput, SearchOptions};
pub use error::{FetchError, SearchError, SearchResult};
pub use facets::{compute_facets, FACET_FIELDS};
pub use fetch::{FetchRequest, FieldProjection, IssueFetcher};
pub use presets::{
    create_date_range_search, create_date_range_search_until, create_issue_search,
    create_text_search,
};
pub use query::{
    DateRange, ProjectScope, SearchQuery, SearchSort, SortOrder, DEFAULT_LIMIT, MAX_LIMIT,
    MIN_LIMIT,
};
pub use result::{Facets, Issue, SearchResponse};
pub use suggest::{completions, refinements, DEFAULT_SUGGESTION_LIMIT, KNOWN_FIELDS};
