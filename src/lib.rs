//! Advanced YouTrack issue search
//!
//! Typed query building, cached and instrumented search execution, and a
//! reqwest-based YouTrack fetcher. See [`search`] for the engine and
//! [`youtrack`] for the HTTP client.

pub mod config;
pub mod error;
pub mod metrics;
pub mod output;
pub mod search;
pub mod youtrack;

pub use config::Config;
pub use error::{AppError, Result};
pub use search::{
    SearchCondition, SearchConfig, SearchEngine, SearchError, SearchOperator, SearchQuery,
    SearchResponse,
};
pub use youtrack::YouTrackClient;
