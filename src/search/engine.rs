//! Search engine: query coercion, caching, fetching and analytics

use crate::metrics::{self, OUTCOME_ERROR, OUTCOME_HIT, OUTCOME_MISS};
use crate::search::analytics::{AnalyticsStats, SearchAnalytics};
use crate::search::cache::{CacheStats, SearchCache};
use crate::search::config::SearchConfig;
use crate::search::error::SearchResult;
use crate::search::facets::compute_facets;
use crate::search::fetch::{FetchRequest, IssueFetcher};
use crate::search::query::{ProjectScope, SearchQuery, SortOrder};
use crate::search::result::{Facets, SearchResponse};
use crate::search::suggest;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Overrides applied when a search is given as raw text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptions {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub sort: Option<(String, SortOrder)>,
    pub include_fields: Vec<String>,
    pub exclude_fields: Vec<String>,
    pub include_custom_fields: Option<bool>,
    pub include_archived: Option<bool>,
    pub include_resolved: Option<bool>,
    pub project_scope: Option<ProjectScope>,
}

impl SearchOptions {
    pub fn with_pagination(mut self, limit: usize, offset: usize) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some((field.into(), order));
        self
    }

    pub fn with_project_scope(mut self, scope: ProjectScope) -> Self {
        self.project_scope = Some(scope);
        self
    }

    fn apply(self, mut query: SearchQuery) -> SearchResult<SearchQuery> {
        if self.limit.is_some() || self.offset.is_some() {
            let limit = self.limit.unwrap_or(query.limit());
            let offset = self.offset.unwrap_or(query.offset());
            query = query.set_pagination(limit, offset);
        }
        if let Some((field, order)) = self.sort {
            query = query.set_sorting(field, order);
        }
        query = query
            .include_fields(self.include_fields)
            .exclude_fields(self.exclude_fields);
        if let Some(include) = self.include_custom_fields {
            query = query.with_custom_fields(include);
        }
        if let Some(include) = self.include_archived {
            query = query.with_archived(include);
        }
        if let Some(include) = self.include_resolved {
            query = query.with_resolved(include);
        }
        if let Some(scope) = self.project_scope {
            query = query.with_project_scope(scope)?;
        }
        Ok(query)
    }
}

/// What to search for
#[derive(Debug, Clone, PartialEq)]
pub enum SearchInput {
    /// Free text over summary and description, with optional overrides
    Text(String, SearchOptions),
    /// A fully built query
    Query(SearchQuery),
}

impl SearchInput {
    fn into_query(self) -> SearchResult<SearchQuery> {
        match self {
            SearchInput::Text(text, options) => options.apply(SearchQuery::from_text(text)),
            SearchInput::Query(query) => Ok(query),
        }
    }
}

impl From<&str> for SearchInput {
    fn from(text: &str) -> Self {
        SearchInput::Text(text.to_string(), SearchOptions::default())
    }
}

impl From<String> for SearchInput {
    fn from(text: String) -> Self {
        SearchInput::Text(text, SearchOptions::default())
    }
}

impl From<SearchQuery> for SearchInput {
    fn from(query: SearchQuery) -> Self {
        SearchInput::Query(query)
    }
}

/// Search engine
///
/// Owns its cache and analytics; share it across tasks behind an `Arc`.
pub struct SearchEngine {
    fetcher: Arc<dyn IssueFetcher>,
    cache: Option<SearchCache>,
    analytics: Option<SearchAnalytics>,
    config: SearchConfig,
}

impl SearchEngine {
    /// Create an engine; cache and analytics are built only when enabled
    pub fn new(fetcher: Arc<dyn IssueFetcher>, config: SearchConfig) -> Self {
        let cache = config
            .cache_enabled
            .then(|| SearchCache::new(config.cache_max_entries, config.cache_ttl_secs));
        let analytics = config.analytics_enabled.then(SearchAnalytics::new);

        info!(
            cache_enabled = config.cache_enabled,
            analytics_enabled = config.analytics_enabled,
            cache_max_entries = config.cache_max_entries,
            cache_ttl_secs = config.cache_ttl_secs,
            "Search engine initialized"
        );

        Self {
            fetcher,
            cache,
            analytics,
            config,
        }
    }

    /// Create an engine with default configuration
    pub fn with_defaults(fetcher: Arc<dyn IssueFetcher>) -> Self {
        Self::new(fetcher, SearchConfig::default())
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Fresh query builder
    pub fn create_query(&self) -> SearchQuery {
        SearchQuery::new()
    }

    /// Run a search, serving it from the cache when possible.
    ///
    /// Fetch failures are recorded in analytics and returned unchanged; they
    /// are never cached or retried here.
    pub async fn search(&self, input: impl Into<SearchInput>) -> SearchResult<SearchResponse> {
        let query = input.into().into_query()?;
        let rendered = query.render();
        let cache_key = query.cache_key();
        let fields_used = query.fields_used();

        if let Some(cache) = &self.cache {
            let lookup_started = Instant::now();
            if let Some(response) = cache.get(&cache_key) {
                let elapsed = lookup_started.elapsed();
                debug!(query = %rendered, key = %cache_key, "Search cache hit");
                self.record(&rendered, elapsed, response.len(), &fields_used, None);
                metrics::observe_search(OUTCOME_HIT, elapsed.as_secs_f64());
                return Ok(response);
            }
            debug!(query = %rendered, key = %cache_key, "Search cache miss");
        }

        let request = FetchRequest::from_query(&query);
        let started = Instant::now();
        let fetched = self.fetcher.fetch(&request).await;
        let elapsed = started.elapsed();

        let issues = match fetched {
            Ok(issues) => issues,
            Err(e) => {
                let message = e.to_string();
                warn!(query = %rendered, error = %message, "Search fetch failed");
                self.record(&rendered, elapsed, 0, &fields_used, Some(&message));
                metrics::observe_search(OUTCOME_ERROR, elapsed.as_secs_f64());
                return Err(e.into());
            }
        };

        let returned = issues.len();
        let total_count = if returned < query.limit() {
            query.offset() + returned
        } else {
            query.offset() + returned + 1
        };

        let suggested_queries = if self.config.enable_suggestions {
            suggest::refinements(&rendered)
        } else {
            Vec::new()
        };

        let facets = if self.config.enable_facets && query.limit() <= self.config.facet_limit {
            compute_facets(&issues)
        } else {
            Facets::new()
        };

        let response = SearchResponse {
            issues,
            total_count,
            execution_time: elapsed,
            query_used: rendered.clone(),
            cache_hit: false,
            suggested_queries,
            facets,
        };

        if let Some(cache) = &self.cache {
            cache.put(cache_key, response.clone());
        }
        self.record(&rendered, elapsed, returned, &fields_used, None);
        metrics::observe_search(OUTCOME_MISS, elapsed.as_secs_f64());

        info!(
            query = %rendered,
            returned,
            total_count,
            elapsed_ms = elapsed.as_millis() as u64,
            "Search completed"
        );

        Ok(response)
    }

    /// Completions for a partially typed query
    pub fn get_search_suggestions(&self, partial: &str, limit: usize) -> Vec<String> {
        suggest::completions(partial, limit)
    }

    /// `None` when the cache is disabled
    pub fn get_cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(SearchCache::stats)
    }

    /// `None` when analytics are disabled
    pub fn get_analytics_stats(&self) -> Option<AnalyticsStats> {
        self.analytics.as_ref().map(SearchAnalytics::stats)
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
            info!("Search cache cleared");
        }
    }

    fn record(
        &self,
        rendered: &str,
        elapsed: std::time::Duration,
        result_count: usize,
        fields_used: &[String],
        error: Option<&str>,
    ) {
        if let Some(analytics) = &self.analytics {
            analytics.record(rendered, elapsed, result_count, fields_used, error);
        }
    }
}
