//! Search engine configuration

use serde::{Deserialize, Serialize};

/// Search engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    /// Cache search responses
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Record search analytics
    #[serde(default = "default_true")]
    pub analytics_enabled: bool,

    /// Maximum number of cached responses
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// Lifetime of a cached response in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Attach refinement suggestions to responses
    #[serde(default = "default_true")]
    pub enable_suggestions: bool,

    /// Compute facet counts over the returned page
    #[serde(default = "default_true")]
    pub enable_facets: bool,

    /// Facets are skipped for pages larger than this
    #[serde(default = "default_facet_limit")]
    pub facet_limit: usize,
}

fn default_true() -> bool {
    true
}

fn default_cache_max_entries() -> usize {
    1000
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_facet_limit() -> usize {
    100
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            analytics_enabled: true,
            cache_max_entries: default_cache_max_entries(),
            cache_ttl_secs: default_cache_ttl_secs(),
            enable_suggestions: true,
            enable_facets: true,
            facet_limit: default_facet_limit(),
        }
    }
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.config.cache_enabled = enabled;
        self
    }

    pub fn analytics_enabled(mut self, enabled: bool) -> Self {
        self.config.analytics_enabled = enabled;
        self
    }

    pub fn cache_max_entries(mut self, max: usize) -> Self {
        self.config.cache_max_entries = max;
        self
    }

    pub fn cache_ttl_secs(mut self, secs: u64) -> Self {
        self.config.cache_ttl_secs = secs;
        self
    }

    pub fn enable_suggestions(mut self, enabled: bool) -> Self {
        self.config.enable_suggestions = enabled;
        self
    }

    pub fn enable_facets(mut self, enabled: bool) -> Self {
        self.config.enable_facets = enabled;
        self
    }

    pub fn facet_limit(mut self, limit: usize) -> Self {
        self.config.facet_limit = limit;
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
