//! Search query building and rendering

use crate::search::condition::{quote, ConditionValue, SearchCondition, SearchOperator};
use crate::search::error::{SearchError, SearchResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Smallest page size accepted by the tracker
pub const MIN_LIMIT: usize = 1;
/// Largest page size accepted by the tracker
pub const MAX_LIMIT: usize = 1000;
/// Page size used when the caller does not set one
pub const DEFAULT_LIMIT: usize = 50;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Sort order for search results
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            other => Err(SearchError::InvalidQuery(format!(
                "unknown sort order '{}'",
                other
            ))),
        }
    }
}

/// Field to sort by
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchSort {
    pub field: String,
    pub order: SortOrder,
}

/// Which projects a query runs against
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "scope", content = "projects")]
pub enum ProjectScope {
    #[default]
    All,
    CurrentProject,
    VisibleProjects,
    SpecificProjects(Vec<String>),
}

/// Date window on one date-valued field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub field: String,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    fn render(&self) -> Option<String> {
        if self.from.is_none() && self.to.is_none() {
            return None;
        }
        let bound = |date: Option<NaiveDate>| {
            date.map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_else(|| "*".to_string())
        };
        Some(format!(
            "{}: {} .. {}",
            self.field,
            bound(self.from),
            bound(self.to)
        ))
    }
}

/// Inputs that change the fetched result set, digested into the cache key
#[derive(Serialize)]
struct CacheKeyMaterial<'a> {
    query: &'a str,
    limit: usize,
    offset: usize,
    sort_field: Option<&'a str>,
    sort_order: SortOrder,
    include_fields: Vec<&'a str>,
    exclude_fields: Vec<&'a str>,
    include_custom_fields: bool,
}

/// Structured search query
///
/// Built with chainable methods; steps that can violate an invariant return
/// `SearchResult<Self>` so invalid queries never reach the network.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchQuery {
    conditions: Vec<SearchCondition>,
    text_search: Option<String>,
    project_scope: ProjectScope,
    limit: usize,
    offset: usize,
    sort_field: Option<String>,
    sort_order: SortOrder,
    include_fields: Vec<String>,
    exclude_fields: Vec<String>,
    include_custom_fields: bool,
    include_archived: bool,
    include_resolved: bool,
    date_range: Option<DateRange>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
            text_search: None,
            project_scope: ProjectScope::All,
            limit: DEFAULT_LIMIT,
            offset: 0,
            sort_field: None,
            sort_order: SortOrder::Descending,
            include_fields: Vec::new(),
            exclude_fields: Vec::new(),
            include_custom_fields: true,
            include_archived: true,
            include_resolved: true,
            date_range: None,
        }
    }
}

impl SearchQuery {
    /// Create an empty query (renders to `*`)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a free-text query
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new().add_text_search(text)
    }

    /// Add a condition
    pub fn add_condition(
        self,
        field: impl Into<String>,
        operator: SearchOperator,
        value: impl Into<ConditionValue>,
    ) -> SearchResult<Self> {
        Ok(self.with_condition(SearchCondition::new(field, operator, value)?))
    }

    /// Add a negated condition
    pub fn add_negated_condition(
        self,
        field: impl Into<String>,
        operator: SearchOperator,
        value: impl Into<ConditionValue>,
    ) -> SearchResult<Self> {
        Ok(self.with_condition(SearchCondition::negated(field, operator, value)?))
    }

    /// Add an already validated condition
    pub fn with_condition(mut self, condition: SearchCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Set free-text search over summary and description
    pub fn add_text_search(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.text_search = if text.trim().is_empty() {
            None
        } else {
            Some(text)
        };
        self
    }

    /// Restrict results to a date window on `field`
    pub fn add_date_range(
        mut self,
        field: impl Into<String>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> SearchResult<Self> {
        let field = field.into();
        if field.trim().is_empty() {
            return Err(SearchError::InvalidQuery(
                "date range field must not be empty".to_string(),
            ));
        }
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(SearchError::InvalidQuery(format!(
                    "date range on '{}' starts after it ends ({} > {})",
                    field, from, to
                )));
            }
        }
        self.date_range = Some(DateRange { field, from, to });
        Ok(self)
    }

    /// Set pagination; the limit is clamped to the tracker's accepted range
    pub fn set_pagination(mut self, limit: usize, offset: usize) -> Self {
        self.limit = limit.clamp(MIN_LIMIT, MAX_LIMIT);
        self.offset = offset;
        self
    }

    /// Set sorting
    pub fn set_sorting(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        let field = field.into();
        self.sort_field = if field.trim().is_empty() {
            None
        } else {
            Some(field)
        };
        self.sort_order = order;
        self
    }

    /// Set project scope
    pub fn with_project_scope(mut self, scope: ProjectScope) -> SearchResult<Self> {
        if let ProjectScope::SpecificProjects(projects) = &scope {
            if projects.iter().all(|p| p.trim().is_empty()) {
                return Err(SearchError::InvalidQuery(
                    "specific_projects must be provided when project_scope is SPECIFIC_PROJECTS"
                        .to_string(),
                ));
            }
        }
        self.project_scope = scope;
        Ok(self)
    }

    /// Request additional fields in the projection
    pub fn include_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Drop fields from the projection
    pub fn exclude_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Include custom fields in the projection
    pub fn with_custom_fields(mut self, include: bool) -> Self {
        self.include_custom_fields = include;
        self
    }

    /// Include issues from archived projects
    pub fn with_archived(mut self, include: bool) -> Self {
        self.include_archived = include;
        self
    }

    /// Include resolved issues
    pub fn with_resolved(mut self, include: bool) -> Self {
        self.include_resolved = include;
        self
    }

    pub fn conditions(&self) -> &[SearchCondition] {
        &self.conditions
    }

    pub fn text_search(&self) -> Option<&str> {
        self.text_search.as_deref()
    }

    pub fn project_scope(&self) -> &ProjectScope {
        &self.project_scope
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn sort(&self) -> Option<SearchSort> {
        self.sort_field.as_ref().map(|field| SearchSort {
            field: field.clone(),
            order: self.sort_order,
        })
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn included_fields(&self) -> &[String] {
        &self.include_fields
    }

    pub fn excluded_fields(&self) -> &[String] {
        &self.exclude_fields
    }

    pub fn includes_custom_fields(&self) -> bool {
        self.include_custom_fields
    }

    pub fn includes_archived(&self) -> bool {
        self.include_archived
    }

    pub fn includes_resolved(&self) -> bool {
        self.include_resolved
    }

    pub fn date_range(&self) -> Option<&DateRange> {
        self.date_range.as_ref()
    }

    /// Render the query in the tracker's query language.
    ///
    /// Clause order is fixed: conditions, project scope, free text, date
    /// range, archived filter, resolved filter.
    pub fn render(&self) -> String {
        let mut parts: Vec<String> = self.conditions.iter().map(SearchCondition::render).collect();

        if let ProjectScope::SpecificProjects(projects) = &self.project_scope {
            let projects: Vec<&String> = projects.iter().filter(|p| !p.trim().is_empty()).collect();
            match projects.as_slice() {
                [single] if single.chars().any(char::is_whitespace) => {
                    parts.push(format!("project: {{{}}}", single))
                }
                [single] => parts.push(format!("project: {}", single)),
                many => {
                    let quoted: Vec<String> = many.iter().map(|p| quote(p)).collect();
                    parts.push(format!("project: ({})", quoted.join(", ")));
                }
            }
        }

        if let Some(text) = &self.text_search {
            let text = quote(text);
            parts.push(format!("(summary: {} or description: {})", text, text));
        }

        if let Some(clause) = self.date_range.as_ref().and_then(DateRange::render) {
            parts.push(clause);
        }

        if !self.include_archived {
            parts.push("project.archived: false".to_string());
        }

        if !self.include_resolved {
            parts.push("resolved: Unresolved".to_string());
        }

        if parts.is_empty() {
            "*".to_string()
        } else {
            parts.join(" and ")
        }
    }

    /// Deterministic digest over everything that affects the fetched result set
    pub fn cache_key(&self) -> String {
        let rendered = self.render();

        let mut include_fields: Vec<&str> = self.include_fields.iter().map(String::as_str).collect();
        include_fields.sort_unstable();
        let mut exclude_fields: Vec<&str> = self.exclude_fields.iter().map(String::as_str).collect();
        exclude_fields.sort_unstable();

        let material = CacheKeyMaterial {
            query: &rendered,
            limit: self.limit,
            offset: self.offset,
            sort_field: self.sort_field.as_deref(),
            sort_order: self.sort_order,
            include_fields,
            exclude_fields,
            include_custom_fields: self.include_custom_fields,
        };

        let encoded = serde_json::to_vec(&material).unwrap_or_else(|_| rendered.into_bytes());
        format!("{:x}", Sha256::digest(&encoded))
    }

    /// Field names the rendered query refers to, sorted and de-duplicated
    pub fn fields_used(&self) -> Vec<String> {
        let mut fields: BTreeSet<String> = self
            .conditions
            .iter()
            .map(|c| c.field().to_string())
            .collect();

        if matches!(self.project_scope, ProjectScope::SpecificProjects(_)) {
            fields.insert("project".to_string());
        }
        if self.text_search.is_some() {
            fields.insert("summary".to_string());
            fields.insert("description".to_string());
        }
        if let Some(range) = &self.date_range {
            if range.from.is_some() || range.to.is_some() {
                fields.insert(range.field.clone());
            }
        }
        if !self.include_archived {
            fields.insert("project.archived".to_string());
        }
        if !self.include_resolved {
            fields.insert("resolved".to_string());
        }

        fields.into_iter().collect()
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
