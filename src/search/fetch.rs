//! Seam between the search engine and whatever talks to the tracker

use crate::search::error::FetchError;
use crate::search::query::{SearchQuery, SortOrder};
use crate::search::result::Issue;
use async_trait::async_trait;
use serde::Serialize;

/// Fields requested for every issue
pub const BASE_FIELDS: [&str; 10] = [
    "id",
    "idReadable",
    "summary",
    "description",
    "created",
    "updated",
    "resolved",
    "project(id,name,shortName)",
    "reporter(id,login,name)",
    "assignee(id,login,name)",
];

/// Projection added when custom fields are requested
pub const CUSTOM_FIELDS: &str = "customFields(id,name,value(id,name,$type,text,presentation))";

/// Field projection sent with a fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldProjection(Vec<String>);

impl FieldProjection {
    /// Base set, plus custom fields and includes, minus anything containing
    /// an excluded name
    pub fn for_query(query: &SearchQuery) -> Self {
        let mut fields: Vec<String> = BASE_FIELDS.iter().map(|f| f.to_string()).collect();
        if query.includes_custom_fields() {
            fields.push(CUSTOM_FIELDS.to_string());
        }
        fields.extend(query.included_fields().iter().cloned());

        let excluded = query.excluded_fields();
        if !excluded.is_empty() {
            fields.retain(|field| !excluded.iter().any(|ex| field.contains(ex.as_str())));
        }

        Self(fields)
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    /// Comma-joined value for the `fields` request parameter
    pub fn to_param(&self) -> String {
        self.0.join(",")
    }
}

/// Everything the fetcher needs to run one page of a search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchRequest {
    pub query: String,
    pub limit: usize,
    pub offset: usize,
    pub sort: Option<(String, SortOrder)>,
    pub fields: FieldProjection,
}

impl FetchRequest {
    pub fn from_query(query: &SearchQuery) -> Self {
        Self {
            query: query.render(),
            limit: query.limit(),
            offset: query.offset(),
            sort: query.sort().map(|s| (s.field, s.order)),
            fields: FieldProjection::for_query(query),
        }
    }

    /// `$orderBy` value, e.g. `created desc`
    pub fn order_by(&self) -> Option<String> {
        self.sort
            .as_ref()
            .map(|(field, order)| format!("{} {}", field, order))
    }
}

/// Source of issues for the search engine
#[async_trait]
pub trait IssueFetcher: Send + Sync {
    /// Fetch one page of issues matching the request
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Issue>, FetchError>;
}
