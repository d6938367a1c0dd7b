//! Ready-made queries for common searches

use crate::search::condition::SearchOperator;
use crate::search::error::{SearchError, SearchResult};
use crate::search::query::SearchQuery;
use chrono::{Duration, Local, NaiveDate};

/// Query matching issues by project, assignee and state; unset filters are skipped
pub fn create_issue_search(
    project: Option<&str>,
    assignee: Option<&str>,
    state: Option<&str>,
) -> SearchResult<SearchQuery> {
    let mut query = SearchQuery::new();
    for (field, value) in [("project", project), ("assignee", assignee), ("State", state)] {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            query = query.add_condition(field, SearchOperator::Equals, value)?;
        }
    }
    Ok(query)
}

/// Query for issues whose `field` falls within the last `days_back` days
pub fn create_date_range_search(field: &str, days_back: u32) -> SearchResult<SearchQuery> {
    create_date_range_search_until(field, days_back, Local::now().date_naive())
}

/// Same as [`create_date_range_search`] with an explicit end date
pub fn create_date_range_search_until(
    field: &str,
    days_back: u32,
    until: NaiveDate,
) -> SearchResult<SearchQuery> {
    let from = until
        .checked_sub_signed(Duration::days(i64::from(days_back)))
        .ok_or_else(|| {
            SearchError::InvalidQuery(format!(
                "{} days before {} is out of the supported date range",
                days_back, until
            ))
        })?;
    SearchQuery::new().add_date_range(field, Some(from), Some(until))
}

/// Text query; with explicit fields each one must contain `text`,
/// otherwise summary and description are searched
pub fn create_text_search(text: &str, fields: &[&str]) -> SearchResult<SearchQuery> {
    if fields.is_empty() {
        return Ok(SearchQuery::from_text(text));
    }

    let mut query = SearchQuery::new();
    for field in fields {
        query = query.add_condition(*field, SearchOperator::Contains, text)?;
    }
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_search() {
        let query = create_issue_search(Some("API"), None, Some("Open")).unwrap();
        assert_eq!(query.render(), r#"project : "API" and State : "Open""#);

        let everything = create_issue_search(None, None, None).unwrap();
        assert_eq!(everything.render(), "*");
    }

    #[test]
    fn test_issue_search_bare_assignee() {
        let query = create_issue_search(None, Some("me"), None).unwrap();
        assert_eq!(query.render(), "assignee : me");
    }

    #[test]
    fn test_date_range_search() {
        let until = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        let query = create_date_range_search_until("created", 7, until).unwrap();
        assert_eq!(query.render(), "created: 2024-03-01 .. 2024-03-08");
    }

    #[test]
    fn test_date_range_search_out_of_range() {
        let err = create_date_range_search("created", u32::MAX).unwrap_err();
        assert!(matches!(err, SearchError::InvalidQuery(_)));

        let until = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        assert!(create_date_range_search_until("updated", u32::MAX, until).is_err());
    }

    #[test]
    fn test_text_search() {
        let general = create_text_search("timeout", &[]).unwrap();
        assert_eq!(
            general.render(),
            r#"(summary: "timeout" or description: "timeout")"#
        );

        let scoped = create_text_search("timeout", &["summary", "comments"]).unwrap();
        assert_eq!(
            scoped.render(),
            r#"summary ~ "timeout" and comments ~ "timeout""#
        );
    }
}
