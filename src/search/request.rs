//! Mapping of tool-call arguments onto search queries

use crate::search::condition::{ConditionValue, Scalar, SearchCondition, SearchOperator};
use crate::search::error::{SearchError, SearchResult};
use crate::search::query::{SearchQuery, SortOrder, DEFAULT_LIMIT};
use chrono::{Duration, Local, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

static RELATIVE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-(\d+)([dwmy])$").expect("relative date pattern is valid"));

/// Resolve `-Nd`, `-Nw`, `-Nm`, `-Ny` against `today`, or parse `YYYY-MM-DD`
pub fn parse_date(input: &str, today: NaiveDate) -> SearchResult<NaiveDate> {
    let input = input.trim();
    let invalid = || {
        SearchError::InvalidQuery(format!(
            "invalid date '{}': expected YYYY-MM-DD or a relative offset like -7d",
            input
        ))
    };

    if let Some(captures) = RELATIVE_DATE.captures(input) {
        let amount: u32 = captures[1].parse().map_err(|_| invalid())?;
        let resolved = match &captures[2] {
            "d" => today.checked_sub_signed(Duration::days(i64::from(amount))),
            "w" => today.checked_sub_signed(Duration::weeks(i64::from(amount))),
            "m" => today.checked_sub_months(Months::new(amount)),
            _ => amount
                .checked_mul(12)
                .and_then(|months| today.checked_sub_months(Months::new(months))),
        };
        return resolved.ok_or_else(invalid);
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| invalid())
}

fn parse_optional_date(input: Option<&str>, today: NaiveDate) -> SearchResult<Option<NaiveDate>> {
    input
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse_date(s, today))
        .transpose()
}

fn clamp_limit(limit: Option<i64>) -> usize {
    limit
        .map(|l| l.clamp(1, 1000) as usize)
        .unwrap_or(DEFAULT_LIMIT)
}

fn clamp_offset(offset: Option<i64>) -> usize {
    offset.map(|o| o.max(0) as usize).unwrap_or(0)
}

fn parse_sort_order(order: Option<&str>) -> SearchResult<SortOrder> {
    order
        .map(SortOrder::from_str)
        .transpose()
        .map(Option::unwrap_or_default)
}

/// Arguments of the intelligent search tool
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IntelligentSearchRequest {
    pub query_text: Option<String>,
    pub project: Option<String>,
    pub assignee: Option<String>,
    pub state: Option<String>,
    pub priority: Option<String>,
    pub created_after: Option<String>,
    pub created_before: Option<String>,
    pub updated_after: Option<String>,
    pub updated_before: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub include_resolved: Option<bool>,
    pub include_archived: Option<bool>,
}

impl IntelligentSearchRequest {
    /// Build the query, resolving relative dates against the local date
    pub fn into_query(self) -> SearchResult<SearchQuery> {
        self.into_query_at(Local::now().date_naive())
    }

    /// Build the query, resolving relative dates against `today`.
    ///
    /// Archived projects are excluded unless asked for. Only one of the
    /// created and updated windows may be given.
    pub fn into_query_at(self, today: NaiveDate) -> SearchResult<SearchQuery> {
        let mut query = SearchQuery::new();

        for (field, value) in [
            ("project", &self.project),
            ("assignee", &self.assignee),
            ("State", &self.state),
            ("Priority", &self.priority),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                query = query.add_condition(field, SearchOperator::Equals, value)?;
            }
        }

        if let Some(text) = &self.query_text {
            query = query.add_text_search(text.clone());
        }

        let created = (
            parse_optional_date(self.created_after.as_deref(), today)?,
            parse_optional_date(self.created_before.as_deref(), today)?,
        );
        let updated = (
            parse_optional_date(self.updated_after.as_deref(), today)?,
            parse_optional_date(self.updated_before.as_deref(), today)?,
        );
        let has_created = created.0.is_some() || created.1.is_some();
        let has_updated = updated.0.is_some() || updated.1.is_some();

        match (has_created, has_updated) {
            (true, true) => {
                return Err(SearchError::InvalidQuery(
                    "created and updated date windows cannot be combined".to_string(),
                ))
            }
            (true, false) => query = query.add_date_range("created", created.0, created.1)?,
            (false, true) => query = query.add_date_range("updated", updated.0, updated.1)?,
            (false, false) => {}
        }

        if let Some(sort_by) = &self.sort_by {
            query = query.set_sorting(sort_by.clone(), parse_sort_order(self.sort_order.as_deref())?);
        }

        Ok(query
            .set_pagination(clamp_limit(self.limit), clamp_offset(self.offset))
            .with_resolved(self.include_resolved.unwrap_or(true))
            .with_archived(self.include_archived.unwrap_or(false)))
    }
}

/// One condition of the query builder tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConditionSpec {
    pub field: String,
    /// Operator token (`:`, `!~`, `not in`, ...) or name (`equals`, `not_in`, ...)
    pub operator: String,
    pub value: Value,
    #[serde(default)]
    pub negated: bool,
}

impl ConditionSpec {
    pub fn to_condition(&self) -> SearchResult<SearchCondition> {
        let operator = SearchOperator::from_str(self.operator.trim()).map_err(|_| {
            SearchError::InvalidCondition(format!("unknown operator '{}'", self.operator))
        })?;
        let value = json_to_value(&self.field, &self.value)?;

        if self.negated {
            SearchCondition::negated(self.field.clone(), operator, value)
        } else {
            SearchCondition::new(self.field.clone(), operator, value)
        }
    }
}

fn json_to_scalar(field: &str, value: &Value) -> SearchResult<Scalar> {
    match value {
        Value::String(s) => Ok(Scalar::Text(s.clone())),
        Value::Bool(b) => Ok(Scalar::Bool(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(Scalar::Integer)
            .or_else(|| n.as_f64().map(Scalar::Float))
            .ok_or_else(|| {
                SearchError::InvalidCondition(format!("unsupported number for field '{}'", field))
            }),
        _ => Err(SearchError::InvalidCondition(format!(
            "unsupported value for field '{}': {}",
            field, value
        ))),
    }
}

fn json_to_value(field: &str, value: &Value) -> SearchResult<ConditionValue> {
    match value {
        Value::Array(items) => Ok(ConditionValue::List(
            items
                .iter()
                .map(|item| json_to_scalar(field, item))
                .collect::<SearchResult<Vec<_>>>()?,
        )),
        other => Ok(ConditionValue::Scalar(json_to_scalar(field, other)?)),
    }
}

/// Arguments of the structured query builder tool
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueryBuilderRequest {
    pub conditions: Vec<ConditionSpec>,
    pub text: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl QueryBuilderRequest {
    pub fn into_query(self) -> SearchResult<SearchQuery> {
        let mut query = SearchQuery::new();
        for spec in &self.conditions {
            query = query.with_condition(spec.to_condition()?);
        }
        if let Some(text) = self.text {
            query = query.add_text_search(text);
        }
        if let Some(sort_by) = self.sort_by {
            query = query.set_sorting(sort_by, parse_sort_order(self.sort_order.as_deref())?);
        }
        Ok(query.set_pagination(clamp_limit(self.limit), clamp_offset(self.offset)))
    }
}
