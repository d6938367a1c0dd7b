//! Page-local facet counts

use crate::search::result::{Facets, Issue};
use serde_json::Value;
use std::collections::BTreeMap;

/// Fields grouped into facets
pub const FACET_FIELDS: [&str; 5] = ["project", "assignee", "State", "Priority", "Type"];

/// Label used for a field that is present but empty
pub const EMPTY_VALUE: &str = "Unassigned";

/// Count issues per value of each facet field.
///
/// Counts cover only the given page. Fields no issue carries are left out.
pub fn compute_facets(issues: &[Issue]) -> Facets {
    let mut facets = Facets::new();

    for field in FACET_FIELDS {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for issue in issues {
            if let Some(value) = facet_value(issue, field) {
                *counts.entry(value).or_insert(0) += 1;
            }
        }
        if !counts.is_empty() {
            facets.insert(field.to_string(), counts);
        }
    }

    facets
}

/// Value of `field` on an issue: a top-level field first, then a custom field
/// of that name
fn facet_value(issue: &Issue, field: &str) -> Option<String> {
    if let Some(value) = issue.get(field) {
        return Some(display_value(value));
    }

    issue
        .get("customFields")
        .and_then(Value::as_array)?
        .iter()
        .find(|custom| custom.get("name").and_then(Value::as_str) == Some(field))
        .map(|custom| display_value(custom.get("value").unwrap_or(&Value::Null)))
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => EMPTY_VALUE.to_string(),
        Value::String(s) => s.clone(),
        Value::Object(map) => ["name", "shortName", "login", "presentation", "text"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| EMPTY_VALUE.to_string()),
        Value::Array(items) => {
            let names: Vec<String> = items.iter().map(display_value).collect();
            names.join(", ")
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn issue(value: Value) -> Issue {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_facets_over_page() {
        let issues = vec![
            issue(json!({
                "idReadable": "API-1",
                "project": {"name": "API", "shortName": "API"},
                "assignee": {"login": "jane", "name": "Jane"},
                "customFields": [
                    {"name": "State", "value": {"name": "Open"}},
                    {"name": "Priority", "value": {"name": "High"}}
                ]
            })),
            issue(json!({
                "idReadable": "API-2",
                "project": {"name": "API"},
                "assignee": null,
                "customFields": [
                    {"name": "State", "value": {"name": "Open"}},
                    {"name": "Priority", "value": null}
                ]
            })),
        ];

        let facets = compute_facets(&issues);
        assert_eq!(facets["project"]["API"], 2);
        assert_eq!(facets["assignee"]["Jane"], 1);
        assert_eq!(facets["assignee"][EMPTY_VALUE], 1);
        assert_eq!(facets["State"]["Open"], 2);
        assert_eq!(facets["Priority"]["High"], 1);
        assert!(!facets.contains_key("Type"));
    }

    #[test]
    fn test_empty_page_has_no_facets() {
        assert!(compute_facets(&[]).is_empty());
    }
}
