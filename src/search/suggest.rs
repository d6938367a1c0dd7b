//! Query refinements and partial-query completions

use once_cell::sync::Lazy;
use regex::Regex;

/// Fields offered when completing a partially typed field name
pub const KNOWN_FIELDS: [&str; 11] = [
    "project",
    "assignee",
    "reporter",
    "state",
    "priority",
    "type",
    "created",
    "updated",
    "resolved",
    "summary",
    "description",
];

/// Maximum refinements attached to a search response
pub const MAX_REFINEMENTS: usize = 3;

/// Suggestion count used when the caller does not give one
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;

static REFINEMENTS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        ("state", "State: Open"),
        ("assignee", "Assignee: Unassigned"),
        ("created", "created: -7d .. *"),
    ]
    .into_iter()
    .filter_map(|(field, refinement)| {
        Regex::new(&format!(r"(?i)\b{}\s*(!?:|!?~|in\b|not in\b)", field))
            .ok()
            .map(|pattern| (pattern, refinement))
    })
    .collect()
});

static TRAILING_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+):\s*$").expect("trailing field pattern is valid"));

fn known_values(field: &str) -> &'static [&'static str] {
    match field {
        "state" => &["Open", "Fixed", "Verified", "Closed"],
        "priority" => &["Critical", "High", "Normal", "Low"],
        "assignee" => &["Unassigned", "me"],
        _ => &[],
    }
}

/// Narrowing clauses for a rendered query, skipping fields it already filters on
pub fn refinements(rendered: &str) -> Vec<String> {
    REFINEMENTS
        .iter()
        .filter(|(pattern, _)| !pattern.is_match(rendered))
        .map(|(_, refinement)| {
            if rendered.trim() == "*" {
                refinement.to_string()
            } else {
                format!("{} and {}", rendered, refinement)
            }
        })
        .take(MAX_REFINEMENTS)
        .collect()
}

/// Completions for a partially typed query.
///
/// A trailing word that prefixes a known field (not yet used) is replaced
/// by `field:`. A query ending in `field:` for a field with well-known
/// values gets one completion per value.
pub fn completions(partial: &str, limit: usize) -> Vec<String> {
    let mut suggestions = Vec::new();
    let lowered = partial.to_lowercase();
    let words: Vec<&str> = partial.split_whitespace().collect();

    if let Some((last, head)) = words.split_last() {
        let last = last.to_lowercase();
        for field in KNOWN_FIELDS {
            if field.starts_with(&last) && !lowered.contains(field) {
                let mut parts: Vec<String> = head.iter().map(|w| w.to_string()).collect();
                parts.push(format!("{}:", field));
                suggestions.push(parts.join(" "));
            }
        }
    }

    if let Some(captures) = TRAILING_FIELD.captures(partial) {
        let field = captures[1].to_lowercase();
        let base = partial.trim_end();
        for value in known_values(&field) {
            suggestions.push(format!("{} {}", base, value));
        }
    }

    suggestions.truncate(limit);
    suggestions
}
