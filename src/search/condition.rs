//! Single search predicates and their textual rendering

use crate::search::error::{SearchError, SearchResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Values rendered bare for `:` and `!:` instead of being quoted
const BARE_KEYWORDS: [&str; 3] = ["unassigned", "me", "*"];

/// Query language operators
///
/// `Display` yields the operator token used in rendered queries; `FromStr`
/// accepts the token as well as the snake_case operator name.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(ascii_case_insensitive)]
pub enum SearchOperator {
    #[strum(to_string = ":", serialize = "equals")]
    Equals,
    #[strum(to_string = "!:", serialize = "not_equals")]
    NotEquals,
    #[strum(to_string = "~", serialize = "contains")]
    Contains,
    #[strum(to_string = "!~", serialize = "not_contains")]
    NotContains,
    #[strum(to_string = ">", serialize = "gt")]
    GreaterThan,
    #[strum(to_string = "<", serialize = "lt")]
    LessThan,
    #[strum(to_string = ">=", serialize = "ge")]
    GreaterEqual,
    #[strum(to_string = "<=", serialize = "le")]
    LessEqual,
    #[strum(to_string = "in")]
    In,
    #[strum(to_string = "not in", serialize = "not_in")]
    NotIn,
    #[strum(to_string = "has")]
    Has,
    #[strum(to_string = "!has", serialize = "not_has")]
    NotHas,
}

impl SearchOperator {
    /// Whether this is already the negative form of an operator
    pub fn is_negative(self) -> bool {
        matches!(
            self,
            SearchOperator::NotEquals
                | SearchOperator::NotContains
                | SearchOperator::NotIn
                | SearchOperator::NotHas
        )
    }

    /// Whether the operator takes a parenthesized value list
    pub fn is_membership(self) -> bool {
        matches!(self, SearchOperator::In | SearchOperator::NotIn)
    }

    /// Logical complement of a positive operator.
    ///
    /// Negative forms are returned unchanged: negating `!:` stays `!:`.
    pub fn negated(self) -> Self {
        match self {
            SearchOperator::Equals => SearchOperator::NotEquals,
            SearchOperator::Contains => SearchOperator::NotContains,
            SearchOperator::In => SearchOperator::NotIn,
            SearchOperator::Has => SearchOperator::NotHas,
            SearchOperator::GreaterThan => SearchOperator::LessEqual,
            SearchOperator::LessThan => SearchOperator::GreaterEqual,
            SearchOperator::GreaterEqual => SearchOperator::LessThan,
            SearchOperator::LessEqual => SearchOperator::GreaterThan,
            negative => negative,
        }
    }
}

/// A single value a condition compares against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Render the value, quoting text
    fn render_quoted(&self) -> String {
        match self {
            Scalar::Text(text) => quote(text),
            other => other.to_string(),
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(value) => write!(f, "{}", value),
            Scalar::Integer(value) => write!(f, "{}", value),
            Scalar::Float(value) => write!(f, "{}", value),
            Scalar::Text(value) => f.write_str(value),
        }
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident via $conv:expr),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Scalar::$variant($conv(value))
                }
            }

            impl From<$ty> for ConditionValue {
                fn from(value: $ty) -> Self {
                    ConditionValue::Scalar(Scalar::from(value))
                }
            }
        )*
    };
}

scalar_from! {
    &str => Text via |v: &str| v.to_string(),
    String => Text via |v: String| v,
    &String => Text via |v: &String| v.clone(),
    bool => Bool via |v: bool| v,
    i32 => Integer via i64::from,
    i64 => Integer via |v: i64| v,
    u32 => Integer via i64::from,
    f64 => Float via |v: f64| v,
}

/// Right-hand side of a condition: one scalar or a list of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl From<Scalar> for ConditionValue {
    fn from(value: Scalar) -> Self {
        ConditionValue::Scalar(value)
    }
}

impl<T: Into<Scalar>> From<Vec<T>> for ConditionValue {
    fn from(values: Vec<T>) -> Self {
        ConditionValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Scalar>, const N: usize> From<[T; N]> for ConditionValue {
    fn from(values: [T; N]) -> Self {
        ConditionValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// One predicate of a search query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchCondition {
    field: String,
    operator: SearchOperator,
    value: ConditionValue,
    negated: bool,
}

impl SearchCondition {
    /// Create a condition, rejecting operator/value combinations that
    /// cannot be rendered
    pub fn new(
        field: impl Into<String>,
        operator: SearchOperator,
        value: impl Into<ConditionValue>,
    ) -> SearchResult<Self> {
        Self::build(field.into(), operator, value.into(), false)
    }

    /// Create a negated condition
    pub fn negated(
        field: impl Into<String>,
        operator: SearchOperator,
        value: impl Into<ConditionValue>,
    ) -> SearchResult<Self> {
        Self::build(field.into(), operator, value.into(), true)
    }

    fn build(
        field: String,
        operator: SearchOperator,
        value: ConditionValue,
        negated: bool,
    ) -> SearchResult<Self> {
        let field = field.trim().to_string();
        if field.is_empty() {
            return Err(SearchError::InvalidCondition(
                "field name must not be empty".to_string(),
            ));
        }

        match &value {
            ConditionValue::Scalar(_) if operator.is_membership() => {
                return Err(SearchError::InvalidCondition(format!(
                    "operator '{}' on field '{}' requires a list value",
                    operator, field
                )));
            }
            ConditionValue::List(values) if values.is_empty() => {
                return Err(SearchError::InvalidCondition(format!(
                    "empty value list for field '{}'",
                    field
                )));
            }
            _ => {}
        }

        Ok(Self {
            field,
            operator,
            value,
            negated,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn operator(&self) -> SearchOperator {
        self.operator
    }

    pub fn value(&self) -> &ConditionValue {
        &self.value
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Operator actually written to the query after applying negation
    pub fn effective_operator(&self) -> SearchOperator {
        if self.negated {
            self.operator.negated()
        } else {
            self.operator
        }
    }

    /// Render the condition in the tracker's query language
    pub fn render(&self) -> String {
        let op = self.effective_operator();

        match &self.value {
            ConditionValue::List(values) if op.is_membership() => {
                let rendered: Vec<String> = values.iter().map(Scalar::render_quoted).collect();
                format!("{} {} ({})", self.field, op, rendered.join(", "))
            }
            ConditionValue::List(values) => {
                let clauses: Vec<String> = values
                    .iter()
                    .map(|value| format!("{} {} {}", self.field, op, value.render_quoted()))
                    .collect();
                format!("({})", clauses.join(" or "))
            }
            ConditionValue::Scalar(value) => {
                let bare = matches!(op, SearchOperator::Equals | SearchOperator::NotEquals)
                    && value
                        .as_text()
                        .map(|text| {
                            BARE_KEYWORDS
                                .iter()
                                .any(|keyword| text.eq_ignore_ascii_case(keyword))
                        })
                        .unwrap_or(false);

                if bare {
                    format!("{} {} {}", self.field, op, value)
                } else {
                    format!("{} {} {}", self.field, op, value.render_quoted())
                }
            }
        }
    }
}

impl fmt::Display for SearchCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Wrap text in double quotes, escaping embedded quotes
pub(crate) fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\\\""))
}
