use serde::{Deserialize, Serialize};
use std::fmt;

/// Literal operand of a rule condition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum RuleValue {
    Text(String),
    Number(f64),
    Bool(bool),
    List(Vec<RuleValue>),
    #[default]
    Null,
}

impl RuleValue {
    /// Numeric view of the value. Text is accepted when it reads as an amount.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RuleValue::Number(n) => Some(*n),
            RuleValue::Text(s) => parse_numeric(s),
            _ => None,
        }
    }

    /// Scalar text view of the value. Lists and null have none.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RuleValue::Text(s) => Some(s.clone()),
            RuleValue::Number(_) | RuleValue::Bool(_) => Some(self.to_string()),
            RuleValue::List(_) | RuleValue::Null => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RuleValue::Text(_) => "text",
            RuleValue::Number(_) => "number",
            RuleValue::Bool(_) => "bool",
            RuleValue::List(_) => "list",
            RuleValue::Null => "null",
        }
    }
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleValue::Text(s) => write!(f, "\"{}\"", s),
            RuleValue::Number(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            RuleValue::Bool(b) => write!(f, "{}", b),
            RuleValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            RuleValue::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for RuleValue {
    fn from(value: &str) -> Self {
        RuleValue::Text(value.to_string())
    }
}

impl From<String> for RuleValue {
    fn from(value: String) -> Self {
        RuleValue::Text(value)
    }
}

impl From<f64> for RuleValue {
    fn from(value: f64) -> Self {
        RuleValue::Number(value)
    }
}

impl From<i64> for RuleValue {
    fn from(value: i64) -> Self {
        RuleValue::Number(value as f64)
    }
}

impl From<i32> for RuleValue {
    fn from(value: i32) -> Self {
        RuleValue::Number(value as f64)
    }
}

impl From<bool> for RuleValue {
    fn from(value: bool) -> Self {
        RuleValue::Bool(value)
    }
}

impl<T: Into<RuleValue>> From<Vec<T>> for RuleValue {
    fn from(values: Vec<T>) -> Self {
        RuleValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Comparison applied by a leaf condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    In,
    GreaterThan,
    LessThan,
    Exists,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equals => "==",
            Operator::NotEquals => "!=",
            Operator::Contains => "contains",
            Operator::In => "in",
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
            Operator::Exists => "exists",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Boolean combinator of a rule group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Logic {
    And,
    Or,
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Logic::And => f.write_str("AND"),
            Logic::Or => f.write_str("OR"),
        }
    }
}

/// The answer a condition reads: a mapping key, optionally tagged with a concept
/// so the same rule can match equivalent keys in other flows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRef {
    pub mapping_key: String,
    #[serde(default)]
    pub concept: Option<String>,
}

impl FieldRef {
    pub fn key(mapping_key: impl Into<String>) -> Self {
        Self {
            mapping_key: mapping_key.into(),
            concept: None,
        }
    }

    pub fn with_concept(mut self, concept: impl Into<String>) -> Self {
        self.concept = Some(concept.into());
        self
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.concept {
            Some(concept) if concept != &self.mapping_key => {
                write!(f, "${}<{}>", self.mapping_key, concept)
            }
            _ => write!(f, "${}", self.mapping_key),
        }
    }
}

/// Reads a free-text amount such as `"$600,000"`, `"600k"` or `"1.2m"`.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches(['$', '€', '£'])
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | ' '))
        .collect::<String>()
        .to_lowercase();

    let (digits, multiplier) = if let Some(stripped) = cleaned.strip_suffix('k') {
        (stripped, 1_000.0)
    } else if let Some(stripped) = cleaned.strip_suffix('m') {
        (stripped, 1_000_000.0)
    } else {
        (cleaned.as_str(), 1.0)
    };

    digits
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(|n| n * multiplier)
}
