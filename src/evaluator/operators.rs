use crate::rules::{Operator, RuleValue, parse_numeric};
use thiserror::Error;

/// An authored operand that cannot be used with its operator.
#[derive(Error, Debug, Clone, PartialEq)]
pub(super) enum OperandError {
    #[error("operator '{operator}' needs a {expected} value, found {found}")]
    Incompatible {
        operator: Operator,
        expected: &'static str,
        found: &'static str,
    },
}

fn incompatible(operator: Operator, expected: &'static str, found: &RuleValue) -> OperandError {
    OperandError::Incompatible {
        operator,
        expected,
        found: found.type_name(),
    }
}

/// Applies `operator` to a resolved (non-blank) answer.
pub(super) fn apply(
    operator: Operator,
    actual: &str,
    expected: &RuleValue,
) -> Result<bool, OperandError> {
    match operator {
        Operator::Exists => Ok(true),
        Operator::Equals => scalar_eq(operator, actual, expected),
        Operator::NotEquals => scalar_eq(operator, actual, expected).map(|eq| !eq),
        Operator::Contains => {
            let needle = expected
                .as_text()
                .ok_or_else(|| incompatible(operator, "scalar", expected))?;
            Ok(actual.to_lowercase().contains(&needle.trim().to_lowercase()))
        }
        Operator::In => match expected {
            RuleValue::List(items) => {
                for item in items {
                    if scalar_eq(operator, actual, item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            other => Err(incompatible(operator, "list", other)),
        },
        Operator::GreaterThan => compare(operator, actual, expected, |a, b| a > b),
        Operator::LessThan => compare(operator, actual, expected, |a, b| a < b),
    }
}

fn scalar_eq(operator: Operator, actual: &str, expected: &RuleValue) -> Result<bool, OperandError> {
    match expected {
        RuleValue::Bool(flag) => Ok(parse_flag(actual) == Some(*flag)),
        RuleValue::Text(_) | RuleValue::Number(_) => {
            if let (Some(a), Some(b)) = (parse_numeric(actual), expected.as_number()) {
                return Ok(a == b);
            }
            let text = expected.as_text().unwrap_or_default();
            Ok(actual.trim().eq_ignore_ascii_case(text.trim()))
        }
        other => Err(incompatible(operator, "scalar", other)),
    }
}

fn compare<F>(
    operator: Operator,
    actual: &str,
    expected: &RuleValue,
    f: F,
) -> Result<bool, OperandError>
where
    F: Fn(f64, f64) -> bool,
{
    let bound = expected
        .as_number()
        .ok_or_else(|| incompatible(operator, "number", expected))?;
    Ok(parse_numeric(actual).is_some_and(|value| f(value, bound)))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}
