use crate::rules::{Logic, Operator, RuleTrace};
use itertools::Itertools;

/// Formats rule traces into human-readable explanations.
pub struct TraceFormatter;

impl TraceFormatter {
    /// Format an evaluation trace into a human-readable explanation.
    ///
    /// A matched group shows the leaves that decided it (every child of an `AND`,
    /// only the satisfied children of an `OR`). An unmatched group shows the
    /// children that failed it.
    pub fn format_trace(trace: &RuleTrace) -> String {
        Self::format_recursive(trace, true)
    }

    fn format_recursive(trace: &RuleTrace, top_level: bool) -> String {
        match trace {
            RuleTrace::Leaf {
                field,
                operator,
                expected,
                actual,
                ..
            } => {
                let observed = match actual {
                    Some(value) => format!("{} (was {})", field, value),
                    None => format!("{} (missing)", field),
                };
                if *operator == Operator::Exists {
                    format!("{} exists", observed)
                } else {
                    format!("{} {} {}", observed, operator, expected)
                }
            }
            RuleTrace::Group {
                logic,
                children,
                matched,
                ..
            } => {
                let decisive: Vec<&RuleTrace> = match (logic, matched) {
                    (Logic::And, true) | (Logic::Or, false) => children.iter().collect(),
                    (Logic::Or, true) => children.iter().filter(|c| c.matched()).collect(),
                    (Logic::And, false) => children.iter().filter(|c| !c.matched()).collect(),
                };

                if decisive.is_empty() {
                    return format!("empty {}", logic);
                }

                let joined = decisive
                    .iter()
                    .map(|child| Self::format_recursive(child, false))
                    .join(&format!(" {} ", logic));

                // Nested groups are parenthesised only when they contribute more than one term.
                if top_level || decisive.len() == 1 {
                    joined
                } else {
                    format!("({})", joined)
                }
            }
        }
    }
}
