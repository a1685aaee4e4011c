use super::{FieldRef, Logic, Operator, RuleValue};

/// A record of how a rule tree was evaluated, leaf by leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleTrace {
    Group {
        logic: Logic,
        children: Vec<RuleTrace>,
        matched: bool,
        score: f64,
    },
    Leaf {
        field: FieldRef,
        operator: Operator,
        expected: RuleValue,
        /// The answer the leaf resolved to, if any.
        actual: Option<String>,
        matched: bool,
        score: f64,
    },
}

impl RuleTrace {
    pub fn matched(&self) -> bool {
        match self {
            RuleTrace::Group { matched, .. } | RuleTrace::Leaf { matched, .. } => *matched,
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            RuleTrace::Group { score, .. } | RuleTrace::Leaf { score, .. } => *score,
        }
    }
}
