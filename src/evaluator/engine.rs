use super::ConceptMap;
use super::operators;
use crate::rules::{Answers, Condition, Logic, Operator, Rule, RuleGroup, RuleTrace, known_value};
use tracing::warn;

/// The recursive engine that evaluates one rule tree against one answer map.
pub(super) struct RuleEngine<'a> {
    answers: &'a Answers,
    concepts: Option<&'a ConceptMap>,
}

impl<'a> RuleEngine<'a> {
    pub(super) fn new(answers: &'a Answers, concepts: Option<&'a ConceptMap>) -> Self {
        Self { answers, concepts }
    }

    /// Evaluates every child in array order. No short-circuiting, so the trace
    /// always covers the whole tree.
    pub(super) fn evaluate_group(&self, group: &RuleGroup) -> RuleTrace {
        let children: Vec<RuleTrace> = group
            .rules
            .iter()
            .map(|rule| match rule {
                Rule::Group(nested) => self.evaluate_group(nested),
                Rule::Leaf(condition) => self.evaluate_leaf(condition),
            })
            .collect();

        let (matched, score): (bool, f64) = match group.logic {
            Logic::And => {
                if children.iter().all(RuleTrace::matched) {
                    (true, children.iter().map(RuleTrace::score).sum())
                } else {
                    (false, 0.0)
                }
            }
            Logic::Or => {
                let satisfied: Vec<&RuleTrace> = children.iter().filter(|c| c.matched()).collect();
                if satisfied.is_empty() {
                    (false, 0.0)
                } else {
                    (true, satisfied.iter().map(|c| c.score()).sum())
                }
            }
        };

        RuleTrace::Group {
            logic: group.logic,
            children,
            matched,
            score,
        }
    }

    fn evaluate_leaf(&self, condition: &Condition) -> RuleTrace {
        let actual = self.resolve(condition);

        let matched = match (condition.operator, actual) {
            (Operator::Exists, found) => found.is_some(),
            (_, None) => false,
            (operator, Some(value)) => match operators::apply(operator, value, &condition.value) {
                Ok(result) => result,
                Err(e) => {
                    warn!(
                        mapping_key = %condition.field.mapping_key,
                        "Malformed rule leaf treated as unmatched: {}", e
                    );
                    false
                }
            },
        };

        RuleTrace::Leaf {
            field: condition.field.clone(),
            operator: condition.operator,
            expected: condition.value.clone(),
            actual: actual.map(str::to_string),
            matched,
            score: if matched { condition.weight } else { 0.0 },
        }
    }

    /// Reads the leaf's own key first, then any key sharing its concept.
    fn resolve(&self, condition: &Condition) -> Option<&'a str> {
        if let Some(value) = known_value(self.answers, &condition.field.mapping_key) {
            return Some(value);
        }
        let concept = condition.field.concept.as_deref()?;
        self.concepts?
            .keys_for(concept)
            .iter()
            .find_map(|key| known_value(self.answers, key))
    }
}
