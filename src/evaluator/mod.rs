use crate::flow::{FieldDefinition, StateMachineConfig};
use crate::rules::{Answers, RuleGroup, RuleTrace};
use crate::trace::TraceFormatter;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

mod engine;
mod operators;

use engine::RuleEngine;

/// The result of evaluating one rule group.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub matched: bool,
    /// Sum of the weights of the satisfied leaves; `0.0` when unmatched.
    pub score: f64,
    pub trace: RuleTrace,
}

impl RuleOutcome {
    /// A human-readable explanation of the logic that led to the result.
    pub fn reason(&self) -> String {
        TraceFormatter::format_trace(&self.trace)
    }
}

/// Groups mapping keys that mean the same thing across flows, e.g. the concept
/// `budget` may be `purchase_budget` in one flow and `asking_price` in another.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptMap {
    concepts: AHashMap<String, Vec<String>>,
}

impl ConceptMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the map from the `concept` tags of a flow's field definitions.
    pub fn from_fields(fields: &[FieldDefinition]) -> Self {
        let mut map = Self::new();
        for field in fields {
            if let Some(concept) = &field.concept {
                map.insert(concept, &field.mapping_key);
            }
        }
        map
    }

    /// Builds the map from the `concept` tags on a machine's collected fields.
    pub fn from_config(config: &StateMachineConfig) -> Self {
        let mut map = Self::new();
        for field in config.states.iter().flat_map(|s| &s.collects) {
            if let Some(concept) = &field.concept {
                map.insert(concept, &field.mapping_key);
            }
        }
        map
    }

    /// Appends `mapping_key` to `concept`, keeping insertion order and skipping duplicates.
    pub fn insert(&mut self, concept: &str, mapping_key: &str) {
        let keys = self.concepts.entry(concept.to_string()).or_default();
        if !keys.iter().any(|k| k == mapping_key) {
            keys.push(mapping_key.to_string());
        }
    }

    pub fn keys_for(&self, concept: &str) -> &[String] {
        self.concepts.get(concept).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }
}

/// Evaluates rule groups against an answer map.
///
/// The evaluator holds no mutable state and can be shared across threads. The
/// same inputs always produce the same outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEvaluator<'c> {
    concepts: Option<&'c ConceptMap>,
}

impl<'c> RuleEvaluator<'c> {
    pub fn new() -> Self {
        Self { concepts: None }
    }

    /// Resolves leaves whose key is unanswered through their concept tag.
    pub fn with_concepts(concepts: &'c ConceptMap) -> Self {
        Self {
            concepts: Some(concepts),
        }
    }

    /// Evaluates a rule group.
    ///
    /// A leaf whose answer is missing is unmatched with score 0, except for
    /// `exists`, which is its own test. An `AND` group matches only if every child
    /// does and then scores the sum of its children; an `OR` group matches if any
    /// child does and scores the sum of the matched children. Leaves whose authored
    /// value does not fit their operator are logged and count as unmatched.
    pub fn evaluate(&self, group: &RuleGroup, answers: &Answers) -> RuleOutcome {
        let trace = RuleEngine::new(answers, self.concepts).evaluate_group(group);
        RuleOutcome {
            matched: trace.matched(),
            score: trace.score(),
            trace,
        }
    }

    pub fn matches(&self, group: &RuleGroup, answers: &Answers) -> bool {
        self.evaluate(group, answers).matched
    }
}

/// Evaluates `group` against `answers` without concept resolution.
pub fn evaluate(group: &RuleGroup, answers: &Answers) -> RuleOutcome {
    RuleEvaluator::new().evaluate(group, answers)
}
