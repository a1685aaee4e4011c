//! Boundary contracts for the collaborators the engine depends on.

use crate::advice::AdviceItem;
use crate::error::StoreError;
use crate::flow::{Choice, CollectedField};
use crate::session::SessionState;
use serde::{Deserialize, Serialize};

/// One value pulled out of a user's message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedPair {
    pub mapping_key: String,
    pub value: String,
}

impl ExtractedPair {
    pub fn new(mapping_key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            mapping_key: mapping_key.into(),
            value: value.into(),
        }
    }
}

/// What an extractor is told about the turn.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRequest<'a> {
    pub text: &'a str,
    /// Fields the current state asks for.
    pub collects: &'a [CollectedField],
    pub choices: &'a [Choice],
    /// Every mapping key of the flow. Values for later states are kept too.
    pub vocabulary: &'a [&'a str],
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub pairs: Vec<ExtractedPair>,
    /// Extractor's confidence in `[0, 1]`.
    pub confidence: f32,
    /// Set when the extractor could not interpret the message at all.
    pub failed: bool,
}

impl ExtractionResult {
    pub fn failed() -> Self {
        Self {
            pairs: Vec::new(),
            confidence: 0.0,
            failed: true,
        }
    }

    pub fn with_pairs(pairs: Vec<ExtractedPair>, confidence: f32) -> Self {
        Self {
            pairs,
            confidence,
            failed: false,
        }
    }

    /// The pairs to merge. A failed extraction contributes nothing, which the
    /// engine treats as an unsatisfied turn.
    pub fn usable_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .filter(|_| !self.failed)
            .map(|p| (p.mapping_key.as_str(), p.value.as_str()))
    }
}

/// Turns free text into key/value pairs.
pub trait FieldExtractor: Send + Sync {
    fn extract(&self, request: &ExtractionRequest<'_>) -> ExtractionResult;
}

/// Matches a message against the current state's choice buttons by label or
/// value, without any language model. Useful for button-only flows and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChoiceExtractor;

impl FieldExtractor for ChoiceExtractor {
    fn extract(&self, request: &ExtractionRequest<'_>) -> ExtractionResult {
        let text = request.text.trim();
        let Some(field) = request.collects.first() else {
            return ExtractionResult::failed();
        };
        let matched = request.choices.iter().find(|choice| {
            choice.label.eq_ignore_ascii_case(text) || choice.value.eq_ignore_ascii_case(text)
        });
        match matched {
            Some(choice) => ExtractionResult::with_pairs(
                vec![ExtractedPair::new(field.mapping_key.clone(), choice.value.clone())],
                1.0,
            ),
            None => ExtractionResult::failed(),
        }
    }
}

/// Persists sessions. Implementations must round-trip `SessionState` exactly.
pub trait SessionStore: Send + Sync {
    fn load(&self, session_id: &str) -> Result<Option<SessionState>, StoreError>;
    fn save(&self, session_id: &str, session: &SessionState) -> Result<(), StoreError>;
}

/// Supplies the advice snapshot for a flow.
pub trait AdviceSource: Send + Sync {
    fn snapshot(&self, flow_id: &str, session: &SessionState) -> Result<Vec<AdviceItem>, StoreError>;
}
