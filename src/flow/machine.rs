use super::{Choice, InputKind};
use crate::rules::{Answers, RuleGroup, known_value};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const LEAD_CAPTURE_STATE_ID: &str = "lead_capture";
pub const COMPLETION_STATE_ID: &str = "completion";

/// The role a state plays in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    DataCollection,
    LeadCapture,
    Completion,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DataCollection => "data_collection",
            Self::LeadCapture => "lead_capture",
            Self::Completion => "completion",
        };
        write!(f, "{s}")
    }
}

/// One answer a state asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedField {
    pub mapping_key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_required")]
    pub required: bool,
    /// Semantic tag shared with equivalent keys of other flows.
    #[serde(default)]
    pub concept: Option<String>,
}

fn default_required() -> bool {
    true
}

/// The guard on a transition edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TransitionCondition {
    Always,
    /// True iff every key is present and non-empty in the answers.
    DataCollected { mapping_keys: Vec<String> },
    RuleMatch { rule_group: RuleGroup },
    /// True once the source state's attempt counter exceeds `n`.
    AttemptsExceeded { n: u32 },
}

impl fmt::Display for TransitionCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "always"),
            Self::DataCollected { mapping_keys } => {
                write!(f, "collected[{}]", mapping_keys.join(", "))
            }
            Self::RuleMatch { rule_group } => {
                write!(f, "rule({} over {} rules)", rule_group.logic, rule_group.rules.len())
            }
            Self::AttemptsExceeded { n } => write!(f, "attempts > {}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateTransition {
    pub target_state_id: String,
    pub condition: TransitionCondition,
    /// Lower evaluates first; equal priorities fall back to array order.
    pub priority: i32,
}

impl StateTransition {
    pub fn new(target_state_id: impl Into<String>, condition: TransitionCondition, priority: i32) -> Self {
        Self {
            target_state_id: target_state_id.into(),
            condition,
            priority,
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

/// A node of the conversation state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    pub id: String,
    pub kind: StateKind,
    pub order: i32,
    #[serde(default)]
    pub collects: Vec<CollectedField>,
    pub prompt: String,
    #[serde(default)]
    pub input_kind: InputKind,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub transitions: Vec<StateTransition>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub skip_if_already_known: bool,
}

impl ConversationState {
    pub fn is_terminal(&self) -> bool {
        self.kind == StateKind::Completion
    }

    /// Transitions in evaluation order: ascending priority, ties by array index.
    pub fn ordered_transitions(&self) -> Vec<&StateTransition> {
        self.transitions
            .iter()
            .sorted_by_key(|t| t.priority)
            .collect()
    }

    /// Required collects that have no answer yet.
    pub fn missing_required(&self, answers: &Answers) -> Vec<String> {
        self.collects
            .iter()
            .filter(|c| c.required && known_value(answers, &c.mapping_key).is_none())
            .map(|c| c.mapping_key.clone())
            .collect()
    }

    /// Every required collect is answered.
    pub fn is_satisfied(&self, answers: &Answers) -> bool {
        self.missing_required(answers).is_empty()
    }

    /// Every collect, required or not, is answered. A state that collects
    /// nothing is never "already known".
    pub fn is_already_known(&self, answers: &Answers) -> bool {
        !self.collects.is_empty()
            && self
                .collects
                .iter()
                .all(|c| known_value(answers, &c.mapping_key).is_some())
    }
}

/// A compiled or authored flow: states plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMachineConfig {
    pub id: String,
    pub version: u32,
    pub initial_state_id: String,
    pub states: Vec<ConversationState>,
    #[serde(default)]
    pub lead_capture_state_id: Option<String>,
    pub completion_state_id: String,
}

impl StateMachineConfig {
    pub fn state(&self, id: &str) -> Option<&ConversationState> {
        self.states.iter().find(|s| s.id == id)
    }

    pub fn initial_state(&self) -> Option<&ConversationState> {
        self.state(&self.initial_state_id)
    }

    /// Every mapping key any state collects, in state order without duplicates.
    pub fn vocabulary(&self) -> Vec<&str> {
        self.states
            .iter()
            .flat_map(|s| s.collects.iter().map(|c| c.mapping_key.as_str()))
            .unique()
            .collect()
    }
}
