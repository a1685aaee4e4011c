//! Transition selection over a `StateMachineConfig`.

use crate::error::TurnError;
use crate::evaluator::{ConceptMap, RuleEvaluator};
use crate::flow::{ConversationState, StateMachineConfig, StateTransition, TransitionCondition};
use crate::rules::{Answers, known_value};
use ahash::AHashMap;
use tracing::{debug, error};

mod cascade;

pub use cascade::Cascade;

/// Failed-turn counters keyed by state id.
pub type AttemptCounters = AHashMap<String, u32>;

/// Chooses the next state from the current one. Holds only shared references,
/// so one configuration serves any number of sessions concurrently.
#[derive(Debug, Clone, Copy)]
pub struct TransitionEngine<'a> {
    config: &'a StateMachineConfig,
    evaluator: RuleEvaluator<'a>,
    max_hops: usize,
}

impl<'a> TransitionEngine<'a> {
    pub fn new(config: &'a StateMachineConfig) -> Self {
        Self {
            config,
            evaluator: RuleEvaluator::new(),
            max_hops: config.states.len(),
        }
    }

    pub fn with_concepts(mut self, concepts: &'a ConceptMap) -> Self {
        self.evaluator = RuleEvaluator::with_concepts(concepts);
        self
    }

    /// Overrides the cascading-skip guard, which defaults to the number of states.
    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    pub fn config(&self) -> &'a StateMachineConfig {
        self.config
    }

    /// Looks up a state. A miss here means the configuration and the session
    /// disagree, which validation should have made impossible.
    pub fn state(&self, id: &str) -> Result<&'a ConversationState, TurnError> {
        self.config.state(id).ok_or_else(|| {
            error!(
                flow_id = %self.config.id,
                state_id = %id,
                "Turn referenced a state that does not exist in the configuration"
            );
            TurnError::UnknownState {
                flow_id: self.config.id.clone(),
                state_id: id.to_string(),
            }
        })
    }

    pub fn condition_holds(
        &self,
        state_id: &str,
        condition: &TransitionCondition,
        answers: &Answers,
        attempts: &AttemptCounters,
    ) -> bool {
        match condition {
            TransitionCondition::Always => true,
            TransitionCondition::DataCollected { mapping_keys } => mapping_keys
                .iter()
                .all(|key| known_value(answers, key).is_some()),
            TransitionCondition::RuleMatch { rule_group } => {
                self.evaluator.matches(rule_group, answers)
            }
            TransitionCondition::AttemptsExceeded { n } => {
                attempts.get(state_id).copied().unwrap_or(0) > *n
            }
        }
    }

    /// The first transition, in ascending priority with ties broken by array
    /// index, whose condition holds.
    pub fn select_transition(
        &self,
        state: &'a ConversationState,
        answers: &Answers,
        attempts: &AttemptCounters,
    ) -> Option<&'a StateTransition> {
        let selected = state
            .ordered_transitions()
            .into_iter()
            .find(|t| self.condition_holds(&state.id, &t.condition, answers, attempts));
        match selected {
            Some(t) => debug!(
                state_id = %state.id,
                target = %t.target_state_id,
                priority = t.priority,
                "Transition selected on {}",
                t.condition
            ),
            None => debug!(state_id = %state.id, "No transition condition holds"),
        }
        selected
    }

    /// The first `AttemptsExceeded` transition that holds, used once a state has
    /// used up its attempts.
    pub fn stall_transition(
        &self,
        state: &'a ConversationState,
        answers: &Answers,
        attempts: &AttemptCounters,
    ) -> Option<&'a StateTransition> {
        state.ordered_transitions().into_iter().find(|t| {
            matches!(t.condition, TransitionCondition::AttemptsExceeded { .. })
                && self.condition_holds(&state.id, &t.condition, answers, attempts)
        })
    }
}
