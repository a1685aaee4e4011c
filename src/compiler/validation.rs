use crate::error::ConfigError;
use crate::flow::document::MAX_RULE_DEPTH;
use crate::flow::{StateKind, StateMachineConfig, TransitionCondition};
use ahash::AHashSet;

/// Checks the structural invariants of a state machine.
///
/// Every configuration, compiled or authored, passes through here before it
/// is handed to the engine: state ids are unique, every transition target
/// resolves, the completion state exists and has no outgoing edges, the
/// initial state exists and has no incoming edges, no non-terminal state is
/// a dead end, and no rule tree nests deeper than [`MAX_RULE_DEPTH`].
pub fn validate(config: &StateMachineConfig) -> Result<(), ConfigError> {
    let mut ids = AHashSet::with_capacity(config.states.len());
    for state in &config.states {
        if !ids.insert(state.id.as_str()) {
            return Err(ConfigError::DuplicateStateId(state.id.clone()));
        }
    }

    if !ids.contains(config.initial_state_id.as_str()) {
        return Err(ConfigError::MissingInitialState(
            config.initial_state_id.clone(),
        ));
    }

    match config.state(&config.completion_state_id) {
        Some(state) if state.kind == StateKind::Completion => {}
        _ => return Err(ConfigError::MissingTerminal(config.id.clone())),
    }

    if let Some(lead_id) = &config.lead_capture_state_id {
        if !ids.contains(lead_id.as_str()) {
            return Err(ConfigError::MissingLeadCapture(lead_id.clone()));
        }
    }

    for state in &config.states {
        if state.is_terminal() {
            if !state.transitions.is_empty() {
                return Err(ConfigError::TerminalHasTransitions(state.id.clone()));
            }
            continue;
        }
        if state.transitions.is_empty() {
            return Err(ConfigError::DeadEnd(state.id.clone()));
        }

        for transition in &state.transitions {
            if !ids.contains(transition.target_state_id.as_str()) {
                return Err(ConfigError::UnresolvedTarget {
                    state_id: state.id.clone(),
                    target_id: transition.target_state_id.clone(),
                });
            }
            if transition.target_state_id == config.initial_state_id {
                return Err(ConfigError::InitialStateHasIncoming {
                    initial_id: config.initial_state_id.clone(),
                    source_id: state.id.clone(),
                });
            }
            if let TransitionCondition::RuleMatch { rule_group } = &transition.condition {
                let depth = rule_group.depth();
                if depth > MAX_RULE_DEPTH {
                    return Err(ConfigError::RuleTooDeep {
                        depth,
                        limit: MAX_RULE_DEPTH,
                    });
                }
            }
        }
    }

    Ok(())
}
