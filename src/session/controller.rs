use super::{SessionState, SessionStatus, StayReason, TurnOutcome};
use crate::engine::TransitionEngine;
use crate::error::TurnError;
use crate::flow::StateMachineConfig;
use crate::rules::Answers;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// Drives one conversation turn by turn.
///
/// The controller mutates the session it is given. Callers that persist
/// sessions should run it on a copy and keep the copy only once it is saved.
#[derive(Debug, Clone, Copy)]
pub struct SessionController<'a> {
    engine: TransitionEngine<'a>,
}

impl<'a> SessionController<'a> {
    pub fn new(config: &'a StateMachineConfig) -> Self {
        Self {
            engine: TransitionEngine::new(config),
        }
    }

    pub fn with_engine(engine: TransitionEngine<'a>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &TransitionEngine<'a> {
        &self.engine
    }

    /// Opens a session at the initial state. Answers already known from
    /// elsewhere are merged first, and the cascading skip moves the session
    /// past every state they satisfy. The outcome reports where it landed.
    pub fn start(
        &self,
        session_id: impl Into<String>,
        prefilled: Answers,
        now: DateTime<Utc>,
    ) -> Result<(SessionState, TurnOutcome), TurnError> {
        let config = self.engine.config();
        let mut session = SessionState::new(session_id, config, now);
        session.merge_answers(prefilled);

        let cascade = self.engine.resolve_cascade(
            &config.initial_state_id,
            &session.answers,
            &session.attempt_counters,
        )?;
        let landed = self.engine.state(&cascade.landed)?;
        session.enter(&landed.id, now);

        info!(
            session_id = %session.session_id,
            flow_id = %config.id,
            state_id = %session.current_state_id,
            skipped = cascade.skipped.len(),
            "Session started"
        );
        let outcome = if landed.is_terminal() {
            session.status = SessionStatus::Completed;
            TurnOutcome::Completed
        } else {
            TurnOutcome::Advanced {
                new_state_id: landed.id.clone(),
                skipped: cascade.skipped,
            }
        };
        Ok((session, outcome))
    }

    /// Applies one user turn.
    ///
    /// 1. The extracted pairs are merged into the answers.
    /// 2. If the current state still misses required answers its attempt
    ///    counter goes up. Within `max_attempts` the state is prompted again;
    ///    past it, an `AttemptsExceeded` edge is taken if one holds.
    /// 3. Otherwise the first holding transition in priority order is taken.
    /// 4. From the target, states that are skip-if-known and already answered
    ///    are passed through in the same turn.
    pub fn apply_turn<I, K, V>(
        &self,
        session: &mut SessionState,
        pairs: I,
        now: DateTime<Utc>,
    ) -> Result<TurnOutcome, TurnError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        match session.status {
            SessionStatus::Active => {}
            SessionStatus::Completed => return Ok(TurnOutcome::Completed),
            SessionStatus::Abandoned => {
                return Err(TurnError::SessionClosed {
                    session_id: session.session_id.clone(),
                    status: session.status.to_string(),
                });
            }
        }

        let config = self.engine.config();
        if session.config_version != config.version {
            warn!(
                session_id = %session.session_id,
                from = session.config_version,
                to = config.version,
                "Session continues on a newer configuration version"
            );
            session.config_version = config.version;
        }

        let stored = session.merge_answers(pairs);
        session.touch(now);
        debug!(session_id = %session.session_id, stored, "Merged extracted answers");

        let state = self.engine.state(&session.current_state_id)?;
        if state.is_terminal() {
            session.status = SessionStatus::Completed;
            return Ok(TurnOutcome::Completed);
        }

        let transition = if !state.is_satisfied(&session.answers) {
            let attempts = session.record_attempt(&state.id);
            if attempts <= state.max_attempts {
                return Ok(TurnOutcome::Stayed {
                    state_id: state.id.clone(),
                    reason: StayReason::MissingData {
                        missing: state.missing_required(&session.answers),
                    },
                });
            }
            match self
                .engine
                .stall_transition(state, &session.answers, &session.attempt_counters)
            {
                Some(t) => {
                    info!(
                        session_id = %session.session_id,
                        state_id = %state.id,
                        attempts,
                        "Attempts exceeded, forcing transition to '{}'",
                        t.target_state_id
                    );
                    t
                }
                None => {
                    warn!(
                        session_id = %session.session_id,
                        state_id = %state.id,
                        attempts,
                        "State stalled with no fallback transition; prompting again"
                    );
                    return Ok(TurnOutcome::Stayed {
                        state_id: state.id.clone(),
                        reason: StayReason::AttemptsExhausted { attempts },
                    });
                }
            }
        } else {
            match self
                .engine
                .select_transition(state, &session.answers, &session.attempt_counters)
            {
                Some(t) => t,
                None => {
                    warn!(
                        session_id = %session.session_id,
                        state_id = %state.id,
                        "State is satisfied but no transition holds"
                    );
                    return Ok(TurnOutcome::Stayed {
                        state_id: state.id.clone(),
                        reason: StayReason::NoTransitionMatched,
                    });
                }
            }
        };

        let cascade = self.engine.resolve_cascade(
            &transition.target_state_id,
            &session.answers,
            &session.attempt_counters,
        )?;
        let landed = self.engine.state(&cascade.landed)?;
        session.enter(&landed.id, now);

        if landed.is_terminal() {
            session.status = SessionStatus::Completed;
            info!(session_id = %session.session_id, "Session completed");
            return Ok(TurnOutcome::Completed);
        }

        info!(
            session_id = %session.session_id,
            from = %state.id,
            to = %landed.id,
            skipped = cascade.skipped.len(),
            "Session advanced"
        );
        Ok(TurnOutcome::Advanced {
            new_state_id: landed.id.clone(),
            skipped: cascade.skipped,
        })
    }
}
