use super::{AttemptCounters, TransitionEngine};
use crate::error::TurnError;
use crate::rules::Answers;
use tracing::debug;

/// Where a cascading skip came to rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cascade {
    pub landed: String,
    /// States passed through without being prompted, in order.
    pub skipped: Vec<String>,
}

impl TransitionEngine<'_> {
    /// Follows transitions from `entry_id` for as long as the state in hand is
    /// marked skip-if-known and already has all its data.
    ///
    /// A skippable state with no satisfied transition is where the cascade
    /// lands. Exceeding the hop guard means the configuration contains a
    /// skip cycle and aborts the turn.
    pub fn resolve_cascade(
        &self,
        entry_id: &str,
        answers: &Answers,
        attempts: &AttemptCounters,
    ) -> Result<Cascade, TurnError> {
        let mut current = self.state(entry_id)?;
        let mut skipped = Vec::new();

        while !current.is_terminal()
            && current.skip_if_already_known
            && current.is_already_known(answers)
        {
            let Some(transition) = self.select_transition(current, answers, attempts) else {
                break;
            };
            if skipped.len() >= self.max_hops {
                return Err(TurnError::CascadeOverflow {
                    start_id: entry_id.to_string(),
                    limit: self.max_hops,
                });
            }
            debug!(
                state_id = %current.id,
                target = %transition.target_state_id,
                "Skipping state with known answers"
            );
            skipped.push(current.id.clone());
            current = self.state(&transition.target_state_id)?;
        }

        Ok(Cascade {
            landed: current.id.clone(),
            skipped,
        })
    }
}
