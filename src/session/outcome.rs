use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a turn did not move the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum StayReason {
    /// Required answers are still missing; the state will be prompted again.
    MissingData { missing: Vec<String> },
    /// The attempt budget is spent and no `AttemptsExceeded` edge exists.
    AttemptsExhausted { attempts: u32 },
    /// The state is satisfied but none of its transitions hold.
    NoTransitionMatched,
}

impl fmt::Display for StayReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingData { missing } => write!(f, "missing {}", missing.join(", ")),
            Self::AttemptsExhausted { attempts } => {
                write!(f, "attempts exhausted after {}", attempts)
            }
            Self::NoTransitionMatched => write!(f, "no transition matched"),
        }
    }
}

/// The observable result of one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TurnOutcome {
    Advanced {
        new_state_id: String,
        /// States bypassed by the cascading skip on the way.
        skipped: Vec<String>,
    },
    Stayed {
        state_id: String,
        reason: StayReason,
    },
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnStatus {
    Advanced,
    Stayed,
    Completed,
}

impl fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Advanced => "Advanced",
            Self::Stayed => "Stayed",
            Self::Completed => "Completed",
        };
        write!(f, "{s}")
    }
}

impl TurnOutcome {
    pub fn status(&self) -> TurnStatus {
        match self {
            Self::Advanced { .. } => TurnStatus::Advanced,
            Self::Stayed { .. } => TurnStatus::Stayed,
            Self::Completed => TurnStatus::Completed,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}
