//! Live conversation state.

use super::timeout::{IdlePolicy, is_idle};
use crate::engine::AttemptCounters;
use crate::flow::StateMachineConfig;
use crate::rules::Answers;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Accepting turns.
    Active,
    /// Reached the completion state.
    Completed,
    /// Closed after a period of inactivity.
    Abandoned,
}

impl SessionStatus {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        };
        write!(f, "{s}")
    }
}

/// A state the conversation landed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub state_id: String,
    pub entered_at: DateTime<Utc>,
}

/// Everything the engine knows about one conversation.
///
/// Answers are only ever added or overwritten, never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub flow_id: String,
    /// Version of the configuration the session last ran against.
    pub config_version: u32,
    pub current_state_id: String,
    pub answers: Answers,
    pub attempt_counters: AttemptCounters,
    pub history: Vec<HistoryEntry>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl SessionState {
    /// A fresh session positioned at the configuration's initial state, with no history.
    pub fn new(session_id: impl Into<String>, config: &StateMachineConfig, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            flow_id: config.id.clone(),
            config_version: config.version,
            current_state_id: config.initial_state_id.clone(),
            answers: Answers::new(),
            attempt_counters: AttemptCounters::new(),
            history: Vec::new(),
            status: SessionStatus::Active,
            created_at: now,
            last_activity_at: now,
        }
    }

    /// Records extracted values. Blank values are ignored so a failed
    /// re-extraction can never erase an answer. Returns how many were stored.
    pub fn merge_answers<I, K, V>(&mut self, pairs: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut stored = 0;
        for (key, value) in pairs {
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            self.answers.insert(key.into(), value.to_string());
            stored += 1;
        }
        stored
    }

    pub fn attempts(&self, state_id: &str) -> u32 {
        self.attempt_counters.get(state_id).copied().unwrap_or(0)
    }

    /// Counts a failed turn against `state_id` and returns the new count.
    pub fn record_attempt(&mut self, state_id: &str) -> u32 {
        let counter = self.attempt_counters.entry(state_id.to_string()).or_insert(0);
        *counter = counter.saturating_add(1);
        *counter
    }

    /// Moves to `state_id` and appends it to the history.
    pub fn enter(&mut self, state_id: &str, now: DateTime<Utc>) {
        self.current_state_id = state_id.to_string();
        self.history.push(HistoryEntry {
            state_id: state_id.to_string(),
            entered_at: now,
        });
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now;
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Marks an active session abandoned once it has been idle past `policy`.
    /// Returns `true` if the status changed.
    pub fn abandon_if_idle(&mut self, now: DateTime<Utc>, policy: &IdlePolicy) -> bool {
        if !self.is_active() || !is_idle(self.last_activity_at, now, policy) {
            return false;
        }
        self.status = SessionStatus::Abandoned;
        info!(
            session_id = %self.session_id,
            state_id = %self.current_state_id,
            "Session abandoned after inactivity"
        );
        true
    }
}
