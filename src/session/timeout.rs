use crate::config::EngineConfig;
use chrono::{DateTime, TimeDelta, Utc};

/// How long a session may sit without a turn before it counts as idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdlePolicy {
    pub threshold_secs: u64,
}

impl IdlePolicy {
    pub fn from_secs(threshold_secs: u64) -> Self {
        Self { threshold_secs }
    }

    pub fn threshold(&self) -> Option<TimeDelta> {
        i64::try_from(self.threshold_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
    }
}

impl Default for IdlePolicy {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for IdlePolicy {
    fn from(config: &EngineConfig) -> Self {
        Self::from_secs(config.idle_timeout_secs)
    }
}

/// `true` once at least the policy threshold has passed since `last_activity`.
/// A threshold too large to represent never elapses.
pub fn is_idle(last_activity: DateTime<Utc>, now: DateTime<Utc>, policy: &IdlePolicy) -> bool {
    match policy.threshold() {
        Some(threshold) => now.signed_duration_since(last_activity) >= threshold,
        None => false,
    }
}
