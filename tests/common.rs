//! Common test utilities for building flows, answers and advice.
use chrono::{DateTime, TimeZone, Utc};
use leadflow::prelude::*;
use std::sync::Arc;

/// The two-question buyer flow: budget, then timeline.
#[allow(dead_code)]
pub fn buyer_fields() -> Vec<FieldDefinition> {
    vec![
        FieldDefinition::new("budget", "What is your budget?", 1),
        FieldDefinition::new("timeline", "When are you hoping to move?", 2),
    ]
}

/// Builds an answer map from literal pairs.
#[allow(dead_code)]
pub fn answers(pairs: &[(&str, &str)]) -> Answers {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// `AND[$budget > amount]`
#[allow(dead_code)]
pub fn budget_over(amount: i64) -> RuleGroup {
    RuleGroup::all([Condition::new("budget", Operator::GreaterThan, amount)])
}

/// A fixed instant so timestamps in assertions are stable.
#[allow(dead_code)]
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn minutes_after(start: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    start + chrono::TimeDelta::try_minutes(minutes).unwrap()
}

/// An orchestrator over a memory store with the buyer flow registered as `buyer` v1.
#[allow(dead_code)]
pub fn buyer_orchestrator(advice: Vec<AdviceItem>) -> (Orchestrator, Arc<MemorySessionStore>) {
    let store = Arc::new(MemorySessionStore::new());
    let orchestrator = Orchestrator::new(
        EngineConfig::default(),
        store.clone(),
        Arc::new(StaticAdviceSource::new(advice)),
    );
    orchestrator.register_fields("buyer", 1, buyer_fields());
    (orchestrator, store)
}
