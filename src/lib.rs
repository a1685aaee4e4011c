//! # leadflow - Conversation Orchestration for Lead-Capture Flows
//!
//! **leadflow** drives multi-turn data-collection conversations. A flow is an
//! ordered list of questions; the engine compiles it into a state machine,
//! decides after every user turn where the conversation goes next, and picks
//! the contextual advice to show alongside each question.
//!
//! ## Core Workflow
//!
//! 1.  **Describe the flow**: load your question list into `FieldDefinition`s,
//!     directly from JSON or through the `IntoFields` trait for your own format.
//! 2.  **Compile**: `FlowCompiler::builder(fields)` produces a validated
//!     `StateMachineConfig` of the shape `question* -> lead_capture -> completion`.
//!     Hand-authored, branching machines can be loaded with
//!     `flow::document::config_from_json` instead.
//! 3.  **Run turns**: `SessionController` applies one turn of extracted answers
//!     to a `SessionState`. The `Orchestrator` wraps this with flow registration,
//!     a compiled-config cache, per-session locking and persistence.
//! 4.  **Target advice**: `AdviceTargeter` ranks advice items by their rule
//!     groups, tags, and placement against the answers collected so far.
//!
//! Rule groups are nested AND/OR trees shared by transitions and advice. Every
//! evaluation produces a trace that renders as a readable reason.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use leadflow::prelude::*;
//! use std::sync::Arc;
//!
//! fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let fields = vec![
//!         FieldDefinition::new("budget", "What is your budget?", 1),
//!         FieldDefinition::new("timeline", "When do you want to move?", 2),
//!     ];
//!
//!     let luxury = AdviceItem::new("luxury", "The luxury market", "Expect longer negotiations.")
//!         .with_rule_group(RuleGroup::all([Condition::new(
//!             "budget",
//!             Operator::GreaterThan,
//!             500_000,
//!         )]));
//!
//!     let orchestrator = Orchestrator::new(
//!         EngineConfig::default(),
//!         Arc::new(MemorySessionStore::new()),
//!         Arc::new(StaticAdviceSource::new(vec![luxury])),
//!     );
//!     orchestrator.register_fields("buyer", 1, fields);
//!
//!     let first = orchestrator.start_session("buyer", "session-1", Answers::new())?;
//!     println!("Bot: {}", first.prompt_to_show);
//!
//!     let turn = orchestrator.process_turn(
//!         "session-1",
//!         &[ExtractedPair::new("budget", "$650,000")],
//!         Some("about 650k"),
//!     )?;
//!     println!("-> {} at {}", turn.status, turn.new_state_id);
//!     for advice in &turn.attached_advice {
//!         println!("   advice: {} ({})", advice.item.title, advice.reason.as_deref().unwrap_or("-"));
//!     }
//!     Ok(())
//! }
//! ```

pub mod advice;
pub mod backend;
pub mod compiler;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod flow;
pub mod orchestrator;
pub mod prelude;
pub mod rules;
pub mod session;
pub mod store;
pub mod trace;
