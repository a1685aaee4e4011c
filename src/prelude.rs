//! Prelude module for convenient imports
//!
//! Re-exports the types needed to compile a flow, run conversation turns and
//! target advice.
//!
//! # Example
//!
//! ```rust,no_run
//! use leadflow::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let fields = fields_from_json(&std::fs::read_to_string("path/to/fields.json")?)?;
//! let config = FlowCompiler::builder(fields).with_flow_id("buyer").build().compile()?;
//! println!("{}", visualize_config(&config));
//!
//! let controller = SessionController::new(&config);
//! let (mut session, _) = controller.start("session-1", Answers::new(), chrono::Utc::now())?;
//! let outcome = controller.apply_turn(&mut session, [("budget", "600k")], chrono::Utc::now())?;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```

// Flow definition and compilation
pub use crate::compiler::{FlowCompiler, compile};
pub use crate::config::EngineConfig;
pub use crate::flow::{
    Choice, FieldDefinition, InputKind, IntoFields, StateKind, StateMachineConfig,
    TransitionCondition, fields_from_json, visualize_config,
};

// Rules and evaluation
pub use crate::evaluator::{ConceptMap, RuleEvaluator, RuleOutcome};
pub use crate::rules::{Answers, Condition, Logic, Operator, RuleGroup, RuleValue};
pub use crate::trace::TraceFormatter;

// Sessions and turns
pub use crate::orchestrator::{Orchestrator, TurnResponse};
pub use crate::session::{SessionController, SessionState, SessionStatus, TurnOutcome, TurnStatus};

// Advice
pub use crate::advice::{AdviceItem, AdviceTargeter, Placement, SelectedAdvice};

// Collaborators
pub use crate::backend::{AdviceSource, ExtractedPair, FieldExtractor, SessionStore};
pub use crate::store::{FileSessionStore, MemorySessionStore, StaticAdviceSource};

// Error types
pub use crate::error::{ConfigError, StoreError, TurnError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
