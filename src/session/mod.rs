mod controller;
mod outcome;
mod state;
pub mod timeout;

pub use controller::SessionController;
pub use outcome::{StayReason, TurnOutcome, TurnStatus};
pub use state::{HistoryEntry, SessionState, SessionStatus};
pub use timeout::{IdlePolicy, is_idle};
