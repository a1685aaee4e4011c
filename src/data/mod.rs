mod script;

pub use script::{ConversationScript, ScriptedTurn};
