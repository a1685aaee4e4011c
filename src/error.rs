use thiserror::Error;

/// Errors raised while compiling, loading or validating a flow configuration.
///
/// These are operator-facing defects. They are never recovered silently and never
/// reach the end user of a conversation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to parse configuration JSON: {0}")]
    JsonParseError(String),

    #[error("State id '{0}' is defined more than once")]
    DuplicateStateId(String),

    #[error(
        "State '{state_id}' has a transition to '{target_id}', which does not exist in the configuration"
    )]
    UnresolvedTarget { state_id: String, target_id: String },

    #[error("Initial state '{0}' is not defined in the configuration")]
    MissingInitialState(String),

    #[error("Configuration '{0}' has no completion state")]
    MissingTerminal(String),

    #[error("Lead capture state '{0}' is not defined in the configuration")]
    MissingLeadCapture(String),

    #[error("Completion state '{0}' must not have outgoing transitions")]
    TerminalHasTransitions(String),

    #[error("Initial state '{initial_id}' is the target of a transition from '{source_id}'")]
    InitialStateHasIncoming {
        initial_id: String,
        source_id: String,
    },

    #[error("State '{0}' has no outgoing transitions but is not a completion state")]
    DeadEnd(String),

    #[error("Rule tree is nested {depth} levels deep, the limit is {limit}")]
    RuleTooDeep { depth: usize, limit: usize },

    #[error("Invalid rule document: {0}")]
    InvalidRule(String),

    #[error("Artifact error: {0}")]
    Artifact(String),
}

/// Errors raised while processing a single conversation turn.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TurnError {
    #[error("State '{state_id}' referenced at turn time does not exist in flow '{flow_id}'")]
    UnknownState { flow_id: String, state_id: String },

    #[error("Cascading skip from '{start_id}' exceeded the guard of {limit} hops")]
    CascadeOverflow { start_id: String, limit: usize },

    #[error("Session '{0}' was not found")]
    SessionNotFound(String),

    #[error("Session '{0}' already exists")]
    SessionExists(String),

    #[error("Session '{session_id}' is {status} and accepts no further turns")]
    SessionClosed { session_id: String, status: String },

    #[error("Flow '{0}' is not registered")]
    UnknownFlow(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Persistence error: {0}")]
    Store(#[from] StoreError),
}

/// Errors reported by the persistence and content collaborators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("I/O failure: {0}")]
    Io(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Backend failure: {0}")]
    Backend(String),
}

/// Errors that can occur when converting a custom format into `FieldDefinition`s.
#[derive(Error, Debug, Clone)]
pub enum FieldConversionError {
    #[error("Invalid custom data: {0}")]
    ValidationError(String),
}
