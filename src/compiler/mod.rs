use crate::config::EngineConfig;
use crate::error::ConfigError;
use crate::flow::{FieldDefinition, StateMachineConfig, COMPLETION_STATE_ID, LEAD_CAPTURE_STATE_ID};
use itertools::Itertools;
use tracing::{debug, info};

mod builder;
mod cache;
mod validation;

use builder::StateBuilder;
pub use cache::ConfigCache;
pub use validation::validate;

/// Knobs applied to every state the compiler emits.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    pub max_attempts: u32,
    pub skip_if_already_known: bool,
    pub state_id_prefix: String,
    pub lead_capture_prompt: String,
    pub completion_prompt: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for CompileOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            max_attempts: config.default_max_attempts,
            skip_if_already_known: config.skip_if_already_known,
            state_id_prefix: config.state_id_prefix.clone(),
            lead_capture_prompt: "How can we reach you?".to_string(),
            completion_prompt: "Thanks, we have everything we need.".to_string(),
        }
    }
}

/// Turns an ordered field list into a linear state machine.
pub struct FlowCompiler {
    fields: Vec<FieldDefinition>,
    flow_id: String,
    version: u32,
    options: CompileOptions,
}

pub struct FlowCompilerBuilder {
    fields: Vec<FieldDefinition>,
    flow_id: String,
    version: u32,
    options: CompileOptions,
}

impl FlowCompilerBuilder {
    pub fn new(fields: Vec<FieldDefinition>) -> Self {
        Self {
            fields,
            flow_id: "default".to_string(),
            version: 1,
            options: CompileOptions::default(),
        }
    }

    pub fn with_flow_id(mut self, flow_id: impl Into<String>) -> Self {
        self.flow_id = flow_id.into();
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.options.max_attempts = max_attempts;
        self
    }

    pub fn with_skip_if_known(mut self, skip: bool) -> Self {
        self.options.skip_if_already_known = skip;
        self
    }

    pub fn with_state_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.state_id_prefix = prefix.into();
        self
    }

    pub fn with_prompts(mut self, lead_capture: impl Into<String>, completion: impl Into<String>) -> Self {
        self.options.lead_capture_prompt = lead_capture.into();
        self.options.completion_prompt = completion.into();
        self
    }

    /// Applies the compile-related settings of an engine configuration.
    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.options.max_attempts = config.default_max_attempts;
        self.options.skip_if_already_known = config.skip_if_already_known;
        self.options.state_id_prefix = config.state_id_prefix.clone();
        self
    }

    pub fn build(self) -> FlowCompiler {
        FlowCompiler {
            fields: self.fields,
            flow_id: self.flow_id,
            version: self.version,
            options: self.options,
        }
    }
}

impl FlowCompiler {
    pub fn builder(fields: Vec<FieldDefinition>) -> FlowCompilerBuilder {
        FlowCompilerBuilder::new(fields)
    }

    /// Produces `data_collection* -> lead_capture -> completion`.
    ///
    /// Fields are sorted by `order` (stable, so equal orders keep their list
    /// position). The result is validated before it is returned; duplicate
    /// mapping keys surface as [`ConfigError::DuplicateStateId`].
    pub fn compile(self) -> Result<StateMachineConfig, ConfigError> {
        let builder = StateBuilder::new(&self.options);
        let fields: Vec<&FieldDefinition> = self.fields.iter().sorted_by_key(|f| f.order).collect();

        let mut states = Vec::with_capacity(fields.len() + 2);
        for (i, field) in fields.iter().enumerate() {
            let next_id = match fields.get(i + 1) {
                Some(next) => builder.state_id(next),
                None => LEAD_CAPTURE_STATE_ID.to_string(),
            };
            states.push(builder.data_collection(field, &next_id));
        }

        let last_order = fields.last().map_or(0, |f| f.order);
        states.push(builder.lead_capture(last_order.saturating_add(1)));
        states.push(builder.completion(last_order.saturating_add(2)));

        let initial_state_id = fields
            .first()
            .map(|f| builder.state_id(f))
            .unwrap_or_else(|| LEAD_CAPTURE_STATE_ID.to_string());

        let config = StateMachineConfig {
            id: self.flow_id,
            version: self.version,
            initial_state_id,
            states,
            lead_capture_state_id: Some(LEAD_CAPTURE_STATE_ID.to_string()),
            completion_state_id: COMPLETION_STATE_ID.to_string(),
        };
        validate(&config)?;

        debug!(flow_id = %config.id, "Compiled state order: {}", config.states.iter().map(|s| &s.id).join(" -> "));
        info!(
            flow_id = %config.id,
            version = config.version,
            states = config.states.len(),
            "Compiled flow"
        );
        Ok(config)
    }
}

/// Compiles a field list with default options.
pub fn compile(fields: Vec<FieldDefinition>) -> Result<StateMachineConfig, ConfigError> {
    FlowCompiler::builder(fields).build().compile()
}
