use super::CompileOptions;
use crate::flow::{
    CollectedField, ConversationState, FieldDefinition, InputKind, StateKind, StateTransition,
    TransitionCondition, COMPLETION_STATE_ID, LEAD_CAPTURE_STATE_ID,
};

/// Responsible for building the individual states of a linear flow.
pub(super) struct StateBuilder<'a> {
    options: &'a CompileOptions,
}

impl<'a> StateBuilder<'a> {
    pub(super) fn new(options: &'a CompileOptions) -> Self {
        Self { options }
    }

    pub(super) fn state_id(&self, field: &FieldDefinition) -> String {
        format!("{}{}", self.options.state_id_prefix, field.mapping_key)
    }

    /// One question state. Its `DataCollected` edge leads to `next_id`; optional
    /// questions get a lower-precedence `Always` edge to the same target so an
    /// unanswered optional question does not hold the conversation.
    pub(super) fn data_collection(&self, field: &FieldDefinition, next_id: &str) -> ConversationState {
        let mut transitions = vec![StateTransition::new(
            next_id,
            TransitionCondition::DataCollected {
                mapping_keys: vec![field.mapping_key.clone()],
            },
            0,
        )];
        if !field.required {
            transitions.push(StateTransition::new(next_id, TransitionCondition::Always, 1));
        }

        ConversationState {
            id: self.state_id(field),
            kind: StateKind::DataCollection,
            order: field.order,
            collects: vec![CollectedField {
                mapping_key: field.mapping_key.clone(),
                label: field.display_label().to_string(),
                required: field.required,
                concept: field.concept.clone(),
            }],
            prompt: field.prompt.clone(),
            input_kind: field.input_kind,
            choices: field.choices.clone(),
            transitions,
            max_attempts: self.options.max_attempts,
            skip_if_already_known: self.options.skip_if_already_known,
        }
    }

    /// The contact step. It collects nothing structurally; the caller submits a
    /// turn once contact details are recorded.
    pub(super) fn lead_capture(&self, order: i32) -> ConversationState {
        ConversationState {
            id: LEAD_CAPTURE_STATE_ID.to_string(),
            kind: StateKind::LeadCapture,
            order,
            collects: Vec::new(),
            prompt: self.options.lead_capture_prompt.clone(),
            input_kind: InputKind::FreeText,
            choices: Vec::new(),
            transitions: vec![StateTransition::new(
                COMPLETION_STATE_ID,
                TransitionCondition::Always,
                0,
            )],
            max_attempts: self.options.max_attempts,
            skip_if_already_known: false,
        }
    }

    pub(super) fn completion(&self, order: i32) -> ConversationState {
        ConversationState {
            id: COMPLETION_STATE_ID.to_string(),
            kind: StateKind::Completion,
            order,
            collects: Vec::new(),
            prompt: self.options.completion_prompt.clone(),
            input_kind: InputKind::FreeText,
            choices: Vec::new(),
            transitions: Vec::new(),
            max_attempts: 0,
            skip_if_already_known: false,
        }
    }
}
