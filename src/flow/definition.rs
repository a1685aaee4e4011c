use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// How a question is answered in the chat surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputKind {
    ChoiceButtons,
    #[default]
    FreeText,
}

/// One button of a choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub label: String,
    pub value: String,
}

impl Choice {
    pub fn new(id: impl Into<String>, label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            value: value.into(),
        }
    }
}

fn default_required() -> bool {
    true
}

/// One question of a flow. The field list, sorted by `order`, defines the
/// default linear conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: String,
    /// The canonical answer key this question fills.
    pub mapping_key: String,
    pub prompt: String,
    #[serde(default)]
    pub input_kind: InputKind,
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub order: i32,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub label: Option<String>,
    /// Semantic tag shared with equivalent keys of other flows.
    #[serde(default)]
    pub concept: Option<String>,
}

impl FieldDefinition {
    pub fn new(mapping_key: impl Into<String>, prompt: impl Into<String>, order: i32) -> Self {
        let mapping_key = mapping_key.into();
        Self {
            id: mapping_key.clone(),
            mapping_key,
            prompt: prompt.into(),
            input_kind: InputKind::FreeText,
            choices: Vec::new(),
            order,
            required: true,
            label: None,
            concept: None,
        }
    }

    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.input_kind = InputKind::ChoiceButtons;
        self.choices = choices;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_concept(mut self, concept: impl Into<String>) -> Self {
        self.concept = Some(concept.into());
        self
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.mapping_key)
    }
}

/// Parses a JSON array of field definitions.
pub fn fields_from_json(json: &str) -> Result<Vec<FieldDefinition>, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::JsonParseError(e.to_string()))
}
