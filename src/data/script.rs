use crate::advice::AdviceItem;
use crate::error::ConfigError;
use crate::flow::document::parse_advice_item;
use crate::flow::{Choice, FieldDefinition};
use crate::rules::Answers;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;

/// One scripted user turn: the pairs an extractor would have produced, and
/// optionally the text they came from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ScriptedTurn {
    #[serde(default)]
    pub pairs: BTreeMap<String, String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// A flow plus a conversation to replay against it, as read by `flow-cli replay`
/// and written by `script-gen`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationScript {
    pub flow_id: String,
    pub fields: Vec<FieldDefinition>,
    /// Authored advice items in the document shape of `flow::document`.
    #[serde(default)]
    pub advice: Vec<serde_json::Value>,
    /// Answers known before the first turn.
    #[serde(default)]
    pub prefilled: BTreeMap<String, String>,
    pub turns: Vec<ScriptedTurn>,
}

impl ConversationScript {
    /// Load a script from a JSON file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::JsonParseError(format!("Could not read '{}': {}", path, e)))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::JsonParseError(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::JsonParseError(e.to_string()))
    }

    pub fn advice_items(&self) -> Result<Vec<AdviceItem>, ConfigError> {
        self.advice.iter().map(parse_advice_item).collect()
    }

    pub fn prefilled_answers(&self) -> Answers {
        self.prefilled
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl Default for ConversationScript {
    /// A small buyer conversation used when no script file is given.
    fn default() -> Self {
        let fields = vec![
            FieldDefinition::new("budget", "What is your budget?", 1)
                .with_label("Budget")
                .with_concept("budget"),
            FieldDefinition::new("timeline", "When are you hoping to move?", 2).with_choices(vec![
                Choice::new("asap", "As soon as possible", "asap"),
                Choice::new("quarter", "In 1-3 months", "1-3 months"),
                Choice::new("later", "Later this year", "later"),
            ]),
            FieldDefinition::new("neighborhood", "Any neighborhoods in mind?", 3).optional(),
        ];

        let advice = vec![
            json!({
                "id": "luxury-market",
                "title": "Navigating the luxury market",
                "body": "Homes above 500k move differently; plan for longer negotiations.",
                "ruleGroup": {"logic": "AND", "rules": [
                    {"field": "budget", "concept": "budget", "operator": "greaterThan", "value": 500000}
                ]}
            }),
            json!({
                "id": "preapproval",
                "title": "Get pre-approved early",
                "body": "A lender letter makes your offer stronger.",
                "tags": ["financing", "budget"]
            }),
            json!({
                "id": "welcome",
                "title": "Welcome",
                "body": "We are glad you are here.",
                "placements": ["state:q_budget"]
            }),
        ];

        let turns = vec![
            ScriptedTurn {
                pairs: BTreeMap::new(),
                text: Some("not sure yet".to_string()),
            },
            ScriptedTurn {
                pairs: BTreeMap::from([
                    ("budget".to_string(), "$650,000".to_string()),
                    ("timeline".to_string(), "asap".to_string()),
                ]),
                text: Some("around 650k and we need to move asap".to_string()),
            },
            ScriptedTurn::default(),
            ScriptedTurn {
                pairs: BTreeMap::from([("email".to_string(), "lead@example.com".to_string())]),
                text: None,
            },
        ];

        Self {
            flow_id: "buyer".to_string(),
            fields,
            advice,
            prefilled: BTreeMap::new(),
            turns,
        }
    }
}
