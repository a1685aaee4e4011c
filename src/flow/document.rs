//! Loading of authored JSON documents: rule trees, advice items and
//! hand-authored (non-linear) state machines.
//!
//! Authored rule trees use a compact shape:
//!
//! ```json
//! {"logic": "AND", "rules": [
//!     {"field": "budget", "concept": "budget", "operator": "greaterThan", "value": 500000},
//!     {"logic": "OR", "rules": [
//!         {"field": "timeline", "operator": "in", "value": ["asap", "1-3 months"], "weight": 0.5}
//!     ]}
//! ]}
//! ```

use super::{
    Choice, CollectedField, ConversationState, InputKind, StateKind, StateMachineConfig,
    StateTransition, TransitionCondition, COMPLETION_STATE_ID,
};
use crate::advice::{AdviceItem, Placement};
use crate::error::ConfigError;
use crate::rules::{Condition, FieldRef, Logic, Operator, Rule, RuleGroup, RuleValue};
use serde::Deserialize;
use serde_json::Value;

/// Deepest group nesting accepted from a document.
pub const MAX_RULE_DEPTH: usize = 32;

/// Parses a rule tree from its JSON text.
pub fn rule_group_from_json(json: &str) -> Result<RuleGroup, ConfigError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| ConfigError::JsonParseError(e.to_string()))?;
    parse_rule_group(&value)
}

/// Parses a rule tree from a JSON value, rejecting trees nested deeper than
/// [`MAX_RULE_DEPTH`].
pub fn parse_rule_group(value: &Value) -> Result<RuleGroup, ConfigError> {
    parse_group(value, 1)
}

fn parse_group(value: &Value, depth: usize) -> Result<RuleGroup, ConfigError> {
    if depth > MAX_RULE_DEPTH {
        return Err(ConfigError::RuleTooDeep {
            depth,
            limit: MAX_RULE_DEPTH,
        });
    }
    let obj = value
        .as_object()
        .ok_or_else(|| ConfigError::InvalidRule(format!("expected a rule group, found {}", value)))?;

    let logic = match obj.get("logic").and_then(Value::as_str) {
        Some(s) if s.eq_ignore_ascii_case("and") => Logic::And,
        Some(s) if s.eq_ignore_ascii_case("or") => Logic::Or,
        Some(other) => {
            return Err(ConfigError::InvalidRule(format!("unknown logic '{}'", other)));
        }
        None => Logic::And,
    };

    let rules = match obj.get("rules") {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                let is_group = item
                    .as_object()
                    .is_some_and(|o| o.contains_key("rules") || o.contains_key("logic"));
                if is_group {
                    parse_group(item, depth + 1).map(Rule::Group)
                } else {
                    parse_condition(item).map(Rule::Leaf)
                }
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(ConfigError::InvalidRule(format!(
                "'rules' must be an array, found {}",
                other
            )));
        }
    };

    Ok(RuleGroup::new(logic, rules))
}

fn parse_condition(value: &Value) -> Result<Condition, ConfigError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ConfigError::InvalidRule(format!("expected a condition, found {}", value)))?;

    let mut field = match obj.get("field") {
        Some(Value::String(key)) => FieldRef::key(key.clone()),
        Some(reference @ Value::Object(_)) => serde_json::from_value::<FieldRef>(reference.clone())
            .map_err(|e| ConfigError::InvalidRule(format!("invalid field reference: {}", e)))?,
        _ => return Err(ConfigError::InvalidRule("condition is missing 'field'".to_string())),
    };
    if let Some(concept) = obj.get("concept").and_then(Value::as_str) {
        field.concept = Some(concept.to_string());
    }

    let operator_value = obj
        .get("operator")
        .ok_or_else(|| ConfigError::InvalidRule("condition is missing 'operator'".to_string()))?;
    let operator: Operator = serde_json::from_value(operator_value.clone()).map_err(|_| {
        ConfigError::InvalidRule(format!("unknown operator {}", operator_value))
    })?;

    let weight = match obj.get("weight") {
        None => 1.0,
        Some(w) => w
            .as_f64()
            .ok_or_else(|| ConfigError::InvalidRule(format!("weight must be a number, found {}", w)))?,
    };

    Ok(Condition {
        field,
        operator,
        value: obj.get("value").map(rule_value).transpose()?.unwrap_or_default(),
        weight,
    })
}

/// Converts a JSON scalar or array into a rule operand.
pub fn rule_value(value: &Value) -> Result<RuleValue, ConfigError> {
    Ok(match value {
        Value::Null => RuleValue::Null,
        Value::Bool(b) => RuleValue::Bool(*b),
        Value::Number(n) => RuleValue::Number(n.as_f64().unwrap_or_default()),
        Value::String(s) => RuleValue::Text(s.clone()),
        Value::Array(items) => {
            RuleValue::List(items.iter().map(rule_value).collect::<Result<_, _>>()?)
        }
        Value::Object(_) => {
            return Err(ConfigError::InvalidRule(format!(
                "objects are not valid rule values: {}",
                value
            )));
        }
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAdviceItem {
    id: String,
    title: String,
    #[serde(alias = "body_text", alias = "bodyText")]
    body: String,
    #[serde(default)]
    rule_group: Option<Value>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    placements: Vec<String>,
}

/// Parses a JSON array of authored advice items.
pub fn advice_items_from_json(json: &str) -> Result<Vec<AdviceItem>, ConfigError> {
    let values: Vec<Value> =
        serde_json::from_str(json).map_err(|e| ConfigError::JsonParseError(e.to_string()))?;
    values.iter().map(parse_advice_item).collect()
}

/// Parses one authored advice item.
pub fn parse_advice_item(value: &Value) -> Result<AdviceItem, ConfigError> {
    let raw: RawAdviceItem = serde_json::from_value(value.clone())
        .map_err(|e| ConfigError::JsonParseError(e.to_string()))?;
    let rule_group = raw.rule_group.as_ref().map(parse_rule_group).transpose()?;
    Ok(AdviceItem {
        id: raw.id,
        title: raw.title,
        body: raw.body,
        rule_group,
        tags: raw.tags,
        placements: raw.placements.iter().map(|p| parse_placement(p)).collect(),
    })
}

/// `"kind:lead_capture"` targets a state kind; `"state:q_budget"` or a bare id targets one state.
fn parse_placement(raw: &str) -> Placement {
    let kind = |name: &str| match name {
        "data_collection" => Some(StateKind::DataCollection),
        "lead_capture" => Some(StateKind::LeadCapture),
        "completion" => Some(StateKind::Completion),
        _ => None,
    };
    match raw.split_once(':') {
        Some(("kind", name)) => match kind(name) {
            Some(k) => Placement::Kind(k),
            None => Placement::State(name.to_string()),
        },
        Some(("state", id)) => Placement::State(id.to_string()),
        _ => Placement::State(raw.to_string()),
    }
}

fn default_version() -> u32 {
    1
}

fn default_max_attempts() -> u32 {
    3
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    id: String,
    #[serde(default = "default_version")]
    version: u32,
    initial_state_id: String,
    states: Vec<RawState>,
    #[serde(default)]
    lead_capture_state_id: Option<String>,
    #[serde(default)]
    completion_state_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawState {
    id: String,
    kind: StateKind,
    #[serde(default)]
    order: i32,
    #[serde(default)]
    collects: Vec<CollectedField>,
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    input_kind: InputKind,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    transitions: Vec<RawTransition>,
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,
    #[serde(default)]
    skip_if_already_known: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransition {
    target_state_id: String,
    #[serde(default)]
    priority: i32,
    condition: RawCondition,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum RawCondition {
    Always,
    DataCollected { mapping_keys: Vec<String> },
    RuleMatch { rule_group: Value },
    AttemptsExceeded { n: u32 },
}

impl RawCondition {
    fn into_condition(self) -> Result<TransitionCondition, ConfigError> {
        Ok(match self {
            RawCondition::Always => TransitionCondition::Always,
            RawCondition::DataCollected { mapping_keys } => {
                TransitionCondition::DataCollected { mapping_keys }
            }
            RawCondition::RuleMatch { rule_group } => TransitionCondition::RuleMatch {
                rule_group: parse_rule_group(&rule_group)?,
            },
            RawCondition::AttemptsExceeded { n } => TransitionCondition::AttemptsExceeded { n },
        })
    }
}

/// Parses and validates a hand-authored state machine.
///
/// Transition conditions are tagged with `"type"` and rule groups use the
/// compact rule shape described at the top of this module.
pub fn config_from_json(json: &str) -> Result<StateMachineConfig, ConfigError> {
    let raw: RawConfig =
        serde_json::from_str(json).map_err(|e| ConfigError::JsonParseError(e.to_string()))?;

    let completion_state_id = raw.completion_state_id.unwrap_or_else(|| {
        raw.states
            .iter()
            .find(|s| s.kind == StateKind::Completion)
            .map(|s| s.id.clone())
            .unwrap_or_else(|| COMPLETION_STATE_ID.to_string())
    });

    let states = raw
        .states
        .into_iter()
        .map(|state| {
            let transitions = state
                .transitions
                .into_iter()
                .map(|t| {
                    Ok(StateTransition {
                        target_state_id: t.target_state_id,
                        condition: t.condition.into_condition()?,
                        priority: t.priority,
                    })
                })
                .collect::<Result<Vec<_>, ConfigError>>()?;
            Ok(ConversationState {
                id: state.id,
                kind: state.kind,
                order: state.order,
                collects: state.collects,
                prompt: state.prompt,
                input_kind: state.input_kind,
                choices: state.choices,
                transitions,
                max_attempts: state.max_attempts,
                skip_if_already_known: state.skip_if_already_known,
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    let config = StateMachineConfig {
        id: raw.id,
        version: raw.version,
        initial_state_id: raw.initial_state_id,
        states,
        lead_capture_state_id: raw.lead_capture_state_id,
        completion_state_id,
    };
    crate::compiler::validate(&config)?;
    Ok(config)
}
