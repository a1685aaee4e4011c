use crate::flow::{ConversationState, StateKind};
use crate::rules::RuleGroup;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an advice item may be attached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Placement {
    State(String),
    Kind(StateKind),
}

impl Placement {
    pub fn fits(&self, state: &ConversationState) -> bool {
        match self {
            Self::State(id) => *id == state.id,
            Self::Kind(kind) => *kind == state.kind,
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State(id) => write!(f, "state:{}", id),
            Self::Kind(kind) => write!(f, "kind:{}", kind),
        }
    }
}

/// A piece of contextual content. Items are read-only snapshots supplied by
/// the content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviceItem {
    pub id: String,
    pub title: String,
    pub body: String,
    /// Authored targeting. Takes precedence over `tags` when present.
    #[serde(default)]
    pub rule_group: Option<RuleGroup>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Empty means the item may attach anywhere.
    #[serde(default)]
    pub placements: Vec<Placement>,
}

impl AdviceItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
            rule_group: None,
            tags: Vec::new(),
            placements: Vec::new(),
        }
    }

    pub fn with_rule_group(mut self, rule_group: RuleGroup) -> Self {
        self.rule_group = Some(rule_group);
        self
    }

    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placements.push(placement);
        self
    }

    pub fn fits(&self, state: &ConversationState) -> bool {
        self.placements.is_empty() || self.placements.iter().any(|p| p.fits(state))
    }
}
