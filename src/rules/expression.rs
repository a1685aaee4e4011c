use super::{FieldRef, Logic, Operator, RuleValue};
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_weight() -> f64 {
    1.0
}

/// A leaf of a rule tree: applies `operator` to the answer named by `field`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: FieldRef,
    pub operator: Operator,
    #[serde(default)]
    pub value: RuleValue,
    /// Contribution to the match score when the leaf is satisfied.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl Condition {
    pub fn new(mapping_key: impl Into<String>, operator: Operator, value: impl Into<RuleValue>) -> Self {
        Self {
            field: FieldRef::key(mapping_key),
            operator,
            value: value.into(),
            weight: default_weight(),
        }
    }

    /// Shorthand for an `exists` leaf.
    pub fn exists(mapping_key: impl Into<String>) -> Self {
        Self::new(mapping_key, Operator::Exists, RuleValue::Null)
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_concept(mut self, concept: impl Into<String>) -> Self {
        self.field = self.field.with_concept(concept);
        self
    }
}

/// A node of a rule tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Rule {
    Group(RuleGroup),
    Leaf(Condition),
}

impl From<Condition> for Rule {
    fn from(condition: Condition) -> Self {
        Rule::Leaf(condition)
    }
}

impl From<RuleGroup> for Rule {
    fn from(group: RuleGroup) -> Self {
        Rule::Group(group)
    }
}

/// Boolean AND/OR tree shared by transition conditions and advice targeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleGroup {
    pub logic: Logic,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl RuleGroup {
    pub fn new(logic: Logic, rules: Vec<Rule>) -> Self {
        Self { logic, rules }
    }

    pub fn all<R: Into<Rule>>(rules: impl IntoIterator<Item = R>) -> Self {
        Self::new(Logic::And, rules.into_iter().map(Into::into).collect())
    }

    pub fn any<R: Into<Rule>>(rules: impl IntoIterator<Item = R>) -> Self {
        Self::new(Logic::Or, rules.into_iter().map(Into::into).collect())
    }

    pub fn push(mut self, rule: impl Into<Rule>) -> Self {
        self.rules.push(rule.into());
        self
    }

    /// Nesting depth of the tree; a group of leaves has depth 1.
    pub fn depth(&self) -> usize {
        1 + self
            .rules
            .iter()
            .map(|rule| match rule {
                Rule::Group(group) => group.depth(),
                Rule::Leaf(_) => 0,
            })
            .max()
            .unwrap_or(0)
    }

    fn fmt_as_tree(&self, f: &mut fmt::Formatter<'_>, prefix: &str, is_last: bool) -> fmt::Result {
        let node_marker = if is_last { "└── " } else { "├── " };
        writeln!(f, "{}{}{}", prefix, node_marker, self.logic)?;

        let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
        for (i, rule) in self.rules.iter().enumerate() {
            let last = i + 1 == self.rules.len();
            match rule {
                Rule::Group(group) => group.fmt_as_tree(f, &child_prefix, last)?,
                Rule::Leaf(c) => {
                    let marker = if last { "└── " } else { "├── " };
                    if c.operator == Operator::Exists {
                        write!(f, "{}{}{} exists", child_prefix, marker, c.field)?;
                    } else {
                        write!(f, "{}{}{} {} {}", child_prefix, marker, c.field, c.operator, c.value)?;
                    }
                    if c.weight != 1.0 {
                        write!(f, " (weight {})", c.weight)?;
                    }
                    writeln!(f)?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for RuleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_as_tree(f, "", true)
    }
}
