//! Selection and ranking of contextual advice.

use crate::evaluator::{ConceptMap, RuleEvaluator};
use crate::flow::{ConversationState, StateKind};
use crate::rules::{Answers, known_value};
use itertools::Itertools;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::debug;

mod item;
pub mod keywords;

pub use item::{AdviceItem, Placement};
pub use keywords::{AdvicePhase, infer_phases};

/// Score contributed by each phase an item's tags share with the context.
pub const TAG_MATCH_WEIGHT: f64 = 0.5;

/// How an item qualified. Ordered by precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchBasis {
    /// Its authored rule group matched.
    Explicit,
    /// Its tags share a phase with the context.
    TagInferred,
    /// No targeting applies; eligible only when nothing more specific is.
    Universal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectedAdvice {
    pub item: AdviceItem,
    pub score: f64,
    pub basis: MatchBasis,
    /// Explanation of the match, absent for universal items.
    pub reason: Option<String>,
}

/// Filters and ranks advice snapshots against a conversation's answers.
#[derive(Debug, Clone, Copy)]
pub struct AdviceTargeter<'c> {
    evaluator: RuleEvaluator<'c>,
    limit: usize,
    tag_weight: f64,
}

impl<'c> AdviceTargeter<'c> {
    pub fn new(limit_per_state: usize) -> Self {
        Self {
            evaluator: RuleEvaluator::new(),
            limit: limit_per_state,
            tag_weight: TAG_MATCH_WEIGHT,
        }
    }

    pub fn with_concepts(mut self, concepts: &'c ConceptMap) -> Self {
        self.evaluator = RuleEvaluator::with_concepts(concepts);
        self
    }

    pub fn with_tag_weight(mut self, tag_weight: f64) -> Self {
        self.tag_weight = tag_weight;
        self
    }

    /// Ranks the whole snapshot. Tag inference uses the phases of the keys
    /// answered so far.
    pub fn select_advice(&self, items: &[AdviceItem], answers: &Answers) -> Vec<SelectedAdvice> {
        let context = infer_phases(
            answers
                .keys()
                .filter(|k| known_value(answers, k).is_some())
                .map(String::as_str),
        );
        self.rank(items.iter(), answers, &context)
    }

    /// Ranks the items placed on `state`. Tag inference uses the phases of the
    /// keys the state collects; the lead capture step counts as the contact phase.
    pub fn select_for_state(
        &self,
        items: &[AdviceItem],
        state: &ConversationState,
        answers: &Answers,
    ) -> Vec<SelectedAdvice> {
        let mut context = infer_phases(state.collects.iter().map(|c| c.mapping_key.as_str()));
        if state.kind == StateKind::LeadCapture {
            context.insert(AdvicePhase::Contact);
        }
        self.rank(
            items.iter().filter(|item| item.fits(state)),
            answers,
            &context,
        )
    }

    fn rank<'i>(
        &self,
        items: impl Iterator<Item = &'i AdviceItem>,
        answers: &Answers,
        context: &BTreeSet<AdvicePhase>,
    ) -> Vec<SelectedAdvice> {
        let mut candidates: Vec<SelectedAdvice> = items
            .filter_map(|item| self.classify(item, answers, context))
            .collect();

        // Universal items are a fallback only.
        if candidates.iter().any(|c| c.basis != MatchBasis::Universal) {
            candidates.retain(|c| c.basis != MatchBasis::Universal);
        }

        candidates.sort_by(|a, b| {
            a.basis
                .cmp(&b.basis)
                .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
                .then_with(|| a.item.id.cmp(&b.item.id))
        });
        candidates.truncate(self.limit);

        debug!(
            selected = %candidates.iter().map(|c| c.item.id.as_str()).join(", "),
            "Advice ranked"
        );
        candidates
    }

    fn classify(
        &self,
        item: &AdviceItem,
        answers: &Answers,
        context: &BTreeSet<AdvicePhase>,
    ) -> Option<SelectedAdvice> {
        if let Some(group) = &item.rule_group {
            let outcome = self.evaluator.evaluate(group, answers);
            return outcome.matched.then(|| SelectedAdvice {
                item: item.clone(),
                score: outcome.score,
                basis: MatchBasis::Explicit,
                reason: Some(outcome.reason()),
            });
        }

        let shared: Vec<AdvicePhase> = infer_phases(item.tags.iter().map(String::as_str))
            .intersection(context)
            .copied()
            .collect();
        if shared.is_empty() {
            return Some(SelectedAdvice {
                item: item.clone(),
                score: 0.0,
                basis: MatchBasis::Universal,
                reason: None,
            });
        }
        Some(SelectedAdvice {
            item: item.clone(),
            score: shared.len() as f64 * self.tag_weight,
            basis: MatchBasis::TagInferred,
            reason: Some(format!("tags match {}", shared.iter().join(", "))),
        })
    }
}

/// Ranks `items` against `answers` and keeps at most `limit_per_state`.
pub fn select_advice(items: &[AdviceItem], answers: &Answers, limit_per_state: usize) -> Vec<AdviceItem> {
    AdviceTargeter::new(limit_per_state)
        .select_advice(items, answers)
        .into_iter()
        .map(|selected| selected.item)
        .collect()
}
