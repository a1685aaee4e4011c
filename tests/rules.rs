//! Tests for rule evaluation, operator semantics, traces and rule documents.
mod common;
use common::*;
use leadflow::error::ConfigError;
use leadflow::evaluator::evaluate;
use leadflow::flow::document::{MAX_RULE_DEPTH, rule_group_from_json};
use leadflow::prelude::*;
use leadflow::rules::parse_numeric;

#[test]
fn test_and_group_requires_every_child() {
    let group = RuleGroup::all([
        Condition::new("budget", Operator::GreaterThan, 500_000),
        Condition::new("timeline", Operator::Equals, "asap").with_weight(0.5),
    ]);

    let outcome = evaluate(&group, &answers(&[("budget", "600000"), ("timeline", "ASAP")]));
    assert!(outcome.matched);
    assert!((outcome.score - 1.5).abs() < 1e-9);

    // Flipping one satisfied leaf flips the group and resets the score.
    let outcome = evaluate(&group, &answers(&[("budget", "400000"), ("timeline", "asap")]));
    assert!(!outcome.matched);
    assert_eq!(outcome.score, 0.0);
}

#[test]
fn test_or_group_matches_on_any_child() {
    let group = RuleGroup::any([
        Condition::new("budget", Operator::GreaterThan, 500_000).with_weight(2.0),
        Condition::new("timeline", Operator::Equals, "asap"),
        Condition::exists("neighborhood"),
    ]);

    let outcome = evaluate(&group, &answers(&[("budget", "100"), ("timeline", "asap")]));
    assert!(outcome.matched);
    assert_eq!(outcome.score, 1.0);

    let outcome = evaluate(&group, &answers(&[]));
    assert!(!outcome.matched);
    assert_eq!(outcome.score, 0.0);
}

#[test]
fn test_missing_answers_and_exists() {
    let present = answers(&[("email", "a@b.c"), ("blank", "   ")]);

    assert!(RuleEvaluator::new().matches(&RuleGroup::all([Condition::exists("email")]), &present));
    assert!(!RuleEvaluator::new().matches(&RuleGroup::all([Condition::exists("blank")]), &present));
    // A missing answer never satisfies a comparison, not even `notEquals`.
    assert!(!RuleEvaluator::new().matches(
        &RuleGroup::all([Condition::new("phone", Operator::NotEquals, "555")]),
        &present
    ));
}

#[test]
fn test_empty_groups() {
    let outcome = evaluate(&RuleGroup::new(Logic::And, vec![]), &answers(&[]));
    assert!(outcome.matched);
    assert_eq!(outcome.score, 0.0);
    assert_eq!(outcome.reason(), "empty AND");

    assert!(!evaluate(&RuleGroup::new(Logic::Or, vec![]), &answers(&[])).matched);
}

#[test]
fn test_numeric_answers_in_free_text() {
    let group = budget_over(500_000);
    for raw in ["$600,000", "600k", "1.2m", "600 000", "€750000"] {
        assert!(
            evaluate(&group, &answers(&[("budget", raw)])).matched,
            "{} should read as more than 500000",
            raw
        );
    }
    assert!(!evaluate(&group, &answers(&[("budget", "lots")])).matched);

    assert_eq!(parse_numeric("$600,000"), Some(600_000.0));
    assert_eq!(parse_numeric("1.2m"), Some(1_200_000.0));
    assert_eq!(parse_numeric("250K"), Some(250_000.0));
    assert_eq!(parse_numeric("soon"), None);
}

#[test]
fn test_equality_contains_and_in() {
    let a = answers(&[("budget", "600000"), ("timeline", "1-3 Months"), ("notes", "Needs a big Garden")]);

    assert!(evaluate(&RuleGroup::all([Condition::new("budget", Operator::Equals, 600_000.0)]), &a).matched);
    assert!(evaluate(&RuleGroup::all([Condition::new("timeline", Operator::Equals, "1-3 months")]), &a).matched);
    assert!(evaluate(&RuleGroup::all([Condition::new("timeline", Operator::NotEquals, "asap")]), &a).matched);
    assert!(evaluate(&RuleGroup::all([Condition::new("notes", Operator::Contains, "garden")]), &a).matched);
    assert!(
        evaluate(
            &RuleGroup::all([Condition::new("timeline", Operator::In, vec!["asap", "1-3 months"])]),
            &a
        )
        .matched
    );
    assert!(
        !evaluate(
            &RuleGroup::all([Condition::new("timeline", Operator::In, vec!["later"])]),
            &a
        )
        .matched
    );
}

#[test]
fn test_malformed_leaves_are_unmatched() {
    let a = answers(&[("budget", "600000"), ("timeline", "asap")]);

    // `in` needs a list and `>` needs a number; neither fails the evaluation.
    let malformed_in = RuleGroup::all([Condition::new("timeline", Operator::In, "asap")]);
    assert!(!evaluate(&malformed_in, &a).matched);

    let malformed_gt = RuleGroup::all([Condition::new("budget", Operator::GreaterThan, "a lot")]);
    assert!(!evaluate(&malformed_gt, &a).matched);

    // A malformed leaf only costs its own contribution inside an OR.
    let group = RuleGroup::any([
        Condition::new("timeline", Operator::In, "asap"),
        Condition::new("timeline", Operator::Equals, "asap"),
    ]);
    assert!(evaluate(&group, &a).matched);
}

#[test]
fn test_concept_resolution() {
    let mut concepts = ConceptMap::new();
    concepts.insert("budget", "purchase_budget");
    concepts.insert("budget", "asking_price");

    let group = RuleGroup::all([
        Condition::new("budget", Operator::GreaterThan, 500_000).with_concept("budget"),
    ]);
    let sell_side = answers(&[("asking_price", "720k")]);

    assert!(RuleEvaluator::with_concepts(&concepts).matches(&group, &sell_side));
    assert!(!RuleEvaluator::new().matches(&group, &sell_side));
}

#[test]
fn test_reason_strings() {
    let outcome = evaluate(&budget_over(500_000), &answers(&[("budget", "600000")]));
    assert_eq!(outcome.reason(), "$budget (was 600000) > 500000");

    let nested = RuleGroup::all([Condition::new("budget", Operator::GreaterThan, 500_000)]).push(
        RuleGroup::any([
            Condition::new("timeline", Operator::Equals, "asap"),
            Condition::new("timeline", Operator::Equals, "1-3 months"),
        ]),
    );
    let outcome = evaluate(&nested, &answers(&[("budget", "600000"), ("timeline", "asap")]));
    assert_eq!(
        outcome.reason(),
        "$budget (was 600000) > 500000 AND $timeline (was asap) == \"asap\""
    );

    let outcome = evaluate(&nested, &answers(&[("timeline", "asap")]));
    assert!(!outcome.matched);
    assert_eq!(outcome.reason(), "$budget (missing) > 500000");
}

#[test]
fn test_evaluation_is_deterministic() {
    let group = RuleGroup::any([
        Condition::new("budget", Operator::GreaterThan, 500_000),
        Condition::exists("timeline"),
    ]);
    let a = answers(&[("budget", "600000"), ("timeline", "asap")]);
    assert_eq!(evaluate(&group, &a), evaluate(&group, &a));
}

#[test]
fn test_rule_document_parsing() {
    let json = r#"{"logic": "AND", "rules": [
        {"field": "budget", "concept": "budget", "operator": "greaterThan", "value": 500000, "weight": 1.2},
        {"logic": "OR", "rules": [
            {"field": "timeline", "operator": "in", "value": ["asap", "1-3 months"]},
            {"field": {"mappingKey": "neighborhood"}, "operator": "exists"}
        ]}
    ]}"#;
    let group = rule_group_from_json(json).unwrap();
    assert_eq!(group.logic, Logic::And);
    assert_eq!(group.depth(), 2);

    let outcome = evaluate(&group, &answers(&[("budget", "$650,000"), ("timeline", "asap")]));
    assert!(outcome.matched);
    assert!((outcome.score - 2.2).abs() < 1e-9);
}

#[test]
fn test_rule_document_rejections() {
    let unknown_operator = r#"{"logic": "AND", "rules": [{"field": "budget", "operator": "between", "value": 1}]}"#;
    assert!(matches!(
        rule_group_from_json(unknown_operator),
        Err(ConfigError::InvalidRule(_))
    ));

    let mut deep = String::new();
    for _ in 0..(MAX_RULE_DEPTH + 5) {
        deep.push_str(r#"{"logic": "OR", "rules": ["#);
    }
    deep.push_str(r#"{"field": "budget", "operator": "exists"}"#);
    for _ in 0..(MAX_RULE_DEPTH + 5) {
        deep.push_str("]}");
    }
    assert!(matches!(
        rule_group_from_json(&deep),
        Err(ConfigError::RuleTooDeep { .. })
    ));
}

#[test]
fn test_rule_group_display() {
    let group = RuleGroup::all([Condition::new("budget", Operator::GreaterThan, 500_000)]);
    let rendered = group.to_string();
    assert!(rendered.contains("AND"));
    assert!(rendered.contains("$budget > 500000"));
}
