//! Tests for advice selection, ranking and placement.
mod common;
use common::*;
use leadflow::advice::keywords::phases_for;
use leadflow::advice::{AdvicePhase, MatchBasis, select_advice};
use leadflow::flow::document::advice_items_from_json;
use leadflow::prelude::*;

fn luxury_item() -> AdviceItem {
    AdviceItem::new("luxury", "Luxury market report", "Inventory above 500k moves slowly.")
        .with_rule_group(budget_over(500_000))
}

fn welcome_item() -> AdviceItem {
    AdviceItem::new("welcome", "Welcome", "We help buyers find the right home.")
}

#[test]
fn test_rule_item_selected_when_rule_matches() {
    let targeter = AdviceTargeter::new(3);
    let items = vec![luxury_item()];

    let selected = targeter.select_advice(&items, &answers(&[("budget", "600000")]));
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].item.id, "luxury");
    assert_eq!(selected[0].basis, MatchBasis::Explicit);
    assert_eq!(selected[0].score, 1.0);
    assert_eq!(
        selected[0].reason.as_deref(),
        Some("$budget (was 600000) > 500000")
    );

    assert!(targeter.select_advice(&items, &answers(&[("budget", "400000")])).is_empty());
    assert!(targeter.select_advice(&items, &answers(&[])).is_empty());
}

#[test]
fn test_universal_items_are_only_a_fallback() {
    let weighted = AdviceItem::new("luxury", "Luxury", "...").with_rule_group(RuleGroup::all([
        Condition::new("budget", Operator::GreaterThan, 500_000).with_weight(1.2),
    ]));
    let items = vec![welcome_item(), weighted];

    let selected = AdviceTargeter::new(1).select_advice(&items, &answers(&[("budget", "600000")]));
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].item.id, "luxury");
    assert!((selected[0].score - 1.2).abs() < 1e-9);

    // Even with room for more, the universal item stays out while a specific one qualifies.
    let selected = AdviceTargeter::new(5).select_advice(&items, &answers(&[("budget", "600000")]));
    assert_eq!(selected.len(), 1);

    let selected = AdviceTargeter::new(5).select_advice(&items, &answers(&[("budget", "100")]));
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].item.id, "welcome");
    assert_eq!(selected[0].basis, MatchBasis::Universal);
    assert_eq!(selected[0].reason, None);
}

#[test]
fn test_tag_inference_on_state() {
    let config = compile(buyer_fields()).unwrap();
    let budget_state = config.state("q_budget").unwrap();
    let timeline_state = config.state("q_timeline").unwrap();

    let items = vec![
        welcome_item(),
        AdviceItem::new("pricing", "Know your price range", "...").with_tags(["Price range", "Budget"]),
        AdviceItem::new("moving", "Moving checklist", "...").with_tags(["move date"]),
    ];
    let targeter = AdviceTargeter::new(2);

    let selected = targeter.select_for_state(&items, budget_state, &Answers::new());
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].item.id, "pricing");
    assert_eq!(selected[0].basis, MatchBasis::TagInferred);
    assert_eq!(selected[0].score, 0.5);
    assert_eq!(selected[0].reason.as_deref(), Some("tags match budget"));

    let selected = targeter.select_for_state(&items, timeline_state, &Answers::new());
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].item.id, "moving");

    let selected = targeter.with_tag_weight(2.0).select_for_state(&items, budget_state, &Answers::new());
    assert_eq!(selected[0].score, 2.0);
}

#[test]
fn test_explicit_outranks_tags_and_ties_break_by_id() {
    let config = compile(buyer_fields()).unwrap();
    let budget_state = config.state("q_budget").unwrap();
    let items = vec![
        AdviceItem::new("b-tagged", "Budget tips", "...").with_tags(["budget"]),
        AdviceItem::new("a-tagged", "Affordability", "...").with_tags(["afford"]),
        luxury_item(),
    ];

    let selected = AdviceTargeter::new(3).select_for_state(&items, budget_state, &answers(&[("budget", "1m")]));
    let ids: Vec<&str> = selected.iter().map(|s| s.item.id.as_str()).collect();
    assert_eq!(ids, ["luxury", "a-tagged", "b-tagged"]);
}

#[test]
fn test_placements_restrict_items() {
    let config = compile(buyer_fields()).unwrap();
    let items = vec![
        welcome_item().with_placement(Placement::State("q_budget".to_string())),
        AdviceItem::new("privacy", "We never share your details", "...")
            .with_placement(Placement::Kind(StateKind::LeadCapture)),
    ];
    let targeter = AdviceTargeter::new(5);

    let on_budget = targeter.select_for_state(&items, config.state("q_budget").unwrap(), &Answers::new());
    assert_eq!(on_budget.len(), 1);
    assert_eq!(on_budget[0].item.id, "welcome");

    let on_timeline = targeter.select_for_state(&items, config.state("q_timeline").unwrap(), &Answers::new());
    assert!(on_timeline.is_empty());

    let on_lead = targeter.select_for_state(&items, config.state("lead_capture").unwrap(), &Answers::new());
    assert_eq!(on_lead.len(), 1);
    assert_eq!(on_lead[0].item.id, "privacy");
}

#[test]
fn test_lead_capture_counts_as_contact_phase() {
    let config = compile(buyer_fields()).unwrap();
    let items = vec![
        welcome_item(),
        AdviceItem::new("callback", "Prefer a call?", "...").with_tags(["phone"]),
    ];
    let selected =
        AdviceTargeter::new(1).select_for_state(&items, config.state("lead_capture").unwrap(), &Answers::new());
    assert_eq!(selected[0].item.id, "callback");
    assert_eq!(selected[0].basis, MatchBasis::TagInferred);
}

#[test]
fn test_rule_items_resolve_concepts() {
    let item = AdviceItem::new("luxury", "Luxury", "...").with_rule_group(RuleGroup::all([
        Condition::new("budget", Operator::GreaterThan, 500_000).with_concept("budget"),
    ]));
    let mut concepts = ConceptMap::new();
    concepts.insert("budget", "asking_price");
    let seller = answers(&[("asking_price", "$950,000")]);

    assert!(AdviceTargeter::new(1).select_advice(&[item.clone()], &seller).is_empty());
    let selected = AdviceTargeter::new(1).with_concepts(&concepts).select_advice(&[item], &seller);
    assert_eq!(selected.len(), 1);
}

#[test]
fn test_select_advice_returns_items() {
    let items = vec![welcome_item(), luxury_item()];
    let selected = select_advice(&items, &answers(&[("budget", "600000")]), 1);
    assert_eq!(selected, vec![luxury_item()]);
    assert!(select_advice(&items, &answers(&[]), 0).is_empty());
}

#[test]
fn test_authored_advice_document() {
    let json = r#"[
        {"id": "luxury", "title": "Luxury", "bodyText": "...",
         "ruleGroup": {"logic": "AND", "rules": [{"field": "budget", "operator": "greaterThan", "value": 500000}]}},
        {"id": "privacy", "title": "Privacy", "body": "...", "placements": ["kind:lead_capture"]},
        {"id": "welcome", "title": "Welcome", "body": "...", "placements": ["state:q_budget", "q_timeline"]}
    ]"#;
    let items = advice_items_from_json(json).unwrap();
    assert_eq!(items.len(), 3);
    assert!(items[0].rule_group.is_some());
    assert_eq!(items[1].placements, vec![Placement::Kind(StateKind::LeadCapture)]);
    assert_eq!(
        items[2].placements,
        vec![
            Placement::State("q_budget".to_string()),
            Placement::State("q_timeline".to_string())
        ]
    );
}

#[test]
fn test_keyword_phases() {
    assert!(phases_for("Down payment").contains(&AdvicePhase::Financing));
    assert!(phases_for("purchase_budget").contains(&AdvicePhase::Budget));
    assert!(phases_for("EMAIL").contains(&AdvicePhase::Contact));
    assert!(phases_for("favourite colour").is_empty());
}
