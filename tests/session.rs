//! Tests for turn processing: re-prompts, stalls, cascading skips and lifecycle.
mod common;
use common::*;
use leadflow::engine::TransitionEngine;
use leadflow::flow::{CollectedField, ConversationState, StateTransition};
use leadflow::prelude::*;
use leadflow::session::timeout::{IdlePolicy, is_idle};
use leadflow::session::StayReason;

fn no_answers() -> Vec<(&'static str, &'static str)> {
    Vec::new()
}

#[test]
fn test_start_lands_on_first_question() {
    let config = compile(buyer_fields()).unwrap();
    let controller = SessionController::new(&config);
    let (session, outcome) = controller.start("s1", Answers::new(), t0()).unwrap();

    assert_eq!(session.current_state_id, "q_budget");
    assert_eq!(session.status, SessionStatus::Active);
    assert_eq!(session.history.len(), 1);
    assert_eq!(session.history[0].state_id, "q_budget");
    assert_eq!(
        outcome,
        TurnOutcome::Advanced {
            new_state_id: "q_budget".to_string(),
            skipped: vec![]
        }
    );
}

#[test]
fn test_answer_advances_one_state() {
    let config = compile(buyer_fields()).unwrap();
    let controller = SessionController::new(&config);
    let (mut session, _) = controller.start("s1", Answers::new(), t0()).unwrap();

    let outcome = controller
        .apply_turn(&mut session, [("budget", "600k")], minutes_after(t0(), 1))
        .unwrap();
    assert_eq!(outcome.status(), TurnStatus::Advanced);
    assert_eq!(session.current_state_id, "q_timeline");
    assert_eq!(session.answers.get("budget").map(String::as_str), Some("600k"));
    assert_eq!(session.last_activity_at, minutes_after(t0(), 1));
}

#[test]
fn test_missing_data_reprompts_then_stalls() {
    let config = compile(buyer_fields()).unwrap();
    let controller = SessionController::new(&config);
    let (mut session, _) = controller.start("s1", Answers::new(), t0()).unwrap();

    for attempt in 1..=3 {
        let outcome = controller.apply_turn(&mut session, no_answers(), t0()).unwrap();
        assert_eq!(
            outcome,
            TurnOutcome::Stayed {
                state_id: "q_budget".to_string(),
                reason: StayReason::MissingData {
                    missing: vec!["budget".to_string()]
                }
            }
        );
        assert_eq!(session.attempts("q_budget"), attempt);
    }

    // Compiled states carry no fallback edge, so the stall keeps the session in place.
    let outcome = controller.apply_turn(&mut session, no_answers(), t0()).unwrap();
    assert_eq!(
        outcome,
        TurnOutcome::Stayed {
            state_id: "q_budget".to_string(),
            reason: StayReason::AttemptsExhausted { attempts: 4 }
        }
    );
    assert_eq!(session.current_state_id, "q_budget");
    assert!(session.is_active());

    // A late answer still moves the conversation on.
    let outcome = controller
        .apply_turn(&mut session, [("budget", "450000")], t0())
        .unwrap();
    assert_eq!(outcome.status(), TurnStatus::Advanced);
}

#[test]
fn test_attempts_exceeded_edge_is_taken_after_the_budget() {
    let mut config = compile(buyer_fields()).unwrap();
    config.states[0].transitions.push(StateTransition::new(
        "lead_capture",
        TransitionCondition::AttemptsExceeded { n: 3 },
        5,
    ));
    let controller = SessionController::new(&config);
    let (mut session, _) = controller.start("s1", Answers::new(), t0()).unwrap();

    for _ in 0..3 {
        let outcome = controller.apply_turn(&mut session, no_answers(), t0()).unwrap();
        assert_eq!(outcome.status(), TurnStatus::Stayed);
    }
    let outcome = controller.apply_turn(&mut session, no_answers(), t0()).unwrap();
    assert_eq!(
        outcome,
        TurnOutcome::Advanced {
            new_state_id: "lead_capture".to_string(),
            skipped: vec![]
        }
    );
}

#[test]
fn test_multi_field_turn_cascades_past_known_states() {
    let config = compile(buyer_fields()).unwrap();
    let controller = SessionController::new(&config);
    let (mut session, _) = controller.start("s1", Answers::new(), t0()).unwrap();

    let outcome = controller
        .apply_turn(&mut session, [("budget", "600k"), ("timeline", "asap")], t0())
        .unwrap();
    assert_eq!(
        outcome,
        TurnOutcome::Advanced {
            new_state_id: "lead_capture".to_string(),
            skipped: vec!["q_timeline".to_string()]
        }
    );
    let visited: Vec<&str> = session.history.iter().map(|h| h.state_id.as_str()).collect();
    assert_eq!(visited, ["q_budget", "lead_capture"]);
}

#[test]
fn test_prefilled_answers_skip_on_start() {
    let config = compile(buyer_fields()).unwrap();
    let controller = SessionController::new(&config);
    let prefilled = answers(&[("budget", "600k"), ("timeline", "asap")]);
    let (session, outcome) = controller.start("s1", prefilled, t0()).unwrap();

    assert_eq!(
        outcome,
        TurnOutcome::Advanced {
            new_state_id: "lead_capture".to_string(),
            skipped: vec!["q_budget".to_string(), "q_timeline".to_string()]
        }
    );
    assert_eq!(session.history.len(), 1);
    assert_eq!(session.history[0].state_id, "lead_capture");
}

#[test]
fn test_skipping_can_be_disabled() {
    let config = FlowCompiler::builder(buyer_fields())
        .with_skip_if_known(false)
        .build()
        .compile()
        .unwrap();
    let controller = SessionController::new(&config);
    let prefilled = answers(&[("budget", "600k"), ("timeline", "asap")]);
    let (mut session, _) = controller.start("s1", prefilled, t0()).unwrap();
    assert_eq!(session.current_state_id, "q_budget");

    // The question is still asked once, and answered by what is already known.
    let outcome = controller.apply_turn(&mut session, no_answers(), t0()).unwrap();
    assert_eq!(
        outcome,
        TurnOutcome::Advanced {
            new_state_id: "q_timeline".to_string(),
            skipped: vec![]
        }
    );
}

#[test]
fn test_lead_capture_completes_the_session() {
    let config = compile(buyer_fields()).unwrap();
    let controller = SessionController::new(&config);
    let prefilled = answers(&[("budget", "600k"), ("timeline", "asap")]);
    let (mut session, _) = controller.start("s1", prefilled, t0()).unwrap();

    let outcome = controller
        .apply_turn(&mut session, [("email", "jo@example.com")], t0())
        .unwrap();
    assert_eq!(outcome, TurnOutcome::Completed);
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.current_state_id, "completion");

    // Further turns are a no-op.
    let history_len = session.history.len();
    let outcome = controller
        .apply_turn(&mut session, [("phone", "555-0100")], t0())
        .unwrap();
    assert!(outcome.is_completed());
    assert_eq!(session.history.len(), history_len);
    assert!(!session.answers.contains_key("phone"));
}

#[test]
fn test_optional_question_can_be_passed() {
    let fields = vec![
        FieldDefinition::new("budget", "How much?", 1),
        FieldDefinition::new("neighborhood", "Where?", 2).optional(),
    ];
    let config = compile(fields).unwrap();
    let controller = SessionController::new(&config);
    let (mut session, _) = controller.start("s1", answers(&[("budget", "1m")]), t0()).unwrap();
    assert_eq!(session.current_state_id, "q_neighborhood");

    let outcome = controller.apply_turn(&mut session, no_answers(), t0()).unwrap();
    assert_eq!(
        outcome,
        TurnOutcome::Advanced {
            new_state_id: "lead_capture".to_string(),
            skipped: vec![]
        }
    );
    assert_eq!(session.attempts("q_neighborhood"), 0);
}

#[test]
fn test_blank_values_never_erase_answers() {
    let config = compile(buyer_fields()).unwrap();
    let mut session = SessionState::new("s1", &config, t0());
    assert_eq!(session.merge_answers([("budget", " 600k ")]), 1);
    assert_eq!(session.merge_answers([("budget", "   "), ("timeline", "")]), 0);
    assert_eq!(session.answers.get("budget").map(String::as_str), Some("600k"));
    assert!(!session.answers.contains_key("timeline"));
}

#[test]
fn test_abandoned_sessions_reject_turns() {
    let config = compile(buyer_fields()).unwrap();
    let controller = SessionController::new(&config);
    let (mut session, _) = controller.start("s1", Answers::new(), t0()).unwrap();
    let policy = IdlePolicy::from_secs(30 * 60);

    assert!(!session.abandon_if_idle(minutes_after(t0(), 29), &policy));
    assert!(session.abandon_if_idle(minutes_after(t0(), 30), &policy));
    assert_eq!(session.status, SessionStatus::Abandoned);
    assert!(!session.abandon_if_idle(minutes_after(t0(), 90), &policy));

    let err = controller
        .apply_turn(&mut session, [("budget", "600k")], minutes_after(t0(), 31))
        .unwrap_err();
    assert_eq!(
        err,
        TurnError::SessionClosed {
            session_id: "s1".to_string(),
            status: "abandoned".to_string()
        }
    );
}

#[test]
fn test_idle_threshold() {
    let policy = IdlePolicy::default();
    assert_eq!(policy.threshold_secs, 1800);
    assert!(!is_idle(t0(), minutes_after(t0(), 29), &policy));
    assert!(is_idle(t0(), minutes_after(t0(), 30), &policy));
    assert!(!is_idle(t0(), minutes_after(t0(), 600), &IdlePolicy::from_secs(u64::MAX)));
}

#[test]
fn test_unknown_current_state_is_an_error() {
    let config = compile(buyer_fields()).unwrap();
    let controller = SessionController::new(&config);
    let (mut session, _) = controller.start("s1", Answers::new(), t0()).unwrap();
    session.current_state_id = "q_removed".to_string();

    let err = controller
        .apply_turn(&mut session, [("budget", "600k")], t0())
        .unwrap_err();
    assert!(matches!(err, TurnError::UnknownState { ref state_id, .. } if state_id == "q_removed"));
}

#[test]
fn test_session_follows_configuration_version() {
    let config = FlowCompiler::builder(buyer_fields()).with_version(2).build().compile().unwrap();
    let controller = SessionController::new(&config);
    let (mut session, _) = controller.start("s1", Answers::new(), t0()).unwrap();
    session.config_version = 1;

    controller.apply_turn(&mut session, [("budget", "600k")], t0()).unwrap();
    assert_eq!(session.config_version, 2);
}

fn skip_state(id: &str, key: &str, transition: StateTransition) -> ConversationState {
    ConversationState {
        id: id.to_string(),
        kind: StateKind::DataCollection,
        order: 0,
        collects: vec![CollectedField {
            mapping_key: key.to_string(),
            label: key.to_string(),
            required: true,
            concept: None,
        }],
        prompt: format!("{}?", key),
        input_kind: InputKind::FreeText,
        choices: vec![],
        transitions: vec![transition],
        max_attempts: 3,
        skip_if_already_known: true,
    }
}

/// `s0 -> a <-> b`, where both `a` and `b` are skippable once `y` is known.
fn skip_cycle() -> StateMachineConfig {
    let start = ConversationState {
        id: "s0".to_string(),
        kind: StateKind::DataCollection,
        order: 0,
        collects: vec![],
        prompt: "Hi!".to_string(),
        input_kind: InputKind::FreeText,
        choices: vec![],
        transitions: vec![StateTransition::new("a", TransitionCondition::Always, 0)],
        max_attempts: 3,
        skip_if_already_known: false,
    };
    let completion = ConversationState {
        id: "completion".to_string(),
        kind: StateKind::Completion,
        order: 9,
        collects: vec![],
        prompt: "Bye".to_string(),
        input_kind: InputKind::FreeText,
        choices: vec![],
        transitions: vec![],
        max_attempts: 0,
        skip_if_already_known: false,
    };
    let config = StateMachineConfig {
        id: "cyclic".to_string(),
        version: 1,
        initial_state_id: "s0".to_string(),
        states: vec![
            start,
            skip_state(
                "a",
                "y",
                StateTransition::new(
                    "b",
                    TransitionCondition::DataCollected {
                        mapping_keys: vec!["y".to_string()],
                    },
                    0,
                ),
            ),
            skip_state("b", "y", StateTransition::new("a", TransitionCondition::Always, 0)),
            completion,
        ],
        lead_capture_state_id: None,
        completion_state_id: "completion".to_string(),
    };
    leadflow::compiler::validate(&config).unwrap();
    config
}

#[test]
fn test_skip_cycle_overflows_the_guard() {
    let config = skip_cycle();
    let controller = SessionController::new(&config);
    let (mut session, _) = controller.start("s1", answers(&[("y", "1")]), t0()).unwrap();
    assert_eq!(session.current_state_id, "s0");

    let err = controller.apply_turn(&mut session, no_answers(), t0()).unwrap_err();
    assert_eq!(
        err,
        TurnError::CascadeOverflow {
            start_id: "a".to_string(),
            limit: 4
        }
    );

    let engine = TransitionEngine::new(&config).with_max_hops(1);
    let err = engine
        .resolve_cascade("a", &answers(&[("y", "1")]), &Default::default())
        .unwrap_err();
    assert!(matches!(err, TurnError::CascadeOverflow { limit: 1, .. }));
}

#[test]
fn test_rule_edges_resolve_concepts() {
    let mut config = compile(buyer_fields()).unwrap();
    config.states[0].transitions.insert(
        0,
        StateTransition::new(
            "lead_capture",
            TransitionCondition::RuleMatch {
                rule_group: RuleGroup::all([Condition::new("price", Operator::GreaterThan, 1_000_000)
                    .with_concept("budget")]),
            },
            0,
        ),
    );
    config.states[0].transitions[1].priority = 1;

    let mut concepts = ConceptMap::new();
    concepts.insert("budget", "budget");
    let controller = SessionController::with_engine(TransitionEngine::new(&config).with_concepts(&concepts));
    let (mut session, _) = controller.start("s1", Answers::new(), t0()).unwrap();

    let outcome = controller
        .apply_turn(&mut session, [("budget", "2.5m")], t0())
        .unwrap();
    assert_eq!(
        outcome,
        TurnOutcome::Advanced {
            new_state_id: "lead_capture".to_string(),
            skipped: vec![]
        }
    );
}
