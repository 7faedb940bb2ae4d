//! Edge cases: cycles, shared references, failures, and deferred lifecycle.

use core::time::Duration;

use lodestar_core::{OutputError, Phase, Value};
use lodestar_output::{deferred, output, Input, Output};

mod common;

// ─────────────────────────────────────────────────────────────────────────────
// Cycle detection
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn self_referential_structure_fails_synchronously() {
    // a = {}; a.self = a - buildable only through a bound deferred.
    let (slot, binder) = Input::deferred();
    let a = Input::object([("self", slot)]);
    binder.bind(a.clone());

    assert!(matches!(
        output(a),
        Err(OutputError::CircularStructure)
    ));
}

#[tokio::test]
async fn cycle_appearing_after_resolution_rejects_lazily() {
    // The back-reference is bound after lifting, so the synchronous check
    // cannot see it; the post-resolution walk rejects it instead.
    let (slot, binder) = Input::deferred();
    let a = Input::object([("self", slot)]);

    let o = output(a.clone()).expect("cycle is not yet visible");
    binder.bind(a);

    assert!(matches!(
        o.value().await,
        Err(OutputError::CircularStructure)
    ));
    assert!(matches!(
        o.is_known().await,
        Err(OutputError::CircularStructure)
    ));
}

#[tokio::test]
async fn pending_resolving_to_ancestor_is_a_cycle() {
    let (slot, binder) = Input::deferred();
    let list = Input::array([Input::from(1), slot]);
    let o = output(list.clone()).unwrap();
    binder.bind(list);

    assert!(matches!(
        o.value().await,
        Err(OutputError::CircularStructure)
    ));
}

#[tokio::test]
async fn shared_node_at_two_positions_is_accepted() {
    // b = [a, a] - the same node twice is sharing, not a cycle.
    let a = Input::object([("n", Input::from(1))]);
    let b = Input::array([a.clone(), a]);

    let o = output(b).unwrap();
    let expected_member = Value::object([("n", Value::from(1))]);
    assert_eq!(
        o.value().await.unwrap(),
        Some(Value::Array(vec![expected_member.clone(), expected_member]))
    );
}

#[tokio::test]
async fn shared_pending_at_two_positions_is_accepted() {
    let (slot, binder) = Input::deferred();
    let pair = Input::array([slot.clone(), slot]);
    let o = output(pair).unwrap();
    binder.bind(7);

    assert_eq!(
        o.value().await.unwrap(),
        Some(Value::array([7, 7]))
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Failure propagation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rejected_pending_reaches_derived_outputs() {
    let o = output(Input::array([
        Input::from(1),
        Input::pending(async { Err(OutputError::pending("provider unavailable")) }),
    ]))
    .unwrap();
    let derived = o.apply(|v| Input::from(v));

    assert!(matches!(derived.value().await, Err(OutputError::Pending(_))));
    assert!(matches!(
        derived.is_known().await,
        Err(OutputError::Pending(_))
    ));
}

#[tokio::test]
async fn callback_failure_leaves_metadata_usable() {
    let source = Output::resolved("ok", true, false, common::deps_of("vm"));
    let failed = source.try_apply(|_| Err(OutputError::callback("parse failure")));

    assert!(matches!(failed.value().await, Err(OutputError::Callback(_))));
    assert!(matches!(
        failed.is_known().await,
        Err(OutputError::Callback(_))
    ));
    assert!(!failed.is_secret().await.unwrap());
    assert_eq!(failed.all_resources().await.unwrap(), common::deps_of("vm"));
    assert_eq!(failed.resources().await.unwrap(), common::deps_of("vm"));
}

#[tokio::test]
async fn chained_apply_after_failure_keeps_failing() {
    let source = Output::new(1);
    let failed = source.try_apply(|_| Err(OutputError::callback("boom")));
    let chained = failed.apply(|v| Input::from(v));

    assert!(matches!(chained.value().await, Err(OutputError::Callback(_))));
}

// ─────────────────────────────────────────────────────────────────────────────
// Unknown sentinel handling
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn deeply_nested_sentinel_forces_unknown() {
    let o = output(Input::object([(
        "outer",
        Input::array([Input::object([("inner", Input::from(Value::Unknown))])]),
    )]))
    .unwrap();

    assert!(!o.is_known().await.unwrap());
    assert_eq!(o.value().await.unwrap(), None);
}

#[tokio::test]
async fn sentinel_returned_by_callback_makes_result_unknown() {
    let source = Output::new(1);
    let result = source.apply(|_| Input::from(Value::Unknown));

    assert!(!result.is_known().await.unwrap());
    assert_eq!(result.value().await.unwrap(), None);
}

// ─────────────────────────────────────────────────────────────────────────────
// Deferred lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unbound_deferred_suspends() {
    let (pending, binder) = deferred();

    let read = tokio::time::timeout(Duration::from_millis(20), pending.value());
    assert!(read.await.is_err(), "an unbound deferred should suspend");

    // Still bindable afterwards.
    binder.bind(&Output::new(1));
    assert_eq!(pending.value().await.unwrap(), Some(Value::from(1)));
}

#[tokio::test]
async fn dropped_input_binder_rejects_the_lift() {
    let (slot, binder) = Input::deferred();
    let o = output(Input::array([slot])).unwrap();
    drop(binder);

    assert!(matches!(
        o.value().await,
        Err(OutputError::DeferredDropped)
    ));
}

// ─────────────────────────────────────────────────────────────────────────────
// Phase-sensitive value visibility
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_result_value_is_hidden_in_both_phases() {
    for phase in [Phase::Preview, Phase::Apply] {
        let _phase = common::with_phase(phase);
        let source = common::unknown_from("node");
        let result = source.apply(|_| Input::from("materialized"));

        assert!(!result.is_known().await.unwrap());
        assert_eq!(result.value().await.unwrap(), None);
    }
}
