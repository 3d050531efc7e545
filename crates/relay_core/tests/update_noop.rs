use std::time::Instant;

use relay_core::{update, CoordinatorState, Msg};

#[test]
fn update_is_noop() {
    let state = CoordinatorState::default();
    let (next, effects) = update(state.clone(), Msg::NoOp, Instant::now());

    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn events_without_dispatch_change_nothing() {
    let now = Instant::now();
    let state = CoordinatorState::default();
    let (state, effects) = update(
        state,
        Msg::TabReady {
            tab_id: 1,
            url: "https://claude.ai/".to_string(),
        },
        now,
    );
    assert!(effects.is_empty());
    let (state, effects) = update(state, Msg::FillAcknowledged { tab_id: 1 }, now);
    assert!(effects.is_empty());
    let (next, effects) = update(state.clone(), Msg::TabCreated { tab_id: 2 }, now);
    assert!(effects.is_empty());
    assert_eq!(state, next);
}
