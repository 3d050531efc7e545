use std::sync::Once;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use relay_core::{
    update, AdapterRegistry, CoordinatorSettings, CoordinatorState, Effect, FillPrompt, Msg,
    TabId,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(relay_logging::initialize_for_tests);
}

fn fresh() -> CoordinatorState {
    CoordinatorState::new(CoordinatorSettings::default(), AdapterRegistry::builtin())
}

fn open_providers(
    state: CoordinatorState,
    urls: &[&str],
    prompt: &str,
    now: Instant,
) -> (CoordinatorState, Vec<Effect>) {
    update(
        state,
        Msg::OpenProviders {
            urls: urls.iter().map(|url| url.to_string()).collect(),
            prompt: prompt.to_string(),
            auto_send: Some(true),
        },
        now,
    )
}

fn opened_urls(effects: &[Effect]) -> Vec<String> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::OpenTab { url, .. } => Some(url.clone()),
            _ => None,
        })
        .collect()
}

fn pushed_tabs(effects: &[Effect]) -> Vec<TabId> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::PushFill { tab_id, .. } => Some(*tab_id),
            _ => None,
        })
        .collect()
}

fn tab_opened(state: CoordinatorState, tab_id: TabId, url: &str, now: Instant) -> CoordinatorState {
    let dispatch_id = state.pending().expect("pending dispatch").id;
    let (state, effects) = update(
        state,
        Msg::TabOpened {
            dispatch_id,
            tab_id,
            url: url.to_string(),
        },
        now,
    );
    assert!(effects.is_empty());
    state
}

#[test]
fn open_providers_opens_one_tab_per_url_and_schedules_expiry() {
    init_logging();
    let now = Instant::now();
    let urls = ["https://claude.ai/new", "https://chatgpt.com/", "https://grok.com/"];

    let (state, effects) = open_providers(fresh(), &urls, "explain recursion", now);

    assert_eq!(opened_urls(&effects), urls.to_vec());
    let dispatch_id = state.pending().unwrap().id;
    assert_eq!(
        effects.last(),
        Some(&Effect::ScheduleExpiry {
            dispatch_id,
            after: Duration::from_secs(30),
        })
    );
    assert!(state.view().bindings.is_empty());
}

#[test]
fn bindings_match_open_count_regardless_of_event_order() {
    init_logging();
    let now = Instant::now();
    let urls = ["https://claude.ai/", "https://chatgpt.com/", "https://example.org/"];
    let (state, _) = open_providers(fresh(), &urls, "hello", now);

    // Tabs come back out of order, with readiness interleaved.
    let state = tab_opened(state, 12, urls[2], now);
    let (state, _) = update(
        state,
        Msg::TabReady {
            tab_id: 12,
            url: urls[2].to_string(),
        },
        now,
    );
    let state = tab_opened(state, 10, urls[0], now);
    let state = tab_opened(state, 11, urls[1], now);

    let view = state.view();
    assert_eq!(view.bound_tabs(), vec![10, 11, 12]);
    let sites: Vec<_> = view.bindings.iter().map(|b| b.site.as_str()).collect();
    assert_eq!(sites, vec!["claude", "chatgpt", "example.org"]);
}

#[test]
fn ready_tab_receives_fill_instruction() {
    init_logging();
    let now = Instant::now();
    let (state, _) = open_providers(fresh(), &["https://claude.ai/"], "explain recursion", now);
    let state = tab_opened(state, 3, "https://claude.ai/", now);

    let (_state, effects) = update(
        state,
        Msg::TabReady {
            tab_id: 3,
            url: "https://claude.ai/new".to_string(),
        },
        now + Duration::from_secs(2),
    );

    assert_eq!(
        effects,
        vec![Effect::PushFill {
            tab_id: 3,
            fill: FillPrompt {
                prompt: "explain recursion".to_string(),
                auto_send: true,
                follow_up: false,
            },
        }]
    );
}

#[test]
fn repeated_readiness_repushes_while_dispatch_is_live() {
    init_logging();
    let now = Instant::now();
    let (state, _) = open_providers(fresh(), &["https://chatgpt.com/"], "p", now);
    let mut state = tab_opened(state, 1, "https://chatgpt.com/", now);

    for second in 1..4 {
        let (next, effects) = update(
            state,
            Msg::TabReady {
                tab_id: 1,
                url: "https://chatgpt.com/".to_string(),
            },
            now + Duration::from_secs(second),
        );
        assert_eq!(pushed_tabs(&effects), vec![1]);
        state = next;
    }
}

#[test]
fn ready_on_unsupported_url_is_skipped() {
    init_logging();
    let now = Instant::now();
    let (state, _) = open_providers(fresh(), &["https://claude.ai/"], "p", now);
    let state = tab_opened(state, 1, "https://claude.ai/", now);

    // Redirected to a login page on another domain.
    let (state, effects) = update(
        state,
        Msg::TabReady {
            tab_id: 1,
            url: "https://accounts.example.com/login".to_string(),
        },
        now,
    );
    assert!(effects.is_empty());
    assert_eq!(state.view().bound_tabs(), vec![1]);
}

#[test]
fn empty_url_list_is_ignored() {
    init_logging();
    let now = Instant::now();
    let (state, effects) = open_providers(fresh(), &[], "prompt", now);
    assert!(effects.is_empty());
    assert!(state.pending().is_none());

    let (state, effects) = open_providers(state, &["  ", ""], "prompt", now);
    assert!(effects.is_empty());
    assert!(state.pending().is_none());
}

#[test]
fn all_acknowledgments_clear_the_dispatch() {
    init_logging();
    let now = Instant::now();
    let urls = ["https://claude.ai/", "https://gemini.google.com/app"];
    let (state, _) = open_providers(fresh(), &urls, "explain recursion", now);
    let state = tab_opened(state, 1, urls[0], now);
    let state = tab_opened(state, 2, urls[1], now);

    let (state, _) = update(state, Msg::FillAcknowledged { tab_id: 1 }, now);
    assert!(state.pending().is_some());
    assert_eq!(state.view().bound_tabs(), vec![2]);

    let (state, _) = update(state, Msg::FillAcknowledged { tab_id: 2 }, now);
    let view = state.view();
    assert!(view.pending.is_none());
    assert!(view.bindings.is_empty());
    assert_eq!(view.delivered, vec![1, 2]);
}

#[test]
fn early_acknowledgment_waits_for_outstanding_opens() {
    init_logging();
    let now = Instant::now();
    let urls = ["https://claude.ai/", "https://chatgpt.com/"];
    let (state, _) = open_providers(fresh(), &urls, "p", now);
    let state = tab_opened(state, 1, urls[0], now);

    let (state, _) = update(state, Msg::FillAcknowledged { tab_id: 1 }, now);
    assert!(state.pending().is_some(), "second tab has not opened yet");

    let dispatch_id = state.pending().unwrap().id;
    let (state, _) = update(
        state,
        Msg::TabOpenFailed {
            dispatch_id,
            url: urls[1].to_string(),
        },
        now,
    );
    assert!(state.pending().is_none());
}

#[test]
fn closed_tab_loses_binding_and_others_continue() {
    init_logging();
    let now = Instant::now();
    let urls = ["https://claude.ai/", "https://chatgpt.com/"];
    let (state, _) = open_providers(fresh(), &urls, "p", now);
    let state = tab_opened(state, 1, urls[0], now);
    let state = tab_opened(state, 2, urls[1], now);

    let (state, effects) = update(state, Msg::TabClosed { tab_id: 1 }, now);
    assert!(effects.is_empty());
    assert_eq!(state.view().bound_tabs(), vec![2]);

    let (state, effects) = update(
        state,
        Msg::TabReady {
            tab_id: 2,
            url: urls[1].to_string(),
        },
        now,
    );
    assert_eq!(pushed_tabs(&effects), vec![2]);
    assert!(state.pending().is_some());
}

#[test]
fn close_reported_before_open_completion_never_binds() {
    init_logging();
    let now = Instant::now();
    let (state, _) = open_providers(
        fresh(),
        &["https://claude.ai/new", "https://grok.com/"],
        "closed early",
        now,
    );

    let (state, _) = update(state, Msg::TabClosed { tab_id: 7 }, now);
    let state = tab_opened(state, 7, "https://claude.ai/new", now);
    assert_eq!(state.binding(7), None);

    let state = tab_opened(state, 8, "https://grok.com/", now);
    let (state, _) = update(state, Msg::FillAcknowledged { tab_id: 8 }, now);
    assert_eq!(state.pending(), None);
    assert!(state.view().bindings.is_empty());
}

#[test]
fn new_dispatch_replaces_previous_and_drops_its_bindings() {
    init_logging();
    let now = Instant::now();
    let (state, _) = open_providers(fresh(), &["https://claude.ai/"], "first", now);
    let first_id = state.pending().unwrap().id;
    let state = tab_opened(state, 1, "https://claude.ai/", now);

    let (state, _) = open_providers(state, &["https://grok.com/"], "second", now);
    let second = state.pending().unwrap();
    assert_ne!(second.id, first_id);
    assert_eq!(second.text, "second");
    assert!(state.view().bindings.is_empty());

    // A tab from the first dispatch finishing its open is not bound.
    let (state, _) = update(
        state,
        Msg::TabOpened {
            dispatch_id: first_id,
            tab_id: 9,
            url: "https://claude.ai/".to_string(),
        },
        now,
    );
    assert!(state.binding(9).is_none());
}

#[test]
fn stored_prompt_reaches_manually_opened_supported_tab() {
    init_logging();
    let now = Instant::now();
    let (state, effects) = update(
        fresh(),
        Msg::StorePrompt {
            prompt: "manual".to_string(),
            auto_send: None,
        },
        now,
    );
    assert!(opened_urls(&effects).is_empty());

    let (state, effects) = update(
        state,
        Msg::TabReady {
            tab_id: 40,
            url: "https://chat.deepseek.com/".to_string(),
        },
        now,
    );
    assert_eq!(pushed_tabs(&effects), vec![40]);
    assert_eq!(state.binding(40).unwrap().site, "deepseek");

    let (_state, effects) = update(
        state,
        Msg::TabReady {
            tab_id: 41,
            url: "https://news.example.com/".to_string(),
        },
        now,
    );
    assert!(effects.is_empty());
}

#[test]
fn follow_up_targets_tabs_that_acknowledged() {
    init_logging();
    let now = Instant::now();
    let urls = ["https://claude.ai/", "https://chatgpt.com/"];
    let (state, _) = open_providers(fresh(), &urls, "first", now);
    let state = tab_opened(state, 1, urls[0], now);
    let state = tab_opened(state, 2, urls[1], now);
    let (state, _) = update(state, Msg::FillAcknowledged { tab_id: 1 }, now);

    let later = now + Duration::from_secs(60);
    let (state, effects) = update(
        state,
        Msg::SendFollowUp {
            prompt: "and now in Rust".to_string(),
            auto_send: None,
        },
        later,
    );

    assert_eq!(
        effects[0],
        Effect::PushFill {
            tab_id: 1,
            fill: FillPrompt {
                prompt: "and now in Rust".to_string(),
                auto_send: true,
                follow_up: true,
            },
        }
    );
    assert!(matches!(effects[1], Effect::ScheduleExpiry { .. }));
    let pending = state.pending().unwrap();
    assert!(pending.follow_up);
    assert_eq!(state.view().bound_tabs(), vec![1]);
}

#[test]
fn follow_up_without_delivered_tabs_is_ignored() {
    init_logging();
    let now = Instant::now();
    let (state, effects) = update(
        fresh(),
        Msg::SendFollowUp {
            prompt: "again".to_string(),
            auto_send: None,
        },
        now,
    );
    assert!(effects.is_empty());
    assert!(state.pending().is_none());
}

#[test]
fn closing_delivered_tab_removes_it_from_follow_up_targets() {
    init_logging();
    let now = Instant::now();
    let (state, _) = open_providers(fresh(), &["https://claude.ai/"], "first", now);
    let state = tab_opened(state, 1, "https://claude.ai/", now);
    let (state, _) = update(state, Msg::FillAcknowledged { tab_id: 1 }, now);
    let (state, _) = update(state, Msg::TabClosed { tab_id: 1 }, now);

    let (_state, effects) = update(
        state,
        Msg::SendFollowUp {
            prompt: "again".to_string(),
            auto_send: None,
        },
        now,
    );
    assert!(effects.is_empty());
}
