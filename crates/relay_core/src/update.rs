use std::time::Instant;

use relay_logging::{relay_debug, relay_info, relay_trace, relay_warn};

use crate::{CoordinatorState, DispatchId, Effect, Msg, TabBinding, TabId};

/// Pure update function: applies a message to state and returns any effects.
///
/// `now` is the coordinator clock at the time the message is handled; a
/// dispatch is never pushed once `now` has passed its expiry, even if the
/// expiry timer has not been delivered yet.
pub fn update(mut state: CoordinatorState, msg: Msg, now: Instant) -> (CoordinatorState, Vec<Effect>) {
    let effects = match msg {
        Msg::StorePrompt { prompt, auto_send } => {
            let auto_send = auto_send.unwrap_or(state.settings().auto_send);
            let dispatch_id = state.begin_dispatch(prompt, auto_send, false, 0, now);
            vec![expiry_effect(&state, dispatch_id)]
        }
        Msg::OpenProviders {
            urls,
            prompt,
            auto_send,
        } => {
            let urls = clean_urls(urls);
            if urls.is_empty() {
                relay_debug!("open providers ignored: no urls");
                return (state, Vec::new());
            }
            let auto_send = auto_send.unwrap_or(state.settings().auto_send);
            let dispatch_id = state.begin_dispatch(prompt, auto_send, false, urls.len(), now);

            let mut effects = Vec::with_capacity(urls.len() + 1);
            for url in urls {
                effects.push(Effect::OpenTab { dispatch_id, url });
            }
            effects.push(expiry_effect(&state, dispatch_id));
            effects
        }
        Msg::SendFollowUp { prompt, auto_send } => {
            let targets: Vec<(TabId, String)> = state
                .delivered_tabs()
                .map(|(tab_id, site)| (tab_id, site.to_string()))
                .collect();
            if targets.is_empty() {
                relay_info!("follow-up ignored: no tab has received a prompt yet");
                return (state, Vec::new());
            }
            let auto_send = auto_send.unwrap_or(state.settings().auto_send);
            let dispatch_id = state.begin_dispatch(prompt, auto_send, true, 0, now);

            let mut effects = Vec::with_capacity(targets.len() + 1);
            for (tab_id, site) in targets {
                state.bind(TabBinding {
                    tab_id,
                    site,
                    dispatch_id,
                    follow_up: true,
                });
                if let Some(fill) = state.pending().map(|pending| pending.instruction(true)) {
                    effects.push(Effect::PushFill { tab_id, fill });
                }
            }
            effects.push(expiry_effect(&state, dispatch_id));
            effects
        }
        Msg::TabOpened {
            dispatch_id,
            tab_id,
            url,
        } => {
            if !state.open_finished(dispatch_id) {
                relay_debug!(
                    "tab {} opened for stale dispatch {}, not bound",
                    tab_id,
                    dispatch_id
                );
            } else if state.was_closed(tab_id) {
                relay_debug!("tab {} closed before its open completed, not bound", tab_id);
                state.settle_if_complete();
            } else {
                let site = state.site_key(&url);
                state.bind(TabBinding {
                    tab_id,
                    site,
                    dispatch_id,
                    follow_up: false,
                });
            }
            Vec::new()
        }
        Msg::TabOpenFailed { dispatch_id, url } => {
            relay_warn!("could not open tab for {} (dispatch {})", url, dispatch_id);
            if state.open_finished(dispatch_id) {
                state.settle_if_complete();
            }
            Vec::new()
        }
        Msg::TabCreated { tab_id } => {
            relay_trace!("tab {} created", tab_id);
            Vec::new()
        }
        Msg::TabReady { tab_id, url } => push_on_ready(&mut state, tab_id, &url, now)
            .into_iter()
            .collect(),
        Msg::FillAcknowledged { tab_id } => {
            match state.unbind(tab_id) {
                Some(binding) => {
                    relay_info!("tab {} ({}) acknowledged delivery", tab_id, binding.site);
                    state.record_acknowledged(&binding);
                    state.settle_if_complete();
                }
                None => relay_debug!("acknowledgment from unbound tab {}", tab_id),
            }
            Vec::new()
        }
        Msg::TabClosed { tab_id } => {
            if state.binding(tab_id).is_some() {
                relay_debug!("bound tab {} closed", tab_id);
            }
            state.forget_tab(tab_id);
            state.settle_if_complete();
            Vec::new()
        }
        Msg::DispatchExpired { dispatch_id } => {
            state.expire(dispatch_id);
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn push_on_ready(
    state: &mut CoordinatorState,
    tab_id: TabId,
    url: &str,
    now: Instant,
) -> Option<Effect> {
    let (dispatch_id, live, dispatch_follow_up) = match state.pending() {
        Some(pending) => (pending.id, pending.is_live(now), pending.follow_up),
        None => {
            relay_trace!("tab {} ready, no dispatch pending", tab_id);
            return None;
        }
    };
    if !live {
        relay_debug!("tab {} ready after dispatch {} expired, skipped", tab_id, dispatch_id);
        state.expire(dispatch_id);
        return None;
    }

    let Some(site) = state.registry().resolve_url(url).map(|adapter| adapter.id.clone()) else {
        relay_debug!("tab {} ready on unsupported url {}, skipped", tab_id, url);
        return None;
    };

    let follow_up = match state.binding(tab_id) {
        Some(binding) => binding.follow_up,
        None => {
            relay_debug!(
                "tab {} discovered on {} while dispatch {} is live{}",
                tab_id,
                site,
                dispatch_id,
                if dispatch_follow_up { " (follow-up)" } else { "" }
            );
            state.bind(TabBinding {
                tab_id,
                site,
                dispatch_id,
                follow_up: false,
            });
            false
        }
    };

    let fill = state.pending()?.instruction(follow_up);
    Some(Effect::PushFill { tab_id, fill })
}

fn expiry_effect(state: &CoordinatorState, dispatch_id: DispatchId) -> Effect {
    Effect::ScheduleExpiry {
        dispatch_id,
        after: state.settings().dispatch_window,
    }
}

fn clean_urls(urls: Vec<String>) -> Vec<String> {
    urls.into_iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect()
}
