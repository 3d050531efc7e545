use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use relay_logging::{prompt_preview, relay_debug, relay_info};

use crate::adapter::{host_of, AdapterRegistry};
use crate::protocol::FillPrompt;
use crate::view_model::{BindingView, CoordinatorView, PendingView};

/// Opaque browser tab handle.
pub type TabId = u64;
pub type DispatchId = u64;

pub const DEFAULT_DISPATCH_WINDOW: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// How long a dispatch may be pushed into tabs after it was created.
    pub dispatch_window: Duration,
    /// Used when a panel request does not say whether to auto-send.
    pub auto_send: bool,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            dispatch_window: DEFAULT_DISPATCH_WINDOW,
            auto_send: true,
        }
    }
}

/// The prompt currently in flight. At most one is live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDispatch {
    pub id: DispatchId,
    pub text: String,
    pub auto_send: bool,
    pub follow_up: bool,
    pub created_at: Instant,
    pub window: Duration,
    awaiting_open: usize,
    acknowledged: usize,
}

impl PendingDispatch {
    /// `None` when the window reaches past what the clock can represent.
    pub fn expires_at(&self) -> Option<Instant> {
        self.created_at.checked_add(self.window)
    }

    pub fn is_live(&self, now: Instant) -> bool {
        self.expires_at().map_or(true, |expires_at| now < expires_at)
    }

    pub fn instruction(&self, follow_up: bool) -> FillPrompt {
        FillPrompt {
            prompt: self.text.clone(),
            auto_send: self.auto_send,
            follow_up,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabBinding {
    pub tab_id: TabId,
    /// Adapter id when the URL is supported, otherwise the host name.
    pub site: String,
    pub dispatch_id: DispatchId,
    pub follow_up: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoordinatorState {
    settings: CoordinatorSettings,
    registry: AdapterRegistry,
    pending: Option<PendingDispatch>,
    bindings: BTreeMap<TabId, TabBinding>,
    /// Tabs that acknowledged at least one delivery; follow-up targets.
    delivered: BTreeMap<TabId, String>,
    /// Tabs the host removed while the live dispatch existed. An open
    /// completion may arrive after the removal.
    closed: BTreeSet<TabId>,
    last_dispatch_id: DispatchId,
}

impl CoordinatorState {
    pub fn new(settings: CoordinatorSettings, registry: AdapterRegistry) -> Self {
        Self {
            settings,
            registry,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn pending(&self) -> Option<&PendingDispatch> {
        self.pending.as_ref()
    }

    pub fn binding(&self, tab_id: TabId) -> Option<&TabBinding> {
        self.bindings.get(&tab_id)
    }

    pub fn bindings(&self) -> impl Iterator<Item = &TabBinding> {
        self.bindings.values()
    }

    pub fn delivered_tabs(&self) -> impl Iterator<Item = (TabId, &str)> {
        self.delivered.iter().map(|(tab, site)| (*tab, site.as_str()))
    }

    pub fn view(&self) -> CoordinatorView {
        CoordinatorView {
            pending: self.pending.as_ref().map(|pending| PendingView {
                id: pending.id,
                text: pending.text.clone(),
                auto_send: pending.auto_send,
                follow_up: pending.follow_up,
                expires_at: pending.expires_at(),
            }),
            bindings: self
                .bindings
                .values()
                .map(|binding| BindingView {
                    tab_id: binding.tab_id,
                    site: binding.site.clone(),
                    dispatch_id: binding.dispatch_id,
                    follow_up: binding.follow_up,
                })
                .collect(),
            delivered: self.delivered.keys().copied().collect(),
        }
    }

    /// Site key for a URL: adapter id when supported, else the host, else the raw URL.
    pub fn site_key(&self, url: &str) -> String {
        if let Some(adapter) = self.registry.resolve_url(url) {
            return adapter.id.clone();
        }
        host_of(url).unwrap_or_else(|| url.trim().to_string())
    }

    /// Replaces the live dispatch. Bindings of the replaced one are dropped.
    pub(crate) fn begin_dispatch(
        &mut self,
        text: String,
        auto_send: bool,
        follow_up: bool,
        awaiting_open: usize,
        now: Instant,
    ) -> DispatchId {
        self.closed.clear();
        if let Some(previous) = self.pending.take() {
            let dropped = self.drop_bindings_of(previous.id);
            relay_debug!(
                "dispatch {} replaced, dropped {} bindings",
                previous.id,
                dropped
            );
        }

        self.last_dispatch_id += 1;
        let id = self.last_dispatch_id;
        relay_info!(
            "dispatch {} started follow_up={} auto_send={} prompt=\"{}\"",
            id,
            follow_up,
            auto_send,
            prompt_preview(&text)
        );
        self.pending = Some(PendingDispatch {
            id,
            text,
            auto_send,
            follow_up,
            created_at: now,
            window: self.settings.dispatch_window,
            awaiting_open,
            acknowledged: 0,
        });
        id
    }

    /// Whether the host already reported `tab_id` removed during the live dispatch.
    pub(crate) fn was_closed(&self, tab_id: TabId) -> bool {
        self.closed.contains(&tab_id)
    }

    /// Records that one tab-open request of `dispatch_id` finished.
    /// Returns whether that dispatch is still the live one.
    pub(crate) fn open_finished(&mut self, dispatch_id: DispatchId) -> bool {
        match self.pending.as_mut() {
            Some(pending) if pending.id == dispatch_id => {
                pending.awaiting_open = pending.awaiting_open.saturating_sub(1);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn bind(&mut self, binding: TabBinding) {
        relay_debug!(
            "tab {} bound to {} (dispatch {})",
            binding.tab_id,
            binding.site,
            binding.dispatch_id
        );
        self.bindings.insert(binding.tab_id, binding);
    }

    pub(crate) fn unbind(&mut self, tab_id: TabId) -> Option<TabBinding> {
        self.bindings.remove(&tab_id)
    }

    pub(crate) fn record_acknowledged(&mut self, binding: &TabBinding) {
        self.delivered.insert(binding.tab_id, binding.site.clone());
        if let Some(pending) = self.pending.as_mut() {
            if pending.id == binding.dispatch_id {
                pending.acknowledged += 1;
            }
        }
    }

    pub(crate) fn forget_tab(&mut self, tab_id: TabId) {
        if self.pending.is_some() {
            self.closed.insert(tab_id);
        }
        self.bindings.remove(&tab_id);
        self.delivered.remove(&tab_id);
    }

    /// Clears the live dispatch once every tab it opened or discovered has
    /// acknowledged delivery.
    pub(crate) fn settle_if_complete(&mut self) {
        let Some(pending) = self.pending.as_ref() else {
            return;
        };
        let outstanding = self
            .bindings
            .values()
            .filter(|binding| binding.dispatch_id == pending.id)
            .count();
        if pending.awaiting_open == 0 && outstanding == 0 && pending.acknowledged > 0 {
            relay_info!(
                "dispatch {} completed, {} tabs acknowledged",
                pending.id,
                pending.acknowledged
            );
            self.pending = None;
            self.closed.clear();
        }
    }

    /// Clears the dispatch if it is still the live one. Outstanding bindings go with it.
    pub(crate) fn expire(&mut self, dispatch_id: DispatchId) -> bool {
        match self.pending.as_ref() {
            Some(pending) if pending.id == dispatch_id => {
                self.pending = None;
                self.closed.clear();
                let dropped = self.drop_bindings_of(dispatch_id);
                relay_info!(
                    "dispatch {} expired with {} bindings outstanding",
                    dispatch_id,
                    dropped
                );
                true
            }
            _ => false,
        }
    }

    fn drop_bindings_of(&mut self, dispatch_id: DispatchId) -> usize {
        let before = self.bindings.len();
        self.bindings
            .retain(|_, binding| binding.dispatch_id != dispatch_id);
        before - self.bindings.len()
    }
}
