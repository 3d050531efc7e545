use std::time::Instant;

use crate::{DispatchId, TabId};

/// Read-only snapshot of the coordinator for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoordinatorView {
    pub pending: Option<PendingView>,
    pub bindings: Vec<BindingView>,
    pub delivered: Vec<TabId>,
}

impl CoordinatorView {
    pub fn bound_tabs(&self) -> Vec<TabId> {
        self.bindings.iter().map(|binding| binding.tab_id).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingView {
    pub id: DispatchId,
    pub text: String,
    pub auto_send: bool,
    pub follow_up: bool,
    /// `None` for a window too large to expire.
    pub expires_at: Option<Instant>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingView {
    pub tab_id: TabId,
    pub site: String,
    pub dispatch_id: DispatchId,
    pub follow_up: bool,
}
