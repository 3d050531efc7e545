use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ego_tree::NodeId;
use relay_core::DomEvent;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("invalid selector {selector}: {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("element is no longer attached to the document")]
    StaleElement,
}

/// Reference to an element of one rendered document.
/// It goes stale when the page re-renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    generation: u64,
    node: NodeId,
}

impl ElementHandle {
    pub(crate) fn new(generation: u64, node: NodeId) -> Self {
        Self { generation, node }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn node(&self) -> NodeId {
        self.node
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementInfo {
    pub tag: String,
    pub content_editable: bool,
    pub disabled: bool,
}

/// Live subscription to document mutations. Dropping it disconnects.
pub struct MutationObservation {
    revisions: watch::Receiver<u64>,
    active: Arc<AtomicUsize>,
}

impl MutationObservation {
    pub fn new(revisions: watch::Receiver<u64>, active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self { revisions, active }
    }

    /// Waits for the next mutation. `false` once the document is gone.
    pub async fn changed(&mut self) -> bool {
        self.revisions.changed().await.is_ok()
    }
}

impl Drop for MutationObservation {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The page a filler runs in.
pub trait PageDom: Send + Sync {
    fn url(&self) -> String;

    /// First element matching `selector`, in document order.
    fn query(&self, selector: &str) -> Result<Option<ElementHandle>, DomError>;

    fn observe(&self) -> MutationObservation;

    fn element_info(&self, element: ElementHandle) -> Result<ElementInfo, DomError>;

    /// Value-assignment editing model.
    fn set_value(&self, element: ElementHandle, text: &str) -> Result<(), DomError>;

    /// Rich-text editing model: clears the children and inserts one paragraph.
    fn replace_rich_text(&self, element: ElementHandle, text: &str) -> Result<(), DomError>;

    fn dispatch_event(&self, element: ElementHandle, event: DomEvent) -> Result<(), DomError>;

    fn click(&self, element: ElementHandle) -> Result<(), DomError>;
}
