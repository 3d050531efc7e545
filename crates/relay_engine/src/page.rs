use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ego_tree::NodeId;
use relay_core::DomEvent;
use scraper::{ElementRef, Html, Selector};
use tokio::sync::watch;

use crate::dom::{DomError, ElementHandle, ElementInfo, MutationObservation, PageDom};

const BLANK_DOCUMENT: &str = "<html><head></head><body></body></html>";

/// In-memory page backed by a parsed HTML snapshot.
///
/// Structure comes from the current source; writes made through [`PageDom`]
/// live in side tables keyed by node and are discarded by the next
/// [`HtmlPage::render`], the same way a site re-render replaces its widgets.
pub struct HtmlPage {
    url: String,
    state: Mutex<PageState>,
    revisions: watch::Sender<u64>,
    observers: Arc<AtomicUsize>,
}

#[derive(Default)]
struct PageState {
    source: String,
    generation: u64,
    revision: u64,
    values: HashMap<NodeId, String>,
    rich_text: HashMap<NodeId, String>,
    events: Vec<(NodeId, DomEvent)>,
    clicks: Vec<NodeId>,
}

impl HtmlPage {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_html(url, BLANK_DOCUMENT)
    }

    pub fn with_html(url: impl Into<String>, source: &str) -> Self {
        let (revisions, _) = watch::channel(0);
        Self {
            url: url.into(),
            state: Mutex::new(PageState {
                source: source.to_string(),
                ..PageState::default()
            }),
            revisions,
            observers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replaces the whole document and notifies observers.
    pub fn render(&self, source: &str) {
        let mut state = self.lock();
        state.source = source.to_string();
        state.generation += 1;
        state.values.clear();
        state.rich_text.clear();
        state.events.clear();
        state.clicks.clear();
        self.touch(&mut state);
    }

    /// Number of mutation observations currently connected.
    pub fn active_observers(&self) -> usize {
        self.observers.load(Ordering::SeqCst)
    }

    /// Current text of the first match: written value, written rich text, or parsed text.
    pub fn text_of(&self, selector: &str) -> Option<String> {
        let state = self.lock();
        let node = first_match(&state.source, selector).ok()??;
        if let Some(text) = state.rich_text.get(&node).or_else(|| state.values.get(&node)) {
            return Some(text.clone());
        }
        let document = Html::parse_document(&state.source);
        let element = document.tree.get(node).and_then(ElementRef::wrap)?;
        Some(element.text().collect::<String>())
    }

    /// Events raised on the first match since the last render.
    pub fn events_on(&self, selector: &str) -> Vec<DomEvent> {
        let state = self.lock();
        let Ok(Some(node)) = first_match(&state.source, selector) else {
            return Vec::new();
        };
        state
            .events
            .iter()
            .filter(|(target, _)| *target == node)
            .map(|(_, event)| *event)
            .collect()
    }

    pub fn click_count(&self, selector: &str) -> usize {
        let state = self.lock();
        let Ok(Some(node)) = first_match(&state.source, selector) else {
            return 0;
        };
        state.clicks.iter().filter(|target| **target == node).count()
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn touch(&self, state: &mut PageState) {
        state.revision += 1;
        self.revisions.send_replace(state.revision);
    }
}

impl PageDom for HtmlPage {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn query(&self, selector: &str) -> Result<Option<ElementHandle>, DomError> {
        let state = self.lock();
        let node = first_match(&state.source, selector)?;
        Ok(node.map(|node| ElementHandle::new(state.generation, node)))
    }

    fn observe(&self) -> MutationObservation {
        MutationObservation::new(self.revisions.subscribe(), self.observers.clone())
    }

    fn element_info(&self, element: ElementHandle) -> Result<ElementInfo, DomError> {
        let state = self.lock();
        if element.generation() != state.generation {
            return Err(DomError::StaleElement);
        }
        let document = Html::parse_document(&state.source);
        let found = document
            .tree
            .get(element.node())
            .and_then(ElementRef::wrap)
            .ok_or(DomError::StaleElement)?;
        let value = found.value();
        Ok(ElementInfo {
            tag: value.name().to_ascii_lowercase(),
            content_editable: value
                .attr("contenteditable")
                .is_some_and(|flag| flag.eq_ignore_ascii_case("true")),
            disabled: value.attr("disabled").is_some()
                || value
                    .attr("aria-disabled")
                    .is_some_and(|flag| flag.eq_ignore_ascii_case("true")),
        })
    }

    fn set_value(&self, element: ElementHandle, text: &str) -> Result<(), DomError> {
        let mut state = self.lock();
        let node = attached_node(&state, element)?;
        state.values.insert(node, text.to_string());
        self.touch(&mut state);
        Ok(())
    }

    fn replace_rich_text(&self, element: ElementHandle, text: &str) -> Result<(), DomError> {
        let mut state = self.lock();
        let node = attached_node(&state, element)?;
        state.rich_text.insert(node, text.to_string());
        self.touch(&mut state);
        Ok(())
    }

    fn dispatch_event(&self, element: ElementHandle, event: DomEvent) -> Result<(), DomError> {
        let mut state = self.lock();
        let node = attached_node(&state, element)?;
        state.events.push((node, event));
        Ok(())
    }

    fn click(&self, element: ElementHandle) -> Result<(), DomError> {
        let mut state = self.lock();
        let node = attached_node(&state, element)?;
        state.clicks.push(node);
        Ok(())
    }
}

fn attached_node(state: &PageState, element: ElementHandle) -> Result<NodeId, DomError> {
    if element.generation() != state.generation {
        return Err(DomError::StaleElement);
    }
    let document = Html::parse_document(&state.source);
    let node = document
        .tree
        .get(element.node())
        .and_then(ElementRef::wrap)
        .map(|found| found.id())
        .ok_or(DomError::StaleElement)?;
    Ok(node)
}

fn first_match(source: &str, selector: &str) -> Result<Option<NodeId>, DomError> {
    let parsed = Selector::parse(selector).map_err(|err| DomError::InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{err:?}"),
    })?;
    let document = Html::parse_document(source);
    let found = document.select(&parsed).next().map(|element| element.id());
    Ok(found)
}
