//! In-process browser used by the scenario runner and the end-to-end tests.
//!
//! Each tab owns an [`HtmlPage`] and a [`Filler`]. Pages load after a delay,
//! the in-page listener may attach later still, and a site can re-render its
//! whole document after load the way single-page chat apps do.
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use relay_core::{
    host_of, AdapterRegistry, FillOutcome, FillPhase, TabId, TabMessage, TabReport,
};
use relay_logging::{relay_debug, relay_info, relay_warn};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::coordinator::{CoordinatorHandle, HostError, TabEvent, TabHost, TabStatus};
use crate::filler::{CoordinatorLink, FillSettings, Filler};
use crate::page::HtmlPage;
use crate::slot::{FilePromptSlot, MemoryPromptSlot, PromptSlot};

pub const DEFAULT_LOAD_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LateRender {
    pub after: Duration,
    pub html: String,
}

/// What a url serves in the simulated browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimSite {
    pub url: String,
    pub html: String,
    /// Where the tab ends up after navigation; defaults to `url`.
    pub final_url: Option<String>,
    pub late_render: Option<LateRender>,
    pub load_delay: Duration,
    /// Extra time after load before the in-page listener accepts messages.
    pub listener_delay: Duration,
    /// Prompt already waiting in the origin's storage slot.
    pub stored_prompt: Option<String>,
}

impl SimSite {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            final_url: None,
            late_render: None,
            load_delay: DEFAULT_LOAD_DELAY,
            listener_delay: Duration::ZERO,
            stored_prompt: None,
        }
    }

    pub fn redirect_to(mut self, final_url: impl Into<String>) -> Self {
        self.final_url = Some(final_url.into());
        self
    }

    pub fn late_render(mut self, after: Duration, html: impl Into<String>) -> Self {
        self.late_render = Some(LateRender {
            after,
            html: html.into(),
        });
        self
    }

    pub fn load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    pub fn listener_delay(mut self, delay: Duration) -> Self {
        self.listener_delay = delay;
        self
    }

    pub fn stored_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.stored_prompt = Some(prompt.into());
        self
    }
}

struct SimTab {
    site: SimSite,
    page: Arc<HtmlPage>,
    filler: Arc<Filler>,
    slot: Arc<dyn PromptSlot>,
    inbox: mpsc::UnboundedSender<String>,
    listening: Arc<AtomicBool>,
    outcomes: Arc<Mutex<Vec<FillOutcome>>>,
    /// Aborting these also aborts fills still running in the document.
    tasks: Vec<JoinHandle<()>>,
}

impl SimTab {
    fn abort(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

pub struct SimulatedBrowser {
    coordinator: CoordinatorHandle,
    registry: Arc<AdapterRegistry>,
    fill_settings: FillSettings,
    sites: Vec<SimSite>,
    /// File-backed storage slots when set, in-memory otherwise.
    slot_dir: Option<PathBuf>,
    next_tab: AtomicU64,
    tabs: Mutex<BTreeMap<TabId, SimTab>>,
}

/// Reports from one tab's filler back to the coordinator.
struct TabLink {
    tab_id: TabId,
    coordinator: CoordinatorHandle,
}

#[async_trait::async_trait]
impl CoordinatorLink for TabLink {
    async fn report(&self, report: TabReport) -> Result<(), HostError> {
        self.coordinator.tab_report(self.tab_id, report)
    }
}

impl SimulatedBrowser {
    pub fn new(
        coordinator: CoordinatorHandle,
        registry: Arc<AdapterRegistry>,
        fill_settings: FillSettings,
        sites: Vec<SimSite>,
    ) -> Arc<Self> {
        Self::build(coordinator, registry, fill_settings, sites, None)
    }

    /// Same as [`SimulatedBrowser::new`], with each origin's storage slot kept
    /// as a file under `dir`.
    pub fn with_slot_dir(
        coordinator: CoordinatorHandle,
        registry: Arc<AdapterRegistry>,
        fill_settings: FillSettings,
        sites: Vec<SimSite>,
        dir: PathBuf,
    ) -> Arc<Self> {
        Self::build(coordinator, registry, fill_settings, sites, Some(dir))
    }

    fn build(
        coordinator: CoordinatorHandle,
        registry: Arc<AdapterRegistry>,
        fill_settings: FillSettings,
        sites: Vec<SimSite>,
        slot_dir: Option<PathBuf>,
    ) -> Arc<Self> {
        Arc::new(Self {
            coordinator,
            registry,
            fill_settings,
            sites,
            slot_dir,
            next_tab: AtomicU64::new(1),
            tabs: Mutex::new(BTreeMap::new()),
        })
    }

    /// A tab the user opened by hand, outside any dispatch.
    pub fn open_manual(&self, url: &str) -> Result<TabId, HostError> {
        self.open(url)
    }

    pub fn close_tab(&self, tab_id: TabId) -> Result<(), HostError> {
        let Some(mut tab) = self.lock_tabs().remove(&tab_id) else {
            return Err(HostError::TabNotFound(tab_id));
        };
        tab.abort();
        relay_debug!("sim: tab {} closed", tab_id);
        self.coordinator.tab_event(TabEvent::Removed { tab_id })
    }

    /// Navigates the tab again: fresh document, fresh in-page agent. The
    /// storage slot survives, so a prompt already read is not delivered again.
    pub fn reload(&self, tab_id: TabId) -> Result<(), HostError> {
        let mut tabs = self.lock_tabs();
        let Some(tab) = tabs.get_mut(&tab_id) else {
            return Err(HostError::TabNotFound(tab_id));
        };
        tab.abort();
        let site = tab.site.clone();
        let slot = tab.slot.clone();
        *tab = self.start_tab(tab_id, site, slot);
        drop(tabs);
        relay_debug!("sim: tab {} reloading", tab_id);
        Ok(())
    }

    pub fn page(&self, tab_id: TabId) -> Option<Arc<HtmlPage>> {
        self.lock_tabs().get(&tab_id).map(|tab| tab.page.clone())
    }

    pub fn fill_phase(&self, tab_id: TabId) -> Option<FillPhase> {
        self.lock_tabs().get(&tab_id).map(|tab| tab.filler.phase())
    }

    /// Outcomes of every fill attempt in the tab's current document.
    pub fn outcomes(&self, tab_id: TabId) -> Vec<FillOutcome> {
        self.lock_tabs()
            .get(&tab_id)
            .map(|tab| {
                tab.outcomes
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone()
            })
            .unwrap_or_default()
    }

    pub fn tab_ids(&self) -> Vec<TabId> {
        self.lock_tabs().keys().copied().collect()
    }

    /// Url the tab settled on, after any redirect.
    pub fn tab_url(&self, tab_id: TabId) -> Option<String> {
        self.lock_tabs()
            .get(&tab_id)
            .map(|tab| final_url(&tab.site).to_string())
    }

    fn open(&self, url: &str) -> Result<TabId, HostError> {
        let tab_id = self.next_tab.fetch_add(1, Ordering::SeqCst);
        let site = self
            .sites
            .iter()
            .find(|site| site.url == url)
            .cloned()
            .unwrap_or_else(|| SimSite::new(url, ""));

        let slot = self.prompt_slot(&site);
        if let Some(prompt) = &site.stored_prompt {
            if let Err(err) = slot.put(prompt) {
                relay_warn!("sim: storage slot for {} not written: {}", url, err);
            }
        }

        self.coordinator.tab_event(TabEvent::Created { tab_id })?;
        let tab = self.start_tab(tab_id, site, slot);
        self.lock_tabs().insert(tab_id, tab);
        relay_info!("sim: tab {} opened on {}", tab_id, url);
        Ok(tab_id)
    }

    fn prompt_slot(&self, site: &SimSite) -> Arc<dyn PromptSlot> {
        match &self.slot_dir {
            Some(dir) => {
                let url = final_url(site);
                let origin = host_of(url).unwrap_or_else(|| url.to_string());
                Arc::new(FilePromptSlot::new(dir.clone(), &origin))
            }
            None => Arc::new(MemoryPromptSlot::new()),
        }
    }

    fn start_tab(&self, tab_id: TabId, site: SimSite, slot: Arc<dyn PromptSlot>) -> SimTab {
        let page = Arc::new(HtmlPage::new(final_url(&site)));
        let link = Arc::new(TabLink {
            tab_id,
            coordinator: self.coordinator.clone(),
        });
        let filler = Arc::new(Filler::new(
            page.clone(),
            self.registry.clone(),
            link,
            self.fill_settings.clone(),
        ));
        let (inbox, messages) = mpsc::unbounded_channel();
        let listening = Arc::new(AtomicBool::new(false));
        let outcomes = Arc::new(Mutex::new(Vec::new()));

        let mut tasks = vec![tokio::spawn(page_lifecycle(
            tab_id,
            site.clone(),
            page.clone(),
            filler.clone(),
            slot.clone(),
            self.coordinator.clone(),
            listening.clone(),
            outcomes.clone(),
            messages,
        ))];
        if let Some(late) = site.late_render.clone() {
            let page = page.clone();
            let after = site.load_delay + late.after;
            tasks.push(tokio::spawn(async move {
                tokio::time::sleep(after).await;
                relay_debug!("sim: tab {} re-rendered", tab_id);
                page.render(&late.html);
            }));
        }

        SimTab {
            site,
            page,
            filler,
            slot,
            inbox,
            listening,
            outcomes,
            tasks,
        }
    }

    fn lock_tabs(&self) -> MutexGuard<'_, BTreeMap<TabId, SimTab>> {
        self.tabs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl TabHost for SimulatedBrowser {
    async fn open_tab(&self, url: &str) -> Result<TabId, HostError> {
        self.open(url)
    }

    async fn deliver(&self, tab_id: TabId, message: TabMessage) -> Result<(), HostError> {
        let raw = message.to_json()?;
        let tabs = self.lock_tabs();
        let tab = tabs.get(&tab_id).ok_or(HostError::TabNotFound(tab_id))?;
        if !tab.listening.load(Ordering::SeqCst) {
            return Err(HostError::NotListening(tab_id));
        }
        tab.inbox
            .send(raw)
            .map_err(|_| HostError::NotListening(tab_id))
    }
}

fn final_url(site: &SimSite) -> &str {
    site.final_url.as_deref().unwrap_or(&site.url)
}

/// Load, announce readiness, attach the listener, then serve messages.
#[allow(clippy::too_many_arguments)]
async fn page_lifecycle(
    tab_id: TabId,
    site: SimSite,
    page: Arc<HtmlPage>,
    filler: Arc<Filler>,
    slot: Arc<dyn PromptSlot>,
    coordinator: CoordinatorHandle,
    listening: Arc<AtomicBool>,
    outcomes: Arc<Mutex<Vec<FillOutcome>>>,
    mut messages: mpsc::UnboundedReceiver<String>,
) {
    tokio::time::sleep(site.load_delay).await;
    page.render(&site.html);

    let attach_now = site.listener_delay.is_zero();
    if attach_now {
        listening.store(true, Ordering::SeqCst);
    }
    let ready = TabEvent::Updated {
        tab_id,
        status: TabStatus::Complete,
        url: final_url(&site).to_string(),
    };
    if let Err(err) = coordinator.tab_event(ready) {
        relay_warn!("sim: tab {} readiness not reported: {}", tab_id, err);
    }
    if !attach_now {
        tokio::time::sleep(site.listener_delay).await;
        listening.store(true, Ordering::SeqCst);
    }
    relay_debug!("sim: tab {} listener attached", tab_id);

    if let Some(outcome) = filler.consume_slot(slot.as_ref()).await {
        record(&outcomes, outcome);
    }

    // Owned by this task: aborting the document drops every fill still running in it.
    let mut fills = JoinSet::new();
    loop {
        tokio::select! {
            received = messages.recv() => {
                let Some(raw) = received else { break };
                let message = match TabMessage::from_json(&raw) {
                    Ok(message) => message,
                    Err(err) => {
                        relay_warn!("sim: tab {} dropped message: {}", tab_id, err);
                        continue;
                    }
                };
                let filler = filler.clone();
                let outcomes = outcomes.clone();
                fills.spawn(async move {
                    let outcome = filler.handle(message).await;
                    record(&outcomes, outcome);
                });
            }
            Some(_) = fills.join_next(), if !fills.is_empty() => {}
        }
    }
}

fn record(outcomes: &Mutex<Vec<FillOutcome>>, outcome: FillOutcome) {
    outcomes
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(outcome);
}
