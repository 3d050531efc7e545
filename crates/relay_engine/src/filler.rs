use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use relay_core::{
    host_of, AdapterRegistry, EditingModel, FillFailure, FillOutcome, FillPhase, FillPrompt,
    FillSession, SiteAdapter, TabMessage, TabReport,
};
use relay_logging::{prompt_preview, relay_debug, relay_info, relay_warn};

use crate::coordinator::HostError;
use crate::dom::{ElementHandle, PageDom};
use crate::locate::{locate, DEFAULT_LOCATE_TIMEOUT};
use crate::slot::PromptSlot;
use crate::write::{submit, write_text};

#[derive(Debug, Clone)]
pub struct FillSettings {
    pub input_timeout: Duration,
    pub submit_timeout: Duration,
}

impl Default for FillSettings {
    fn default() -> Self {
        Self {
            input_timeout: DEFAULT_LOCATE_TIMEOUT,
            submit_timeout: DEFAULT_LOCATE_TIMEOUT,
        }
    }
}

/// Channel back to the coordinator. The implementation knows which tab it
/// speaks for.
#[async_trait::async_trait]
pub trait CoordinatorLink: Send + Sync {
    async fn report(&self, report: TabReport) -> Result<(), HostError>;
}

/// Content-side agent: one per tab.
pub struct Filler {
    dom: Arc<dyn PageDom>,
    registry: Arc<AdapterRegistry>,
    link: Arc<dyn CoordinatorLink>,
    settings: FillSettings,
    session: Mutex<FillSession>,
}

impl Filler {
    pub fn new(
        dom: Arc<dyn PageDom>,
        registry: Arc<AdapterRegistry>,
        link: Arc<dyn CoordinatorLink>,
        settings: FillSettings,
    ) -> Self {
        Self {
            dom,
            registry,
            link,
            settings,
            session: Mutex::new(FillSession::new()),
        }
    }

    pub fn phase(&self) -> FillPhase {
        self.session().phase()
    }

    pub fn session(&self) -> FillSession {
        self.lock_session().clone()
    }

    pub async fn handle(&self, message: TabMessage) -> FillOutcome {
        match message {
            TabMessage::FillPrompt(instruction) => self.fill(&instruction).await,
        }
    }

    /// Runs one instruction: resolve adapter, locate input, write, optionally submit.
    /// `PromptSent` is reported only after a successful submit.
    pub async fn fill(&self, instruction: &FillPrompt) -> FillOutcome {
        let url = self.dom.url();
        let host = host_of(&url).unwrap_or_default();
        let Some(adapter) = self.registry.resolve(&host) else {
            relay_debug!("no adapter for {}, nothing to fill", url);
            return FillOutcome::Unsupported;
        };

        let accepted = self.lock_session().begin(instruction.follow_up);
        if !accepted {
            relay_debug!(
                "{}: fill instruction ignored in phase {:?}",
                adapter.id,
                self.phase()
            );
            return FillOutcome::Skipped;
        }

        relay_info!(
            "{}: filling prompt \"{}\" auto_send={} follow_up={}",
            adapter.id,
            prompt_preview(&instruction.prompt),
            instruction.auto_send,
            instruction.follow_up
        );
        let outcome = self.run(adapter, instruction).await;
        self.lock_session().finish(outcome);
        relay_info!("{}: fill finished with {:?}", adapter.id, outcome);

        if outcome.should_report() {
            if let Err(err) = self.link.report(TabReport::PromptSent).await {
                relay_warn!("{}: could not report delivery: {}", adapter.id, err);
            }
        }
        outcome
    }

    /// First-load delivery from the storage slot. The slot is cleared by the read.
    pub async fn consume_slot(&self, slot: &dyn PromptSlot) -> Option<FillOutcome> {
        let prompt = match slot.take() {
            Ok(Some(prompt)) => prompt,
            Ok(None) => return None,
            Err(err) => {
                relay_warn!("prompt slot unreadable: {}", err);
                return None;
            }
        };
        let instruction = FillPrompt {
            prompt,
            auto_send: false,
            follow_up: false,
        };
        Some(self.fill(&instruction).await)
    }

    async fn run(&self, adapter: &SiteAdapter, instruction: &FillPrompt) -> FillOutcome {
        let dom = self.dom.as_ref();
        let Some((input, model)) = self.locate_input(adapter).await else {
            relay_warn!("{}: input control not found", adapter.id);
            return FillOutcome::Failed(FillFailure::InputNotFound);
        };

        if let Err(err) = write_text(dom, input, &instruction.prompt, model, &adapter.notify) {
            relay_warn!("{}: writing the prompt failed: {}", adapter.id, err);
            return FillOutcome::Failed(FillFailure::Mutation);
        }

        if !instruction.auto_send {
            return FillOutcome::FilledOnly;
        }

        let Some(button) = locate(dom, &adapter.submit, self.settings.submit_timeout).await else {
            relay_debug!("{}: no submit control, leaving text for manual send", adapter.id);
            return FillOutcome::FilledOnly;
        };
        match submit(dom, button) {
            Ok(true) => FillOutcome::Sent,
            Ok(false) => {
                relay_debug!("{}: submit control disabled", adapter.id);
                FillOutcome::FilledOnly
            }
            Err(err) => {
                relay_warn!("{}: submit failed: {}", adapter.id, err);
                FillOutcome::FilledOnly
            }
        }
    }

    /// Tries each input candidate in order; a match with the wrong shape
    /// (e.g. not contenteditable) falls through to the next one.
    async fn locate_input(&self, adapter: &SiteAdapter) -> Option<(ElementHandle, EditingModel)> {
        let dom = self.dom.as_ref();
        for target in &adapter.inputs {
            let Some(element) = locate(dom, &target.selector, self.settings.input_timeout).await
            else {
                continue;
            };
            match dom.element_info(element) {
                Ok(info) if target.model.accepts(&info.tag, info.content_editable) => {
                    return Some((element, target.model));
                }
                Ok(info) => relay_debug!(
                    "{}: {} matched <{}> which does not take {:?}",
                    adapter.id,
                    target.selector,
                    info.tag,
                    target.model
                ),
                Err(err) => relay_debug!("{}: {}: {}", adapter.id, target.selector, err),
            }
        }
        None
    }

    fn lock_session(&self) -> MutexGuard<'_, FillSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
