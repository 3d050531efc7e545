use std::sync::Arc;

use relay_core::{
    update, AdapterRegistry, CoordinatorSettings, CoordinatorState, CoordinatorView, DispatchId,
    Effect, Msg, PanelRequest, PanelResponse, ProtocolError, TabId, TabMessage, TabReport,
};
use relay_logging::{relay_debug, relay_info, relay_warn};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("tab {0} does not exist")]
    TabNotFound(TabId),
    #[error("tab {0} has no listener yet")]
    NotListening(TabId),
    #[error("could not open {url}: {reason}")]
    OpenFailed { url: String, reason: String },
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("coordinator stopped")]
    CoordinatorStopped,
}

/// The browser side the coordinator drives.
#[async_trait::async_trait]
pub trait TabHost: Send + Sync {
    async fn open_tab(&self, url: &str) -> Result<TabId, HostError>;

    /// Pushes a message into the tab's in-page agent. Fails if nothing listens yet.
    async fn deliver(&self, tab_id: TabId, message: TabMessage) -> Result<(), HostError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabStatus {
    Loading,
    Complete,
}

/// Tab lifecycle notifications from the host platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabEvent {
    Created { tab_id: TabId },
    Updated {
        tab_id: TabId,
        status: TabStatus,
        url: String,
    },
    Removed { tab_id: TabId },
}

/// Returned once every tab-open request has been issued, not once pages load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchResult {
    pub dispatch_id: Option<DispatchId>,
    pub tabs_requested: usize,
}

enum Command {
    Apply(Msg),
    Panel {
        request: PanelRequest,
        reply: oneshot::Sender<DispatchResult>,
    },
    View(oneshot::Sender<CoordinatorView>),
}

#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<Command>,
    shutdown: CancellationToken,
}

pub struct CoordinatorActor {
    state: CoordinatorState,
    rx: mpsc::UnboundedReceiver<Command>,
    tx: mpsc::UnboundedSender<Command>,
    shutdown: CancellationToken,
}

/// Creates the coordinator. Spawn [`CoordinatorActor::run`] once the host exists.
pub fn coordinator(
    settings: CoordinatorSettings,
    registry: AdapterRegistry,
) -> (CoordinatorHandle, CoordinatorActor) {
    let (tx, rx) = mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();
    let handle = CoordinatorHandle {
        tx: tx.clone(),
        shutdown: shutdown.clone(),
    };
    let actor = CoordinatorActor {
        state: CoordinatorState::new(settings, registry),
        rx,
        tx,
        shutdown,
    };
    (handle, actor)
}

impl CoordinatorHandle {
    /// Panel entry point. Invalid requests are rejected here and never reach the coordinator.
    pub async fn request(&self, request: PanelRequest) -> Result<DispatchResult, HostError> {
        request.validate()?;
        let (reply, rx) = oneshot::channel();
        self.send(Command::Panel { request, reply })?;
        rx.await.map_err(|_| HostError::CoordinatorStopped)
    }

    /// Raw JSON panel message in, `{ "success": .. }` out.
    pub async fn request_json(&self, raw: &str) -> PanelResponse {
        let result = match PanelRequest::from_json(raw) {
            Ok(request) => self.request(request).await,
            Err(err) => Err(err.into()),
        };
        if let Err(err) = &result {
            relay_debug!("panel request rejected: {}", err);
        }
        PanelResponse {
            success: result.is_ok(),
        }
    }

    pub fn tab_event(&self, event: TabEvent) -> Result<(), HostError> {
        let msg = match event {
            TabEvent::Created { tab_id } => Msg::TabCreated { tab_id },
            TabEvent::Updated {
                tab_id,
                status: TabStatus::Complete,
                url,
            } => Msg::TabReady { tab_id, url },
            TabEvent::Updated {
                status: TabStatus::Loading,
                ..
            } => return Ok(()),
            TabEvent::Removed { tab_id } => Msg::TabClosed { tab_id },
        };
        self.send(Command::Apply(msg))
    }

    pub fn tab_report(&self, tab_id: TabId, report: TabReport) -> Result<(), HostError> {
        let msg = match report {
            TabReport::PromptSent => Msg::FillAcknowledged { tab_id },
        };
        self.send(Command::Apply(msg))
    }

    pub async fn view(&self) -> Result<CoordinatorView, HostError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::View(reply))?;
        rx.await.map_err(|_| HostError::CoordinatorStopped)
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn send(&self, command: Command) -> Result<(), HostError> {
        self.tx
            .send(command)
            .map_err(|_| HostError::CoordinatorStopped)
    }
}

impl CoordinatorActor {
    /// Single event loop: handlers never interleave, so the binding table needs no lock.
    pub async fn run(self, host: Arc<dyn TabHost>) {
        let CoordinatorActor {
            mut state,
            mut rx,
            tx,
            shutdown,
        } = self;
        relay_info!("coordinator running");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                command = rx.recv() => match command {
                    Some(command) => state = handle(state, command, &host, &tx),
                    None => break,
                },
            }
        }
        relay_info!("coordinator stopped");
    }
}

fn handle(
    state: CoordinatorState,
    command: Command,
    host: &Arc<dyn TabHost>,
    tx: &mpsc::UnboundedSender<Command>,
) -> CoordinatorState {
    match command {
        Command::Apply(msg) => apply(state, msg, host, tx).0,
        Command::Panel { request, reply } => {
            let (state, tabs_requested) = apply(state, Msg::from(request), host, tx);
            let result = DispatchResult {
                dispatch_id: state.pending().map(|pending| pending.id),
                tabs_requested,
            };
            let _ = reply.send(result);
            state
        }
        Command::View(reply) => {
            let _ = reply.send(state.view());
            state
        }
    }
}

/// Runs `update` and its effects. Also returns how many tabs were requested.
fn apply(
    state: CoordinatorState,
    msg: Msg,
    host: &Arc<dyn TabHost>,
    tx: &mpsc::UnboundedSender<Command>,
) -> (CoordinatorState, usize) {
    let (state, effects) = update(state, msg, Instant::now().into_std());

    let mut opened = 0;
    for effect in effects {
        if matches!(effect, Effect::OpenTab { .. }) {
            opened += 1;
        }
        execute(effect, host, tx);
    }
    (state, opened)
}

fn execute(effect: Effect, host: &Arc<dyn TabHost>, tx: &mpsc::UnboundedSender<Command>) {
    match effect {
        Effect::OpenTab { dispatch_id, url } => {
            let host = host.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let msg = match host.open_tab(&url).await {
                    Ok(tab_id) => {
                        relay_debug!("tab {} opened for {}", tab_id, url);
                        Msg::TabOpened {
                            dispatch_id,
                            tab_id,
                            url,
                        }
                    }
                    Err(err) => {
                        relay_warn!("open {} failed: {}", url, err);
                        Msg::TabOpenFailed { dispatch_id, url }
                    }
                };
                let _ = tx.send(Command::Apply(msg));
            });
        }
        Effect::PushFill { tab_id, fill } => {
            let host = host.clone();
            tokio::spawn(async move {
                if let Err(err) = host.deliver(tab_id, TabMessage::FillPrompt(fill)).await {
                    relay_warn!(
                        "fill push to tab {} not delivered, waiting for next readiness event: {}",
                        tab_id,
                        err
                    );
                }
            });
        }
        Effect::ScheduleExpiry { dispatch_id, after } => {
            let tx = tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                let _ = tx.send(Command::Apply(Msg::DispatchExpired { dispatch_id }));
            });
        }
    }
}
