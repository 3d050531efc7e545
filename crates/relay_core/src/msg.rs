use crate::protocol::PanelRequest;
use crate::{DispatchId, TabId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Panel replaced the session prompt; no tabs are opened.
    StorePrompt {
        prompt: String,
        auto_send: Option<bool>,
    },
    /// Panel asked to open providers and deliver the prompt to each.
    OpenProviders {
        urls: Vec<String>,
        prompt: String,
        auto_send: Option<bool>,
    },
    /// Panel sent a second prompt to tabs that already acknowledged one.
    SendFollowUp {
        prompt: String,
        auto_send: Option<bool>,
    },
    /// Host finished an open-tab request issued for `dispatch_id`.
    TabOpened {
        dispatch_id: DispatchId,
        tab_id: TabId,
        url: String,
    },
    /// Host could not open a tab.
    TabOpenFailed { dispatch_id: DispatchId, url: String },
    /// Host reported a new tab, opened by us or by the user.
    TabCreated { tab_id: TabId },
    /// Host reported navigation complete.
    TabReady { tab_id: TabId, url: String },
    /// Filler in `tab_id` reported `PromptSent`.
    FillAcknowledged { tab_id: TabId },
    /// Host reported the tab was removed.
    TabClosed { tab_id: TabId },
    /// Expiry timer of `dispatch_id` fired.
    DispatchExpired { dispatch_id: DispatchId },
    NoOp,
}

impl From<PanelRequest> for Msg {
    fn from(request: PanelRequest) -> Self {
        match request {
            PanelRequest::StorePrompt { prompt, auto_send } => Msg::StorePrompt { prompt, auto_send },
            PanelRequest::OpenProviders {
                urls,
                prompt,
                auto_send,
            } => Msg::OpenProviders {
                urls,
                prompt,
                auto_send,
            },
            PanelRequest::SendFollowUp { prompt, auto_send } => {
                Msg::SendFollowUp { prompt, auto_send }
            }
        }
    }
}
