//! Wire contract between the composition panel, the coordinator and the
//! per-tab filler. Every message is JSON with a `type` tag.
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error("no provider urls given")]
    NoUrls,
    #[error("malformed message: {0}")]
    Malformed(String),
}

/// Panel -> Coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum PanelRequest {
    /// Replaces the session prompt without opening tabs.
    #[serde(rename = "STORE_PROMPT")]
    StorePrompt {
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auto_send: Option<bool>,
    },
    #[serde(rename = "OPEN_AI_PROVIDERS")]
    OpenProviders {
        #[serde(default)]
        urls: Vec<String>,
        #[serde(default)]
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auto_send: Option<bool>,
    },
    /// Sends a second prompt to tabs that already received one.
    #[serde(rename = "SEND_FOLLOW_UP")]
    SendFollowUp {
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auto_send: Option<bool>,
    },
}

impl PanelRequest {
    /// Caller-side validation; the coordinator itself only ignores empty url lists.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let prompt = match self {
            PanelRequest::StorePrompt { prompt, .. } | PanelRequest::SendFollowUp { prompt, .. } => {
                prompt
            }
            PanelRequest::OpenProviders { urls, prompt, .. } => {
                if urls.iter().all(|url| url.trim().is_empty()) {
                    return Err(ProtocolError::NoUrls);
                }
                prompt
            }
        };
        if prompt.trim().is_empty() {
            return Err(ProtocolError::EmptyPrompt);
        }
        Ok(())
    }

    pub fn from_json(raw: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(raw).map_err(|err| ProtocolError::Malformed(err.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelResponse {
    pub success: bool,
}

/// Coordinator -> Filler instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillPrompt {
    pub prompt: String,
    pub auto_send: bool,
    pub follow_up: bool,
}

/// Everything the coordinator pushes into a tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TabMessage {
    #[serde(rename = "FILL_PROMPT")]
    FillPrompt(FillPrompt),
}

impl TabMessage {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|err| ProtocolError::Malformed(err.to_string()))
    }

    pub fn from_json(raw: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(raw).map_err(|err| ProtocolError::Malformed(err.to_string()))
    }
}

/// Filler -> Coordinator. The sending tab identifies itself implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TabReport {
    #[serde(rename = "PROMPT_SENT")]
    PromptSent,
}
