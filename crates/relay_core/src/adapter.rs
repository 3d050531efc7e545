use serde::{Deserialize, Serialize};
use url::Url;

/// How text has to be written so the page's own framework observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditingModel {
    /// Native `<textarea>` / `<input>`: assign the value.
    ValueAssignment,
    /// `contenteditable` surface: clear the node tree and insert one paragraph.
    RichText,
}

impl EditingModel {
    /// Whether an element with the given shape can be written with this model.
    pub fn accepts(self, tag: &str, content_editable: bool) -> bool {
        match self {
            EditingModel::ValueAssignment => {
                tag.eq_ignore_ascii_case("textarea") || tag.eq_ignore_ascii_case("input")
            }
            EditingModel::RichText => content_editable,
        }
    }
}

/// Notification raised on the input control after its content changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomEvent {
    Input,
    Change,
}

impl DomEvent {
    pub fn name(self) -> &'static str {
        match self {
            DomEvent::Input => "input",
            DomEvent::Change => "change",
        }
    }
}

/// One candidate input control, tried in table order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputTarget {
    pub selector: String,
    pub model: EditingModel,
}

impl InputTarget {
    pub fn new(selector: impl Into<String>, model: EditingModel) -> Self {
        Self {
            selector: selector.into(),
            model,
        }
    }
}

/// Static description of how to drive one chat site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteAdapter {
    /// Stable identifier, also used as the binding's site key.
    pub id: String,
    /// Matched as a substring of the page host.
    pub domain: String,
    /// Primary control first, fallbacks after it.
    pub inputs: Vec<InputTarget>,
    pub submit: String,
    #[serde(default = "default_notify")]
    pub notify: Vec<DomEvent>,
}

fn default_notify() -> Vec<DomEvent> {
    vec![DomEvent::Input]
}

impl SiteAdapter {
    pub fn matches_host(&self, host: &str) -> bool {
        host.contains(self.domain.as_str())
    }
}

/// Ordered adapter table; the first matching entry wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterRegistry {
    adapters: Vec<SiteAdapter>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AdapterRegistry {
    pub fn empty() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// The chat sites supported out of the box.
    pub fn builtin() -> Self {
        use EditingModel::{RichText, ValueAssignment};

        let adapters = vec![
            SiteAdapter {
                id: "chatgpt".into(),
                domain: "chatgpt.com".into(),
                inputs: vec![
                    InputTarget::new("div[id='prompt-textarea']", RichText),
                    InputTarget::new("div[data-testid='text-input-area'] textarea", ValueAssignment),
                ],
                submit: "button[data-testid='send-button']".into(),
                notify: default_notify(),
            },
            SiteAdapter {
                id: "grok".into(),
                domain: "grok.com".into(),
                inputs: vec![InputTarget::new(
                    "textarea.w-full.bg-transparent.focus\\:outline-none.text-primary",
                    ValueAssignment,
                )],
                submit: "button[type='submit']".into(),
                notify: vec![DomEvent::Input, DomEvent::Change],
            },
            SiteAdapter {
                id: "deepseek".into(),
                domain: "chat.deepseek.com".into(),
                inputs: vec![InputTarget::new("textarea#chat-input", ValueAssignment)],
                submit: "div.ds-button--primary.ds-button--filled".into(),
                notify: default_notify(),
            },
            SiteAdapter {
                id: "claude".into(),
                domain: "claude.ai".into(),
                inputs: vec![InputTarget::new(
                    "div.ProseMirror[contenteditable='true']",
                    RichText,
                )],
                submit: "button[aria-label='Send Message']".into(),
                notify: default_notify(),
            },
            SiteAdapter {
                id: "gemini".into(),
                domain: "gemini.google.com".into(),
                inputs: vec![InputTarget::new(
                    "div.ql-editor[contenteditable='true']",
                    RichText,
                )],
                submit: "button.send-button".into(),
                notify: default_notify(),
            },
        ];

        Self { adapters }
    }

    /// Appends entries after the existing ones, so built-ins keep precedence.
    pub fn extend(&mut self, extra: impl IntoIterator<Item = SiteAdapter>) {
        self.adapters.extend(extra);
    }

    pub fn adapters(&self) -> &[SiteAdapter] {
        &self.adapters
    }

    /// Resolves by host name. `None` means "unsupported site", not an error.
    pub fn resolve(&self, host: &str) -> Option<&SiteAdapter> {
        self.adapters.iter().find(|adapter| adapter.matches_host(host))
    }

    /// Resolves from a full URL; unparsable URLs and URLs without host are unsupported.
    pub fn resolve_url(&self, url: &str) -> Option<&SiteAdapter> {
        let host = host_of(url)?;
        self.resolve(&host)
    }
}

/// Host name of a URL, lowercased by the parser.
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url.trim())
        .ok()
        .and_then(|parsed| parsed.host_str().map(ToOwned::to_owned))
}
