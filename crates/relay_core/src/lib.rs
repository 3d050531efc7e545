//! Relay core: pure dispatch coordinator state, site adapter table, per-tab
//! fill state machine and the message protocol.
mod adapter;
mod effect;
mod fill;
mod msg;
pub mod protocol;
mod state;
mod update;
mod view_model;

pub use adapter::{host_of, AdapterRegistry, DomEvent, EditingModel, InputTarget, SiteAdapter};
pub use effect::Effect;
pub use fill::{FillFailure, FillOutcome, FillPhase, FillSession};
pub use msg::Msg;
pub use protocol::{FillPrompt, PanelRequest, PanelResponse, ProtocolError, TabMessage, TabReport};
pub use state::{
    CoordinatorSettings, CoordinatorState, DispatchId, PendingDispatch, TabBinding, TabId,
    DEFAULT_DISPATCH_WINDOW,
};
pub use update::update;
pub use view_model::{BindingView, CoordinatorView, PendingView};
