//! Relay engine: drives the pure coordinator from real events, and hosts the
//! per-tab filler that locates a site's input control and writes the prompt.
mod coordinator;
mod dom;
mod filler;
mod locate;
mod page;
pub mod sim;
mod slot;
mod write;

pub use coordinator::{
    coordinator, CoordinatorActor, CoordinatorHandle, DispatchResult, HostError, TabEvent,
    TabHost, TabStatus,
};
pub use dom::{DomError, ElementHandle, ElementInfo, MutationObservation, PageDom};
pub use filler::{CoordinatorLink, FillSettings, Filler};
pub use locate::{locate, DEFAULT_LOCATE_TIMEOUT};
pub use page::HtmlPage;
pub use sim::{SimSite, SimulatedBrowser};
pub use slot::{ensure_slot_dir, FilePromptSlot, MemoryPromptSlot, PromptSlot, SlotError};
pub use write::{submit, write_text};
