use std::time::Duration;

use crate::protocol::FillPrompt;
use crate::{DispatchId, TabId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fire-and-forget; the host answers with `Msg::TabOpened` or `Msg::TabOpenFailed`.
    OpenTab { dispatch_id: DispatchId, url: String },
    /// Deliver a fill instruction. A failed delivery is logged and not retried.
    PushFill { tab_id: TabId, fill: FillPrompt },
    /// Feed `Msg::DispatchExpired` back after `after`.
    ScheduleExpiry { dispatch_id: DispatchId, after: Duration },
}
