use relay_core::{DomEvent, EditingModel};

use crate::dom::{DomError, ElementHandle, PageDom};

/// Writes `text` with the control's editing model, then raises `notify` so
/// the page's own framework picks the change up.
pub fn write_text(
    dom: &dyn PageDom,
    element: ElementHandle,
    text: &str,
    model: EditingModel,
    notify: &[DomEvent],
) -> Result<(), DomError> {
    match model {
        EditingModel::ValueAssignment => dom.set_value(element, text)?,
        EditingModel::RichText => dom.replace_rich_text(element, text)?,
    }
    for event in notify {
        dom.dispatch_event(element, *event)?;
    }
    Ok(())
}

/// Activates a submit control. A disabled control is left alone: `Ok(false)`.
pub fn submit(dom: &dyn PageDom, element: ElementHandle) -> Result<bool, DomError> {
    let info = dom.element_info(element)?;
    if info.disabled {
        return Ok(false);
    }
    dom.click(element)?;
    Ok(true)
}
