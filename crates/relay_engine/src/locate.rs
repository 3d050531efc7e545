use std::time::Duration;

use relay_logging::{relay_debug, relay_warn};

use crate::dom::{ElementHandle, PageDom};

pub const DEFAULT_LOCATE_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Resolves to the first element matching `selector`, waiting for document
/// mutations up to `timeout`. The observation is disconnected on every path.
pub async fn locate(dom: &dyn PageDom, selector: &str, timeout: Duration) -> Option<ElementHandle> {
    // Subscribe before the first check so a render in between is not missed.
    let mut observation = dom.observe();

    match dom.query(selector) {
        Ok(Some(element)) => return Some(element),
        Ok(None) => {}
        Err(err) => {
            relay_warn!("locate gave up: {}", err);
            return None;
        }
    }

    let waited = tokio::time::timeout(timeout, async {
        while observation.changed().await {
            match dom.query(selector) {
                Ok(Some(element)) => return Some(element),
                Ok(None) => {}
                Err(_) => return None,
            }
        }
        None
    })
    .await;

    match waited {
        Ok(found) => found,
        Err(_) => {
            relay_debug!("locate timed out after {:?}: {}", timeout, selector);
            None
        }
    }
}
