//! Simulated asynchronous surface acquisition.
//!
//! Stands in for fetching a map library or building a canvas context: it
//! waits, then hands back a [`RecordingSurface`] or a load error. An abort
//! requested through the ticket's token cuts the wait short, but the result
//! is still delivered so the engine's stale-load handling is exercised.

use std::time::Duration;

use engine::LoadTicket;
use surface::{RecordingSurface, SurfaceInitError};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LoadPlan {
    pub delay: Duration,
    pub fail_with: Option<String>,
}

pub async fn load_surface(
    ticket: LoadTicket,
    surface: RecordingSurface,
    plan: LoadPlan,
) -> (LoadTicket, Result<RecordingSurface, SurfaceInitError>) {
    tokio::select! {
        _ = ticket.token().cancelled() => {
            debug!(container = %ticket.container(), "surface load aborted by requester");
        }
        _ = tokio::time::sleep(plan.delay) => {
            debug!(container = %ticket.container(), kind = ticket.config().kind_name(), "surface load finished");
        }
    }

    let result = match plan.fail_with {
        Some(message) => Err(SurfaceInitError::new(message)),
        None => Ok(surface),
    };
    (ticket, result)
}
