//! Server-Sent Events stream of run updates.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{self, Stream};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use gaiarun_core::TaskUpdate;

use crate::service::RunService;

/// Stream every run update as one `data:` event each.
///
/// The connection holds its own receiver; it is dropped, and thereby
/// unsubscribed, when the client goes away.
pub async fn check_runs(
    State(service): State<RunService>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("Update subscriber connected");
    Sse::new(update_stream(service.subscribe())).keep_alive(KeepAlive::default())
}

fn update_stream(
    receiver: broadcast::Receiver<TaskUpdate>,
) -> impl Stream<Item = Result<Event, Infallible>> + Send {
    stream::unfold(receiver, |mut receiver| async move {
        match receiver.recv().await {
            Ok(update) => Some((Ok(to_event(&update)), receiver)),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "Update stream lagged, skipping events");
                Some((
                    Ok(Event::default().comment(format!("skipped {} events", n))),
                    receiver,
                ))
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    })
}

fn to_event(update: &TaskUpdate) -> Event {
    match Event::default().json_data(update) {
        Ok(event) => event,
        Err(e) => {
            warn!(run_id = %update.run_id(), error = %e, "Failed to encode update");
            Event::default().comment("unencodable update")
        }
    }
}
