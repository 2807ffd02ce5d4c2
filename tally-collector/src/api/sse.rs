//! Server-Sent Events (SSE) change stream
//!
//! Every persisted change announced on the [`EventBus`](tally_common::events::EventBus)
//! is forwarded to connected clients. The first frame is a snapshot of the
//! status document so a dashboard can render before the next cycle.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::store::documents;
use crate::AppState;

/// GET /events - SSE event stream
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected");

    let mut rx = state.event_bus.subscribe();
    let store = state.store.clone();

    let stream = async_stream::stream! {
        match store.document(documents::STATUS).await {
            Ok(Some(doc)) => {
                yield Ok(Event::default().event("StatusSnapshot").data(doc.to_string()));
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to load status for SSE snapshot: {}", e),
        }

        loop {
            tokio::select! {
                received = rx.recv() => {
                    match received {
                        Ok(event) => {
                            let event_type = event.event_type();
                            match serde_json::to_string(&event) {
                                Ok(json) => {
                                    debug!("Broadcasting SSE event: {}", event_type);
                                    yield Ok(Event::default().event(event_type).data(json));
                                }
                                Err(e) => warn!("Failed to serialize event: {}", e),
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "SSE client lagged; events dropped");
                        }
                        Err(RecvError::Closed) => {
                            debug!("Event bus closed; ending SSE stream");
                            break;
                        }
                    }
                }
                _ = tokio::time::sleep(Duration::from_secs(15)) => {
                    yield Ok(Event::default().comment("heartbeat"));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
