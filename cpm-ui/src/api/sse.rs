//! Server-Sent Events for the signed-in user
//!
//! Streams reminder, bell, completion and announcement events visible to the
//! caller. The stream ends when the session does.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::identity::Identity;
use crate::{ApiResult, AppState};

/// GET /api/events
pub async fn event_stream(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let session = state.session(&identity).await?;
    let user_id = session.read().await.user_id().to_string();
    drop(session);

    let mut rx = state.bus.subscribe();
    let email = identity.email;
    info!(
        user_id = %user_id,
        subscribers = state.bus.subscriber_count(),
        "SSE client connected"
    );

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("ConnectionStatus").data("connected"));

        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(user_id = %user_id, skipped, "SSE client lagged, events dropped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            if state.sessions.get(&email).await.is_none() {
                debug!(user_id = %user_id, "Session ended, closing SSE stream");
                break;
            }
            if !event.is_visible_to(&user_id) {
                continue;
            }

            match serde_json::to_string(&event) {
                Ok(json) => {
                    yield Ok(Event::default().event(event.event_type()).data(json));
                }
                Err(e) => warn!("Failed to serialize event: {}", e),
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    ))
}
