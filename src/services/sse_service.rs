use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    dto::sse::{Handshake, ServerEvent},
    services::sse_events,
    state::{SharedState, SseHub},
};

/// Subscribe to the shared public SSE stream.
pub fn subscribe(state: &SharedState) -> broadcast::Receiver<ServerEvent> {
    state.sse().subscribe()
}

/// Convert a broadcast receiver into an SSE response, forwarding events and
/// cleaning up once the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            let mut event = Event::default().data(payload.data);
                            if let Some(name) = payload.event {
                                event = event.event(name);
                            }

                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {
                            // Skip lagged messages but keep the stream alive.
                            continue;
                        }
                    }
                }
            }
        }

        tracing::info!("SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Greet a freshly connected client so it can render the storage state
/// before the first round event arrives.
pub fn broadcast_handshake(hub: &SseHub, degraded: bool) {
    let message = if degraded {
        "Connected; storage is unavailable, changes stay on this server only"
    } else {
        "Connected to the round stream"
    };
    if let Ok(event) = ServerEvent::json(
        Some("handshake".to_string()),
        &Handshake {
            stream: "public".to_string(),
            message: message.to_string(),
            degraded,
        },
    ) {
        hub.broadcast(event);
    }
}

/// Relay degraded-mode flips onto the SSE stream.
///
/// Runs for the lifetime of the process and ends when the state is dropped.
pub async fn watch_degraded(state: SharedState) {
    let mut watcher = state.degraded_watcher();
    while watcher.changed().await.is_ok() {
        let degraded = *watcher.borrow_and_update();
        sse_events::broadcast_system_status(&state, degraded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Duration, sleep};

    use crate::config::AppConfig;
    use crate::state::AppState;

    #[tokio::test]
    async fn handshake_reports_the_degraded_flag() {
        let state = AppState::new(AppConfig::default());
        let mut receiver = subscribe(&state);

        broadcast_handshake(state.sse(), true);
        let event = receiver.try_recv().unwrap();
        assert_eq!(event.event.as_deref(), Some("handshake"));
        assert!(event.data.contains("\"degraded\":true"));
    }

    #[tokio::test]
    async fn degraded_flips_are_relayed_as_system_status() {
        let state = AppState::new(AppConfig::default());
        let mut receiver = subscribe(&state);
        let watcher = tokio::spawn(watch_degraded(state.clone()));

        state.update_degraded(false);
        sleep(Duration::from_millis(20)).await;

        let event = receiver.try_recv().unwrap();
        assert_eq!(event.event.as_deref(), Some("system_status"));
        assert!(event.data.contains("\"degraded\":false"));

        // Re-sending the same value must not produce another event.
        state.update_degraded(false);
        sleep(Duration::from_millis(20)).await;
        assert!(receiver.try_recv().is_err());

        watcher.abort();
    }
}
