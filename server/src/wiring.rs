//! Long-lived tasks translating core events into subscriber-visible
//! frames, wired up once at startup.

use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;
use tracing::warn;

use switchboard_core::permissions::PermissionEvent;
use switchboard_core::supervisor::SupervisorEvent;
use switchboard_protocol::StreamEvent;
use switchboard_protocol::StreamId;
use switchboard_protocol::UNKNOWN_STREAM;

use crate::state::AppState;

/// Pump supervisor events into the fan-out. `Closed` tears the stream
/// down everywhere: subscribers get the terminal frame, the registry
/// unbinds, and the broker drops the stream's pending requests, in that
/// order, so no pending request outlives its stream.
pub fn spawn_event_pump(
    state: AppState,
    mut rx_event: mpsc::Receiver<SupervisorEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx_event.recv().await {
            match event {
                SupervisorEvent::Message { stream_id, record } => {
                    state.fanout.broadcast_record(stream_id, &record);
                }
                SupervisorEvent::Error { stream_id, reason } => {
                    state
                        .fanout
                        .broadcast_event(stream_id, &StreamEvent::error(stream_id, reason));
                }
                SupervisorEvent::Closed { stream_id, .. } => {
                    state.fanout.close_stream(stream_id);
                    state.registry.unbind(stream_id);
                    state.broker.remove_by_stream(stream_id);
                }
            }
        }
        info!("supervisor event pump exited (channel closed)");
    })
}

/// Forward broker notifications to subscribers. Requests tagged with the
/// unknown sentinel stay queryable but are never broadcast.
pub fn spawn_permission_pump(state: AppState) -> JoinHandle<()> {
    let mut rx_event = state.broker.subscribe();
    tokio::spawn(async move {
        loop {
            match rx_event.recv().await {
                Ok(PermissionEvent::Requested(request)) => {
                    if request.streaming_id == UNKNOWN_STREAM {
                        continue;
                    }
                    let Ok(stream_id) = request.streaming_id.parse::<StreamId>() else {
                        warn!("permission request with unparseable stream id: {}", request.streaming_id);
                        continue;
                    };
                    state.fanout.broadcast_event(
                        stream_id,
                        &StreamEvent::permission_request(stream_id, request),
                    );
                }
                Ok(PermissionEvent::Updated(_)) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("permission pump lagged, skipped {skipped} event(s)");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        info!("permission pump exited (broker dropped)");
    })
}
