//! SSE subscription endpoint.
//!
//! The response body is framed by hand (`data: <json>\n\n`) rather than
//! going through an SSE helper so the wire format is exactly what the
//! fan-out wrote, heartbeat comments included.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header;
use axum::response::Response;
use bytes::Bytes;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use switchboard_core::fanout::Frame;
use switchboard_core::fanout::StreamFanout;
use switchboard_core::fanout::Subscriber;
use switchboard_protocol::StreamId;

use crate::error::ApiError;
use crate::error::ApiResult;
use crate::state::AppState;

/// Detaches the subscriber from the fan-out when the response body is
/// dropped, whether the stream closed cleanly or the client went away.
struct Detach {
    fanout: Arc<StreamFanout>,
    stream_id: StreamId,
    subscriber_id: Uuid,
}

impl Drop for Detach {
    fn drop(&mut self) {
        self.fanout.remove_subscriber(self.stream_id, self.subscriber_id);
    }
}

/// GET /api/stream/{streaming_id}
pub async fn subscribe(
    State(state): State<AppState>,
    Path(streaming_id): Path<String>,
) -> ApiResult<Response> {
    let stream_id: StreamId = streaming_id
        .parse()
        .map_err(|_| ApiError::stream_not_found(format!("unknown stream: {streaming_id}")))?;
    if !state.supervisor.is_active(stream_id) {
        return Err(ApiError::stream_not_found(format!(
            "unknown stream: {stream_id}"
        )));
    }

    let (subscriber, rx_frame) = Subscriber::channel();
    let detach = Detach {
        fanout: Arc::clone(&state.fanout),
        stream_id,
        subscriber_id: subscriber.id(),
    };
    state.fanout.add_subscriber(stream_id, subscriber);

    let frames = ReceiverStream::new(rx_frame)
        .take_while(|frame| !matches!(frame, Frame::End))
        .filter_map(move |frame| {
            let _keepalive = &detach;
            frame
                .to_sse_bytes()
                .map(|bytes| Ok::<Bytes, Infallible>(Bytes::from(bytes)))
        });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header("X-Accel-Buffering", "no")
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .body(Body::from_stream(frames))
        .map_err(|e| ApiError::internal(format!("could not build stream response: {e}")))
}
