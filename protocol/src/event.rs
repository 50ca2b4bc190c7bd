use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use crate::ids::StreamId;
use crate::permission::PermissionRequest;

/// Control frames emitted to SSE subscribers, alongside the pass-through
/// subprocess records.
///
/// Field naming is uneven across variants (`streaming_id` on `connected`,
/// `streamingId` elsewhere); browser clients already depend on the exact
/// spellings, so they are preserved here rather than normalized.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Connected {
        streaming_id: StreamId,
        timestamp: DateTime<Utc>,
    },
    PermissionRequest {
        data: PermissionRequest,
        #[serde(rename = "streamingId")]
        streaming_id: StreamId,
        timestamp: DateTime<Utc>,
    },
    Error {
        error: String,
        #[serde(rename = "streamingId")]
        streaming_id: StreamId,
        timestamp: DateTime<Utc>,
    },
    Closed {
        #[serde(rename = "streamingId")]
        streaming_id: StreamId,
        timestamp: DateTime<Utc>,
    },
}

impl StreamEvent {
    pub fn connected(streaming_id: StreamId) -> Self {
        Self::Connected {
            streaming_id,
            timestamp: Utc::now(),
        }
    }

    pub fn permission_request(streaming_id: StreamId, data: PermissionRequest) -> Self {
        Self::PermissionRequest {
            data,
            streaming_id,
            timestamp: Utc::now(),
        }
    }

    pub fn error(streaming_id: StreamId, error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
            streaming_id,
            timestamp: Utc::now(),
        }
    }

    pub fn closed(streaming_id: StreamId) -> Self {
        Self::Closed {
            streaming_id,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn connected_uses_snake_case_stream_field() {
        let event = StreamEvent::connected(StreamId::new());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "connected");
        assert!(json.get("streaming_id").is_some());
        assert!(json.get("streamingId").is_none());
    }

    #[test]
    fn closed_uses_camel_case_stream_field() {
        let event = StreamEvent::closed(StreamId::new());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "closed");
        assert!(json.get("streamingId").is_some());
        assert!(json.get("streaming_id").is_none());
    }
}
