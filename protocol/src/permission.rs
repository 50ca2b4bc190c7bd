use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Sentinel used when a permission notification arrives without a stream
/// tag. Such requests are queryable but never forwarded to subscribers.
pub const UNKNOWN_STREAM: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Pending,
    Approved,
    Denied,
}

/// A tool-use permission request reported out-of-band by the companion
/// permission-server subprocess.
///
/// `streaming_id` is kept as a string on the wire: it is either a
/// [`crate::StreamId`] rendering or the [`UNKNOWN_STREAM`] sentinel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    pub id: Uuid,
    pub streaming_id: String,
    pub tool_name: String,
    pub tool_input: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub status: PermissionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_input: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deny_reason: Option<String>,
}

impl PermissionRequest {
    pub fn is_pending(&self) -> bool {
        self.status == PermissionStatus::Pending
    }
}
