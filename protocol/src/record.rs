use serde::Deserialize;
use serde::Serialize;

use crate::ids::SessionId;

/// One line of the subprocess's `stream-json` output, kept as opaque JSON.
///
/// Switchboard routes on `type`, `subtype` and `session_id` and passes the
/// rest through untouched, so the subprocess can evolve its schema without
/// a control-plane release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationRecord(pub serde_json::Value);

impl ConversationRecord {
    pub fn record_type(&self) -> Option<&str> {
        self.0.get("type").and_then(|v| v.as_str())
    }

    pub fn subtype(&self) -> Option<&str> {
        self.0.get("subtype").and_then(|v| v.as_str())
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.0
            .get("session_id")
            .and_then(|v| v.as_str())
            .map(SessionId::from)
    }

    /// The `{type:"system", subtype:"init"}` record the subprocess emits
    /// first. It is returned from the start/resume call and suppressed at
    /// the broadcast boundary.
    pub fn is_init(&self) -> bool {
        self.record_type() == Some("system") && self.subtype() == Some("init")
    }

    /// Leading `{type:"summary"}` line of a conversation log file.
    pub fn is_summary(&self) -> bool {
        self.record_type() == Some("summary")
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn u64_field(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(|v| v.as_u64())
    }
}

impl From<serde_json::Value> for ConversationRecord {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}
