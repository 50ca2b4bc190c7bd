//! In-memory registry of out-of-band tool permission requests.
//!
//! The companion permission server reports each tool call it intercepts;
//! the broker stores the request, correlates it to a stream when the
//! caller tagged one, and notifies observers so the fan-out can forward
//! it to live subscribers. Requests never outlive their stream.

// Poisoned lock should fail the program
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use switchboard_protocol::PermissionRequest;
use switchboard_protocol::PermissionStatus;
use switchboard_protocol::StreamId;
use switchboard_protocol::UNKNOWN_STREAM;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub enum PermissionEvent {
    Requested(PermissionRequest),
    Updated(PermissionRequest),
}

/// The decision applied to a pending request.
#[derive(Debug, Clone)]
pub enum PermissionDecision {
    Approved {
        modified_input: Option<serde_json::Value>,
    },
    Denied {
        reason: Option<String>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct PermissionFilter {
    pub streaming_id: Option<String>,
    pub status: Option<PermissionStatus>,
}

pub struct PermissionBroker {
    requests: Mutex<HashMap<Uuid, PermissionRequest>>,
    events: broadcast::Sender<PermissionEvent>,
}

impl Default for PermissionBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionBroker {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            requests: Mutex::new(HashMap::new()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PermissionEvent> {
        self.events.subscribe()
    }

    /// Record an incoming notification and tell observers. Requests with
    /// no stream tag are stored under the `unknown` sentinel: queryable,
    /// never forwarded.
    pub fn notify(
        &self,
        tool_name: String,
        tool_input: serde_json::Value,
        stream_id: Option<StreamId>,
    ) -> PermissionRequest {
        let request = PermissionRequest {
            id: Uuid::new_v4(),
            streaming_id: stream_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| UNKNOWN_STREAM.to_string()),
            tool_name,
            tool_input,
            created_at: Utc::now(),
            status: PermissionStatus::Pending,
            modified_input: None,
            deny_reason: None,
        };

        {
            let mut requests = self.requests.lock().unwrap();
            requests.insert(request.id, request.clone());
        }
        let _ = self.events.send(PermissionEvent::Requested(request.clone()));
        request
    }

    pub fn list(&self, filter: &PermissionFilter) -> Vec<PermissionRequest> {
        let requests = self.requests.lock().unwrap();
        let mut matching: Vec<PermissionRequest> = requests
            .values()
            .filter(|request| {
                filter
                    .streaming_id
                    .as_ref()
                    .is_none_or(|id| request.streaming_id == *id)
            })
            .filter(|request| filter.status.is_none_or(|status| request.status == status))
            .cloned()
            .collect();
        matching.sort_by_key(|request| request.created_at);
        matching
    }

    pub fn get(&self, id: Uuid) -> Option<PermissionRequest> {
        let requests = self.requests.lock().unwrap();
        requests.get(&id).cloned()
    }

    /// Apply a decision. Returns false for an unknown id.
    pub fn update_status(&self, id: Uuid, decision: PermissionDecision) -> bool {
        let updated = {
            let mut requests = self.requests.lock().unwrap();
            let Some(request) = requests.get_mut(&id) else {
                return false;
            };
            match decision {
                PermissionDecision::Approved { modified_input } => {
                    request.status = PermissionStatus::Approved;
                    request.modified_input = modified_input;
                }
                PermissionDecision::Denied { reason } => {
                    request.status = PermissionStatus::Denied;
                    request.deny_reason = reason;
                }
            }
            request.clone()
        };

        let _ = self.events.send(PermissionEvent::Updated(updated));
        true
    }

    /// Drop every pending request tagged with `stream_id`; called when the
    /// stream closes so no pending request refers to a dead subprocess.
    pub fn remove_by_stream(&self, stream_id: StreamId) -> usize {
        let stream = stream_id.to_string();
        let mut requests = self.requests.lock().unwrap();
        let before = requests.len();
        requests.retain(|_, request| !(request.streaming_id == stream && request.is_pending()));
        let removed = before - requests.len();
        if removed > 0 {
            debug!("dropped {removed} pending permission request(s) for stream {stream_id}");
        }
        removed
    }
}
