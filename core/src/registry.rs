//! Bidirectional map between supervisor stream IDs and subprocess session
//! IDs, plus pre-history context for sessions whose log file has not yet
//! reached disk.

// Poisoned lock should fail the program
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::RwLock;

use chrono::Utc;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::warn;

use switchboard_protocol::ConversationDetails;
use switchboard_protocol::ConversationMetadata;
use switchboard_protocol::ConversationRecord;
use switchboard_protocol::ConversationStatus;
use switchboard_protocol::ConversationSummary;
use switchboard_protocol::SessionContext;
use switchboard_protocol::SessionId;
use switchboard_protocol::StreamId;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub enum RegistryEvent {
    SessionStarted {
        stream_id: StreamId,
        session_id: SessionId,
    },
    SessionEnded {
        stream_id: StreamId,
        session_id: SessionId,
    },
}

#[derive(Default)]
struct RegistryState {
    by_stream: HashMap<StreamId, SessionId>,
    by_session: HashMap<SessionId, StreamId>,
    contexts: HashMap<SessionId, SessionContext>,
}

/// All public methods are internally serialized; callers never lock.
///
/// The forward and reverse maps are mutated only while the write lock is
/// held across the whole operation, which keeps them mutual inverses at
/// every observation point.
pub struct SessionRegistry {
    state: RwLock<RegistryState>,
    events: broadcast::Sender<RegistryEvent>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(RegistryState::default()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// Establish `stream_id` ↔ `session_id`.
    ///
    /// A resume steals the session from its previous stream; a stream that
    /// was already bound to a different session drops that binding and its
    /// context. Last bind wins when two starts race on one session.
    pub fn bind(&self, stream_id: StreamId, session_id: SessionId, context: Option<SessionContext>) {
        {
            let mut state = self.state.write().unwrap();

            if let Some(previous_stream) = state.by_session.get(&session_id).copied()
                && previous_stream != stream_id
            {
                state.by_stream.remove(&previous_stream);
            }
            if let Some(previous_session) = state.by_stream.get(&stream_id).cloned()
                && previous_session != session_id
            {
                state.by_session.remove(&previous_session);
                state.contexts.remove(&previous_session);
            }

            state.by_stream.insert(stream_id, session_id.clone());
            state.by_session.insert(session_id.clone(), stream_id);
            if let Some(context) = context {
                state.contexts.insert(session_id.clone(), context);
            }
        }

        let _ = self.events.send(RegistryEvent::SessionStarted {
            stream_id,
            session_id,
        });
    }

    pub fn unbind(&self, stream_id: StreamId) {
        let session_id = {
            let mut state = self.state.write().unwrap();
            match state.by_stream.remove(&stream_id) {
                Some(session_id) => {
                    state.by_session.remove(&session_id);
                    state.contexts.remove(&session_id);
                    session_id
                }
                None => {
                    warn!("unbind for unknown stream {stream_id}");
                    return;
                }
            }
        };

        let _ = self.events.send(RegistryEvent::SessionEnded {
            stream_id,
            session_id,
        });
    }

    pub fn status(&self, session_id: &SessionId) -> ConversationStatus {
        let state = self.state.read().unwrap();
        if state.by_session.contains_key(session_id) {
            ConversationStatus::Ongoing
        } else {
            ConversationStatus::Completed
        }
    }

    pub fn stream_id_for(&self, session_id: &SessionId) -> Option<StreamId> {
        let state = self.state.read().unwrap();
        state.by_session.get(session_id).copied()
    }

    pub fn session_id_for(&self, stream_id: StreamId) -> Option<SessionId> {
        let state = self.state.read().unwrap();
        state.by_stream.get(&stream_id).cloned()
    }

    pub fn context_for(&self, session_id: &SessionId) -> Option<SessionContext> {
        let state = self.state.read().unwrap();
        state.contexts.get(session_id).cloned()
    }

    /// Synthetic one-message summaries for bound sessions that have not
    /// yet been flushed to a log file, so the UI can show them alongside
    /// the on-disk list.
    pub fn conversations_not_on_disk(
        &self,
        existing_session_ids: &HashSet<SessionId>,
    ) -> Vec<ConversationSummary> {
        let state = self.state.read().unwrap();
        state
            .by_session
            .iter()
            .filter(|(session_id, _)| !existing_session_ids.contains(session_id))
            .filter_map(|(session_id, stream_id)| {
                let context = state.contexts.get(session_id)?;
                Some(ConversationSummary {
                    session_id: session_id.clone(),
                    project_path: context.working_directory.to_string_lossy().into_owned(),
                    summary: Some(context.initial_prompt.clone()),
                    created: context.started_at,
                    updated: context.started_at,
                    message_count: 1,
                    status: ConversationStatus::Ongoing,
                    streaming_id: Some(*stream_id),
                    is_archived: false,
                    is_pinned: false,
                    continuation_session_id: None,
                })
            })
            .collect()
    }

    /// Conversation details for a live session before persistence: any
    /// inherited messages followed by a synthetic user message carrying
    /// the initial prompt.
    pub fn active_details_for(&self, session_id: &SessionId) -> Option<ConversationDetails> {
        let state = self.state.read().unwrap();
        state.by_session.get(session_id)?;
        let context = state.contexts.get(session_id)?;

        let mut messages = context.inherited_messages.clone().unwrap_or_default();
        messages.push(ConversationRecord::from(json!({
            "type": "user",
            "session_id": session_id.as_str(),
            "message": { "role": "user", "content": context.initial_prompt },
            "timestamp": context.started_at.to_rfc3339(),
        })));

        Some(ConversationDetails {
            session_id: session_id.clone(),
            messages,
            summary: None,
            project_path: context.working_directory.to_string_lossy().into_owned(),
            metadata: ConversationMetadata {
                summary: None,
                project_path: Some(context.working_directory.to_string_lossy().into_owned()),
                model: context.model.clone(),
                total_duration_ms: 0,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn context(prompt: &str) -> SessionContext {
        SessionContext {
            initial_prompt: prompt.to_string(),
            working_directory: PathBuf::from("/w"),
            model: None,
            started_at: Utc::now(),
            inherited_messages: None,
        }
    }

    #[test]
    fn bind_then_unbind_restores_the_initial_state() {
        let registry = SessionRegistry::new();
        let stream = StreamId::new();
        let session = SessionId::from("sess-1");

        registry.bind(stream, session.clone(), Some(context("hi")));
        assert_eq!(registry.session_id_for(stream), Some(session.clone()));
        assert_eq!(registry.stream_id_for(&session), Some(stream));
        assert_eq!(registry.status(&session), ConversationStatus::Ongoing);

        registry.unbind(stream);
        assert_eq!(registry.session_id_for(stream), None);
        assert_eq!(registry.stream_id_for(&session), None);
        assert!(registry.context_for(&session).is_none());
        assert_eq!(registry.status(&session), ConversationStatus::Completed);
    }

    #[test]
    fn unbind_of_unknown_stream_is_a_warning_not_a_panic() {
        let registry = SessionRegistry::new();
        registry.unbind(StreamId::new());
    }

    #[test]
    fn resume_steals_the_session_binding() {
        let registry = SessionRegistry::new();
        let first = StreamId::new();
        let second = StreamId::new();
        let session = SessionId::from("sess-1");

        registry.bind(first, session.clone(), Some(context("a")));
        registry.bind(second, session.clone(), Some(context("b")));

        assert_eq!(registry.stream_id_for(&session), Some(second));
        assert_eq!(registry.session_id_for(first), None);
        assert_eq!(
            registry.context_for(&session).unwrap().initial_prompt,
            "b"
        );
    }

    #[test]
    fn rebinding_a_stream_drops_its_old_session_and_context() {
        let registry = SessionRegistry::new();
        let stream = StreamId::new();
        let old = SessionId::from("old");
        let new = SessionId::from("new");

        registry.bind(stream, old.clone(), Some(context("old")));
        registry.bind(stream, new.clone(), Some(context("new")));

        assert_eq!(registry.stream_id_for(&old), None);
        assert!(registry.context_for(&old).is_none());
        assert_eq!(registry.session_id_for(stream), Some(new));
    }

    #[test]
    fn not_on_disk_sessions_become_synthetic_summaries() {
        let registry = SessionRegistry::new();
        let stream = StreamId::new();
        let live = SessionId::from("live");
        let persisted = SessionId::from("persisted");

        registry.bind(stream, live.clone(), Some(context("hello")));
        registry.bind(StreamId::new(), persisted.clone(), Some(context("old")));

        let existing: HashSet<SessionId> = [persisted].into_iter().collect();
        let summaries = registry.conversations_not_on_disk(&existing);
        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.session_id, live);
        assert_eq!(summary.message_count, 1);
        assert_eq!(summary.status, ConversationStatus::Ongoing);
        assert_eq!(summary.streaming_id, Some(stream));
    }

    #[test]
    fn active_details_merge_inherited_messages_with_the_prompt() {
        let registry = SessionRegistry::new();
        let stream = StreamId::new();
        let session = SessionId::from("sess-1");
        let inherited = vec![ConversationRecord::from(json!({
            "type": "assistant",
            "message": {"role": "assistant", "content": "earlier"},
        }))];
        let mut ctx = context("continue");
        ctx.inherited_messages = Some(inherited);

        registry.bind(stream, session.clone(), Some(ctx));

        let details = registry.active_details_for(&session).unwrap();
        assert_eq!(details.messages.len(), 2);
        assert_eq!(details.messages[1].record_type(), Some("user"));
        assert!(registry.active_details_for(&SessionId::from("nope")).is_none());
    }
}
