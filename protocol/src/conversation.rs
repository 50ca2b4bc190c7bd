use std::path::PathBuf;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::ids::SessionId;
use crate::ids::StreamId;
use crate::record::ConversationRecord;

/// How liberally the subprocess may use tools without asking.
///
/// Parsed from client requests and forwarded verbatim to the launcher; an
/// unrecognized value is a validation error, not a pass-through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    #[default]
    Default,
    AcceptEdits,
    BypassPermissions,
    Plan,
}

impl PermissionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PermissionMode::Default => "default",
            PermissionMode::AcceptEdits => "acceptEdits",
            PermissionMode::BypassPermissions => "bypassPermissions",
            PermissionMode::Plan => "plan",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Ongoing,
    Completed,
    /// Reserved. No current code path produces it.
    Pending,
}

/// Pre-history context for an in-flight session, held by the registry from
/// bind until unbind so the UI can show a conversation before its log file
/// reaches disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub initial_prompt: String,
    pub working_directory: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub started_at: DateTime<Utc>,
    /// Messages carried over from the session this one resumed, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inherited_messages: Option<Vec<ConversationRecord>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub session_id: SessionId,
    pub project_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub message_count: usize,
    pub status: ConversationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streaming_id: Option<StreamId>,
    pub is_archived: bool,
    pub is_pinned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_session_id: Option<SessionId>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub total_duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDetails {
    pub session_id: SessionId,
    pub messages: Vec<ConversationRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub project_path: String,
    pub metadata: ConversationMetadata,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Created,
    #[default]
    Updated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Filter, sort and pagination options for conversation listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversationFilter {
    pub project_path: Option<String>,
    pub archived: Option<bool>,
    pub pinned: Option<bool>,
    pub has_continuation: Option<bool>,
    pub sort_by: SortKey,
    pub order: SortOrder,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ConversationFilter {
    /// Whether `summary` survives the boolean and project filters. Sorting
    /// and pagination are applied separately by the caller.
    pub fn matches(&self, summary: &ConversationSummary) -> bool {
        if let Some(project_path) = &self.project_path
            && summary.project_path != *project_path
        {
            return false;
        }
        if let Some(archived) = self.archived
            && summary.is_archived != archived
        {
            return false;
        }
        if let Some(pinned) = self.pinned
            && summary.is_pinned != pinned
        {
            return false;
        }
        if let Some(has_continuation) = self.has_continuation
            && summary.continuation_session_id.is_some() != has_continuation
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use pretty_assertions::assert_eq;

    fn summary(project: &str, archived: bool) -> ConversationSummary {
        ConversationSummary {
            session_id: SessionId::from("s"),
            project_path: project.to_string(),
            summary: None,
            created: Utc::now(),
            updated: Utc::now(),
            message_count: 0,
            status: ConversationStatus::Completed,
            streaming_id: None,
            is_archived: archived,
            is_pinned: false,
            continuation_session_id: None,
        }
    }

    #[test]
    fn filter_on_project_path_and_archived() {
        let filter = ConversationFilter {
            project_path: Some("/w".to_string()),
            archived: Some(false),
            ..Default::default()
        };
        assert!(filter.matches(&summary("/w", false)));
        assert!(!filter.matches(&summary("/w", true)));
        assert!(!filter.matches(&summary("/other", false)));
    }

    #[test]
    fn permission_mode_round_trips_camel_case() {
        let mode: PermissionMode = serde_json::from_str("\"acceptEdits\"").unwrap();
        assert_eq!(mode, PermissionMode::AcceptEdits);
        assert_eq!(mode.as_str(), "acceptEdits");
    }
}
