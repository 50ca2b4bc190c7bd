//! Conversation lifecycle and listing handlers.

use axum::Json;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use switchboard_core::SwitchboardErr;
use switchboard_core::launch::ConversationParams;
use switchboard_protocol::ConversationDetails;
use switchboard_protocol::ConversationFilter;
use switchboard_protocol::ConversationStatus;
use switchboard_protocol::PermissionMode;
use switchboard_protocol::SessionContext;
use switchboard_protocol::SessionId;
use switchboard_protocol::StreamId;

use crate::error::ApiError;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub working_directory: String,
    pub initial_prompt: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub allowed_tools: Option<Vec<String>>,
    #[serde(default)]
    pub disallowed_tools: Option<Vec<String>>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub permission_mode: Option<String>,
    #[serde(default)]
    pub resumed_session_id: Option<SessionId>,
}

/// POST /api/conversations/start: spawn the launcher, wait for its init
/// record, bind the registry, and hand the client its stream.
pub async fn start(
    State(state): State<AppState>,
    Json(request): Json<StartRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if request.working_directory.trim().is_empty() {
        return Err(ApiError::invalid_request("workingDirectory is required"));
    }
    if request.initial_prompt.trim().is_empty() {
        return Err(ApiError::invalid_request("initialPrompt is required"));
    }
    let permission_mode = request
        .permission_mode
        .as_deref()
        .map(parse_permission_mode)
        .transpose()?;

    let params = ConversationParams {
        working_directory: request.working_directory.clone().into(),
        initial_prompt: request.initial_prompt.clone(),
        model: request.model.clone(),
        allowed_tools: request.allowed_tools.unwrap_or_default(),
        disallowed_tools: request.disallowed_tools.unwrap_or_default(),
        system_prompt: request.system_prompt,
        permission_mode,
        add_dirs: Vec::new(),
    };

    // For a resume, pull the previous session's messages so the registry
    // can serve them before the new log file reaches disk.
    let resumed = match &request.resumed_session_id {
        Some(previous) => {
            let inherited = match state.history.fetch_conversation(previous).await {
                Ok(messages) => Some(messages),
                Err(SwitchboardErr::SessionNotFound(_)) => None,
                Err(e) => return Err(e.into()),
            };
            Some((previous.clone(), inherited))
        }
        None => None,
    };

    let (stream_id, init) = match &resumed {
        Some((previous, _)) => {
            state
                .supervisor
                .resume_conversation(previous.clone(), params.clone())
                .await?
        }
        None => state.supervisor.start_conversation(params.clone()).await?,
    };

    let Some(session_id) = init.session_id() else {
        return Err(ApiError::internal("init record carried no session_id"));
    };

    let context = SessionContext {
        initial_prompt: params.initial_prompt,
        working_directory: params.working_directory,
        model: params.model,
        started_at: Utc::now(),
        inherited_messages: resumed.as_ref().and_then(|(_, inherited)| inherited.clone()),
    };
    state
        .registry
        .bind(stream_id, session_id.clone(), Some(context));
    if !state.supervisor.is_active(stream_id) {
        // The subprocess can exit between init and bind; do not leave a
        // dangling binding behind.
        state.registry.unbind(stream_id);
    }
    if let Some((previous, _)) = resumed {
        state.history.record_continuation(previous, session_id.clone());
    }

    debug!("conversation started: stream {stream_id}, session {session_id}");

    let mut body = match init.0 {
        serde_json::Value::Object(map) => map,
        other => {
            let mut map = serde_json::Map::new();
            map.insert("init".to_string(), other);
            map
        }
    };
    body.insert("streamingId".to_string(), json!(stream_id));
    body.insert("streamUrl".to_string(), json!(format!("/api/stream/{stream_id}")));
    Ok(Json(serde_json::Value::Object(body)))
}

fn parse_permission_mode(raw: &str) -> ApiResult<PermissionMode> {
    serde_json::from_value::<PermissionMode>(json!(raw))
        .map_err(|_| ApiError::invalid_request(format!("unknown permissionMode: {raw}")))
}

#[derive(Debug, serde::Serialize)]
pub struct StopResponse {
    pub success: bool,
}

/// POST /api/conversations/{streaming_id}/stop. Unknown or malformed IDs
/// report `success: false` rather than an error.
pub async fn stop(
    State(state): State<AppState>,
    Path(streaming_id): Path<String>,
) -> Json<StopResponse> {
    let success = streaming_id
        .parse::<StreamId>()
        .map(|stream_id| state.supervisor.stop_conversation(stream_id))
        .unwrap_or(false);
    Json(StopResponse { success })
}

/// GET /api/conversations: the on-disk listing merged with live sessions
/// that have not yet been flushed to a log file.
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<ConversationFilter>,
) -> ApiResult<Json<serde_json::Value>> {
    let (mut summaries, mut total) = state.history.list_conversations(&filter).await?;

    for summary in &mut summaries {
        if let Some(stream_id) = state.registry.stream_id_for(&summary.session_id) {
            summary.status = ConversationStatus::Ongoing;
            summary.streaming_id = Some(stream_id);
        }
    }

    let existing = state.history.existing_session_ids().await?;
    let mut merged: Vec<_> = state
        .registry
        .conversations_not_on_disk(&existing)
        .into_iter()
        .filter(|summary| filter.matches(summary))
        .collect();
    total += merged.len();
    merged.extend(summaries);

    Ok(Json(json!({ "conversations": merged, "total": total })))
}

/// GET /api/conversations/{session_id}: falls back to the registry's
/// synthesized view when the session is live but not yet persisted.
pub async fn details(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<ConversationDetails>> {
    let session_id = SessionId::from(session_id);

    match state.history.fetch_conversation(&session_id).await {
        Ok(messages) => {
            let metadata = state.history.get_metadata(&session_id).await?;
            let project_path = metadata.project_path.clone().unwrap_or_default();
            Ok(Json(ConversationDetails {
                session_id,
                messages,
                summary: metadata.summary.clone(),
                project_path,
                metadata,
            }))
        }
        Err(SwitchboardErr::SessionNotFound(_)) => state
            .registry
            .active_details_for(&session_id)
            .map(Json)
            .ok_or_else(|| {
                ApiError::session_not_found(format!("unknown session: {session_id}"))
            }),
        Err(e) => Err(e.into()),
    }
}
