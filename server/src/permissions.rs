//! Permission endpoints, called by the companion permission server and by
//! browser clients polling the request list.

use axum::Json;
use axum::extract::Query;
use axum::extract::State;
use serde::Deserialize;
use serde_json::json;

use switchboard_core::permissions::PermissionFilter;
use switchboard_protocol::PermissionStatus;
use switchboard_protocol::StreamId;

use crate::error::ApiError;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyRequest {
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: serde_json::Value,
    #[serde(default)]
    pub streaming_id: Option<String>,
}

/// POST /api/permissions/notify
pub async fn notify(
    State(state): State<AppState>,
    Json(request): Json<NotifyRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if request.tool_name.trim().is_empty() {
        return Err(ApiError::invalid_request("toolName is required"));
    }
    let stream_id = request
        .streaming_id
        .as_deref()
        .and_then(|raw| raw.parse::<StreamId>().ok());

    let stored = state
        .broker
        .notify(request.tool_name, request.tool_input, stream_id);
    Ok(Json(json!({ "success": true, "id": stored.id })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub streaming_id: Option<String>,
    #[serde(default)]
    pub status: Option<PermissionStatus>,
}

/// GET /api/permissions
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<serde_json::Value> {
    let permissions = state.broker.list(&PermissionFilter {
        streaming_id: query.streaming_id,
        status: query.status,
    });
    Json(json!({ "permissions": permissions }))
}
