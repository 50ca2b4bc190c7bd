use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde_json::json;

use switchboard_core::SwitchboardErr;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// HTTP rendering of a failure: a status plus a stable machine-readable
/// code, with the human-readable message alongside.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "INVALID_REQUEST",
            message: message.into(),
        }
    }

    pub fn session_not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "SESSION_NOT_FOUND",
            message: message.into(),
        }
    }

    pub fn stream_not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "STREAM_NOT_FOUND",
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL",
            message: message.into(),
        }
    }
}

impl From<SwitchboardErr> for ApiError {
    fn from(e: SwitchboardErr) -> Self {
        let (status, code) = match &e {
            SwitchboardErr::ExecutableNotFound(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "EXECUTABLE_NOT_FOUND")
            }
            SwitchboardErr::SpawnFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SPAWN_FAILED"),
            SwitchboardErr::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
            SwitchboardErr::StreamNotFound(_) => (StatusCode::NOT_FOUND, "STREAM_NOT_FOUND"),
            SwitchboardErr::Io(_) | SwitchboardErr::Refresh(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR")
            }
            SwitchboardErr::Parse { .. }
            | SwitchboardErr::Json(_)
            | SwitchboardErr::EventChannelClosed => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        };
        Self {
            status,
            code,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "code": self.code,
        }));
        (self.status, body).into_response()
    }
}
