use std::io;

use thiserror::Error;

use switchboard_protocol::SessionId;
use switchboard_protocol::StreamId;

pub type Result<T> = std::result::Result<T, SwitchboardErr>;

#[derive(Error, Debug)]
pub enum SwitchboardErr {
    /// The configured launcher program does not exist on the PATH. Surfaced
    /// synchronously from start/resume, before any event is emitted.
    #[error("launcher executable not found: {0}")]
    ExecutableNotFound(String),

    /// The spawn syscall failed, or the child exited before emitting its
    /// init record.
    #[error("failed to spawn launcher: {0}")]
    SpawnFailed(String),

    #[error("no conversation log found for session: {0}")]
    SessionNotFound(SessionId),

    #[error("no active stream with id: {0}")]
    StreamNotFound(StreamId),

    /// A JSONL line that did not decode. Carries the offending line so the
    /// caller can decide between terminating the stream and logging.
    #[error("invalid JSON line: {line}")]
    Parse { line: String },

    /// A history refresh pass failed as a whole (directory enumeration or
    /// stat, not individual line parses).
    #[error("history refresh failed: {0}")]
    Refresh(String),

    /// The supervisor's event channel closed with the consumer gone.
    #[error("supervisor event channel closed")]
    EventChannelClosed,

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
