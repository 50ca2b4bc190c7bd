//! Shared types for the switchboard control plane.
//!
//! Everything that crosses a component boundary lives here: stream and
//! session identifiers, pass-through conversation records, the SSE event
//! frames sent to subscribers, permission requests, and the conversation
//! summary/detail shapes served by the history endpoints. This crate
//! performs no I/O.

mod conversation;
mod event;
mod ids;
mod permission;
mod record;

pub use conversation::ConversationDetails;
pub use conversation::ConversationFilter;
pub use conversation::ConversationMetadata;
pub use conversation::ConversationStatus;
pub use conversation::ConversationSummary;
pub use conversation::PermissionMode;
pub use conversation::SessionContext;
pub use conversation::SortKey;
pub use conversation::SortOrder;
pub use event::StreamEvent;
pub use ids::SessionId;
pub use ids::StreamId;
pub use permission::PermissionRequest;
pub use permission::PermissionStatus;
pub use permission::UNKNOWN_STREAM;
pub use record::ConversationRecord;
