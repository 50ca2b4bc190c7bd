//! Concurrency and streaming substrate of the switchboard control plane.
//!
//! Five cooperating components, leaves first: the JSONL line parser, the
//! process supervisor, the session status registry, the stream fan-out,
//! the history index and its mtime cache, and the permission broker. The
//! HTTP surface lives in `switchboard-server`; this crate exposes passive
//! objects with internally-synchronized state plus the long-lived reader
//! tasks behind each subprocess.

mod config;
mod error;
pub mod fanout;
pub mod history;
pub mod jsonl;
pub mod launch;
pub mod permissions;
pub mod registry;
pub mod supervisor;
mod util;

pub use config::Config;
pub use config::ConfigOverrides;
pub use config::DEFAULT_BIND_ADDR;
pub use error::Result;
pub use error::SwitchboardErr;
pub use util::notify_on_shutdown_signal;
