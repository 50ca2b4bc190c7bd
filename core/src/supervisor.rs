//! Owns the set of live assistant subprocesses.
//!
//! Each conversation is one child process: argv computed from the request,
//! stdout parsed as JSONL into `Message` events, stderr forwarded as
//! `Error` events, and exactly one `Closed` event emitted after the child
//! has exited and both pipes are drained. Stopping is staged: stdin close,
//! SIGTERM after a short grace, SIGKILL at the hard deadline, with the
//! kill timers cancelled as soon as the child actually exits.

// Poisoned lock should fail the program
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::process::ChildStdin;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;

use switchboard_protocol::ConversationRecord;
use switchboard_protocol::SessionId;
use switchboard_protocol::StreamId;

use crate::config::Config;
use crate::error::Result;
use crate::error::SwitchboardErr;
use crate::jsonl::JsonlDecoder;
use crate::launch::ConversationParams;
use crate::launch::LaunchIntent;
use crate::launch::build_argv;

/// Size of the event channel between the supervisor's reader tasks and the
/// single wiring consumer. 128 events of headroom is plenty for an
/// interactive stream.
const CHANNEL_CAPACITY: usize = 128;

/// Per-stream lifecycle events, delivered in subprocess emission order for
/// any one stream. `Closed` arrives exactly once, after every `Message`
/// and `Error` for that stream.
#[derive(Debug)]
pub enum SupervisorEvent {
    Message {
        stream_id: StreamId,
        record: ConversationRecord,
    },
    Error {
        stream_id: StreamId,
        reason: String,
    },
    Closed {
        stream_id: StreamId,
        exit_code: i32,
    },
}

struct StreamHandle {
    stdin: Option<ChildStdin>,
    pid: Option<u32>,
    /// Cancelled by the monitor task when the child exits; pending kill
    /// timers select on it.
    exited: CancellationToken,
}

pub struct ProcessSupervisor {
    config: Arc<Config>,
    mcp_config_path: Mutex<Option<PathBuf>>,
    streams: Arc<Mutex<HashMap<StreamId, StreamHandle>>>,
    /// Processes spawned and not yet exited, including ones already
    /// removed from the table by a stop in progress.
    live: Arc<AtomicUsize>,
    tx_event: mpsc::Sender<SupervisorEvent>,
}

impl ProcessSupervisor {
    /// The receiver carries every event of every stream; wire it up once
    /// at startup and keep it drained.
    pub fn new(config: Arc<Config>) -> (Arc<Self>, mpsc::Receiver<SupervisorEvent>) {
        let (tx_event, rx_event) = mpsc::channel(CHANNEL_CAPACITY);
        let mcp_config_path = config.mcp_config_path.clone();
        (
            Arc::new(Self {
                config,
                mcp_config_path: Mutex::new(mcp_config_path),
                streams: Arc::new(Mutex::new(HashMap::new())),
                live: Arc::new(AtomicUsize::new(0)),
                tx_event,
            }),
            rx_event,
        )
    }

    /// Spawn a fresh conversation and wait for the subprocess's
    /// `system/init` record. Spawn failures surface here synchronously and
    /// produce no events.
    pub async fn start_conversation(
        &self,
        params: ConversationParams,
    ) -> Result<(StreamId, ConversationRecord)> {
        self.launch(params, LaunchIntent::Start).await
    }

    /// Same as [`Self::start_conversation`], but the argv carries the
    /// resume selector and the previous session ID.
    pub async fn resume_conversation(
        &self,
        previous_session_id: SessionId,
        params: ConversationParams,
    ) -> Result<(StreamId, ConversationRecord)> {
        self.launch(params, LaunchIntent::Resume {
            previous_session_id,
        })
        .await
    }

    /// Enter the staged shutdown sequence for `stream_id`. Returns false
    /// when the stream is unknown (including a second stop).
    pub fn stop_conversation(&self, stream_id: StreamId) -> bool {
        let handle = {
            let mut streams = self.streams.lock().unwrap();
            streams.remove(&stream_id)
        };
        let Some(mut handle) = handle else {
            return false;
        };

        debug!("stopping stream {stream_id}");
        // Cooperative: closing stdin asks the launcher to wind down.
        drop(handle.stdin.take());

        let exited = handle.exited.clone();
        let pid = handle.pid;
        let soft_grace = self.config.stop_soft_grace;
        let hard_deadline = self.config.stop_hard_deadline;
        tokio::spawn(async move {
            tokio::select! {
                _ = exited.cancelled() => return,
                _ = tokio::time::sleep(soft_grace) => {}
            }
            send_signal(pid, Signal::Term);
            tokio::select! {
                _ = exited.cancelled() => return,
                _ = tokio::time::sleep(hard_deadline.saturating_sub(soft_grace)) => {}
            }
            send_signal(pid, Signal::Kill);
        });
        true
    }

    pub fn active_stream_ids(&self) -> Vec<StreamId> {
        let streams = self.streams.lock().unwrap();
        streams.keys().copied().collect()
    }

    pub fn is_active(&self, stream_id: StreamId) -> bool {
        let streams = self.streams.lock().unwrap();
        streams.contains_key(&stream_id)
    }

    /// Purely configurational; the next start picks it up.
    pub fn set_mcp_config_path(&self, path: Option<PathBuf>) {
        let mut mcp_config_path = self.mcp_config_path.lock().unwrap();
        *mcp_config_path = path;
    }

    /// Stop every active stream with bounded concurrency and wait for the
    /// children to actually exit, up to the hard kill deadline.
    pub async fn shutdown(&self) {
        let stream_ids = self.active_stream_ids();
        if stream_ids.is_empty() {
            return;
        }
        debug!("stopping {} active stream(s)", stream_ids.len());
        futures::StreamExt::for_each_concurrent(
            futures::stream::iter(stream_ids),
            self.config.shutdown_concurrency,
            |stream_id| async move {
                self.stop_conversation(stream_id);
            },
        )
        .await;
        self.wait_idle(self.config.stop_hard_deadline + Duration::from_secs(1))
            .await;
    }

    /// Wait until every spawned child has exited, or `timeout` elapses.
    pub async fn wait_idle(&self, timeout: Duration) {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.live.load(Ordering::SeqCst) > 0 {
            if tokio::time::Instant::now() >= deadline {
                warn!("shutdown timed out with children still live");
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }

    async fn launch(
        &self,
        params: ConversationParams,
        intent: LaunchIntent,
    ) -> Result<(StreamId, ConversationRecord)> {
        let mcp_config_path = self.mcp_config_path.lock().unwrap().clone();
        let argv = build_argv(&self.config, &params, &intent, mcp_config_path.as_ref());

        let mut command = Command::new(&argv[0]);
        command
            .args(&argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if params.working_directory.as_os_str().is_empty() {
            warn!("starting conversation without a working directory");
        } else {
            command.current_dir(&params.working_directory);
        }

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                SwitchboardErr::ExecutableNotFound(argv[0].clone())
            } else {
                SwitchboardErr::SpawnFailed(e.to_string())
            }
        })?;

        // One immediate poll replaces the old race between "spawn
        // succeeded" and an early-exit event.
        if let Ok(Some(status)) = child.try_wait() {
            return Err(SwitchboardErr::SpawnFailed(format!(
                "launcher exited immediately: {status}"
            )));
        }

        let stdout = child.stdout.take().ok_or_else(|| {
            SwitchboardErr::SpawnFailed("stdout pipe was unexpectedly not available".to_string())
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            SwitchboardErr::SpawnFailed("stderr pipe was unexpectedly not available".to_string())
        })?;
        let stdin = child.stdin.take();

        let stream_id = StreamId::new();
        let exited = CancellationToken::new();
        {
            let mut streams = self.streams.lock().unwrap();
            streams.insert(stream_id, StreamHandle {
                stdin,
                pid: child.id(),
                exited: exited.clone(),
            });
        }
        self.live.fetch_add(1, Ordering::SeqCst);

        let (init_tx, init_rx) = oneshot::channel();
        let stdout_task = tokio::spawn(read_stdout(
            stream_id,
            stdout,
            self.tx_event.clone(),
            init_tx,
        ));
        let stderr_task = tokio::spawn(read_stderr(stream_id, stderr, self.tx_event.clone()));

        let streams = Arc::clone(&self.streams);
        let live = Arc::clone(&self.live);
        let tx_event = self.tx_event.clone();
        tokio::spawn(async move {
            let status = child.wait().await;
            // Drain both pipes so Closed follows every Message and Error.
            let _ = tokio::join!(stdout_task, stderr_task);
            exited.cancel();
            {
                let mut streams = streams.lock().unwrap();
                streams.remove(&stream_id);
            }
            live.fetch_sub(1, Ordering::SeqCst);
            let exit_code = match status {
                Ok(status) => status.code().unwrap_or(-1),
                Err(e) => {
                    warn!("wait failed for stream {stream_id}: {e}");
                    -1
                }
            };
            debug!("stream {stream_id} closed with exit code {exit_code}");
            let _ = tx_event
                .send(SupervisorEvent::Closed {
                    stream_id,
                    exit_code,
                })
                .await;
        });

        match init_rx.await {
            Ok(record) => Ok((stream_id, record)),
            Err(_) => Err(SwitchboardErr::SpawnFailed(
                "launcher closed its output before initialization".to_string(),
            )),
        }
    }
}

/// Parse the child's stdout as JSONL. The first `system/init` record also
/// resolves the startup barrier; decode failures become `Error` events and
/// the stream keeps going.
async fn read_stdout<R: AsyncRead + Unpin>(
    stream_id: StreamId,
    mut stdout: R,
    tx_event: mpsc::Sender<SupervisorEvent>,
    init_tx: oneshot::Sender<ConversationRecord>,
) {
    let mut init_tx = Some(init_tx);
    let mut decoder = JsonlDecoder::new();
    let mut buf = [0u8; 8192];

    loop {
        match stdout.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                for item in decoder.feed(&buf[..n]) {
                    deliver(stream_id, item, &tx_event, &mut init_tx).await;
                }
            }
            Err(e) => {
                let _ = tx_event
                    .send(SupervisorEvent::Error {
                        stream_id,
                        reason: format!("stdout read failed: {e}"),
                    })
                    .await;
                break;
            }
        }
    }
    if let Some(item) = decoder.finish() {
        deliver(stream_id, item, &tx_event, &mut init_tx).await;
    }
}

async fn deliver(
    stream_id: StreamId,
    item: Result<serde_json::Value>,
    tx_event: &mpsc::Sender<SupervisorEvent>,
    init_tx: &mut Option<oneshot::Sender<ConversationRecord>>,
) {
    match item {
        Ok(value) => {
            let record = ConversationRecord::from(value);
            if record.is_init()
                && let Some(init_tx) = init_tx.take()
            {
                let _ = init_tx.send(record.clone());
            }
            let _ = tx_event
                .send(SupervisorEvent::Message { stream_id, record })
                .await;
        }
        Err(e) => {
            let _ = tx_event
                .send(SupervisorEvent::Error {
                    stream_id,
                    reason: e.to_string(),
                })
                .await;
        }
    }
}

/// Forward stderr chunks as `Error` events. Stderr output does not close
/// the stream; the child may keep emitting records.
async fn read_stderr<R: AsyncRead + Unpin>(
    stream_id: StreamId,
    mut stderr: R,
    tx_event: mpsc::Sender<SupervisorEvent>,
) {
    let mut buf = [0u8; 8192];
    loop {
        match stderr.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let chunk = String::from_utf8_lossy(&buf[..n]);
                let reason = chunk.trim();
                if reason.is_empty() {
                    continue;
                }
                let _ = tx_event
                    .send(SupervisorEvent::Error {
                        stream_id,
                        reason: reason.to_string(),
                    })
                    .await;
            }
        }
    }
}

enum Signal {
    Term,
    Kill,
}

#[cfg(unix)]
fn send_signal(pid: Option<u32>, signal: Signal) {
    let Some(pid) = pid else {
        return;
    };
    let signal = match signal {
        Signal::Term => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };
    // Safety: sending a signal to a pid we spawned; at worst the pid has
    // been reaped and kill(2) returns ESRCH.
    unsafe {
        libc::kill(pid as libc::pid_t, signal);
    }
}

#[cfg(not(unix))]
fn send_signal(pid: Option<u32>, _signal: Signal) {
    debug!("signal delivery not supported on this platform (pid {pid:?})");
}
