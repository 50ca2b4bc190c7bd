//! Read-side index over the assistant's on-disk conversation logs.
//!
//! The assistant records each session as an append-only JSON-lines file at
//! `<agent_home>/projects/<encoded-project>/<session>.jsonl`; switchboard
//! reads this tree and never writes it. Listing goes through a per-file
//! mtime-keyed cache so an unchanged file is never re-parsed, and the
//! refresh pass is single-flight: concurrent callers await one in-flight
//! result instead of racing the disk.

// Poisoned lock should fail the program
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;

use chrono::DateTime;
use chrono::Utc;
use futures::FutureExt;
use futures::future::Shared;
use tracing::warn;

use switchboard_protocol::ConversationFilter;
use switchboard_protocol::ConversationMetadata;
use switchboard_protocol::ConversationRecord;
use switchboard_protocol::ConversationStatus;
use switchboard_protocol::ConversationSummary;
use switchboard_protocol::SessionId;
use switchboard_protocol::SortKey;
use switchboard_protocol::SortOrder;

use crate::error::Result;
use crate::error::SwitchboardErr;

const JSONL_EXTENSION: &str = "jsonl";
const SUMMARY_FALLBACK_LEN: usize = 100;

/// Cached parse of one conversation log. Replaced wholesale whenever the
/// file's mtime advances; never updated in place.
struct FileCacheEntry {
    mtime: SystemTime,
    source_project: String,
    records: Arc<Vec<ConversationRecord>>,
}

/// One session file within a refresh snapshot.
#[derive(Clone)]
struct SessionFile {
    session_id: SessionId,
    source_project: String,
    mtime: SystemTime,
    records: Arc<Vec<ConversationRecord>>,
}

#[derive(Clone, Default)]
struct Snapshot {
    files: Arc<Vec<SessionFile>>,
}

type RefreshFuture = Shared<Pin<Box<dyn Future<Output = std::result::Result<Snapshot, String>> + Send>>>;

pub struct HistoryIndex {
    projects_dir: PathBuf,
    cache: Mutex<HashMap<PathBuf, FileCacheEntry>>,
    inflight: Mutex<Option<RefreshFuture>>,
    /// Resume pointers observed this run: original session -> its
    /// continuation. Merged into summaries on top of anything the log
    /// files themselves carry.
    continuations: Mutex<HashMap<SessionId, SessionId>>,
    files_parsed: AtomicU64,
}

impl HistoryIndex {
    pub fn new(projects_dir: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            projects_dir,
            cache: Mutex::new(HashMap::new()),
            inflight: Mutex::new(None),
            continuations: Mutex::new(HashMap::new()),
            files_parsed: AtomicU64::new(0),
        })
    }

    /// Number of files parsed since construction. A warm second listing
    /// leaves this unchanged.
    pub fn files_parsed(&self) -> u64 {
        self.files_parsed.load(Ordering::Relaxed)
    }

    /// Note that `previous` was resumed as `next`. Later bindings for the
    /// same original replace earlier ones.
    pub fn record_continuation(&self, previous: SessionId, next: SessionId) {
        let mut continuations = self.continuations.lock().unwrap();
        continuations.insert(previous, next);
    }

    /// Enumerate, refresh the cache, reduce to summaries, then filter,
    /// sort and paginate. Returns the page plus the total match count.
    pub async fn list_conversations(
        self: &Arc<Self>,
        filter: &ConversationFilter,
    ) -> Result<(Vec<ConversationSummary>, usize)> {
        let snapshot = self.refresh().await?;
        let continuations = self.continuations.lock().unwrap().clone();

        let mut summaries: Vec<ConversationSummary> = snapshot
            .files
            .iter()
            .filter_map(|file| summarize(file, &continuations))
            .filter(|summary| filter.matches(summary))
            .collect();

        summaries.sort_by(|a, b| {
            let ordering = match filter.sort_by {
                SortKey::Created => a.created.cmp(&b.created),
                SortKey::Updated => a.updated.cmp(&b.updated),
            };
            match filter.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = summaries.len();
        let offset = filter.offset.unwrap_or(0).min(total);
        let end = filter
            .limit
            .map_or(total, |limit| (offset + limit).min(total));
        Ok((summaries.drain(offset..end).collect(), total))
    }

    /// Session IDs of every conversation currently on disk.
    pub async fn existing_session_ids(self: &Arc<Self>) -> Result<HashSet<SessionId>> {
        let snapshot = self.refresh().await?;
        Ok(snapshot
            .files
            .iter()
            .map(|file| file.session_id.clone())
            .collect())
    }

    /// All message entries of one conversation, summary lines excluded.
    pub async fn fetch_conversation(&self, session_id: &SessionId) -> Result<Vec<ConversationRecord>> {
        let path = self
            .locate(session_id)
            .await?
            .ok_or_else(|| SwitchboardErr::SessionNotFound(session_id.clone()))?;
        let records = parse_file(&path).await?;
        Ok(records
            .into_iter()
            .filter(|record| !record.is_summary())
            .collect())
    }

    pub async fn get_metadata(&self, session_id: &SessionId) -> Result<ConversationMetadata> {
        let path = self
            .locate(session_id)
            .await?
            .ok_or_else(|| SwitchboardErr::SessionNotFound(session_id.clone()))?;
        let records = parse_file(&path).await?;

        let summary = records
            .iter()
            .find(|record| record.is_summary())
            .and_then(|record| record.str_field("summary"))
            .map(str::to_string);
        let project_path = records
            .iter()
            .find_map(|record| record.str_field("cwd"))
            .map(str::to_string);
        let model = records
            .iter()
            .rev()
            .find(|record| record.record_type() == Some("assistant"))
            .and_then(assistant_model);
        let total_duration_ms = records
            .iter()
            .filter_map(|record| record.u64_field("durationMs"))
            .sum();

        Ok(ConversationMetadata {
            summary,
            project_path,
            model,
            total_duration_ms,
        })
    }

    pub async fn working_directory_for(&self, session_id: &SessionId) -> Option<PathBuf> {
        let path = self.locate(session_id).await.ok().flatten()?;
        let records = parse_file(&path).await.ok()?;
        records
            .iter()
            .find_map(|record| record.str_field("cwd"))
            .map(PathBuf::from)
    }

    /// Single-flight refresh: the first caller builds the pass, everyone
    /// arriving while it runs awaits the same future, and the slot is
    /// cleared on completion so the next call re-stats the tree.
    async fn refresh(self: &Arc<Self>) -> Result<Snapshot> {
        let future = {
            let mut inflight = self.inflight.lock().unwrap();
            match inflight.as_ref() {
                Some(future) => future.clone(),
                None => {
                    let this = Arc::clone(self);
                    let future: RefreshFuture = async move {
                        let outcome = this.scan().await;
                        this.inflight.lock().unwrap().take();
                        outcome.map_err(|e| e.to_string())
                    }
                    .boxed()
                    .shared();
                    *inflight = Some(future.clone());
                    future
                }
            }
        };

        future.await.map_err(SwitchboardErr::Refresh)
    }

    /// One full pass: stat every candidate file, reuse cache entries whose
    /// mtime matches, re-parse the rest, evict entries for vanished paths.
    async fn scan(self: &Arc<Self>) -> Result<Snapshot> {
        let current = self.enumerate().await?;

        // Split into cache hits and files needing a parse. The map lock is
        // not held across disk I/O.
        let mut files: HashMap<PathBuf, SessionFile> = HashMap::new();
        let mut stale: Vec<(PathBuf, String, SystemTime)> = Vec::new();
        {
            let cache = self.cache.lock().unwrap();
            for (path, project, mtime) in &current {
                match cache.get(path) {
                    Some(entry) if entry.mtime == *mtime => {
                        if let Some(session_id) = session_id_of(path) {
                            files.insert(
                                path.clone(),
                                SessionFile {
                                    session_id,
                                    source_project: entry.source_project.clone(),
                                    mtime: entry.mtime,
                                    records: Arc::clone(&entry.records),
                                },
                            );
                        }
                    }
                    _ => stale.push((path.clone(), project.clone(), *mtime)),
                }
            }
        }

        let mut replacements: Vec<(PathBuf, FileCacheEntry)> = Vec::new();
        for (path, project, mtime) in stale {
            let records = Arc::new(parse_file(&path).await?);
            self.files_parsed.fetch_add(1, Ordering::Relaxed);
            if let Some(session_id) = session_id_of(&path) {
                files.insert(
                    path.clone(),
                    SessionFile {
                        session_id,
                        source_project: project.clone(),
                        mtime,
                        records: Arc::clone(&records),
                    },
                );
            }
            replacements.push((
                path,
                FileCacheEntry {
                    mtime,
                    source_project: project,
                    records,
                },
            ));
        }

        {
            let mut cache = self.cache.lock().unwrap();
            for (path, entry) in replacements {
                cache.insert(path, entry);
            }
            let live: HashSet<&PathBuf> = current.iter().map(|(path, _, _)| path).collect();
            cache.retain(|path, _| live.contains(path));
        }

        let mut files: Vec<SessionFile> = files.into_values().collect();
        files.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        Ok(Snapshot {
            files: Arc::new(files),
        })
    }

    /// Stat every `<project>/<session>.jsonl` under the projects dir. A
    /// missing tree is an empty listing, not an error.
    async fn enumerate(&self) -> Result<Vec<(PathBuf, String, SystemTime)>> {
        let mut out = Vec::new();
        let mut projects = match tokio::fs::read_dir(&self.projects_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };

        while let Some(project) = projects.next_entry().await? {
            if !project.file_type().await?.is_dir() {
                continue;
            }
            let project_name = project.file_name().to_string_lossy().into_owned();
            let mut sessions = tokio::fs::read_dir(project.path()).await?;
            while let Some(session) = sessions.next_entry().await? {
                let path = session.path();
                if path.extension().and_then(|e| e.to_str()) != Some(JSONL_EXTENSION) {
                    continue;
                }
                let mtime = session.metadata().await?.modified()?;
                out.push((path, project_name.clone(), mtime));
            }
        }
        Ok(out)
    }

    /// Find `<session>.jsonl` by scanning the project directories.
    async fn locate(&self, session_id: &SessionId) -> Result<Option<PathBuf>> {
        let filename = format!("{session_id}.{JSONL_EXTENSION}");
        let mut projects = match tokio::fs::read_dir(&self.projects_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        while let Some(project) = projects.next_entry().await? {
            if !project.file_type().await?.is_dir() {
                continue;
            }
            let candidate = project.path().join(&filename);
            if tokio::fs::try_exists(&candidate).await? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}

/// Project directory names encode the project path with `/` replaced by
/// `-`. The transform is one-way (a hyphenated directory name decodes
/// ambiguously); decoding exists for display only.
pub fn encode_project_path(path: &Path) -> String {
    path.to_string_lossy().replace('/', "-")
}

pub fn decode_project_dir(name: &str) -> String {
    name.replace('-', "/")
}

/// Pure reducer from one file's records to a list entry. Files with no
/// records contribute nothing rather than failing the listing.
fn summarize(
    file: &SessionFile,
    continuations: &HashMap<SessionId, SessionId>,
) -> Option<ConversationSummary> {
    let records = file.records.as_slice();
    if records.is_empty() {
        return None;
    }

    let summary_record = records.iter().find(|record| record.is_summary());
    let summary = summary_record
        .and_then(|record| record.str_field("summary"))
        .map(str::to_string)
        .or_else(|| first_user_text(records));

    let timestamps: Vec<DateTime<Utc>> = records
        .iter()
        .filter_map(|record| record.str_field("timestamp"))
        .filter_map(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .collect();
    let fallback: DateTime<Utc> = file.mtime.into();
    let created = timestamps.first().copied().unwrap_or(fallback);
    let updated = timestamps.last().copied().unwrap_or(fallback);

    let message_count = records
        .iter()
        .filter(|record| matches!(record.record_type(), Some("user" | "assistant")))
        .count();

    let project_path = records
        .iter()
        .find_map(|record| record.str_field("cwd"))
        .map(str::to_string)
        .unwrap_or_else(|| decode_project_dir(&file.source_project));

    let continuation_session_id = continuations.get(&file.session_id).cloned().or_else(|| {
        records
            .iter()
            .filter(|record| {
                record.record_type() == Some("system")
                    && record.subtype() == Some("continuation")
            })
            .find_map(|record| record.str_field("continuation_session_id"))
            .map(SessionId::from)
    });

    Some(ConversationSummary {
        session_id: file.session_id.clone(),
        project_path,
        summary,
        created,
        updated,
        message_count,
        status: ConversationStatus::Completed,
        streaming_id: None,
        is_archived: summary_record
            .and_then(|record| record.0.get("isArchived"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        is_pinned: summary_record
            .and_then(|record| record.0.get("isPinned"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        continuation_session_id,
    })
}

fn first_user_text(records: &[ConversationRecord]) -> Option<String> {
    let text = records
        .iter()
        .filter(|record| record.record_type() == Some("user"))
        .find_map(|record| {
            record
                .0
                .get("message")
                .and_then(|m| m.get("content"))
                .and_then(|c| c.as_str())
        })?;
    let mut text = text.to_string();
    if text.len() > SUMMARY_FALLBACK_LEN {
        let cut = (0..=SUMMARY_FALLBACK_LEN)
            .rev()
            .find(|i| text.is_char_boundary(*i))
            .unwrap_or(0);
        text.truncate(cut);
    }
    Some(text)
}

fn assistant_model(record: &ConversationRecord) -> Option<String> {
    record
        .0
        .get("message")
        .and_then(|m| m.get("model"))
        .and_then(|v| v.as_str())
        .or_else(|| record.str_field("model"))
        .map(str::to_string)
}

fn session_id_of(path: &Path) -> Option<SessionId> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(SessionId::from)
}

/// Parse one log file. Individual bad lines are logged and skipped; only
/// failing to read the file at all is an error.
async fn parse_file(path: &Path) -> Result<Vec<ConversationRecord>> {
    let contents = tokio::fs::read_to_string(path).await?;
    let mut records = Vec::new();
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(value) => records.push(ConversationRecord::from(value)),
            Err(e) => warn!("skipping malformed line in {}: {e}", path.display()),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_session(root: &Path, project: &str, session: &str, lines: &[&str]) -> PathBuf {
        let dir = root.join(project);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{session}.jsonl"));
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        path
    }

    fn session_lines() -> Vec<&'static str> {
        vec![
            r#"{"type":"summary","summary":"greeting","isPinned":true}"#,
            r#"{"type":"user","session_id":"s1","cwd":"/w","message":{"role":"user","content":"hi"},"timestamp":"2025-03-01T10:00:00Z","durationMs":5}"#,
            r#"{"type":"assistant","session_id":"s1","message":{"role":"assistant","content":"hello","model":"fast-1"},"timestamp":"2025-03-01T10:00:02Z","durationMs":1200}"#,
        ]
    }

    #[tokio::test]
    async fn lists_sessions_with_reduced_summaries() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(tmp.path(), "-w", "s1", &session_lines());
        let index = HistoryIndex::new(tmp.path().to_path_buf());

        let (summaries, total) = index
            .list_conversations(&ConversationFilter::default())
            .await
            .unwrap();

        assert_eq!(total, 1);
        let summary = &summaries[0];
        assert_eq!(summary.session_id, SessionId::from("s1"));
        assert_eq!(summary.summary.as_deref(), Some("greeting"));
        assert_eq!(summary.project_path, "/w");
        assert_eq!(summary.message_count, 2);
        assert!(summary.is_pinned);
        assert!(!summary.is_archived);
        assert_eq!(summary.status, ConversationStatus::Completed);
    }

    #[tokio::test]
    async fn unchanged_files_are_not_reparsed() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(tmp.path(), "-w", "s1", &session_lines());
        let index = HistoryIndex::new(tmp.path().to_path_buf());

        let (first, _) = index
            .list_conversations(&ConversationFilter::default())
            .await
            .unwrap();
        let parsed_after_first = index.files_parsed();
        let (second, _) = index
            .list_conversations(&ConversationFilter::default())
            .await
            .unwrap();

        assert_eq!(parsed_after_first, 1);
        assert_eq!(index.files_parsed(), parsed_after_first);
        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].summary, second[0].summary);
    }

    #[tokio::test]
    async fn touched_files_are_reparsed_and_replaced() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_session(tmp.path(), "-w", "s1", &session_lines());
        let index = HistoryIndex::new(tmp.path().to_path_buf());
        index
            .list_conversations(&ConversationFilter::default())
            .await
            .unwrap();

        let mut lines = session_lines();
        lines.push(
            r#"{"type":"user","session_id":"s1","message":{"role":"user","content":"more"},"timestamp":"2025-03-01T10:05:00Z"}"#,
        );
        write_session(tmp.path(), "-w", "s1", &lines);
        // Make sure the mtime moves even on coarse-grained filesystems.
        let bumped = std::time::SystemTime::now() + std::time::Duration::from_secs(2);
        std::fs::File::options()
            .append(true)
            .open(&path)
            .unwrap()
            .set_modified(bumped)
            .unwrap();

        let (summaries, _) = index
            .list_conversations(&ConversationFilter::default())
            .await
            .unwrap();
        assert_eq!(index.files_parsed(), 2);
        assert_eq!(summaries[0].message_count, 3);
    }

    #[tokio::test]
    async fn deleted_files_are_evicted() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_session(tmp.path(), "-w", "s1", &session_lines());
        let index = HistoryIndex::new(tmp.path().to_path_buf());
        index
            .list_conversations(&ConversationFilter::default())
            .await
            .unwrap();

        std::fs::remove_file(&path).unwrap();
        let (summaries, total) = index
            .list_conversations(&ConversationFilter::default())
            .await
            .unwrap();
        assert_eq!(total, 0);
        assert!(summaries.is_empty());
        assert!(index.cache.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(
            tmp.path(),
            "-w",
            "s1",
            &[
                r#"{"type":"user","message":{"role":"user","content":"ok"},"timestamp":"2025-03-01T10:00:00Z"}"#,
                "{broken",
                r#"{"type":"assistant","message":{"role":"assistant","content":"fine"},"timestamp":"2025-03-01T10:00:01Z"}"#,
            ],
        );
        let index = HistoryIndex::new(tmp.path().to_path_buf());

        let (summaries, total) = index
            .list_conversations(&ConversationFilter::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(summaries[0].message_count, 2);
    }

    #[tokio::test]
    async fn missing_projects_dir_is_an_empty_listing() {
        let index = HistoryIndex::new(PathBuf::from("/nonexistent/projects-root"));
        let (summaries, total) = index
            .list_conversations(&ConversationFilter::default())
            .await
            .unwrap();
        assert!(summaries.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn sorting_and_pagination() {
        let tmp = tempfile::tempdir().unwrap();
        for (session, ts) in [
            ("a", "2025-03-01T10:00:00Z"),
            ("b", "2025-03-02T10:00:00Z"),
            ("c", "2025-03-03T10:00:00Z"),
        ] {
            write_session(
                tmp.path(),
                "-w",
                session,
                &[&format!(
                    r#"{{"type":"user","message":{{"role":"user","content":"x"}},"timestamp":"{ts}"}}"#
                )],
            );
        }
        let index = HistoryIndex::new(tmp.path().to_path_buf());

        let filter = ConversationFilter {
            sort_by: SortKey::Created,
            order: SortOrder::Desc,
            limit: Some(2),
            offset: Some(1),
            ..Default::default()
        };
        let (summaries, total) = index.list_conversations(&filter).await.unwrap();
        assert_eq!(total, 3);
        let ids: Vec<&str> = summaries.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn fetch_conversation_excludes_the_summary_line() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(tmp.path(), "-w", "s1", &session_lines());
        let index = HistoryIndex::new(tmp.path().to_path_buf());

        let messages = index
            .fetch_conversation(&SessionId::from("s1"))
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| !m.is_summary()));

        let missing = index.fetch_conversation(&SessionId::from("nope")).await;
        assert!(matches!(missing, Err(SwitchboardErr::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn metadata_derives_model_duration_and_cwd() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(tmp.path(), "-w", "s1", &session_lines());
        let index = HistoryIndex::new(tmp.path().to_path_buf());

        let metadata = index.get_metadata(&SessionId::from("s1")).await.unwrap();
        assert_eq!(metadata.summary.as_deref(), Some("greeting"));
        assert_eq!(metadata.project_path.as_deref(), Some("/w"));
        assert_eq!(metadata.model.as_deref(), Some("fast-1"));
        assert_eq!(metadata.total_duration_ms, 1205);

        assert_eq!(
            index
                .working_directory_for(&SessionId::from("s1"))
                .await
                .as_deref(),
            Some(Path::new("/w"))
        );
    }

    #[tokio::test]
    async fn recorded_continuations_show_up_in_summaries() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(tmp.path(), "-w", "s1", &session_lines());
        let index = HistoryIndex::new(tmp.path().to_path_buf());
        index.record_continuation(SessionId::from("s1"), SessionId::from("s2"));

        let filter = ConversationFilter {
            has_continuation: Some(true),
            ..Default::default()
        };
        let (summaries, total) = index.list_conversations(&filter).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(
            summaries[0].continuation_session_id,
            Some(SessionId::from("s2"))
        );
    }

    #[tokio::test]
    async fn concurrent_listings_share_one_refresh() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(tmp.path(), "-w", "s1", &session_lines());
        let index = HistoryIndex::new(tmp.path().to_path_buf());

        let filter_a = ConversationFilter::default();
        let filter_b = ConversationFilter::default();
        let (a, b) = tokio::join!(
            index.list_conversations(&filter_a),
            index.list_conversations(&filter_b),
        );
        assert_eq!(a.unwrap().1, 1);
        assert_eq!(b.unwrap().1, 1);
        assert_eq!(index.files_parsed(), 1);
    }

    #[test]
    fn project_encoding_is_one_way() {
        assert_eq!(encode_project_path(Path::new("/home/u/proj")), "-home-u-proj");
        assert_eq!(decode_project_dir("-home-u-proj"), "/home/u/proj");
    }
}
