//! Append-only activity log, one JSON object per line.
//!
//! Lines are written unbuffered with a single `write_all` on an `O_APPEND`
//! handle, so a reader following the file only ever sees whole lines.
//! When a destination fails the writer moves down the chain
//! primary → fallback → discard and never comes back up. Nothing goes to
//! stderr: the display owns the terminal while it runs.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SegError};

/// How loud an event is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Log event types of the display pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    DisplayStart,
    DisplayStop,
    WorkerStart,
    WorkerStop,
    ConnectAttempt,
    Connected,
    ConnectFailed,
    FetchFailed,
    Reconnected,
    ReconnectFailed,
    SurfaceResized,
    RenderFailed,
    Error,
}

/// A single JSONL log entry. All fields are optional except `ts`, `event`, `severity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 UTC, millisecond precision.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    /// Cabinet endpoint (`host:port`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Consecutive failures at the time of the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failures: Option<u64>,
    /// Surface size after a resize.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    /// SEG error code if the action failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Freeform details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Entry stamped now, every optional field empty.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            event,
            severity,
            endpoint: None,
            failures: None,
            width: None,
            height: None,
            ok: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }
}

/// Where the activity log goes and how much of it is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonlConfig {
    pub path: PathBuf,
    /// Used once `path` cannot be opened or written.
    pub fallback_path: Option<PathBuf>,
    /// A line that would push the live file past this size rotates it first.
    pub max_size_bytes: u64,
    /// Rotated generations kept as `<path>.1` (newest) to `<path>.N`.
    pub max_rotated_files: u32,
    pub fsync_interval_secs: u64,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            path: std::env::temp_dir().join("iidxseg").join("activity.jsonl"),
            fallback_path: None,
            max_size_bytes: 8 * 1024 * 1024,
            max_rotated_files: 3,
            fsync_interval_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Primary,
    Fallback,
    Discard,
}

impl Target {
    const fn next(self) -> Self {
        match self {
            Self::Primary => Self::Fallback,
            Self::Fallback | Self::Discard => Self::Discard,
        }
    }
}

#[derive(Debug)]
struct LiveFile {
    file: File,
    path: PathBuf,
    len: u64,
}

impl LiveFile {
    fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| SegError::io(dir, source))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| SegError::io(path, source))?;
        let len = file.metadata().map_or(0, |meta| meta.len());
        Ok(Self {
            file,
            path: path.to_path_buf(),
            len,
        })
    }
}

/// Writes [`LogEntry`] lines with size-based rotation.
#[derive(Debug)]
pub struct JsonlWriter {
    config: JsonlConfig,
    target: Target,
    live: Option<LiveFile>,
    synced_at: Instant,
}

impl JsonlWriter {
    /// Open the first usable destination. Never fails: with nothing
    /// writable the writer discards.
    pub fn open(config: JsonlConfig) -> Self {
        let mut writer = Self {
            config,
            target: Target::Primary,
            live: None,
            synced_at: Instant::now(),
        };
        writer.settle(Target::Primary);
        writer
    }

    pub fn write_entry(&mut self, entry: &LogEntry) {
        let Ok(mut line) = serde_json::to_string(entry) else {
            return;
        };
        line.push('\n');
        self.append(line.as_bytes());
    }

    pub fn flush(&mut self) {
        if let Some(live) = self.live.as_mut() {
            let _ = live.file.flush();
        }
    }

    pub fn fsync(&mut self) {
        if let Some(live) = &self.live {
            let _ = live.file.sync_data();
        }
        self.synced_at = Instant::now();
    }

    /// `"normal"`, `"fallback"` or `"discard"`.
    pub const fn state(&self) -> &'static str {
        match self.target {
            Target::Primary => "normal",
            Target::Fallback => "fallback",
            Target::Discard => "discard",
        }
    }

    fn append(&mut self, bytes: &[u8]) {
        let len = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        let over = self.live.as_ref().is_some_and(|live| {
            live.len > 0 && live.len.saturating_add(len) > self.config.max_size_bytes
        });
        if over {
            self.rotate();
        }

        loop {
            let Some(live) = self.live.as_mut() else {
                return;
            };
            if live.file.write_all(bytes).is_ok() {
                live.len += len;
                break;
            }
            self.settle(self.target.next());
        }

        if self.synced_at.elapsed() >= Duration::from_secs(self.config.fsync_interval_secs) {
            self.fsync();
        }
    }

    /// Open the first destination at or after `from` that accepts writes.
    fn settle(&mut self, from: Target) {
        self.live = None;
        let chain = [
            (Target::Primary, Some(self.config.path.clone())),
            (Target::Fallback, self.config.fallback_path.clone()),
        ];
        for (target, path) in chain.into_iter().skip_while(|(t, _)| *t != from) {
            if let Some(live) = path.and_then(|p| LiveFile::open(&p).ok()) {
                self.target = target;
                self.live = Some(live);
                return;
            }
        }
        self.target = Target::Discard;
    }

    fn rotate(&mut self) {
        let Some(LiveFile { file, path, .. }) = self.live.take() else {
            return;
        };
        drop(file);
        shift_generations(&path, self.config.max_rotated_files);
        match LiveFile::open(&path) {
            Ok(live) => self.live = Some(live),
            Err(_) => self.settle(self.target.next()),
        }
    }
}

/// Move `log` to `log.1`, `log.1` to `log.2` and so on, dropping the oldest.
fn shift_generations(base: &Path, keep: u32) {
    if keep == 0 {
        let _ = fs::remove_file(base);
        return;
    }
    for index in (1..keep).rev() {
        let _ = fs::rename(generation(base, index), generation(base, index + 1));
    }
    let _ = fs::rename(base, generation(base, 1));
}

fn generation(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}
