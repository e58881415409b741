//! Activity logger: a dedicated thread owns the `JsonlWriter`.
//!
//! The acquisition worker and the display loop send `ActivityEvent`s over a
//! bounded crossbeam channel. `try_send()` never blocks, so a slow disk can
//! only cost log lines, never frames or polls.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::errors::{Result, SegError};
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

// ──────────────────── channel capacity ────────────────────

/// Default bounded channel capacity for log events.
const CHANNEL_CAPACITY: usize = 256;

// ──────────────────── public event type ────────────────────

/// Events the display pipeline reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityEvent {
    DisplayStarted {
        version: String,
        config_hash: String,
    },
    DisplayStopped {
        reason: String,
        frames: u64,
    },
    WorkerStarted {
        endpoint: String,
    },
    WorkerStopped {
        polls: u64,
    },
    ConnectAttempt {
        endpoint: String,
    },
    Connected {
        endpoint: String,
    },
    ConnectFailed {
        endpoint: String,
        error_code: String,
        error_message: String,
        failures: u64,
    },
    FetchFailed {
        error_code: String,
        error_message: String,
    },
    Reconnected {
        endpoint: String,
    },
    ReconnectFailed {
        endpoint: String,
        error_code: String,
        error_message: String,
    },
    SurfaceResized {
        width: u32,
        height: u32,
    },
    RenderFailed {
        error_code: String,
        error_message: String,
    },
    Error {
        code: String,
        message: String,
    },
    /// Sentinel to request graceful shutdown of the logger thread.
    Shutdown,
}

// ──────────────────── public handle ────────────────────

/// Thread-safe, cheaply-cloneable handle for sending log events.
///
/// A disabled handle (no log file configured) accepts and ignores every event,
/// so callers never branch on whether logging is on.
#[derive(Debug, Clone)]
pub struct ActivityLoggerHandle {
    tx: Option<Sender<ActivityEvent>>,
    dropped_events: Arc<AtomicU64>,
}

impl ActivityLoggerHandle {
    /// A handle that discards everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            tx: None,
            dropped_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether events reach a logger thread.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Send an event to the logger thread. Non-blocking.
    ///
    /// If the channel is full the event is dropped and the dropped-events
    /// counter is incremented.
    pub fn send(&self, event: ActivityEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(TrySendError::Full(_)) = tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
        // Disconnected is fine during shutdown.
    }

    /// Number of events dropped due to channel back-pressure and not yet
    /// reported in the log.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Ask the logger thread to flush and exit.
    pub fn shutdown(&self) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(ActivityEvent::Shutdown);
        }
    }
}

// ──────────────────── spawn ────────────────────

/// Spawn the logger thread and return a handle.
///
/// With `None` no thread is started and a disabled handle is returned.
pub fn spawn_logger(
    config: Option<JsonlConfig>,
) -> Result<(ActivityLoggerHandle, Option<thread::JoinHandle<()>>)> {
    let Some(config) = config else {
        return Ok((ActivityLoggerHandle::disabled(), None));
    };

    let (tx, rx) = bounded::<ActivityEvent>(CHANNEL_CAPACITY);
    let dropped = Arc::new(AtomicU64::new(0));
    let dropped_clone = Arc::clone(&dropped);

    let handle = ActivityLoggerHandle {
        tx: Some(tx),
        dropped_events: dropped,
    };

    let join = thread::Builder::new()
        .name("iidxseg-logger".to_string())
        .spawn(move || logger_thread_main(rx, config, dropped_clone))
        .map_err(|e| SegError::Runtime {
            details: format!("failed to spawn logger thread: {e}"),
        })?;

    Ok((handle, Some(join)))
}

// ──────────────────── logger thread ────────────────────

#[allow(clippy::needless_pass_by_value)]
fn logger_thread_main(rx: Receiver<ActivityEvent>, config: JsonlConfig, dropped: Arc<AtomicU64>) {
    let mut jsonl = JsonlWriter::open(config);

    while let Ok(event) = rx.recv() {
        let d = dropped.swap(0, Ordering::Relaxed);
        if d > 0 {
            let mut warn = LogEntry::new(EventType::Error, Severity::Warning);
            warn.details = Some(format!("{d} log events dropped due to back-pressure"));
            jsonl.write_entry(&warn);
        }

        if matches!(event, ActivityEvent::Shutdown) {
            break;
        }
        jsonl.write_entry(&event_to_log_entry(&event));
    }

    jsonl.flush();
    jsonl.fsync();
}

// ──────────────────── event conversion ────────────────────

fn failure(event: EventType, code: &str, message: &str) -> LogEntry {
    let mut e = LogEntry::new(event, Severity::Warning);
    e.ok = Some(false);
    e.error_code = Some(code.to_string());
    e.error_message = Some(message.to_string());
    e
}

pub(crate) fn event_to_log_entry(event: &ActivityEvent) -> LogEntry {
    match event {
        ActivityEvent::DisplayStarted {
            version,
            config_hash,
        } => {
            let mut e = LogEntry::new(EventType::DisplayStart, Severity::Info);
            e.details = Some(format!("version={version} config_hash={config_hash}"));
            e.ok = Some(true);
            e
        }
        ActivityEvent::DisplayStopped { reason, frames } => {
            let mut e = LogEntry::new(EventType::DisplayStop, Severity::Info);
            e.details = Some(format!("reason={reason} frames={frames}"));
            e.ok = Some(true);
            e
        }
        ActivityEvent::WorkerStarted { endpoint } => {
            let mut e = LogEntry::new(EventType::WorkerStart, Severity::Info);
            e.endpoint = Some(endpoint.clone());
            e
        }
        ActivityEvent::WorkerStopped { polls } => {
            let mut e = LogEntry::new(EventType::WorkerStop, Severity::Info);
            e.details = Some(format!("polls={polls}"));
            e
        }
        ActivityEvent::ConnectAttempt { endpoint } => {
            let mut e = LogEntry::new(EventType::ConnectAttempt, Severity::Info);
            e.endpoint = Some(endpoint.clone());
            e
        }
        ActivityEvent::Connected { endpoint } => {
            let mut e = LogEntry::new(EventType::Connected, Severity::Info);
            e.endpoint = Some(endpoint.clone());
            e.ok = Some(true);
            e
        }
        ActivityEvent::ConnectFailed {
            endpoint,
            error_code,
            error_message,
            failures,
        } => {
            let mut e = failure(EventType::ConnectFailed, error_code, error_message);
            e.endpoint = Some(endpoint.clone());
            e.failures = Some(*failures);
            e
        }
        ActivityEvent::FetchFailed {
            error_code,
            error_message,
        } => failure(EventType::FetchFailed, error_code, error_message),
        ActivityEvent::Reconnected { endpoint } => {
            let mut e = LogEntry::new(EventType::Reconnected, Severity::Info);
            e.endpoint = Some(endpoint.clone());
            e.ok = Some(true);
            e
        }
        ActivityEvent::ReconnectFailed {
            endpoint,
            error_code,
            error_message,
        } => {
            let mut e = failure(EventType::ReconnectFailed, error_code, error_message);
            e.endpoint = Some(endpoint.clone());
            e
        }
        ActivityEvent::SurfaceResized { width, height } => {
            let mut e = LogEntry::new(EventType::SurfaceResized, Severity::Info);
            e.width = Some(*width);
            e.height = Some(*height);
            e
        }
        ActivityEvent::RenderFailed {
            error_code,
            error_message,
        } => failure(EventType::RenderFailed, error_code, error_message),
        ActivityEvent::Error { code, message } => {
            let mut e = LogEntry::new(EventType::Error, Severity::Critical);
            e.error_code = Some(code.clone());
            e.error_message = Some(message.clone());
            e.ok = Some(false);
            e
        }
        ActivityEvent::Shutdown => LogEntry::new(EventType::DisplayStop, Severity::Info),
    }
}

// ──────────────────── tests ────────────────────
