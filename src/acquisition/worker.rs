//! Acquisition worker: poll the cabinet at a fixed rate, decode, hand off.
//!
//! Every tick publishes exactly one value. When the cabinet cannot be reached
//! that value is the "connecting" placeholder, so the display never has to
//! guess whether the feed is alive.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::acquisition::handoff::{HandoffSender, PushOutcome};
use crate::acquisition::supervisor::{ConnectionSupervisor, SupervisorStats};
use crate::core::errors::{Result, SegError};
use crate::core::pacer::Pacer;
use crate::logger::activity::ActivityEvent;
use crate::remote::TickerConnector;
use crate::ticker::decoder::decode;
use crate::ticker::glyphs::DisplayText;

/// Summary returned when the worker thread exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub polls: u64,
    pub stats: SupervisorStats,
}

pub struct AcquisitionWorker<C: TickerConnector> {
    supervisor: ConnectionSupervisor<C>,
    sender: HandoffSender<DisplayText>,
    polls: u64,
}

impl<C: TickerConnector> AcquisitionWorker<C> {
    #[must_use]
    pub const fn new(
        supervisor: ConnectionSupervisor<C>,
        sender: HandoffSender<DisplayText>,
    ) -> Self {
        Self {
            supervisor,
            sender,
            polls: 0,
        }
    }

    /// Run one poll: connect if allowed, fetch, decode, publish.
    pub fn tick(&mut self, now: Instant) -> PushOutcome {
        let mut value = DisplayText::connecting();
        if self.supervisor.ensure_connected(now) {
            match self.supervisor.fetch() {
                Some(raw) => value = decode(&raw),
                None => self.supervisor.reconnect_if_needed(),
            }
        }
        self.polls += 1;
        self.sender.push(value)
    }

    #[must_use]
    pub const fn supervisor(&self) -> &ConnectionSupervisor<C> {
        &self.supervisor
    }

    #[must_use]
    pub const fn polls(&self) -> u64 {
        self.polls
    }

    /// Loop until `stop` is set, checking it at every tick boundary.
    pub fn run(&mut self, stop: &AtomicBool, interval: Duration) {
        let mut pacer = Pacer::new(interval, Instant::now());
        while !stop.load(Ordering::Relaxed) {
            // A vanished consumer is not an error; keep going until told to stop.
            let _ = self.tick(Instant::now());
            pacer.wait();
        }
    }

    fn report(&self) -> WorkerReport {
        WorkerReport {
            polls: self.polls,
            stats: self.supervisor.stats(),
        }
    }
}

impl<C> AcquisitionWorker<C>
where
    C: TickerConnector + 'static,
{
    /// Move the worker onto its own named thread.
    pub fn spawn(mut self, interval: Duration) -> Result<WorkerHandle> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let join = thread::Builder::new()
            .name("iidxseg-acquire".to_string())
            .spawn(move || {
                let logger = self.supervisor.logger().clone();
                logger.send(ActivityEvent::WorkerStarted {
                    endpoint: self.supervisor.endpoint(),
                });
                self.run(&stop_flag, interval);
                logger.send(ActivityEvent::WorkerStopped { polls: self.polls });
                self.report()
            })
            .map_err(|source| SegError::Runtime {
                details: format!("failed to spawn acquisition thread: {source}"),
            })?;

        Ok(WorkerHandle {
            stop,
            join: Some(join),
        })
    }
}

/// How a stopped worker ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The thread had exited and was joined.
    Joined(WorkerReport),
    /// The thread was still inside a remote call and was left to finish alone.
    Detached,
    /// `stop` had already been called.
    AlreadyStopped,
}

/// Owner's side of a running worker.
#[derive(Debug)]
pub struct WorkerHandle {
    stop: Arc<AtomicBool>,
    join: Option<thread::JoinHandle<WorkerReport>>,
}

impl WorkerHandle {
    /// Set the stop flag without waiting.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Set the stop flag, then join for at most `grace`; detach otherwise.
    pub fn stop(&mut self, grace: Duration) -> StopOutcome {
        self.request_stop();
        let Some(join) = self.join.take() else {
            return StopOutcome::AlreadyStopped;
        };

        let deadline = Instant::now() + grace;
        while !join.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        if !join.is_finished() {
            return StopOutcome::Detached;
        }
        match join.join() {
            Ok(report) => StopOutcome::Joined(report),
            Err(_) => StopOutcome::Detached,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.request_stop();
    }
}
