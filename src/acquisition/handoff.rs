//! Bounded single-producer/single-consumer hand-off with overwrite-oldest.
//!
//! Built on a bounded crossbeam channel. The sender keeps a clone of the
//! receiving end so that, when the buffer is full, it can evict the oldest
//! unread value itself instead of blocking. Neither side ever waits.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};

/// A value together with its position in the producer's sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamped<T> {
    /// Monotonically increasing, starting at 0.
    pub seq: u64,
    pub produced_at: Instant,
    pub value: T,
}

/// What happened to a pushed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Stored without displacing anything.
    Stored,
    /// Stored after discarding the oldest unread value.
    Overwrote,
    /// The consumer is gone; the value was dropped.
    Disconnected,
}

#[derive(Debug)]
struct Shared {
    receiver_alive: AtomicBool,
    overwritten: AtomicU64,
}

/// Create a hand-off of the given capacity (clamped to at least 1).
#[must_use]
pub fn channel<T>(capacity: usize) -> (HandoffSender<T>, HandoffReceiver<T>) {
    let capacity = capacity.max(1);
    let (tx, rx) = bounded(capacity);
    let shared = Arc::new(Shared {
        receiver_alive: AtomicBool::new(true),
        overwritten: AtomicU64::new(0),
    });
    (
        HandoffSender {
            tx,
            evict: rx.clone(),
            shared: Arc::clone(&shared),
            next_seq: 0,
            capacity,
        },
        HandoffReceiver {
            rx,
            shared,
            last_seq: None,
        },
    )
}

/// Producer end. Owned by the acquisition worker.
#[derive(Debug)]
pub struct HandoffSender<T> {
    tx: Sender<Stamped<T>>,
    evict: Receiver<Stamped<T>>,
    shared: Arc<Shared>,
    next_seq: u64,
    capacity: usize,
}

impl<T> HandoffSender<T> {
    /// Store `value`, discarding the oldest unread value when full. Never blocks.
    pub fn push(&mut self, value: T) -> PushOutcome {
        if !self.shared.receiver_alive.load(Ordering::Acquire) {
            return PushOutcome::Disconnected;
        }

        let mut item = Stamped {
            seq: self.next_seq,
            produced_at: Instant::now(),
            value,
        };
        self.next_seq += 1;

        let mut overwrote = false;
        loop {
            match self.tx.try_send(item) {
                Ok(()) => {
                    return if overwrote {
                        PushOutcome::Overwrote
                    } else {
                        PushOutcome::Stored
                    };
                }
                Err(TrySendError::Full(back)) => {
                    item = back;
                    // The consumer may have drained in between; then there is
                    // nothing to evict and the retry simply succeeds.
                    if self.evict.try_recv().is_ok() && !overwrote {
                        overwrote = true;
                        self.shared.overwritten.fetch_add(1, Ordering::Relaxed);
                    }
                }
                Err(TrySendError::Disconnected(_)) => return PushOutcome::Disconnected,
            }
        }
    }

    /// Whether the consumer still exists.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.shared.receiver_alive.load(Ordering::Acquire)
    }

    /// Values discarded unread so far.
    #[must_use]
    pub fn overwritten(&self) -> u64 {
        self.shared.overwritten.load(Ordering::Relaxed)
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of values pushed so far.
    #[must_use]
    pub const fn pushed(&self) -> u64 {
        self.next_seq
    }
}

/// Consumer end. Owned by the display loop.
#[derive(Debug)]
pub struct HandoffReceiver<T> {
    rx: Receiver<Stamped<T>>,
    shared: Arc<Shared>,
    last_seq: Option<u64>,
}

impl<T> HandoffReceiver<T> {
    /// Pop the oldest pending value, if any. Never blocks.
    pub fn try_pop(&mut self) -> Option<Stamped<T>> {
        match self.rx.try_recv() {
            Ok(item) => {
                debug_assert!(self.last_seq.is_none_or(|last| item.seq > last));
                self.last_seq = Some(item.seq);
                Some(item)
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Pop everything pending and return the newest value.
    pub fn drain_latest(&mut self) -> Option<Stamped<T>> {
        let mut latest = None;
        while let Some(item) = self.try_pop() {
            latest = Some(item);
        }
        latest
    }

    /// Values currently waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Values the producer discarded unread so far.
    #[must_use]
    pub fn overwritten(&self) -> u64 {
        self.shared.overwritten.load(Ordering::Relaxed)
    }

    /// Sequence number of the last value handed out.
    #[must_use]
    pub const fn last_seq(&self) -> Option<u64> {
        self.last_seq
    }
}

impl<T> Drop for HandoffReceiver<T> {
    fn drop(&mut self) {
        self.shared.receiver_alive.store(false, Ordering::Release);
    }
}
