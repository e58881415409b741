//! Connection lifecycle: connect with cool-down, fetch, reconnect after a fault.
//!
//! ```text
//! Disconnected --connect ok-----> Connected
//! Disconnected --connect fails--> Disconnected (failure time recorded)
//! Connected ----fetch fails-----> Faulted --reconnect ok--> Connected
//!                                         --reconnect fails--> Faulted
//! ```
//!
//! A failed reconnect keeps the connection and records no failure time, so
//! the next tick fetches and reconnects again without waiting for a cool-down.
//!
//! Nothing here returns an error to the caller. Remote failures become state
//! transitions, counters and activity-log events.

#![allow(missing_docs)]

use std::time::{Duration, Instant};

use crate::core::errors::SegError;
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};
use crate::remote::{TickerConnection, TickerConnector};

/// How the supervisor reacts to failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// A new connect is attempted only once strictly more than this has
    /// passed since the last failure.
    pub connect_cooldown: Duration,
    /// Reconnect in place after a failed fetch. When off, the connection is
    /// dropped and the next tick opens a fresh one.
    pub reconnect_on_fetch_failure: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            connect_cooldown: Duration::from_secs(10),
            reconnect_on_fetch_failure: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// A connect call is in flight.
    Connecting,
    Connected,
    /// Connected, but the last fetch failed and a reconnect is pending.
    Faulted,
}

/// Counters for status output and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupervisorStats {
    pub connect_attempts: u64,
    pub connect_failures: u64,
    pub fetches: u64,
    pub fetch_failures: u64,
    pub reconnects: u64,
    pub reconnect_failures: u64,
    /// Failures since the last successful connect or fetch.
    pub consecutive_failures: u64,
}

pub struct ConnectionSupervisor<C: TickerConnector> {
    connector: C,
    connection: Option<C::Connection>,
    state: ConnectionState,
    policy: RetryPolicy,
    last_failure: Option<Instant>,
    stats: SupervisorStats,
    logger: ActivityLoggerHandle,
}

impl<C: TickerConnector> ConnectionSupervisor<C> {
    #[must_use]
    pub fn new(connector: C, policy: RetryPolicy, logger: ActivityLoggerHandle) -> Self {
        Self {
            connector,
            connection: None,
            state: ConnectionState::Disconnected,
            policy,
            last_failure: None,
            stats: SupervisorStats::default(),
            logger,
        }
    }

    /// Make sure a connection exists, connecting if the cool-down allows.
    ///
    /// Returns whether a connection is available afterwards. The first
    /// attempt is immediate.
    pub fn ensure_connected(&mut self, now: Instant) -> bool {
        if self.connection.is_some() {
            return true;
        }
        if !self.cooldown_elapsed(now) {
            return false;
        }

        let endpoint = self.connector.endpoint();
        self.state = ConnectionState::Connecting;
        self.stats.connect_attempts += 1;
        self.logger.send(ActivityEvent::ConnectAttempt {
            endpoint: endpoint.clone(),
        });

        match self.connector.connect() {
            Ok(conn) => {
                self.connection = Some(conn);
                self.state = ConnectionState::Connected;
                self.last_failure = None;
                self.stats.consecutive_failures = 0;
                self.logger.send(ActivityEvent::Connected { endpoint });
                true
            }
            Err(err) => {
                self.state = ConnectionState::Disconnected;
                self.last_failure = Some(now);
                self.stats.connect_failures += 1;
                self.stats.consecutive_failures += 1;
                self.logger.send(ActivityEvent::ConnectFailed {
                    endpoint,
                    error_code: err.code().to_string(),
                    error_message: err.to_string(),
                    failures: self.stats.consecutive_failures,
                });
                false
            }
        }
    }

    /// Fetch raw ticker text over the current connection. No retry.
    ///
    /// `None` when there is no connection or the fetch failed; a failure
    /// leaves the supervisor `Faulted` (or `Disconnected`, per policy).
    pub fn fetch(&mut self) -> Option<String> {
        let conn = self.connection.as_mut()?;
        self.stats.fetches += 1;
        match conn.fetch_ticker_text() {
            Ok(raw) => {
                self.state = ConnectionState::Connected;
                self.stats.consecutive_failures = 0;
                Some(raw)
            }
            Err(err) => {
                self.stats.fetch_failures += 1;
                self.stats.consecutive_failures += 1;
                self.log_fetch_failure(&err);
                if self.policy.reconnect_on_fetch_failure {
                    self.state = ConnectionState::Faulted;
                } else {
                    self.connection = None;
                    self.state = ConnectionState::Disconnected;
                }
                None
            }
        }
    }

    /// One reconnect attempt if the last fetch failed. Failures are swallowed
    /// and leave the supervisor `Faulted` for the next tick to retry.
    pub fn reconnect_if_needed(&mut self) {
        if self.state != ConnectionState::Faulted {
            return;
        }
        let Some(conn) = self.connection.as_mut() else {
            self.state = ConnectionState::Disconnected;
            return;
        };

        let endpoint = self.connector.endpoint();
        self.stats.reconnects += 1;
        match conn.reconnect() {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                self.logger.send(ActivityEvent::Reconnected { endpoint });
            }
            Err(err) => {
                self.state = ConnectionState::Faulted;
                self.stats.reconnect_failures += 1;
                self.logger.send(ActivityEvent::ReconnectFailed {
                    endpoint,
                    error_code: err.code().to_string(),
                    error_message: err.to_string(),
                });
            }
        }
    }

    /// Drop the connection, if any.
    pub fn disconnect(&mut self) {
        self.connection = None;
        self.state = ConnectionState::Disconnected;
    }

    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    #[must_use]
    pub const fn stats(&self) -> SupervisorStats {
        self.stats
    }

    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    #[must_use]
    pub fn endpoint(&self) -> String {
        self.connector.endpoint()
    }

    pub(crate) fn logger(&self) -> &ActivityLoggerHandle {
        &self.logger
    }

    fn cooldown_elapsed(&self, now: Instant) -> bool {
        self.last_failure.is_none_or(|failed_at| {
            now.saturating_duration_since(failed_at) > self.policy.connect_cooldown
        })
    }

    fn log_fetch_failure(&self, err: &SegError) {
        self.logger.send(ActivityEvent::FetchFailed {
            error_code: err.code().to_string(),
            error_message: err.to_string(),
        });
    }
}
