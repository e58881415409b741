//! Remote cabinet capability: connect, fetch raw ticker text, reconnect.
//!
//! The acquisition pipeline only sees these two traits. Every call may fail;
//! callers treat a failure as "no data this tick" and never escalate it.

pub mod rc4;
pub mod scripted;
pub mod spiceapi;

use crate::core::errors::Result;

/// Factory for connections to the cabinet's control endpoint.
pub trait TickerConnector: Send {
    /// Live connection type produced by [`TickerConnector::connect`].
    type Connection: TickerConnection;

    /// Open a new connection. Bounded by the connector's connect timeout.
    fn connect(&mut self) -> Result<Self::Connection>;

    /// Human-readable endpoint for logs (`host:port`).
    fn endpoint(&self) -> String;
}

/// An established connection.
pub trait TickerConnection: Send {
    /// Ask the cabinet for its current raw ticker text.
    fn fetch_ticker_text(&mut self) -> Result<String>;

    /// Re-establish the transport in place after a failure.
    fn reconnect(&mut self) -> Result<()>;
}
