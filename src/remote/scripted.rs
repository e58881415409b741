//! In-memory cabinet whose availability and ticker text are driven by a
//! [`ScriptHandle`]. Used by tests and by `--demo` runs.

#![allow(missing_docs)]

use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::errors::{Result, SegError};
use crate::remote::{TickerConnection, TickerConnector};

#[derive(Debug, Default)]
struct Script {
    reachable: bool,
    ticker: String,
    failing_fetches: u32,
    connects: u32,
    fetches: u32,
    reconnects: u32,
}

/// Control side of a scripted cabinet. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ScriptHandle {
    shared: Arc<Mutex<Script>>,
}

impl ScriptHandle {
    pub fn set_reachable(&self, reachable: bool) {
        self.shared.lock().reachable = reachable;
    }

    pub fn set_ticker(&self, text: impl Into<String>) {
        self.shared.lock().ticker = text.into();
    }

    /// Make the next `n` fetches fail even though the cabinet is reachable.
    pub fn fail_next_fetches(&self, n: u32) {
        self.shared.lock().failing_fetches = n;
    }

    /// Connect attempts seen so far (successful or not).
    pub fn connect_attempts(&self) -> u32 {
        self.shared.lock().connects
    }

    pub fn fetch_attempts(&self) -> u32 {
        self.shared.lock().fetches
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.lock().reconnects
    }
}

/// Connector half of a scripted cabinet.
#[derive(Debug)]
pub struct ScriptedConnector {
    shared: Arc<Mutex<Script>>,
}

impl ScriptedConnector {
    /// A reachable cabinet showing `ticker`.
    pub fn online(ticker: impl Into<String>) -> (Self, ScriptHandle) {
        Self::with_script(Script {
            reachable: true,
            ticker: ticker.into(),
            ..Script::default()
        })
    }

    /// A cabinet that refuses every connection until told otherwise.
    pub fn unreachable() -> (Self, ScriptHandle) {
        Self::with_script(Script::default())
    }

    fn with_script(script: Script) -> (Self, ScriptHandle) {
        let shared = Arc::new(Mutex::new(script));
        (
            Self {
                shared: Arc::clone(&shared),
            },
            ScriptHandle { shared },
        )
    }
}

impl TickerConnector for ScriptedConnector {
    type Connection = ScriptedConnection;

    fn connect(&mut self) -> Result<Self::Connection> {
        let mut script = self.shared.lock();
        script.connects += 1;
        if !script.reachable {
            return Err(SegError::Connect {
                endpoint: self.endpoint(),
                details: "cabinet unreachable".to_string(),
            });
        }
        Ok(ScriptedConnection {
            shared: Arc::clone(&self.shared),
        })
    }

    fn endpoint(&self) -> String {
        "scripted:0".to_string()
    }
}

#[derive(Debug)]
pub struct ScriptedConnection {
    shared: Arc<Mutex<Script>>,
}

impl TickerConnection for ScriptedConnection {
    fn fetch_ticker_text(&mut self) -> Result<String> {
        let mut script = self.shared.lock();
        script.fetches += 1;
        if !script.reachable {
            return Err(SegError::Fetch {
                details: "connection reset".to_string(),
            });
        }
        if script.failing_fetches > 0 {
            script.failing_fetches -= 1;
            return Err(SegError::Fetch {
                details: "scripted fetch failure".to_string(),
            });
        }
        Ok(script.ticker.clone())
    }

    fn reconnect(&mut self) -> Result<()> {
        let mut script = self.shared.lock();
        script.reconnects += 1;
        if script.reachable {
            Ok(())
        } else {
            Err(SegError::Connect {
                endpoint: "scripted:0".to_string(),
                details: "cabinet unreachable".to_string(),
            })
        }
    }
}
