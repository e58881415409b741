//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use iidxseg::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, SegError};

// Ticker
pub use crate::ticker::decoder::decode;
pub use crate::ticker::glyphs::{ALL_OFF, ALL_ON, CONNECTING_TEXT, DisplayText};

// Remote
pub use crate::remote::scripted::{ScriptHandle, ScriptedConnector};
pub use crate::remote::spiceapi::{SpiceApiConfig, SpiceApiConnector};
pub use crate::remote::{TickerConnection, TickerConnector};

// Acquisition
pub use crate::acquisition::handoff::{HandoffReceiver, HandoffSender, PushOutcome, Stamped};
pub use crate::acquisition::supervisor::{ConnectionState, ConnectionSupervisor, RetryPolicy};
pub use crate::acquisition::worker::{AcquisitionWorker, StopOutcome, WorkerHandle};

// Display
pub use crate::display::backend::{DisplayEvent, RenderBackend, Rgb, SurfaceSize, TextMetrics};
pub use crate::display::loop_main::{DisplayLoop, LastKnownText, StopReason};
pub use crate::display::recording::RecordingBackend;
#[cfg(feature = "terminal")]
pub use crate::display::terminal::TerminalBackend;
pub use crate::display::theme::Theme;

// Logging and runtime
pub use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle, spawn_logger};
pub use crate::runtime::signals::SignalHandler;
