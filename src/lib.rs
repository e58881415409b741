#![forbid(unsafe_code)]

//! iidxseg: segment-display mirror for an arcade cabinet's ticker.
//!
//! A background worker polls the cabinet's control endpoint, decodes the raw
//! ticker into the glyph set of a 14-segment display font, and hands the
//! result to the foreground display loop through a small overwrite-oldest
//! buffer. The display always has something sensible to show: fresh text,
//! the last good text, or the "connecting" placeholder.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use iidxseg::prelude::*;
//!
//! let config = Config::default();
//! let connector = SpiceApiConnector::new(config.spiceapi());
//! let mut display = DisplayLoop::start(
//!     RecordingBackend::new(),
//!     &config,
//!     connector,
//!     ActivityLoggerHandle::disabled(),
//!     SignalHandler::unregistered(),
//! )?;
//! display.run(Some(80))?;
//! # Ok::<(), SegError>(())
//! ```

pub mod prelude;

pub mod acquisition;
pub mod core;
pub mod display;
pub mod logger;
pub mod remote;
pub mod runtime;
pub mod ticker;
