//! Segment display: drawing backends, widgets and the foreground loop.

pub mod backend;
pub mod loop_main;
pub mod recording;
#[cfg(feature = "terminal")]
pub mod terminal;
pub mod theme;
pub mod widgets;
