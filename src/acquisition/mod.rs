//! Background acquisition: connection supervision, polling, and the bounded
//! hand-off to the display loop.

pub mod handoff;
pub mod supervisor;
pub mod worker;
