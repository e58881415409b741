//! Process-level runtime concerns.

pub mod signals;
