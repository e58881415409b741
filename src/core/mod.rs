//! Core types: errors, configuration, loop pacing.

pub mod config;
pub mod errors;
pub mod pacer;
