//! Activity logging: a background thread appending JSONL with graceful degradation.

pub mod activity;
pub mod jsonl;
