//! SEG-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SegError>;

/// Top-level error type for the segment display.
#[derive(Debug, Error)]
pub enum SegError {
    #[error("[SEG-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[SEG-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[SEG-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[SEG-2001] connect to {endpoint} failed: {details}")]
    Connect { endpoint: String, details: String },

    #[error("[SEG-2002] ticker fetch failed: {details}")]
    Fetch { details: String },

    #[error("[SEG-2003] protocol violation: {details}")]
    Protocol { details: String },

    #[error("[SEG-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[SEG-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[SEG-3002] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[SEG-3900] runtime failure: {details}")]
    Runtime { details: String },

    #[error("[SEG-4001] render backend failure in {context}: {details}")]
    Render {
        context: &'static str,
        details: String,
    },

    #[error("[SEG-4002] font unavailable: {details}")]
    Font { details: String },
}

impl SegError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "SEG-1001",
            Self::MissingConfig { .. } => "SEG-1002",
            Self::ConfigParse { .. } => "SEG-1003",
            Self::Connect { .. } => "SEG-2001",
            Self::Fetch { .. } => "SEG-2002",
            Self::Protocol { .. } => "SEG-2003",
            Self::Serialization { .. } => "SEG-2101",
            Self::Io { .. } => "SEG-3001",
            Self::ChannelClosed { .. } => "SEG-3002",
            Self::Runtime { .. } => "SEG-3900",
            Self::Render { .. } => "SEG-4001",
            Self::Font { .. } => "SEG-4002",
        }
    }

    /// Whether retrying might resolve the failure.
    ///
    /// Everything that comes from the remote cabinet is retryable; rendering
    /// and configuration failures are not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. }
                | Self::Fetch { .. }
                | Self::Protocol { .. }
                | Self::Io { .. }
                | Self::ChannelClosed { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for terminal/window backend failures.
    #[must_use]
    pub fn render(context: &'static str, source: &std::io::Error) -> Self {
        Self::Render {
            context,
            details: source.to_string(),
        }
    }
}

impl From<serde_json::Error> for SegError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SegError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
