//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::acquisition::supervisor::RetryPolicy;
use crate::logger::jsonl::JsonlConfig;
use crate::remote::spiceapi::SpiceApiConfig;

use crate::core::errors::{Result, SegError};

/// Window width used when neither dimension is given.
pub const DEFAULT_WIDTH: u32 = 520;
/// Width-to-height ratio applied when only one dimension is given.
pub const DEFAULT_ASPECT_RATIO: f64 = 5.2;

/// Full iidxseg configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub retry: RetryConfig,
    pub acquisition: AcquisitionConfig,
    pub window: WindowConfig,
    pub ticker: TickerConfig,
    pub time: TimeConfig,
    pub logging: LoggingConfig,
    /// File the config was loaded from, if any. Not part of the TOML model.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RemoteConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub connect_timeout_ms: u64,
    pub io_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Minimum quiet period after a failed connect before the next attempt.
    pub connect_cooldown_secs: u64,
    pub reconnect_on_fetch_failure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub poll_hz: u32,
    pub handoff_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WindowConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub borderless: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    pub frame_hz: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TickerConfig {
    /// Fixed font size; 0 means auto-fit to the surface.
    pub font_size: u32,
    /// Vertical shift in pixels, negative moves up.
    pub offset_y: i32,
    pub max_font_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimeConfig {
    pub clock: bool,
    pub stopwatch: bool,
    pub font_size: u32,
    pub blink_colon: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Activity log destination; `None` disables the activity log.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jsonl_path: Option<PathBuf>,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1337,
            password: String::new(),
            connect_timeout_ms: 2_000,
            io_timeout_ms: 1_000,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            connect_cooldown_secs: 10,
            reconnect_on_fetch_failure: true,
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            poll_hz: 8,
            handoff_capacity: 2,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            borderless: false,
            x: None,
            y: None,
            frame_hz: 8,
        }
    }
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            font_size: 0,
            offset_y: 0,
            max_font_size: 512,
        }
    }
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            clock: false,
            stopwatch: false,
            font_size: 24,
            blink_colon: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            jsonl_path: None,
            max_size_bytes: 8 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        let base = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .filter(|p| p.is_absolute())
            .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("iidxseg").join("config.toml")
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    /// Validation is left to the caller so command-line flags can be layered on first.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| SegError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let mut parsed: Self = toml::from_str(&raw)?;
            parsed.source = Some(path_buf);
            parsed
        } else if is_explicit_path {
            return Err(SegError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.apply_env_overrides_from(env_var)?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over canonical JSON, stable across processes and toolchains.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Effective surface size: both given, one given (5.2:1), or 520×100.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn window_size(&self) -> (u32, u32) {
        match (self.window.width, self.window.height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, (f64::from(w) / DEFAULT_ASPECT_RATIO) as u32),
            (None, Some(h)) => ((f64::from(h) * DEFAULT_ASPECT_RATIO) as u32, h),
            (None, None) => (
                DEFAULT_WIDTH,
                (f64::from(DEFAULT_WIDTH) / DEFAULT_ASPECT_RATIO) as u32,
            ),
        }
    }

    /// Window position hint, only when both coordinates are set.
    #[must_use]
    pub const fn position_hint(&self) -> Option<(i32, i32)> {
        match (self.window.x, self.window.y) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }

    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            connect_cooldown: Duration::from_secs(self.retry.connect_cooldown_secs),
            reconnect_on_fetch_failure: self.retry.reconnect_on_fetch_failure,
        }
    }

    #[must_use]
    pub fn spiceapi(&self) -> SpiceApiConfig {
        SpiceApiConfig {
            host: self.remote.host.clone(),
            port: self.remote.port,
            password: self.remote.password.clone(),
            connect_timeout: Duration::from_millis(self.remote.connect_timeout_ms),
            io_timeout: Duration::from_millis(self.remote.io_timeout_ms),
        }
    }

    /// Activity log settings, `None` when no log file is configured.
    #[must_use]
    pub fn jsonl(&self) -> Option<JsonlConfig> {
        let path = self.logging.jsonl_path.clone()?;
        Some(JsonlConfig {
            path,
            fallback_path: None,
            max_size_bytes: self.logging.max_size_bytes,
            max_rotated_files: self.logging.max_rotated_files,
            ..JsonlConfig::default()
        })
    }

    /// Interval between acquisition polls.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        hz_to_interval(self.acquisition.poll_hz)
    }

    /// Interval between rendered frames.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        hz_to_interval(self.window.frame_hz)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // remote
        if let Some(raw) = lookup("IIDXSEG_REMOTE_HOST") {
            self.remote.host = raw;
        }
        set_env(&mut lookup, "IIDXSEG_REMOTE_PORT", &mut self.remote.port)?;
        if let Some(raw) = lookup("IIDXSEG_REMOTE_PASSWORD") {
            self.remote.password = raw;
        }
        set_env(
            &mut lookup,
            "IIDXSEG_REMOTE_CONNECT_TIMEOUT_MS",
            &mut self.remote.connect_timeout_ms,
        )?;
        set_env(
            &mut lookup,
            "IIDXSEG_REMOTE_IO_TIMEOUT_MS",
            &mut self.remote.io_timeout_ms,
        )?;

        // retry
        set_env(
            &mut lookup,
            "IIDXSEG_RETRY_CONNECT_COOLDOWN_SECS",
            &mut self.retry.connect_cooldown_secs,
        )?;
        set_env(
            &mut lookup,
            "IIDXSEG_RETRY_RECONNECT_ON_FETCH_FAILURE",
            &mut self.retry.reconnect_on_fetch_failure,
        )?;

        // acquisition
        set_env(
            &mut lookup,
            "IIDXSEG_ACQUISITION_POLL_HZ",
            &mut self.acquisition.poll_hz,
        )?;
        set_env(
            &mut lookup,
            "IIDXSEG_ACQUISITION_HANDOFF_CAPACITY",
            &mut self.acquisition.handoff_capacity,
        )?;

        // window
        set_env_opt(&mut lookup, "IIDXSEG_WINDOW_WIDTH", &mut self.window.width)?;
        set_env_opt(&mut lookup, "IIDXSEG_WINDOW_HEIGHT", &mut self.window.height)?;
        set_env_opt(&mut lookup, "IIDXSEG_WINDOW_X", &mut self.window.x)?;
        set_env_opt(&mut lookup, "IIDXSEG_WINDOW_Y", &mut self.window.y)?;
        set_env(
            &mut lookup,
            "IIDXSEG_WINDOW_BORDERLESS",
            &mut self.window.borderless,
        )?;
        set_env(&mut lookup, "IIDXSEG_WINDOW_FRAME_HZ", &mut self.window.frame_hz)?;

        // ticker
        set_env(&mut lookup, "IIDXSEG_TICKER_FONT_SIZE", &mut self.ticker.font_size)?;
        set_env(&mut lookup, "IIDXSEG_TICKER_OFFSET_Y", &mut self.ticker.offset_y)?;

        // time
        set_env(&mut lookup, "IIDXSEG_TIME_CLOCK", &mut self.time.clock)?;
        set_env(&mut lookup, "IIDXSEG_TIME_STOPWATCH", &mut self.time.stopwatch)?;
        set_env(&mut lookup, "IIDXSEG_TIME_FONT_SIZE", &mut self.time.font_size)?;
        set_env(
            &mut lookup,
            "IIDXSEG_TIME_BLINK_COLON",
            &mut self.time.blink_colon,
        )?;

        // logging
        if let Some(raw) = lookup("IIDXSEG_LOG_FILE") {
            self.logging.jsonl_path = Some(PathBuf::from(raw));
        }

        Ok(())
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.remote.host.trim().is_empty() {
            return invalid("remote.host must not be empty");
        }
        if self.remote.port == 0 {
            return invalid("remote.port must be in 1..=65535");
        }
        if self.remote.connect_timeout_ms == 0 || self.remote.io_timeout_ms == 0 {
            return invalid("remote timeouts must be > 0 ms");
        }
        if self.acquisition.poll_hz == 0 {
            return invalid("acquisition.poll_hz must be > 0");
        }
        if self.acquisition.handoff_capacity == 0 {
            return invalid("acquisition.handoff_capacity must be >= 1");
        }
        if self.window.frame_hz == 0 {
            return invalid("window.frame_hz must be > 0");
        }
        let (width, height) = self.window_size();
        if width == 0 || height == 0 {
            return Err(SegError::InvalidConfig {
                details: format!("window size must be non-zero, got {width}x{height}"),
            });
        }
        if self.ticker.max_font_size < 8 {
            return invalid("ticker.max_font_size must be >= 8");
        }
        if self.ticker.font_size > self.ticker.max_font_size {
            return Err(SegError::InvalidConfig {
                details: format!(
                    "ticker.font_size ({}) exceeds ticker.max_font_size ({})",
                    self.ticker.font_size, self.ticker.max_font_size
                ),
            });
        }
        if self.time.font_size == 0 {
            return invalid("time.font_size must be > 0");
        }
        if self.logging.max_size_bytes == 0 {
            return invalid("logging.max_size_bytes must be > 0");
        }
        Ok(())
    }
}

fn hz_to_interval(hz: u32) -> Duration {
    Duration::from_secs(1) / hz.max(1)
}

fn invalid(details: &str) -> Result<()> {
    Err(SegError::InvalidConfig {
        details: details.to_string(),
    })
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| SegError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}

fn set_env<F, T>(lookup: &mut F, name: &str, slot: &mut T) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(name) {
        *slot = parse_env(name, &raw)?;
    }
    Ok(())
}

fn set_env_opt<F, T>(lookup: &mut F, name: &str, slot: &mut Option<T>) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(name) {
        *slot = Some(parse_env(name, &raw)?);
    }
    Ok(())
}
