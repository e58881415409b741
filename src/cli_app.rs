//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use colored::{Colorize, control};
use thiserror::Error;

use iidxseg::core::config::Config;
use iidxseg::core::errors::SegError;
use iidxseg::display::loop_main::{DisplayLoop, StopReason};
use iidxseg::display::recording::RecordingBackend;
use iidxseg::display::terminal::TerminalBackend;
use iidxseg::display::theme::Theme;
use iidxseg::logger::activity::{ActivityEvent, ActivityLoggerHandle, spawn_logger};
use iidxseg::remote::TickerConnector;
use iidxseg::remote::scripted::{ScriptHandle, ScriptedConnector};
use iidxseg::remote::spiceapi::SpiceApiConnector;
use iidxseg::runtime::signals::SignalHandler;

/// IIDXSEG: mirrors the cabinet's segment ticker, with optional clock and stopwatch.
#[derive(Debug, Parser)]
#[command(
    name = "iidxseg",
    author,
    version,
    about = "IIDXSEG - segment display mirror for the cabinet ticker",
    long_about = None
)]
pub struct Cli {
    /// Cabinet host name or address (overrides config).
    host: Option<String>,
    /// Control endpoint port (overrides config).
    port: Option<u16>,
    /// Control endpoint password (overrides config).
    password: Option<String>,
    /// Width of the window.
    #[arg(long, value_name = "PIXELS")]
    width: Option<u32>,
    /// Height of the window.
    #[arg(long, value_name = "PIXELS")]
    height: Option<u32>,
    /// Remove window border and title bar.
    #[arg(long)]
    borderless: bool,
    /// Desired x-coordinate for the window position.
    #[arg(long, allow_negative_numbers = true)]
    x: Option<i32>,
    /// Desired y-coordinate for the window position.
    #[arg(long, allow_negative_numbers = true)]
    y: Option<i32>,
    /// Preferred ticker font size. When omitted, the ticker fills the window.
    #[arg(long, alias = "font_size", value_name = "SIZE")]
    font_size: Option<u32>,
    /// Shift the ticker up (negative) or down (positive), in pixels.
    #[arg(long, allow_negative_numbers = true, value_name = "PIXELS")]
    offset: Option<i32>,
    /// Show the wall clock.
    #[arg(long)]
    clock: bool,
    /// Show the stopwatch.
    #[arg(long)]
    timer: bool,
    /// Font size for the wall clock and the stopwatch.
    #[arg(long, alias = "time_font_size", value_name = "SIZE")]
    time_font_size: Option<u32>,
    /// Blink the clock colon once per second.
    #[arg(long)]
    blink_colon: bool,
    /// Override config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Append structured activity events (JSONL) to this file.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
    /// Feed the display from a built-in simulated cabinet.
    #[arg(long)]
    demo: bool,
    /// Print each frame's lit text to stdout instead of drawing in the terminal.
    #[arg(long)]
    headless: bool,
    /// Stop after this many frames.
    #[arg(long, value_name = "N")]
    frames: Option<u64>,
    /// Disable colored output.
    #[arg(long)]
    no_color: bool,
}

impl Cli {
    /// Layer command-line values over the loaded config. Switches only ever
    /// turn features on.
    fn apply_to(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.remote.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.remote.port = port;
        }
        if let Some(password) = &self.password {
            config.remote.password.clone_from(password);
        }
        if self.width.is_some() {
            config.window.width = self.width;
        }
        if self.height.is_some() {
            config.window.height = self.height;
        }
        if self.x.is_some() {
            config.window.x = self.x;
        }
        if self.y.is_some() {
            config.window.y = self.y;
        }
        config.window.borderless |= self.borderless;
        if let Some(size) = self.font_size {
            config.ticker.font_size = size;
        }
        if let Some(offset) = self.offset {
            config.ticker.offset_y = offset;
        }
        config.time.clock |= self.clock;
        config.time.stopwatch |= self.timer;
        config.time.blink_colon |= self.blink_colon;
        if let Some(size) = self.time_font_size {
            config.time.font_size = size;
        }
        if self.log_file.is_some() {
            config.logging.jsonl_path.clone_from(&self.log_file);
        }
    }
}

/// CLI failures. Every failure exits with status 1.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or is invalid.
    #[error("{0}")]
    Config(SegError),
    /// The display could not be started or failed while running.
    #[error("{0}")]
    Display(SegError),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Display(_) | Self::Io(_) => 1,
        }
    }
}

/// Parse-independent entry point.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color || !io::stderr().is_terminal() {
        control::set_override(false);
    }

    let mut config = Config::load(cli.config.as_deref()).map_err(CliError::Config)?;
    cli.apply_to(&mut config);
    config.validate().map_err(CliError::Config)?;

    if cli.print_config {
        let rendered = toml::to_string_pretty(&config).map_err(|e| {
            CliError::Config(SegError::Serialization {
                context: "toml",
                details: e.to_string(),
            })
        })?;
        io::stdout().write_all(rendered.as_bytes())?;
        return Ok(());
    }

    let config_hash = config.stable_hash().map_err(CliError::Config)?;
    let (logger, logger_join) = spawn_logger(config.jsonl()).map_err(CliError::Display)?;
    logger.send(ActivityEvent::DisplayStarted {
        version: env!("CARGO_PKG_VERSION").to_string(),
        config_hash: config_hash.clone(),
    });

    let signals = SignalHandler::new();
    let result = if cli.demo {
        let (connector, script) = ScriptedConnector::online(String::new());
        spawn_demo_feed(script, signals.clone());
        announce(&connector, &config_hash, true);
        run_display(cli, &config, connector, logger.clone(), signals)
    } else {
        let connector = SpiceApiConnector::new(config.spiceapi());
        announce(&connector, &config_hash, false);
        run_display(cli, &config, connector, logger.clone(), signals)
    };

    if let Err(err) = &result {
        logger.send(ActivityEvent::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        });
    }
    logger.shutdown();
    if let Some(join) = logger_join {
        let _ = join.join();
    }

    let reason = result.map_err(CliError::Display)?;
    eprintln!("{} stopped ({})", "[SEG-MAIN]".dimmed(), reason.as_str());
    Ok(())
}

fn announce(connector: &impl TickerConnector, config_hash: &str, demo: bool) {
    let source = if demo { "simulated cabinet" } else { "cabinet" };
    eprintln!(
        "{} mirroring {source} at {} (config {config_hash})",
        "[SEG-MAIN]".dimmed(),
        connector.endpoint().as_str().bold()
    );
}

fn run_display<C>(
    cli: &Cli,
    config: &Config,
    connector: C,
    logger: ActivityLoggerHandle,
    signals: SignalHandler,
) -> iidxseg::core::errors::Result<StopReason>
where
    C: TickerConnector + 'static,
{
    if cli.headless {
        let backend = RecordingBackend::new()
            .with_history(1)
            .with_echo(Box::new(io::stdout()), Theme::default().on);
        DisplayLoop::start(backend, config, connector, logger, signals)?.run(cli.frames)
    } else {
        DisplayLoop::start(TerminalBackend::new(), config, connector, logger, signals)?
            .run(cli.frames)
    }
}

// ──────────────────── demo feed ────────────────────

/// Message the simulated cabinet scrolls, in the cabinet's raw encoding
/// (`!` decodes to `./`, `m` to a period, `q` to an apostrophe).
const DEMO_MESSAGE: &str = "WELCOME TO BEATMANIA IIDX!  LETqS PLAY  STAGE 1m  PRESS START  ";
const DEMO_WINDOW: usize = 9;
const DEMO_STEP: Duration = Duration::from_millis(250);

/// Scroll `DEMO_MESSAGE` through a 9-cell window, like the cabinet does.
fn spawn_demo_feed(script: ScriptHandle, signals: SignalHandler) {
    let chars: Vec<char> = DEMO_MESSAGE.chars().collect();
    let spawned = thread::Builder::new()
        .name("iidxseg-demo".to_string())
        .spawn(move || {
            let mut start = 0;
            while !signals.should_shutdown() {
                let window: String = chars
                    .iter()
                    .cycle()
                    .skip(start)
                    .take(DEMO_WINDOW)
                    .collect();
                script.set_ticker(window);
                start = (start + 1) % chars.len();
                thread::sleep(DEMO_STEP);
            }
        });
    if let Err(e) = spawned {
        eprintln!("{} demo feed unavailable: {e}", "[SEG-MAIN]".yellow());
    }
}
