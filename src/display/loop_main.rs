//! Foreground display loop.
//!
//! Each frame: handle events, drain the hand-off, render ticker/clock/
//! stopwatch, present, sleep to the next frame. Remote trouble never reaches
//! this loop except as "no fresh text", so the clock and stopwatch keep
//! running through any outage.

#![allow(missing_docs)]

use std::time::{Duration, Instant};

use chrono::{Local, NaiveTime};

use crate::acquisition::handoff::{self, HandoffReceiver, Stamped};
use crate::acquisition::supervisor::ConnectionSupervisor;
use crate::acquisition::worker::{AcquisitionWorker, StopOutcome, WorkerHandle};
use crate::core::config::Config;
use crate::core::errors::Result;
use crate::core::pacer::Pacer;
use crate::display::backend::{DisplayEvent, RenderBackend, SurfaceOptions, SurfaceSize};
use crate::display::theme::Theme;
use crate::display::widgets::{self, FrameClock, WidgetLayout, WidgetSettings};
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};
use crate::remote::TickerConnector;
use crate::runtime::signals::SignalHandler;
use crate::ticker::glyphs::DisplayText;

/// How long shutdown waits for the worker before detaching it.
const WORKER_STOP_GRACE: Duration = Duration::from_millis(250);

pub const WINDOW_TITLE: &str = "IIDXSEG";

// ──────────────────── last-known text ────────────────────

/// The text the ticker shows. Starts as the placeholder and only ever
/// changes to a fresh, non-empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastKnownText {
    current: DisplayText,
    seq: Option<u64>,
}

impl LastKnownText {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: DisplayText::connecting(),
            seq: None,
        }
    }

    /// Take `fresh` if it carries a non-empty value. Returns whether the
    /// displayed text was replaced.
    pub fn observe(&mut self, fresh: Option<Stamped<DisplayText>>) -> bool {
        match fresh {
            Some(item) if !item.value.is_empty() => {
                self.current = item.value;
                self.seq = Some(item.seq);
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub const fn current(&self) -> &DisplayText {
        &self.current
    }

    /// Sequence number of the value being shown, `None` for the placeholder.
    #[must_use]
    pub const fn seq(&self) -> Option<u64> {
        self.seq
    }
}

impl Default for LastKnownText {
    fn default() -> Self {
        Self::new()
    }
}

// ──────────────────── options ────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOptions {
    pub surface: SurfaceOptions,
    pub settings: WidgetSettings,
    pub theme: Theme,
    pub frame_interval: Duration,
}

impl DisplayOptions {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let (width, height) = config.window_size();
        Self {
            surface: SurfaceOptions {
                title: WINDOW_TITLE.to_string(),
                size: SurfaceSize::new(width, height),
                borderless: config.window.borderless,
                position: config.position_hint(),
            },
            settings: WidgetSettings::from_config(config),
            theme: Theme::default(),
            frame_interval: config.frame_interval(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Quit,
    Escape,
    Signal,
    FrameLimit,
    RenderFailure,
}

impl StopReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quit => "quit",
            Self::Escape => "escape",
            Self::Signal => "signal",
            Self::FrameLimit => "frame limit",
            Self::RenderFailure => "render failure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    Stop(StopReason),
}

// ──────────────────── loop ────────────────────

pub struct DisplayLoop<B: RenderBackend> {
    backend: B,
    receiver: HandoffReceiver<DisplayText>,
    worker: Option<WorkerHandle>,
    last_known: LastKnownText,
    options: DisplayOptions,
    layout: WidgetLayout,
    started: Instant,
    frames: u64,
    logger: ActivityLoggerHandle,
    signals: SignalHandler,
    stopped: bool,
}

impl<B: RenderBackend> DisplayLoop<B> {
    /// Create the surface and compute the initial layout.
    pub fn new(
        mut backend: B,
        options: DisplayOptions,
        receiver: HandoffReceiver<DisplayText>,
        logger: ActivityLoggerHandle,
        signals: SignalHandler,
        started: Instant,
    ) -> Result<Self> {
        let size = backend.create_or_resize_surface(&options.surface)?;
        let layout = WidgetLayout::compute(size, &options.settings, &options.theme, &backend)?;
        Ok(Self {
            backend,
            receiver,
            worker: None,
            last_known: LastKnownText::new(),
            options,
            layout,
            started,
            frames: 0,
            logger,
            signals,
            stopped: false,
        })
    }

    /// Build the whole pipeline: surface, hand-off, and the acquisition
    /// worker polling `connector` on its own thread.
    pub fn start<C>(
        backend: B,
        config: &Config,
        connector: C,
        logger: ActivityLoggerHandle,
        signals: SignalHandler,
    ) -> Result<Self>
    where
        C: TickerConnector + 'static,
    {
        let (tx, rx) = handoff::channel(config.acquisition.handoff_capacity);
        let mut display = Self::new(
            backend,
            DisplayOptions::from_config(config),
            rx,
            logger.clone(),
            signals,
            Instant::now(),
        )?;
        let supervisor = ConnectionSupervisor::new(connector, config.retry_policy(), logger);
        let worker = AcquisitionWorker::new(supervisor, tx).spawn(config.poll_interval())?;
        display.worker = Some(worker);
        Ok(display)
    }

    /// Render one frame at `now`, with `wall` as the local time of day.
    pub fn run_frame(&mut self, now: Instant, wall: NaiveTime) -> Result<FrameOutcome> {
        for event in self.backend.poll_events()? {
            match event {
                DisplayEvent::Quit => return Ok(FrameOutcome::Stop(StopReason::Quit)),
                DisplayEvent::Escape => return Ok(FrameOutcome::Stop(StopReason::Escape)),
                DisplayEvent::Resize(size) => self.resize(size)?,
            }
        }

        self.last_known.observe(self.receiver.drain_latest());

        let clock = FrameClock {
            wall,
            elapsed: now.saturating_duration_since(self.started),
        };
        let commands = widgets::compose_frame(
            &self.layout,
            &self.options.theme,
            &self.backend,
            self.last_known.current(),
            clock,
        )?;
        widgets::apply(&mut self.backend, &commands)?;
        self.backend.present()?;
        self.frames += 1;
        Ok(FrameOutcome::Continue)
    }

    /// Run frames at the configured rate until quit, signal or `frame_limit`.
    ///
    /// Always shuts the pipeline down before returning. A render failure is
    /// returned as the error after the surface has been released.
    pub fn run(&mut self, frame_limit: Option<u64>) -> Result<StopReason> {
        let mut pacer = Pacer::new(self.options.frame_interval, Instant::now());
        let reason = loop {
            if self.signals.should_shutdown() {
                break StopReason::Signal;
            }
            if frame_limit.is_some_and(|limit| self.frames >= limit) {
                break StopReason::FrameLimit;
            }
            match self.run_frame(Instant::now(), Local::now().time()) {
                Ok(FrameOutcome::Continue) => pacer.wait(),
                Ok(FrameOutcome::Stop(reason)) => break reason,
                Err(err) => {
                    self.logger.send(ActivityEvent::RenderFailed {
                        error_code: err.code().to_string(),
                        error_message: err.to_string(),
                    });
                    let _ = self.shutdown(StopReason::RenderFailure);
                    return Err(err);
                }
            }
        };
        self.shutdown(reason)?;
        Ok(reason)
    }

    /// Stop the worker, then release the surface. Idempotent.
    pub fn shutdown(&mut self, reason: StopReason) -> Result<()> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;

        if let Some(mut worker) = self.worker.take() {
            // Detached workers finish their in-flight call and exit on their own.
            let _: StopOutcome = worker.stop(WORKER_STOP_GRACE);
        }
        let released = self.backend.shutdown();
        self.logger.send(ActivityEvent::DisplayStopped {
            reason: reason.as_str().to_string(),
            frames: self.frames,
        });
        released
    }

    fn resize(&mut self, size: SurfaceSize) -> Result<()> {
        // The placement hint only applies to the first surface.
        self.options.surface.position = None;
        self.options.surface.size = size;
        let actual = self.backend.create_or_resize_surface(&self.options.surface)?;
        self.layout = WidgetLayout::compute(
            actual,
            &self.options.settings,
            &self.options.theme,
            &self.backend,
        )?;
        self.logger.send(ActivityEvent::SurfaceResized {
            width: actual.width,
            height: actual.height,
        });
        Ok(())
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    #[must_use]
    pub const fn last_known(&self) -> &LastKnownText {
        &self.last_known
    }

    #[must_use]
    pub const fn layout(&self) -> &WidgetLayout {
        &self.layout
    }

    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Whether an acquisition worker is attached and still running.
    #[must_use]
    pub fn worker_running(&self) -> bool {
        self.worker.as_ref().is_some_and(WorkerHandle::is_running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::handoff::{HandoffSender, channel};
    use crate::display::recording::RecordingBackend;
    use crate::display::theme::RED;
    use crate::remote::scripted::ScriptedConnector;
    use crate::ticker::glyphs::CONNECTING_TEXT;

    fn options(settings: WidgetSettings) -> DisplayOptions {
        DisplayOptions {
            settings,
            ..DisplayOptions::from_config(&Config::default())
        }
    }

    fn display(
        settings: WidgetSettings,
    ) -> (
        DisplayLoop<RecordingBackend>,
        HandoffSender<DisplayText>,
        Instant,
    ) {
        let (tx, rx) = channel(2);
        let started = Instant::now();
        let display = DisplayLoop::new(
            RecordingBackend::new(),
            options(settings),
            rx,
            ActivityLoggerHandle::disabled(),
            SignalHandler::unregistered(),
            started,
        )
        .unwrap();
        (display, tx, started)
    }

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).unwrap()
    }

    fn lit(display: &DisplayLoop<RecordingBackend>) -> Vec<String> {
        display
            .backend()
            .last_frame()
            .unwrap()
            .texts_in(RED)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn text(s: &str) -> DisplayText {
        DisplayText::new(s).unwrap()
    }

    #[test]
    fn last_known_ignores_empty_and_missing_values() {
        let (mut tx, mut rx) = channel(2);
        let mut last = LastKnownText::new();
        assert_eq!(last.current().as_str(), CONNECTING_TEXT);

        assert!(!last.observe(None));
        tx.push(DisplayText::default());
        assert!(!last.observe(rx.try_pop()));
        assert_eq!(last.current().as_str(), CONNECTING_TEXT);

        tx.push(text("HELLO"));
        assert!(last.observe(rx.try_pop()));
        assert_eq!(last.current().as_str(), "HELLO");
        assert_eq!(last.seq(), Some(1));
    }

    #[test]
    fn placeholder_until_first_value() {
        let (mut display, _tx, started) = display(WidgetSettings::default());
        display.run_frame(started, noon()).unwrap();
        assert_eq!(lit(&display), vec![CONNECTING_TEXT]);
    }

    #[test]
    fn last_value_persists_across_empty_frames() {
        let (mut display, mut tx, started) = display(WidgetSettings::default());
        tx.push(text("STAGE!1"));
        display.run_frame(started, noon()).unwrap();
        for i in 1..=3 {
            display
                .run_frame(started + Duration::from_millis(125 * i), noon())
                .unwrap();
        }
        assert_eq!(lit(&display), vec!["STAGE!1"]);
        assert_eq!(display.frames(), 4);
    }

    #[test]
    fn newest_pending_value_wins() {
        let (mut display, mut tx, started) = display(WidgetSettings::default());
        tx.push(text("OLD"));
        tx.push(text("NEW"));
        display.run_frame(started, noon()).unwrap();
        assert_eq!(lit(&display), vec!["NEW"]);
    }

    #[test]
    fn stopwatch_counts_from_start() {
        let settings = WidgetSettings {
            stopwatch: true,
            ..WidgetSettings::default()
        };
        let (mut display, _tx, started) = display(settings);
        display.run_frame(started, noon()).unwrap();
        assert_eq!(lit(&display), vec![CONNECTING_TEXT, "0:00:00"]);

        display
            .run_frame(started + Duration::from_secs(5), noon())
            .unwrap();
        assert_eq!(lit(&display), vec![CONNECTING_TEXT, "0:00:05"]);
    }

    #[test]
    fn clock_uses_wall_time() {
        let settings = WidgetSettings {
            clock: true,
            ..WidgetSettings::default()
        };
        let (mut display, _tx, started) = display(settings);
        let t = NaiveTime::from_hms_opt(21, 4, 30).unwrap();
        display.run_frame(started, t).unwrap();
        assert_eq!(lit(&display), vec![CONNECTING_TEXT, "09:04"]);
    }

    #[test]
    fn escape_and_quit_stop_without_drawing() {
        let (mut display, _tx, started) = display(WidgetSettings::default());
        display.backend.queue_events([DisplayEvent::Escape]);
        assert_eq!(
            display.run_frame(started, noon()).unwrap(),
            FrameOutcome::Stop(StopReason::Escape)
        );
        display.backend.queue_events([DisplayEvent::Quit]);
        assert_eq!(
            display.run_frame(started, noon()).unwrap(),
            FrameOutcome::Stop(StopReason::Quit)
        );
        assert!(display.backend().frames().is_empty());
    }

    #[test]
    fn resize_recomputes_layout_and_drops_position_hint() {
        let (mut display, _tx, started) = display(WidgetSettings::default());
        let before = display.layout().ticker_font_size;
        display
            .backend
            .queue_events([DisplayEvent::Resize(SurfaceSize::new(1040, 200))]);
        display.run_frame(started, noon()).unwrap();

        assert_eq!(display.layout().surface, SurfaceSize::new(1040, 200));
        assert!(display.layout().ticker_font_size > before);
        let surfaces = display.backend().surfaces();
        assert_eq!(surfaces.len(), 2);
        assert_eq!(surfaces[1].position, None);
    }

    #[test]
    fn frame_limit_ends_run_and_releases_surface() {
        let (mut display, _tx, _started) = display(WidgetSettings::default());
        display.options.frame_interval = Duration::from_millis(1);
        assert_eq!(display.run(Some(3)).unwrap(), StopReason::FrameLimit);
        assert_eq!(display.frames(), 3);
        assert!(display.backend().is_shut_down());
    }

    #[test]
    fn signal_stops_the_loop() {
        let (mut display, _tx, _started) = display(WidgetSettings::default());
        display.signals.request_shutdown();
        assert_eq!(display.run(None).unwrap(), StopReason::Signal);
        assert_eq!(display.frames(), 0);
    }

    #[test]
    fn start_spawns_worker_and_shutdown_stops_it_first() {
        let (connector, _handle) = ScriptedConnector::online("LIVE");
        let mut config = Config::default();
        config.window.frame_hz = 100;
        config.acquisition.poll_hz = 100;
        let mut display = DisplayLoop::start(
            RecordingBackend::new(),
            &config,
            connector,
            ActivityLoggerHandle::disabled(),
            SignalHandler::unregistered(),
        )
        .unwrap();
        assert!(display.worker_running());

        let deadline = Instant::now() + Duration::from_secs(5);
        while display.last_known().current().as_str() != "LIVE" && Instant::now() < deadline {
            display.run_frame(Instant::now(), noon()).unwrap();
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(display.last_known().current().as_str(), "LIVE");

        display.shutdown(StopReason::Quit).unwrap();
        assert!(!display.worker_running());
        assert!(display.backend().is_shut_down());
        // Idempotent.
        display.shutdown(StopReason::Quit).unwrap();
    }
}
