//! End-to-end pipeline runs against a scripted cabinet and a recording surface.

use std::thread;
use std::time::{Duration, Instant};

use chrono::NaiveTime;

use iidxseg::core::config::Config;
use iidxseg::display::loop_main::{DisplayLoop, StopReason};
use iidxseg::display::recording::RecordingBackend;
use iidxseg::display::theme::Theme;
use iidxseg::logger::activity::{ActivityLoggerHandle, spawn_logger};
use iidxseg::logger::jsonl::JsonlConfig;
use iidxseg::remote::scripted::ScriptedConnector;
use iidxseg::runtime::signals::SignalHandler;
use iidxseg::ticker::glyphs::CONNECTING_TEXT;

fn fast_config() -> Config {
    let mut config = Config::default();
    config.acquisition.poll_hz = 200;
    config.window.frame_hz = 200;
    config.retry.connect_cooldown_secs = 0;
    config
}

fn noon() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap()
}

fn lit(display: &DisplayLoop<RecordingBackend>) -> Vec<String> {
    display
        .backend()
        .last_frame()
        .map(|frame| {
            frame
                .texts_in(Theme::default().on)
                .into_iter()
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Render frames until the ticker shows `want` or the deadline passes.
fn render_until(display: &mut DisplayLoop<RecordingBackend>, want: &str) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        display.run_frame(Instant::now(), noon()).unwrap();
        if display.last_known().current().as_str() == want {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn cabinet_coming_online_replaces_placeholder() {
    let (connector, script) = ScriptedConnector::unreachable();
    script.set_ticker("STAGE m");
    let mut display = DisplayLoop::start(
        RecordingBackend::new(),
        &fast_config(),
        connector,
        ActivityLoggerHandle::disabled(),
        SignalHandler::unregistered(),
    )
    .unwrap();

    display.run_frame(Instant::now(), noon()).unwrap();
    assert_eq!(lit(&display), vec![CONNECTING_TEXT.to_string()]);

    // Let the worker's first connect fail before the cabinet comes up.
    let deadline = Instant::now() + Duration::from_secs(5);
    while script.connect_attempts() < 1 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(2));
    }
    assert!(script.connect_attempts() >= 1);

    script.set_reachable(true);
    assert!(render_until(&mut display, "5TAGE!.!"));
    display.run_frame(Instant::now(), noon()).unwrap();
    assert_eq!(lit(&display), vec!["5TAGE!.!".to_string()]);
    assert!(script.connect_attempts() >= 2);

    display.shutdown(StopReason::Quit).unwrap();
    assert!(!display.worker_running());
}

#[test]
fn outage_shows_placeholder_then_recovers() {
    let (connector, script) = ScriptedConnector::online("HELLO");
    let mut display = DisplayLoop::start(
        RecordingBackend::new(),
        &fast_config(),
        connector,
        ActivityLoggerHandle::disabled(),
        SignalHandler::unregistered(),
    )
    .unwrap();
    assert!(render_until(&mut display, "HELLO"));

    script.set_reachable(false);
    assert!(render_until(&mut display, CONNECTING_TEXT));
    display.run_frame(Instant::now(), noon()).unwrap();
    assert_eq!(lit(&display), vec![CONNECTING_TEXT.to_string()]);

    script.set_ticker("AGAIN");
    script.set_reachable(true);
    assert!(render_until(&mut display, "AGAIN"));
    display.run_frame(Instant::now(), noon()).unwrap();
    assert_eq!(lit(&display), vec!["AGAIN".to_string()]);
    display.shutdown(StopReason::Quit).unwrap();
}

#[test]
fn run_with_frame_limit_logs_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("activity.jsonl");
    let (logger, join) = spawn_logger(Some(JsonlConfig {
        path: path.clone(),
        ..JsonlConfig::default()
    }))
    .unwrap();

    let (connector, _script) = ScriptedConnector::online("LIVE");
    let mut config = fast_config();
    config.time.stopwatch = true;
    let mut display = DisplayLoop::start(
        RecordingBackend::new(),
        &config,
        connector,
        logger.clone(),
        SignalHandler::unregistered(),
    )
    .unwrap();
    let reason = display.run(Some(10)).unwrap();
    assert_eq!(reason, StopReason::FrameLimit);
    assert_eq!(display.frames(), 10);
    assert!(display.backend().is_shut_down());
    assert!(!display.worker_running());

    logger.shutdown();
    join.unwrap().join().unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("\"worker_start\""));
    assert!(content.contains("\"connected\""));
    assert!(content.contains("\"display_stop\""));
}
