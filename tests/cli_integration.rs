//! Black-box tests of the `iidxseg` binary in headless mode.

mod common;

use std::fs;

use common::{closed_port, run_cli_case};

#[test]
fn help_lists_display_options() {
    let result = run_cli_case("help", &["--help"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    for flag in [
        "--width",
        "--height",
        "--borderless",
        "--font-size",
        "--offset",
        "--clock",
        "--timer",
        "--time-font-size",
    ] {
        assert!(
            result.stdout.contains(flag),
            "missing {flag}; log: {}",
            result.log_path.display()
        );
    }
}

#[test]
fn print_config_reflects_command_line() {
    let result = run_cli_case(
        "print-config",
        &[
            "10.1.2.3",
            "1338",
            "secret",
            "--width",
            "1040",
            "--timer",
            "--print-config",
        ],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let parsed: toml::Value = toml::from_str(&result.stdout).expect("printed config is TOML");
    assert_eq!(parsed["remote"]["host"].as_str(), Some("10.1.2.3"));
    assert_eq!(parsed["remote"]["port"].as_integer(), Some(1338));
    assert_eq!(parsed["window"]["width"].as_integer(), Some(1040));
    assert_eq!(parsed["time"]["stopwatch"].as_bool(), Some(true));
    assert_eq!(parsed["time"]["clock"].as_bool(), Some(false));
}

#[test]
fn invalid_port_exits_with_one() {
    let result = run_cli_case("invalid-port", &["localhost", "0", "--print-config"]);
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("SEG-1001"), "log: {}", result.log_path.display());
}

#[test]
fn missing_explicit_config_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let result = run_cli_case(
        "missing-config",
        &["--config", missing.to_str().unwrap(), "--print-config"],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("SEG-1002"), "log: {}", result.log_path.display());
}

#[test]
fn config_file_is_layered_under_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "[remote]\nhost = \"cab.local\"\nport = 4000\n\n[time]\nclock = true\n",
    )
    .unwrap();

    let result = run_cli_case(
        "config-layering",
        &["--config", path.to_str().unwrap(), "--timer", "--print-config"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let parsed: toml::Value = toml::from_str(&result.stdout).unwrap();
    assert_eq!(parsed["remote"]["host"].as_str(), Some("cab.local"));
    assert_eq!(parsed["remote"]["port"].as_integer(), Some(4000));
    assert_eq!(parsed["time"]["clock"].as_bool(), Some(true));
    assert_eq!(parsed["time"]["stopwatch"].as_bool(), Some(true));
}

#[test]
fn unreachable_cabinet_shows_placeholder_and_stopwatch() {
    let port = closed_port().to_string();
    let result = run_cli_case(
        "unreachable",
        &[
            "127.0.0.1",
            &port,
            "--headless",
            "--frames",
            "4",
            "--timer",
            "--no-color",
        ],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let lines: Vec<&str> = result.stdout.lines().collect();
    assert_eq!(lines.len(), 4, "log: {}", result.log_path.display());
    for line in lines {
        assert_eq!(line, "CONNECT.!.!. | 0:00:00");
    }
    assert!(result.stderr.contains("[SEG-MAIN] stopped (frame limit)"));
}

#[test]
fn demo_feed_reaches_the_display() {
    let result = run_cli_case(
        "demo",
        &["--demo", "--headless", "--frames", "16", "--no-color"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let lines: Vec<&str> = result.stdout.lines().collect();
    assert_eq!(lines.len(), 16);
    assert!(
        lines.iter().any(|line| *line != "CONNECT.!.!."),
        "demo text never replaced the placeholder; log: {}",
        result.log_path.display()
    );
}

#[test]
fn log_file_records_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("activity.jsonl");
    let port = closed_port().to_string();
    let result = run_cli_case(
        "log-file",
        &[
            "127.0.0.1",
            &port,
            "--headless",
            "--frames",
            "2",
            "--log-file",
            log.to_str().unwrap(),
        ],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let content = fs::read_to_string(&log).expect("activity log written");
    let events: Vec<String> = content
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).expect("valid JSON line");
            value["event"].as_str().unwrap_or_default().to_string()
        })
        .collect();
    assert_eq!(events.first().map(String::as_str), Some("display_start"));
    assert!(events.iter().any(|e| e == "connect_failed"));
    assert!(events.iter().any(|e| e == "display_stop"));
}
