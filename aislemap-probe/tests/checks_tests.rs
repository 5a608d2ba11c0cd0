// Tests for the setup checklist

use aislemap_probe::command::{CommandOutput, CommandRunner, display_command};
use aislemap_probe::error::{ProbeError, Result};
use aislemap_probe::{CheckStatus, SetupConfig, is_port_open, run_setup_checks};
use aislemap_probe::checks::{check_dependencies, check_device_proxy, check_emulator};
use std::collections::HashMap;
use std::net::TcpListener;
use std::time::Duration;

/// Answers commands from a fixed table; anything else fails to spawn
#[derive(Default)]
struct FakeRunner {
    responses: HashMap<String, String>,
}

impl FakeRunner {
    fn with(mut self, command: &str, stdout: &str) -> Self {
        self.responses.insert(command.to_string(), stdout.to_string());
        self
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let key = display_command(program, args);
        match self.responses.get(&key) {
            Some(stdout) => Ok(CommandOutput {
                stdout: stdout.clone(),
                stderr: String::new(),
            }),
            None => Err(ProbeError::Spawn {
                command: key,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            }),
        }
    }
}

fn fully_configured_runner() -> FakeRunner {
    FakeRunner::default()
        .with("adb --version", "Android Debug Bridge version 1.0.41")
        .with("adb devices", "List of devices attached\nemulator-5554\tdevice\n")
        .with("adb shell pm list packages com.target.ui", "package:com.target.ui\n")
        .with("mitmproxy --version", "Mitmproxy: 10.1.5")
        .with("adb shell settings get global http_proxy", "10.0.2.2:8080\n")
        .with("mitmdump --version", "Mitmproxy: 10.1.5")
        .with("mitmweb --version", "Mitmproxy: 10.1.5")
}

/// A port nobody listens on: bind, read the port, drop the listener
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

// ============================================================================
// Port Tests
// ============================================================================

#[test]
fn test_is_port_open_with_listener() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    assert!(is_port_open("127.0.0.1", port, Duration::from_secs(1)));
}

#[test]
fn test_is_port_open_closed() {
    let port = closed_port();
    assert!(!is_port_open("127.0.0.1", port, Duration::from_millis(500)));
}

#[test]
fn test_is_port_open_unresolvable_host() {
    assert!(!is_port_open("host.invalid", 8080, Duration::from_millis(500)));
}

// ============================================================================
// Checklist Tests
// ============================================================================

#[test]
fn test_all_checks_pass() {
    let proxy = TcpListener::bind("127.0.0.1:0").unwrap();
    let web = TcpListener::bind("127.0.0.1:0").unwrap();
    let config = SetupConfig {
        proxy_host: "127.0.0.1".to_string(),
        proxy_port: proxy.local_addr().unwrap().port(),
        web_port: web.local_addr().unwrap().port(),
        ..SetupConfig::default()
    };

    let report = run_setup_checks(&config, &fully_configured_runner());

    assert_eq!(report.total(), 8);
    assert_eq!(report.passed(), 8);
    assert!(report.all_passed());
}

#[test]
fn test_nothing_installed() {
    let config = SetupConfig {
        proxy_host: "127.0.0.1".to_string(),
        proxy_port: closed_port(),
        web_port: closed_port(),
        port_timeout: Duration::from_millis(200),
        ..SetupConfig::default()
    };

    let report = run_setup_checks(&config, &FakeRunner::default());

    assert_eq!(report.total(), 8);
    assert_eq!(report.passed(), 0);
    assert!(!report.all_passed());

    let statuses: Vec<CheckStatus> = report.checks.iter().map(|c| c.status).collect();
    assert_eq!(statuses[6], CheckStatus::Unknown);
    assert_eq!(statuses[7], CheckStatus::Warn);
    assert!(statuses[..6].iter().all(|s| *s == CheckStatus::Fail));
}

#[test]
fn test_check_order_and_components() {
    let config = SetupConfig {
        proxy_host: "127.0.0.1".to_string(),
        proxy_port: closed_port(),
        web_port: closed_port(),
        port_timeout: Duration::from_millis(200),
        ..SetupConfig::default()
    };
    let report = run_setup_checks(&config, &FakeRunner::default());

    assert_eq!(report.checks[0].component, "adb");
    assert_eq!(report.checks[1].component, "Emulator");
    assert_eq!(report.checks[2].component, "Companion App");
    assert_eq!(report.checks[3].component, "mitmproxy");
    assert!(report.checks[4].component.starts_with("mitmproxy (port"));
    assert!(report.checks[5].component.starts_with("mitmweb UI (port"));
    assert_eq!(report.checks[6].component, "Emulator Proxy");
    assert_eq!(report.checks[7].component, "Dependencies");
}

#[test]
fn test_check_emulator_reports_serial() {
    let check = check_emulator(&fully_configured_runner());
    assert_eq!(check.status, CheckStatus::Pass);
    assert_eq!(check.details, "Device: emulator-5554");
}

#[test]
fn test_check_device_proxy_not_set() {
    let runner = FakeRunner::default().with("adb shell settings get global http_proxy", "null\n");
    let check = check_device_proxy(&runner, 8080);

    assert_eq!(check.status, CheckStatus::Fail);
    assert_eq!(check.details, "Set proxy to 10.0.2.2:8080");
}

#[test]
fn test_check_dependencies_partial() {
    let runner = FakeRunner::default().with("mitmdump --version", "Mitmproxy: 10.1.5");
    let check = check_dependencies(&runner);

    assert_eq!(check.status, CheckStatus::Warn);
    assert_eq!(check.details, "Missing: mitmweb");
    assert!(!check.passed());
}
