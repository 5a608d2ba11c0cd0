// Setup checklist: debugger bridge, device, app, proxy and dependencies

use crate::adb::{emulator_serial, package_installed, parse_adb_devices, proxy_setting};
use crate::command::{CommandRunner, command_exists};
use crate::port::{DEFAULT_PROBE_TIMEOUT, is_port_open};
use std::time::Duration;
use tracing::{debug, info};

/// Address the Android emulator uses to reach the host loopback
pub const EMULATOR_HOST_ALIAS: &str = "10.0.2.2";

/// Companion tools that should be on PATH besides `mitmproxy` itself
pub const PROXY_COMPANIONS: &[&str] = &["mitmdump", "mitmweb"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Unknown,
}

impl CheckStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "✓",
            CheckStatus::Fail => "✗",
            CheckStatus::Warn => "⚠",
            CheckStatus::Unknown => "?",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SetupCheck {
    pub component: String,
    pub status: CheckStatus,
    /// Short status label, e.g. "Installed" or "Not Running"
    pub label: String,
    /// Details on success, remediation otherwise
    pub details: String,
}

impl SetupCheck {
    fn new(component: &str, status: CheckStatus, label: &str, details: impl Into<String>) -> Self {
        Self {
            component: component.to_string(),
            status,
            label: label.to_string(),
            details: details.into(),
        }
    }

    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Pass
    }
}

/// Options for the setup checklist
#[derive(Debug, Clone)]
pub struct SetupConfig {
    pub proxy_host: String,
    pub proxy_port: u16,
    pub web_port: u16,
    pub package: String,
    pub port_timeout: Duration,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            proxy_host: "localhost".to_string(),
            proxy_port: 8080,
            web_port: 8081,
            package: "com.target.ui".to_string(),
            port_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SetupReport {
    pub checks: Vec<SetupCheck>,
}

impl SetupReport {
    pub fn passed(&self) -> usize {
        self.checks.iter().filter(|c| c.passed()).count()
    }

    pub fn total(&self) -> usize {
        self.checks.len()
    }

    pub fn all_passed(&self) -> bool {
        self.passed() == self.total()
    }
}

/// Run every check in order. Checks are independent; a failing one never
/// short-circuits the rest.
pub fn run_setup_checks(config: &SetupConfig, runner: &dyn CommandRunner) -> SetupReport {
    let checks = vec![
        check_adb(runner),
        check_emulator(runner),
        check_app_installed(runner, &config.package),
        check_proxy_installed(runner),
        check_proxy_listener(config),
        check_web_ui(config),
        check_device_proxy(runner, config.proxy_port),
        check_dependencies(runner),
    ];

    let report = SetupReport { checks };
    info!(
        "Setup checks complete: {}/{} passed",
        report.passed(),
        report.total()
    );
    report
}

pub fn check_adb(runner: &dyn CommandRunner) -> SetupCheck {
    if command_exists(runner, "adb") {
        SetupCheck::new("adb", CheckStatus::Pass, "Installed", "Android Debug Bridge ready")
    } else {
        SetupCheck::new(
            "adb",
            CheckStatus::Fail,
            "Not Found",
            "Install Android SDK platform-tools",
        )
    }
}

pub fn check_emulator(runner: &dyn CommandRunner) -> SetupCheck {
    let serial = runner
        .run("adb", &["devices"])
        .ok()
        .and_then(|out| emulator_serial(&parse_adb_devices(&out.stdout)).map(String::from));

    match serial {
        Some(serial) => SetupCheck::new(
            "Emulator",
            CheckStatus::Pass,
            "Running",
            format!("Device: {}", serial),
        ),
        None => SetupCheck::new(
            "Emulator",
            CheckStatus::Fail,
            "Not Running",
            "Start emulator with AVD Manager",
        ),
    }
}

pub fn check_app_installed(runner: &dyn CommandRunner, package: &str) -> SetupCheck {
    let installed = runner
        .run("adb", &["shell", "pm", "list", "packages", package])
        .map(|out| package_installed(&out.stdout, package))
        .unwrap_or(false);

    if installed {
        SetupCheck::new(
            "Companion App",
            CheckStatus::Pass,
            "Installed",
            format!("{} found", package),
        )
    } else {
        SetupCheck::new(
            "Companion App",
            CheckStatus::Fail,
            "Not Installed",
            format!("Install the {} APK on the emulator", package),
        )
    }
}

pub fn check_proxy_installed(runner: &dyn CommandRunner) -> SetupCheck {
    if command_exists(runner, "mitmproxy") {
        SetupCheck::new("mitmproxy", CheckStatus::Pass, "Installed", "Proxy tool ready")
    } else {
        SetupCheck::new(
            "mitmproxy",
            CheckStatus::Fail,
            "Not Found",
            "Install: brew install mitmproxy (or pipx install mitmproxy)",
        )
    }
}

pub fn check_proxy_listener(config: &SetupConfig) -> SetupCheck {
    let component = format!("mitmproxy (port {})", config.proxy_port);
    if is_port_open(&config.proxy_host, config.proxy_port, config.port_timeout) {
        SetupCheck::new(&component, CheckStatus::Pass, "Running", "Proxy listener active")
    } else {
        SetupCheck::new(
            &component,
            CheckStatus::Fail,
            "Not Running",
            format!("Start: mitmweb --listen-port {}", config.proxy_port),
        )
    }
}

pub fn check_web_ui(config: &SetupConfig) -> SetupCheck {
    let component = format!("mitmweb UI (port {})", config.web_port);
    if is_port_open(&config.proxy_host, config.web_port, config.port_timeout) {
        SetupCheck::new(
            &component,
            CheckStatus::Pass,
            "Running",
            format!("http://{}:{}", config.proxy_host, config.web_port),
        )
    } else {
        SetupCheck::new(
            &component,
            CheckStatus::Fail,
            "Not Running",
            format!(
                "Start: mitmweb --listen-port {} --web-port {}",
                config.proxy_port, config.web_port
            ),
        )
    }
}

pub fn check_device_proxy(runner: &dyn CommandRunner, proxy_port: u16) -> SetupCheck {
    match runner.run("adb", &["shell", "settings", "get", "global", "http_proxy"]) {
        Ok(out) => match proxy_setting(&out.stdout) {
            Some(proxy) => SetupCheck::new(
                "Emulator Proxy",
                CheckStatus::Pass,
                "Configured",
                format!("Proxy: {}", proxy),
            ),
            None => SetupCheck::new(
                "Emulator Proxy",
                CheckStatus::Fail,
                "Not Set",
                format!("Set proxy to {}:{}", EMULATOR_HOST_ALIAS, proxy_port),
            ),
        },
        Err(e) => {
            debug!("Could not read device proxy: {}", e);
            SetupCheck::new(
                "Emulator Proxy",
                CheckStatus::Unknown,
                "Unknown",
                "Verify manually in emulator WiFi settings",
            )
        }
    }
}

pub fn check_dependencies(runner: &dyn CommandRunner) -> SetupCheck {
    let missing: Vec<&str> = PROXY_COMPANIONS
        .iter()
        .copied()
        .filter(|tool| !command_exists(runner, tool))
        .collect();

    if missing.is_empty() {
        SetupCheck::new(
            "Dependencies",
            CheckStatus::Pass,
            "Installed",
            format!("{} tools ready", PROXY_COMPANIONS.len()),
        )
    } else {
        SetupCheck::new(
            "Dependencies",
            CheckStatus::Warn,
            "Incomplete",
            format!("Missing: {}", missing.join(", ")),
        )
    }
}
