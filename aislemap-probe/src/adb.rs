// Parsers for Android Debug Bridge output

/// One row of `adb devices`
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub serial: String,
    pub state: String,
}

impl Device {
    pub fn is_emulator(&self) -> bool {
        self.serial.contains("emulator")
    }

    pub fn is_online(&self) -> bool {
        self.state == "device"
    }
}

/// Parse `adb devices` output, skipping the header and daemon chatter
pub fn parse_adb_devices(stdout: &str) -> Vec<Device> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with("List of devices") && !line.starts_with('*'))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            let state = parts.next()?;
            Some(Device {
                serial: serial.to_string(),
                state: state.to_string(),
            })
        })
        .collect()
}

/// Serial of the first emulator in `device` state
pub fn emulator_serial(devices: &[Device]) -> Option<&str> {
    devices
        .iter()
        .find(|d| d.is_emulator() && d.is_online())
        .map(|d| d.serial.as_str())
}

/// Check `pm list packages` output for an exact package name
pub fn package_installed(stdout: &str, package: &str) -> bool {
    stdout
        .lines()
        .filter_map(|line| line.trim().strip_prefix("package:"))
        .any(|name| name == package)
}

/// Interpret `settings get global http_proxy`.
/// Returns `None` when no proxy is set.
pub fn proxy_setting(stdout: &str) -> Option<String> {
    let value = stdout.trim();
    match value {
        "" | "null" | ":0" => None,
        other => Some(other.to_string()),
    }
}
