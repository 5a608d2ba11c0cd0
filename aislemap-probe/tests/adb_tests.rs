// Tests for adb output parsing

use aislemap_probe::adb::{
    Device, emulator_serial, package_installed, parse_adb_devices, proxy_setting,
};

// ============================================================================
// Device List Tests
// ============================================================================

#[test]
fn test_parse_adb_devices_single_emulator() {
    let stdout = "List of devices attached\nemulator-5554\tdevice\n\n";
    let devices = parse_adb_devices(stdout);

    assert_eq!(
        devices,
        vec![Device {
            serial: "emulator-5554".to_string(),
            state: "device".to_string(),
        }]
    );
}

#[test]
fn test_parse_adb_devices_header_only() {
    let devices = parse_adb_devices("List of devices attached\n\n");
    assert!(devices.is_empty());
}

#[test]
fn test_parse_adb_devices_skips_daemon_lines() {
    let stdout = "* daemon not running; starting now at tcp:5037\n\
                  * daemon started successfully\n\
                  List of devices attached\n\
                  R58M123ABC\tdevice\n";
    let devices = parse_adb_devices(stdout);

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].serial, "R58M123ABC");
    assert!(!devices[0].is_emulator());
}

#[test]
fn test_emulator_serial_ignores_offline() {
    let stdout = "List of devices attached\nemulator-5554\toffline\nemulator-5556\tdevice\n";
    let devices = parse_adb_devices(stdout);

    assert_eq!(emulator_serial(&devices), Some("emulator-5556"));
}

#[test]
fn test_emulator_serial_physical_device_only() {
    let devices = parse_adb_devices("List of devices attached\nR58M123ABC\tdevice\n");
    assert_eq!(emulator_serial(&devices), None);
}

// ============================================================================
// Package / Proxy Tests
// ============================================================================

#[test]
fn test_package_installed_exact_match() {
    let stdout = "package:com.target.ui\npackage:com.target.uitest\n";
    assert!(package_installed(stdout, "com.target.ui"));
}

#[test]
fn test_package_installed_prefix_is_not_enough() {
    let stdout = "package:com.target.uitest\n";
    assert!(!package_installed(stdout, "com.target.ui"));
}

#[test]
fn test_proxy_setting_values() {
    assert_eq!(proxy_setting("10.0.2.2:8080\n"), Some("10.0.2.2:8080".to_string()));
    assert_eq!(proxy_setting("null\n"), None);
    assert_eq!(proxy_setting("   "), None);
    assert_eq!(proxy_setting(":0"), None);
}
