//! Serial device discovery
//!
//! Enumerates the host's serial devices and filters them with a
//! case-insensitive regular expression searched against the device path and
//! whatever hardware identification the platform reports.

use super::transport::{list_ports, PortError};
use regex::{Regex, RegexBuilder};
use serialport::{SerialPortInfo, SerialPortType};

/// One enumerated serial device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Device path (e.g. `/dev/ttyUSB0`, `COM3`)
    pub path: String,
    /// Descriptive strings (product, manufacturer, hardware id)
    pub hardware: Vec<String>,
}

impl DeviceInfo {
    /// Device known only by its path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hardware: Vec::new(),
        }
    }

    /// Add a descriptive string
    #[must_use]
    pub fn with_hardware(mut self, info: impl Into<String>) -> Self {
        self.hardware.push(info.into());
        self
    }
}

impl From<SerialPortInfo> for DeviceInfo {
    fn from(info: SerialPortInfo) -> Self {
        let mut device = DeviceInfo::new(info.port_name);

        if let SerialPortType::UsbPort(usb) = info.port_type {
            device
                .hardware
                .push(format!("USB VID:PID={:04X}:{:04X}", usb.vid, usb.pid));
            device.hardware.extend(usb.product);
            device.hardware.extend(usb.manufacturer);
            if let Some(serial) = usb.serial_number {
                device.hardware.push(format!("SER={serial}"));
            }
        }

        device
    }
}

/// Source of enumerated devices
pub trait DeviceSource {
    /// List the devices currently present
    fn devices(&self) -> Result<Vec<DeviceInfo>, PortError>;
}

/// Devices reported by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDevices;

impl DeviceSource for SystemDevices {
    fn devices(&self) -> Result<Vec<DeviceInfo>, PortError> {
        Ok(list_ports()?.into_iter().map(DeviceInfo::from).collect())
    }
}

/// Compiled device-name pattern
#[derive(Debug, Clone)]
pub struct DevicePattern {
    regex: Regex,
}

impl DevicePattern {
    /// Compile `pattern`, matching case-insensitively
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self { regex })
    }

    /// Source text of the pattern
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Whether the device path or any of its descriptions match
    pub fn matches(&self, device: &DeviceInfo) -> bool {
        self.regex.is_match(&device.path) || device.hardware.iter().any(|h| self.regex.is_match(h))
    }
}

/// Paths of matching devices, sorted ascending and deduplicated
pub fn matching_paths(devices: Vec<DeviceInfo>, pattern: &DevicePattern) -> Vec<String> {
    let mut paths: Vec<String> = devices
        .into_iter()
        .filter(|device| pattern.matches(device))
        .map(|device| device.path)
        .collect();

    paths.sort();
    paths.dedup();
    paths
}
