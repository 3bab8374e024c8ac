//! Serial device discovery.

use tokio_serial::{SerialPortInfo, SerialPortType};
use tracing::warn;

/// One serial-capable device visible to the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortEntry {
    /// OS device path (e.g., "/dev/ttyACM0" or "COM3").
    pub path: String,
    /// Human-readable description (e.g., "Arduino Leonardo").
    pub description: String,
}

impl PortEntry {
    pub fn new(path: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            description: description.into(),
        }
    }
}

impl From<SerialPortInfo> for PortEntry {
    fn from(info: SerialPortInfo) -> Self {
        let description = match &info.port_type {
            SerialPortType::UsbPort(usb) => usb
                .product
                .clone()
                .or_else(|| usb.manufacturer.clone())
                .unwrap_or_else(|| "n/a".to_string()),
            SerialPortType::PciPort => "PCI".to_string(),
            SerialPortType::BluetoothPort => "Bluetooth".to_string(),
            SerialPortType::Unknown => "n/a".to_string(),
        };

        Self {
            path: info.port_name,
            description,
        }
    }
}

/// Source of the current serial device list.
pub trait PortScanner {
    /// Enumerate the devices visible right now, in OS order.
    fn scan(&self) -> std::io::Result<Vec<PortEntry>>;
}

/// Enumerates the host's serial ports through `tokio-serial`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPorts;

impl PortScanner for SystemPorts {
    fn scan(&self) -> std::io::Result<Vec<PortEntry>> {
        let ports = tokio_serial::available_ports().map_err(std::io::Error::from)?;
        Ok(ports.into_iter().map(PortEntry::from).collect())
    }
}

/// Pick the first port whose description contains `target`.
///
/// Matching is a case-sensitive substring test. When several ports match,
/// the winner depends on enumeration order.
pub fn find_device<'a>(ports: &'a [PortEntry], target: &str) -> Option<&'a PortEntry> {
    ports.iter().find(|p| p.description.contains(target))
}

/// Locates the peripheral among the enumerated serial devices.
pub struct DeviceLocator<S> {
    scanner: S,
    target: String,
}

impl<S: PortScanner> DeviceLocator<S> {
    pub fn new(scanner: S, target: impl Into<String>) -> Self {
        Self {
            scanner,
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Return the path of the first matching device, if any.
    ///
    /// An enumeration failure counts as "not found".
    pub fn find_device(&self) -> Option<String> {
        let ports = match self.scanner.scan() {
            Ok(ports) => ports,
            Err(e) => {
                warn!(error = %e, "Failed to enumerate serial ports");
                return None;
            }
        };

        find_device(&ports, &self.target).map(|p| p.path.clone())
    }
}
