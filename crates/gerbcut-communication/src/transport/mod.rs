//! USB transport abstraction
//!
//! Provides the low-level seam between the plotter engine and the USB stack:
//! - Device enumeration ([`UsbBus`])
//! - Interface claim/release and bulk transfers ([`UsbTransport`])
//!
//! The `rusb` backend talks to real hardware; the `mock` backend records
//! traffic for tests.

pub mod mock;
pub mod usb;

use gerbcut_core::TransportError;
use std::time::Duration;
use thiserror::Error;

pub use usb::{RusbBus, RusbTransport};

/// Low-level USB failure, before the engine maps it to a [`TransportError`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsbError {
    /// The transfer did not complete in time
    #[error("transfer timed out")]
    Timeout,
    /// The device is gone
    #[error("no such device")]
    NoDevice,
    /// The interface is held elsewhere
    #[error("resource busy: {0}")]
    Busy(String),
    /// Insufficient permissions
    #[error("access denied: {0}")]
    Access(String),
    /// Anything else reported by the USB stack
    #[error("{0}")]
    Other(String),
}

impl UsbError {
    /// Map to the engine error raised while streaming
    pub fn into_stream_failed(self, sent: usize, total: usize) -> TransportError {
        TransportError::StreamFailed {
            sent,
            total,
            reason: self.to_string(),
        }
    }
}

impl From<UsbError> for TransportError {
    fn from(err: UsbError) -> Self {
        match err {
            UsbError::NoDevice => TransportError::Disconnected {
                reason: err.to_string(),
            },
            other => TransportError::Usb {
                reason: other.to_string(),
            },
        }
    }
}

/// Information about an attached USB device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDeviceInfo {
    /// USB vendor ID
    pub vendor_id: u16,
    /// USB product ID
    pub product_id: u16,
    /// Bus number
    pub bus: u8,
    /// Address on the bus
    pub address: u8,
}

impl UsbDeviceInfo {
    pub fn new(vendor_id: u16, product_id: u16, bus: u8, address: u8) -> Self {
        Self {
            vendor_id,
            product_id,
            bus,
            address,
        }
    }
}

impl std::fmt::Display for UsbDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04x}:{:04x} (bus {} address {})",
            self.vendor_id, self.product_id, self.bus, self.address
        )
    }
}

/// One opened device
pub trait UsbTransport: Send {
    /// Identity of the opened device
    fn info(&self) -> &UsbDeviceInfo;

    /// Claim interface 0, detaching a kernel driver where needed
    fn claim(&mut self) -> Result<(), UsbError>;

    /// Release interface 0
    fn release(&mut self) -> Result<(), UsbError>;

    /// Bulk write to the OUT endpoint
    fn write(&mut self, data: &[u8], timeout: Duration) -> Result<usize, UsbError>;

    /// Bulk read from the IN endpoint
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, UsbError>;
}

/// Device enumeration
pub trait UsbBus: Send + Sync {
    /// Every attached device, in enumeration order
    fn devices(&self) -> Result<Vec<UsbDeviceInfo>, UsbError>;

    /// Open a device returned by [`UsbBus::devices`]
    fn open(&self, info: &UsbDeviceInfo) -> Result<Box<dyn UsbTransport>, UsbError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usb_error_mapping() {
        let err: TransportError = UsbError::NoDevice.into();
        assert!(matches!(err, TransportError::Disconnected { .. }));

        let err: TransportError = UsbError::Other("pipe".to_string()).into();
        assert_eq!(err.to_string(), "USB error: pipe");

        assert_eq!(
            UsbError::Timeout.into_stream_failed(10, 20),
            TransportError::StreamFailed {
                sent: 10,
                total: 20,
                reason: "transfer timed out".to_string()
            }
        );
    }

    #[test]
    fn test_device_info_display() {
        let info = UsbDeviceInfo::new(0x0b4d, 0x1123, 1, 7);
        assert_eq!(info.to_string(), "0b4d:1123 (bus 1 address 7)");
    }
}
