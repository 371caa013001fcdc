//! `rusb` backend
//!
//! Opens cutters through libusb. The OUT and IN bulk endpoints are read from
//! the active configuration of interface 0.

use super::{UsbBus, UsbDeviceInfo, UsbError, UsbTransport};
use rusb::{Device, DeviceHandle, Direction, GlobalContext, TransferType, UsbContext};
use std::time::Duration;

const INTERFACE: u8 = 0;

impl From<rusb::Error> for UsbError {
    fn from(err: rusb::Error) -> Self {
        match err {
            rusb::Error::Timeout => UsbError::Timeout,
            rusb::Error::NoDevice | rusb::Error::NotFound => UsbError::NoDevice,
            rusb::Error::Busy => UsbError::Busy(err.to_string()),
            rusb::Error::Access => UsbError::Access(err.to_string()),
            other => UsbError::Other(other.to_string()),
        }
    }
}

/// Enumerates devices on the global libusb context
#[derive(Debug, Default, Clone, Copy)]
pub struct RusbBus;

impl RusbBus {
    pub fn new() -> Self {
        Self
    }

    fn find(&self, info: &UsbDeviceInfo) -> Result<Device<GlobalContext>, UsbError> {
        GlobalContext::default()
            .devices()?
            .iter()
            .find(|d| d.bus_number() == info.bus && d.address() == info.address)
            .ok_or(UsbError::NoDevice)
    }
}

impl UsbBus for RusbBus {
    fn devices(&self) -> Result<Vec<UsbDeviceInfo>, UsbError> {
        let mut found = Vec::new();
        for device in rusb::devices()?.iter() {
            match device.device_descriptor() {
                Ok(desc) => found.push(UsbDeviceInfo::new(
                    desc.vendor_id(),
                    desc.product_id(),
                    device.bus_number(),
                    device.address(),
                )),
                Err(e) => tracing::debug!(
                    "Skipping device on bus {} address {}: {}",
                    device.bus_number(),
                    device.address(),
                    e
                ),
            }
        }
        Ok(found)
    }

    fn open(&self, info: &UsbDeviceInfo) -> Result<Box<dyn UsbTransport>, UsbError> {
        let device = self.find(info)?;
        let (ep_out, ep_in) = bulk_endpoints(&device)?;
        let mut handle = device.open()?;
        if let Err(e) = handle.set_auto_detach_kernel_driver(true) {
            // unsupported on some platforms; claim reports real conflicts
            tracing::debug!("Kernel driver auto-detach unavailable: {}", e);
        }
        Ok(Box::new(RusbTransport {
            handle,
            info: info.clone(),
            ep_out,
            ep_in,
        }))
    }
}

/// Bulk OUT and IN endpoint addresses of interface 0
fn bulk_endpoints(device: &Device<GlobalContext>) -> Result<(u8, u8), UsbError> {
    let config = device.active_config_descriptor()?;
    let mut ep_out = None;
    let mut ep_in = None;
    for interface in config.interfaces().filter(|i| i.number() == INTERFACE) {
        for desc in interface.descriptors() {
            for ep in desc.endpoint_descriptors() {
                if ep.transfer_type() != TransferType::Bulk {
                    continue;
                }
                match ep.direction() {
                    Direction::Out if ep_out.is_none() => ep_out = Some(ep.address()),
                    Direction::In if ep_in.is_none() => ep_in = Some(ep.address()),
                    _ => {}
                }
            }
        }
    }
    match (ep_out, ep_in) {
        (Some(out), Some(input)) => Ok((out, input)),
        _ => Err(UsbError::Other(
            "interface 0 has no bulk endpoint pair".to_string(),
        )),
    }
}

/// An opened cutter
pub struct RusbTransport {
    handle: DeviceHandle<GlobalContext>,
    info: UsbDeviceInfo,
    ep_out: u8,
    ep_in: u8,
}

impl UsbTransport for RusbTransport {
    fn info(&self) -> &UsbDeviceInfo {
        &self.info
    }

    fn claim(&mut self) -> Result<(), UsbError> {
        self.handle.claim_interface(INTERFACE)?;
        Ok(())
    }

    fn release(&mut self) -> Result<(), UsbError> {
        self.handle.release_interface(INTERFACE)?;
        Ok(())
    }

    fn write(&mut self, data: &[u8], timeout: Duration) -> Result<usize, UsbError> {
        Ok(self.handle.write_bulk(self.ep_out, data, timeout)?)
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, UsbError> {
        Ok(self.handle.read_bulk(self.ep_in, buf, timeout)?)
    }
}
