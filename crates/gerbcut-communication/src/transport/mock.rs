//! In-memory USB backend
//!
//! A scriptable stand-in for attached cutters. Each [`MockDevice`] records
//! the chunks written to it and answers status queries from a script, so the
//! plotter engine can be exercised without hardware.

use super::{UsbBus, UsbDeviceInfo, UsbError, UsbTransport};
use crate::plotter::status::STATUS_QUERY;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Scripted answer to one status query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// Reply with these bytes
    Status(Vec<u8>),
    /// No reply before the timeout
    Timeout,
    /// The device vanished
    Unplugged,
}

impl MockResponse {
    /// Single status digit
    pub fn digit(d: u8) -> Self {
        MockResponse::Status(vec![d])
    }
}

type WriteHook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct MockState {
    writes: Vec<Vec<u8>>,
    status_queries: usize,
    claims: usize,
    releases: usize,
    claimed: bool,
    busy: bool,
    unplugged: bool,
    release_fails: bool,
    responses: VecDeque<MockResponse>,
    fallback: Option<MockResponse>,
    pending_reply: Option<MockResponse>,
    fail_write: Option<(usize, UsbError)>,
    short_write: Option<usize>,
    write_delay: Option<Duration>,
    hooks: Vec<(usize, WriteHook)>,
}

/// Handle to one simulated device; clones share state
#[derive(Clone)]
pub struct MockDevice {
    info: UsbDeviceInfo,
    state: Arc<Mutex<MockState>>,
}

impl MockDevice {
    pub fn info(&self) -> &UsbDeviceInfo {
        &self.info
    }

    /// Queue an answer for the next status query
    pub fn push_response(&self, response: MockResponse) {
        self.state.lock().responses.push_back(response);
    }

    /// Answer used once the queue is empty; queries time out without one
    pub fn set_fallback_response(&self, response: MockResponse) {
        self.state.lock().fallback = Some(response);
    }

    /// Opening or claiming fails with a busy error
    pub fn set_busy(&self, busy: bool) {
        self.state.lock().busy = busy;
    }

    /// Interface release fails
    pub fn set_release_fails(&self, fails: bool) {
        self.state.lock().release_fails = fails;
    }

    /// The job write with this zero-based index fails with `error`
    pub fn fail_write_at(&self, index: usize, error: UsbError) {
        self.state.lock().fail_write = Some((index, error));
    }

    /// The job write with this zero-based index is accepted only partially
    pub fn short_write_at(&self, index: usize) {
        self.state.lock().short_write = Some(index);
    }

    /// Sleep inside every job write
    pub fn set_write_delay(&self, delay: Duration) {
        self.state.lock().write_delay = Some(delay);
    }

    /// Run `hook` right after the `count`-th job write is accepted
    pub fn after_writes(&self, count: usize, hook: impl FnOnce() + Send + 'static) {
        self.state.lock().hooks.push((count, Box::new(hook)));
    }

    /// Remove the device from the bus; open handles fail with `NoDevice`
    pub fn unplug(&self) {
        self.state.lock().unplugged = true;
    }

    /// Job chunks accepted so far, status queries excluded
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().writes.clone()
    }

    /// Every accepted job byte, in order
    pub fn written_bytes(&self) -> Vec<u8> {
        self.state.lock().writes.concat()
    }

    pub fn status_queries(&self) -> usize {
        self.state.lock().status_queries
    }

    pub fn claims(&self) -> usize {
        self.state.lock().claims
    }

    pub fn releases(&self) -> usize {
        self.state.lock().releases
    }

    pub fn is_claimed(&self) -> bool {
        self.state.lock().claimed
    }
}

/// Simulated bus holding zero or more devices
#[derive(Default)]
pub struct MockBus {
    devices: Mutex<Vec<MockDevice>>,
    opens: Mutex<usize>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a device; bus and address follow attachment order
    pub fn attach(&self, vendor_id: u16, product_id: u16) -> MockDevice {
        let mut devices = self.devices.lock();
        let address = devices.len() as u8 + 1;
        let device = MockDevice {
            info: UsbDeviceInfo::new(vendor_id, product_id, 1, address),
            state: Arc::new(Mutex::new(MockState::default())),
        };
        devices.push(device.clone());
        device
    }

    /// Number of `open` calls served
    pub fn open_count(&self) -> usize {
        *self.opens.lock()
    }
}

impl UsbBus for MockBus {
    fn devices(&self) -> Result<Vec<UsbDeviceInfo>, UsbError> {
        Ok(self
            .devices
            .lock()
            .iter()
            .filter(|d| !d.state.lock().unplugged)
            .map(|d| d.info.clone())
            .collect())
    }

    fn open(&self, info: &UsbDeviceInfo) -> Result<Box<dyn UsbTransport>, UsbError> {
        *self.opens.lock() += 1;
        let device = self
            .devices
            .lock()
            .iter()
            .find(|d| &d.info == info)
            .cloned()
            .ok_or(UsbError::NoDevice)?;
        {
            let state = device.state.lock();
            if state.unplugged {
                return Err(UsbError::NoDevice);
            }
            if state.busy {
                return Err(UsbError::Busy("interface in use".to_string()));
            }
        }
        Ok(Box::new(MockTransport { device }))
    }
}

/// Open handle on a [`MockDevice`]
pub struct MockTransport {
    device: MockDevice,
}

impl UsbTransport for MockTransport {
    fn info(&self) -> &UsbDeviceInfo {
        &self.device.info
    }

    fn claim(&mut self) -> Result<(), UsbError> {
        let mut state = self.device.state.lock();
        if state.unplugged {
            return Err(UsbError::NoDevice);
        }
        if state.busy {
            return Err(UsbError::Busy("interface claimed by another process".to_string()));
        }
        state.claims += 1;
        state.claimed = true;
        Ok(())
    }

    fn release(&mut self) -> Result<(), UsbError> {
        let mut state = self.device.state.lock();
        if state.unplugged {
            return Err(UsbError::NoDevice);
        }
        if state.release_fails {
            return Err(UsbError::Other("release rejected".to_string()));
        }
        state.releases += 1;
        state.claimed = false;
        Ok(())
    }

    fn write(&mut self, data: &[u8], _timeout: Duration) -> Result<usize, UsbError> {
        if data == STATUS_QUERY {
            let mut state = self.device.state.lock();
            if state.unplugged {
                return Err(UsbError::NoDevice);
            }
            state.status_queries += 1;
            let reply = match state.responses.pop_front() {
                Some(reply) => reply,
                None => state.fallback.clone().unwrap_or(MockResponse::Timeout),
            };
            if reply == MockResponse::Unplugged {
                state.unplugged = true;
                return Err(UsbError::NoDevice);
            }
            state.pending_reply = Some(reply);
            return Ok(data.len());
        }

        let delay = self.device.state.lock().write_delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        let (accepted, hooks) = {
            let mut state = self.device.state.lock();
            if state.unplugged {
                return Err(UsbError::NoDevice);
            }
            let index = state.writes.len();
            let failure = state
                .fail_write
                .as_ref()
                .filter(|(at, _)| *at == index)
                .map(|(_, err)| err.clone());
            if let Some(err) = failure {
                if err == UsbError::NoDevice {
                    state.unplugged = true;
                }
                return Err(err);
            }
            let accepted = if state.short_write == Some(index) {
                data.len() / 2
            } else {
                data.len()
            };
            state.writes.push(data[..accepted].to_vec());
            let count = state.writes.len();
            let (due, rest): (Vec<_>, Vec<_>) =
                state.hooks.drain(..).partition(|(at, _)| *at == count);
            state.hooks = rest;
            (accepted, due)
        };
        for (_, hook) in hooks {
            hook();
        }
        Ok(accepted)
    }

    fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, UsbError> {
        let mut state = self.device.state.lock();
        if state.unplugged {
            return Err(UsbError::NoDevice);
        }
        match state.pending_reply.take() {
            Some(MockResponse::Status(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Some(MockResponse::Unplugged) => {
                state.unplugged = true;
                Err(UsbError::NoDevice)
            }
            Some(MockResponse::Timeout) | None => Err(UsbError::Timeout),
        }
    }
}
