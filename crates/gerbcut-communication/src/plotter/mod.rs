//! Plotter Engine
//!
//! Owns the single device handle and moves it between two users:
//! - the periodic status poll (`ESC ENQ` query/response)
//! - the job stream (ordered chunk writes on a blocking worker)
//!
//! While a job streams the connection state is `Streaming` and polls are
//! skipped. Every state change and job milestone is published on one ordered
//! event channel returned by [`Plotter::new`].

pub mod status;

use crate::transport::{UsbBus, UsbError, UsbTransport};
use gerbcut_core::{
    ConnectionState, DeviceState, EncodedJob, JobId, PlotterEvent, TransportError,
};
use gerbcut_devicedb::{DeviceModel, Dialect, VENDOR_ID};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use status::{parse_status, STATUS_QUERY};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Receiving end of the plotter event channel
pub type EventReceiver = mpsc::UnboundedReceiver<PlotterEvent>;

/// Plotter engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotterConfig {
    /// Bytes per bulk write
    pub chunk_size: usize,
    /// Status poll period (milliseconds)
    pub poll_interval_ms: u64,
    /// Status query timeout (milliseconds)
    pub poll_timeout_ms: u64,
    /// Per-chunk write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

impl Default for PlotterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            poll_interval_ms: 1000,
            poll_timeout_ms: 500,
            write_timeout_ms: 10_000,
        }
    }
}

impl PlotterConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

/// Shared cancel flag for one stream
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; repeated calls are harmless
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a stream ended
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Every chunk was accepted
    Completed,
    /// Stopped before chunk `chunks_sent`
    Cancelled { chunks_sent: usize, bytes_sent: usize },
    /// A write failed
    Failed(TransportError),
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed)
    }
}

/// Handle to a running stream
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    cancel: CancelToken,
    task: JoinHandle<JobOutcome>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Stop before the next chunk
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the stream to end. The interface has been released by then.
    pub async fn wait(self) -> JobOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => JobOutcome::Failed(TransportError::Usb {
                reason: format!("stream worker failed: {}", e),
            }),
        }
    }
}

/// The opened device and its claim status
struct DeviceLink {
    transport: Box<dyn UsbTransport>,
    model: &'static DeviceModel,
    claimed: bool,
}

impl DeviceLink {
    fn ensure_claimed(&mut self) -> Result<(), UsbError> {
        if !self.claimed {
            self.transport.claim()?;
            self.claimed = true;
        }
        Ok(())
    }

    fn release(&mut self) -> Result<(), UsbError> {
        if !self.claimed {
            return Ok(());
        }
        self.claimed = false;
        self.transport.release()
    }

    fn query_status(&mut self, timeout: Duration) -> Result<DeviceState, UsbError> {
        self.ensure_claimed()?;
        self.transport.write(&STATUS_QUERY, timeout)?;
        let mut buf = [0u8; 64];
        let n = self.transport.read(&mut buf, timeout)?;
        Ok(parse_status(&buf[..n]))
    }
}

struct Shared {
    config: PlotterConfig,
    bus: Arc<dyn UsbBus>,
    link: Mutex<Option<DeviceLink>>,
    model: RwLock<Option<&'static DeviceModel>>,
    state: RwLock<ConnectionState>,
    active: Mutex<Option<CancelToken>>,
    /// Set when `disconnect` arrives mid-stream; the stream worker closes the link
    disconnect_pending: AtomicBool,
    events: mpsc::UnboundedSender<PlotterEvent>,
}

impl Shared {
    fn emit(&self, event: PlotterEvent) {
        debug!("Plotter event: {}", event);
        // a dropped receiver only means nobody is listening
        let _ = self.events.send(event);
    }

    fn set_device_state(&self, new: DeviceState) {
        let changed = {
            let mut state = self.state.write();
            match *state {
                ConnectionState::Connected(old) if old != new => {
                    *state = ConnectionState::Connected(new);
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.emit(PlotterEvent::DeviceStateChanged(new));
        }
    }

    fn drop_link(&self, slot: &mut Option<DeviceLink>, reason: String) {
        slot.take();
        *self.model.write() = None;
        *self.state.write() = ConnectionState::Disconnected;
        warn!("Cutter disconnected: {}", reason);
        self.emit(PlotterEvent::Disconnected { reason });
    }

    /// Release and drop the handle, then report the requested disconnect
    fn close_link(&self, slot: &mut Option<DeviceLink>) {
        let Some(mut link) = slot.take() else {
            return;
        };
        if let Err(e) = link.release() {
            warn!("Failed to release interface on disconnect: {}", e);
            self.emit(PlotterEvent::ReleaseFailed {
                reason: e.to_string(),
            });
        }
        info!("Disconnected from {}", link.model.name);
        drop(link);

        *self.model.write() = None;
        {
            let mut state = self.state.write();
            self.disconnect_pending.store(false, Ordering::SeqCst);
            *state = ConnectionState::Disconnected;
        }
        self.emit(PlotterEvent::Disconnected {
            reason: "disconnect requested".to_string(),
        });
    }

    async fn poll(self: &Arc<Self>) -> Result<DeviceState, TransportError> {
        let state = *self.state.read();
        match state {
            ConnectionState::Disconnected => return Err(TransportError::NotConnected),
            ConnectionState::Streaming => return Ok(DeviceState::Cutting),
            ConnectionState::Connected(_) => {}
        }
        let shared = Arc::clone(self);
        tokio::task::spawn_blocking(move || shared.poll_blocking())
            .await
            .map_err(|e| TransportError::Usb {
                reason: format!("poll worker failed: {}", e),
            })?
    }

    fn poll_blocking(&self) -> Result<DeviceState, TransportError> {
        // a stream worker holding the handle means the poll is skipped
        let Some(mut slot) = self.link.try_lock() else {
            return Ok(self.state.read().device_state());
        };
        if self.state.read().is_streaming() {
            return Ok(DeviceState::Cutting);
        }
        let Some(link) = slot.as_mut() else {
            return Err(TransportError::NotConnected);
        };

        let timeout = self.config.poll_timeout();
        match link.query_status(timeout) {
            Ok(state) => {
                self.set_device_state(state);
                Ok(state)
            }
            Err(UsbError::Timeout) => {
                let timeout_ms = timeout.as_millis() as u64;
                warn!("Status poll timed out after {}ms", timeout_ms);
                self.set_device_state(DeviceState::Unknown);
                self.emit(PlotterEvent::PollTimedOut);
                Err(TransportError::PollTimeout { timeout_ms })
            }
            Err(UsbError::NoDevice) => {
                let reason = "device lost during status poll".to_string();
                self.drop_link(&mut slot, reason.clone());
                Err(TransportError::Disconnected { reason })
            }
            Err(e) => {
                warn!("Status poll failed: {}", e);
                Err(e.into())
            }
        }
    }

    fn run_stream(&self, job: EncodedJob, cancel: &CancelToken) -> JobOutcome {
        let id = job.id();
        let total = job.len();
        let mut slot = self.link.lock();

        let (outcome, lost) = match slot.as_mut() {
            Some(link) => self.write_chunks(link, &job, cancel),
            None if cancel.is_cancelled() => (
                JobOutcome::Cancelled {
                    chunks_sent: 0,
                    bytes_sent: 0,
                },
                false,
            ),
            None => (JobOutcome::Failed(TransportError::NotConnected), false),
        };

        let mut pending = false;
        if slot.is_none() {
            *self.state.write() = ConnectionState::Disconnected;
        } else if lost {
            self.drop_link(&mut slot, format!("device lost while streaming job {}", id));
        } else if let Some(link) = slot.as_mut() {
            if let Err(e) = link.release() {
                warn!("Failed to release interface after job {}: {}", id, e);
                self.emit(PlotterEvent::ReleaseFailed {
                    reason: e.to_string(),
                });
            }
            // serialized with `Plotter::disconnect` through the state lock
            let mut state = self.state.write();
            pending = self.disconnect_pending.load(Ordering::SeqCst);
            if !pending {
                *state = ConnectionState::Connected(DeviceState::Unknown);
            }
        }
        drop(slot);
        self.active.lock().take();

        match &outcome {
            JobOutcome::Completed => {
                info!("Job {} completed ({} bytes)", id, total);
                self.emit(PlotterEvent::JobCompleted(id));
            }
            JobOutcome::Cancelled {
                chunks_sent,
                bytes_sent,
            } => {
                info!(
                    "Job {} cancelled after {} chunks ({} of {} bytes)",
                    id, chunks_sent, bytes_sent, total
                );
                self.emit(PlotterEvent::JobCancelled {
                    job: id,
                    chunks_sent: *chunks_sent,
                });
            }
            JobOutcome::Failed(e) => {
                error!("Job {} failed: {}", id, e);
                self.emit(PlotterEvent::JobFailed {
                    job: id,
                    error: e.clone(),
                });
            }
        }

        if pending {
            self.close_link(&mut self.link.lock());
        }
        outcome
    }

    /// Write every chunk in order; the flag reports device loss
    fn write_chunks(
        &self,
        link: &mut DeviceLink,
        job: &EncodedJob,
        cancel: &CancelToken,
    ) -> (JobOutcome, bool) {
        let id = job.id();
        let total = job.len();
        if let Err(e) = link.ensure_claimed() {
            let lost = e == UsbError::NoDevice;
            return (JobOutcome::Failed(e.into_stream_failed(0, total)), lost);
        }

        let timeout = self.config.write_timeout();
        let mut sent = 0;
        let mut chunks_sent = 0;
        for chunk in job.as_bytes().chunks(self.config.chunk_size.max(1)) {
            if cancel.is_cancelled() {
                let outcome = JobOutcome::Cancelled {
                    chunks_sent,
                    bytes_sent: sent,
                };
                return (outcome, false);
            }
            match link.transport.write(chunk, timeout) {
                Ok(n) if n == chunk.len() => {
                    sent += n;
                    chunks_sent += 1;
                    self.emit(PlotterEvent::Progress {
                        job: id,
                        sent,
                        total,
                    });
                }
                Ok(n) => {
                    let error = TransportError::StreamFailed {
                        sent: sent + n,
                        total,
                        reason: format!("short write: {} of {} bytes", n, chunk.len()),
                    };
                    return (JobOutcome::Failed(error), false);
                }
                Err(e) => {
                    let lost = e == UsbError::NoDevice;
                    return (JobOutcome::Failed(e.into_stream_failed(sent, total)), lost);
                }
            }
        }
        (JobOutcome::Completed, false)
    }
}

/// Transport and device state engine for one cutter
pub struct Plotter {
    shared: Arc<Shared>,
    poll_task: RwLock<Option<JoinHandle<()>>>,
}

impl Plotter {
    /// Create an engine on `bus` plus the receiver for its events
    pub fn new(config: PlotterConfig, bus: Arc<dyn UsbBus>) -> (Self, EventReceiver) {
        let (events, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            config,
            bus,
            link: Mutex::new(None),
            model: RwLock::new(None),
            state: RwLock::new(ConnectionState::Disconnected),
            active: Mutex::new(None),
            disconnect_pending: AtomicBool::new(false),
            events,
        });
        (
            Self {
                shared,
                poll_task: RwLock::new(None),
            },
            rx,
        )
    }

    pub fn config(&self) -> &PlotterConfig {
        &self.shared.config
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.read()
    }

    pub fn device_state(&self) -> DeviceState {
        self.state().device_state()
    }

    /// Model matched at connect time
    pub fn model(&self) -> Option<&'static DeviceModel> {
        *self.shared.model.read()
    }

    /// Command dialect of the connected model
    pub fn dialect(&self) -> Option<Dialect> {
        self.model().map(|m| m.dialect)
    }

    /// Open the first attached device found in the device table and claim
    /// its interface. Returns the current model when already connected,
    /// without waiting for a running job.
    pub fn connect(&self) -> Result<&'static DeviceModel, TransportError> {
        let shared = &self.shared;
        if !matches!(self.state(), ConnectionState::Disconnected) {
            if let Some(model) = self.model() {
                return Ok(model);
            }
        }

        let mut slot = shared.link.lock();
        if let Some(link) = slot.as_ref() {
            return Ok(link.model);
        }

        let devices = shared.bus.devices().map_err(|e| {
            error!("Failed to enumerate USB devices: {}", e);
            TransportError::from(e)
        })?;
        let (info, model) = devices
            .iter()
            .find_map(|info| {
                gerbcut_devicedb::lookup(info.vendor_id, info.product_id)
                    .ok()
                    .map(|model| (info, model))
            })
            .ok_or_else(|| {
                warn!(
                    "No supported cutter among {} attached USB devices",
                    devices.len()
                );
                TransportError::NoDeviceFound {
                    vendor_id: VENDOR_ID,
                }
            })?;

        let busy = |e: UsbError| TransportError::DeviceBusy {
            product_id: info.product_id,
            reason: e.to_string(),
        };
        let mut transport = shared.bus.open(info).map_err(busy)?;
        transport.claim().map_err(busy)?;

        info!("Connected to {} at {}", model, info);
        *slot = Some(DeviceLink {
            transport,
            model,
            claimed: true,
        });
        *shared.model.write() = Some(model);
        *shared.state.write() = ConnectionState::Connected(DeviceState::Unknown);
        drop(slot);

        shared.emit(PlotterEvent::Connected {
            model: model.name.to_string(),
            product_id: model.product_id,
        });
        Ok(model)
    }

    /// Query the device status once.
    ///
    /// While a job streams the query is skipped and `Cutting` is returned.
    pub async fn poll_once(&self) -> Result<DeviceState, TransportError> {
        self.shared.poll().await
    }

    /// Poll the device every `poll_interval_ms` until stopped or disconnected.
    /// Must be called from within a tokio runtime.
    pub fn start_polling(&self) {
        let mut task = self.poll_task.write();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let period = shared.config.poll_interval();
        debug!("Starting status polling every {:?}", period);
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let state = *shared.state.read();
                if !matches!(state, ConnectionState::Connected(_)) {
                    continue;
                }
                if let Err(e) = shared.poll().await {
                    debug!("Status poll failed: {}", e);
                }
            }
        }));
    }

    pub fn stop_polling(&self) {
        if let Some(task) = self.poll_task.write().take() {
            task.abort();
            debug!("Status polling stopped");
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poll_task
            .read()
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Stream `job` on a blocking worker. Must be called from within a
    /// tokio runtime.
    pub fn stream(&self, job: EncodedJob) -> Result<JobHandle, TransportError> {
        self.stream_with_cancel(job, CancelToken::new())
    }

    /// Stream `job`, stopping before the next chunk once `cancel` is set
    pub fn stream_with_cancel(
        &self,
        job: EncodedJob,
        cancel: CancelToken,
    ) -> Result<JobHandle, TransportError> {
        {
            let mut state = self.shared.state.write();
            match *state {
                ConnectionState::Disconnected => return Err(TransportError::NotConnected),
                ConnectionState::Streaming => return Err(TransportError::AlreadyStreaming),
                ConnectionState::Connected(_) => *state = ConnectionState::Streaming,
            }
            self.shared.disconnect_pending.store(false, Ordering::SeqCst);
        }
        *self.shared.active.lock() = Some(cancel.clone());

        let id = job.id();
        let total = job.len();
        info!(
            "Streaming job {} ({} bytes, {} passes, {} chunks)",
            id,
            total,
            job.passes(),
            job.chunk_count(self.shared.config.chunk_size.max(1))
        );
        self.shared.emit(PlotterEvent::JobStarted { job: id, total });

        let shared = Arc::clone(&self.shared);
        let token = cancel.clone();
        let task = tokio::task::spawn_blocking(move || shared.run_stream(job, &token));
        Ok(JobHandle { id, cancel, task })
    }

    /// Cancel the running job, if any. Returns whether a job was running.
    pub fn cancel(&self) -> bool {
        match self.shared.active.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Stop polling, cancel any running job, release the interface and drop
    /// the handle.
    ///
    /// During a stream this returns at once; the stream worker closes the
    /// link after the job ends, so `Disconnected` follows the job's terminal
    /// event.
    pub fn disconnect(&self) {
        self.stop_polling();
        let streaming = {
            let state = self.shared.state.read();
            let streaming = state.is_streaming();
            if streaming {
                self.shared.disconnect_pending.store(true, Ordering::SeqCst);
            }
            streaming
        };
        self.cancel();
        if streaming {
            debug!("Disconnect deferred until the running job ends");
            return;
        }

        let mut slot = self.shared.link.lock();
        self.shared.close_link(&mut slot);
    }
}

impl Drop for Plotter {
    fn drop(&mut self) {
        self.stop_polling();
    }
}
