//! # Gerbcut Communication
//!
//! USB transport and the device state engine for Graphtec/Silhouette cutters.
//! Supports real hardware through `rusb` and an in-memory backend for tests.

pub mod plotter;
pub mod transport;

pub use plotter::{
    status::{parse_status, STATUS_QUERY},
    CancelToken, EventReceiver, JobHandle, JobOutcome, Plotter, PlotterConfig,
};
pub use transport::{
    mock::{MockBus, MockDevice, MockResponse},
    RusbBus, RusbTransport, UsbBus, UsbDeviceInfo, UsbError, UsbTransport,
};
