//! Error handling for gerbcut
//!
//! Provides error types for every stage of a cut job:
//! - Geometry errors (primitive ingest and normalization)
//! - Encoding errors (cut parameter validation before any bytes exist)
//! - Transport errors (USB connection, polling and streaming)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Primitive ingest and geometry normalization.
    Geometry,
    /// Cut parameter validation and protocol encoding.
    Encoding,
    /// Device connection, polling and streaming.
    Transport,
    /// Anything outside the three core stages.
    Other,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Geometry => write!(f, "geometry"),
            Stage::Encoding => write!(f, "encoding"),
            Stage::Transport => write!(f, "transport"),
            Stage::Other => write!(f, "other"),
        }
    }
}

/// Geometry error type
///
/// Raised while mapping design-layer primitives to strokes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// The primitive type has no stroke representation.
    #[error("Unsupported primitive: {kind}")]
    UnsupportedPrimitive {
        /// Name of the primitive or aperture kind.
        kind: String,
    },

    /// The primitive is well typed but geometrically unusable.
    #[error("Degenerate {kind}: {reason}")]
    DegeneratePrimitive {
        /// Name of the primitive kind.
        kind: String,
        /// Why the primitive could not be used.
        reason: String,
    },
}

/// Encoding error type
///
/// Raised by the protocol encoder before a single byte is generated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// A cut parameter lies outside its declared bounds.
    #[error("Parameter '{name}' out of range: {value} (valid: {min}..={max})")]
    ParameterOutOfRange {
        /// Parameter name, indexed for per-pass values (e.g. `force[1]`).
        name: String,
        /// The rejected value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
}

/// Transport error type
///
/// Represents failures talking to the cutter over USB.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// No attached device matched the vendor/product table.
    #[error("No cutter found (vendor {vendor_id:#06x})")]
    NoDeviceFound {
        /// Vendor id that was searched for.
        vendor_id: u16,
    },

    /// A matching device exists but its interface could not be claimed.
    #[error("Cutter {product_id:#06x} is busy: {reason}")]
    DeviceBusy {
        /// Product id of the busy device.
        product_id: u16,
        /// Reason reported by the USB stack.
        reason: String,
    },

    /// The device did not answer a status query in time.
    #[error("Status poll timed out after {timeout_ms}ms")]
    PollTimeout {
        /// The poll timeout in milliseconds.
        timeout_ms: u64,
    },

    /// A chunk write failed while streaming a job.
    #[error("Stream failed after {sent} of {total} bytes: {reason}")]
    StreamFailed {
        /// Bytes the device accepted before the failure.
        sent: usize,
        /// Total job size in bytes.
        total: usize,
        /// Reason reported by the USB stack.
        reason: String,
    },

    /// The device went away.
    #[error("Cutter disconnected: {reason}")]
    Disconnected {
        /// Why the link was considered lost.
        reason: String,
    },

    /// An operation needed a connected device.
    #[error("Cutter not connected")]
    NotConnected,

    /// A job is already streaming on this device.
    #[error("A job is already streaming")]
    AlreadyStreaming,

    /// Any other USB-level failure.
    #[error("USB error: {reason}")]
    Usb {
        /// Reason reported by the USB stack.
        reason: String,
    },
}

/// Main error type for gerbcut
///
/// A unified error type that can represent any error from all stages.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Geometry error
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Encoding error
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Stage the error belongs to, for status display
    pub fn stage(&self) -> Stage {
        match self {
            Error::Geometry(_) => Stage::Geometry,
            Error::Encode(_) => Stage::Encoding,
            Error::Transport(_) => Stage::Transport,
            Error::Io(_) | Error::Other(_) => Stage::Other,
        }
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport(TransportError::PollTimeout { .. }))
    }

    /// Check if this error means the device is gone
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Error::Transport(TransportError::Disconnected { .. })
                | Error::Transport(TransportError::NoDeviceFound { .. })
        )
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
