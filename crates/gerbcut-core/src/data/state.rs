//! Device and connection state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Last known readiness of the cutter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceState {
    /// No valid status response yet
    #[default]
    Unknown,
    /// No device attached
    NoDevice,
    /// Attached but not able to cut (no media loaded)
    NotReady,
    /// Idle with media loaded
    Ready,
    /// Carriage moving
    Moving,
    /// A job is being streamed
    Cutting,
    /// Paused from the device panel
    Paused,
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceState::Unknown => write!(f, "Unknown"),
            DeviceState::NoDevice => write!(f, "No device"),
            DeviceState::NotReady => write!(f, "Not ready"),
            DeviceState::Ready => write!(f, "Ready"),
            DeviceState::Moving => write!(f, "Moving"),
            DeviceState::Cutting => write!(f, "Cutting"),
            DeviceState::Paused => write!(f, "Paused"),
        }
    }
}

/// Engine connection state; the `Streaming` variant suspends polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected(DeviceState),
    Streaming,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        !matches!(self, ConnectionState::Disconnected)
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, ConnectionState::Streaming)
    }

    /// Device state as seen by callers
    pub fn device_state(&self) -> DeviceState {
        match self {
            ConnectionState::Disconnected => DeviceState::NoDevice,
            ConnectionState::Connected(state) => *state,
            ConnectionState::Streaming => DeviceState::Cutting,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connected(state) => write!(f, "Connected ({})", state),
            ConnectionState::Streaming => write!(f, "Streaming"),
        }
    }
}
