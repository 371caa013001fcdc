//! Events published by the plotter engine
//!
//! Poll and stream events share one ordered channel; events from the two
//! sources may interleave.

use crate::data::{DeviceState, JobId};
use crate::error::TransportError;

/// Plotter event types
#[derive(Debug, Clone, PartialEq)]
pub enum PlotterEvent {
    /// Interface claimed on a matching device
    Connected {
        /// Model name from the device table
        model: String,
        /// USB product id
        product_id: u16,
    },
    /// Device handle dropped
    Disconnected {
        /// Why the link ended
        reason: String,
    },
    /// A status poll produced a new state
    DeviceStateChanged(DeviceState),
    /// A status poll got no answer in time
    PollTimedOut,
    /// Streaming began
    JobStarted {
        /// Job being streamed
        job: JobId,
        /// Job size in bytes
        total: usize,
    },
    /// A chunk was accepted by the device
    Progress {
        /// Job being streamed
        job: JobId,
        /// Bytes sent so far
        sent: usize,
        /// Job size in bytes
        total: usize,
    },
    /// Every chunk was sent
    JobCompleted(JobId),
    /// A chunk write failed
    JobFailed {
        /// Job that failed
        job: JobId,
        /// Transport error that ended the stream
        error: TransportError,
    },
    /// The stream stopped on a cancel request
    JobCancelled {
        /// Job that was cancelled
        job: JobId,
        /// Chunks sent before the cancel took effect
        chunks_sent: usize,
    },
    /// The interface could not be released after a stream
    ReleaseFailed {
        /// Reason reported by the USB stack
        reason: String,
    },
}

impl std::fmt::Display for PlotterEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlotterEvent::Connected { model, product_id } => {
                write!(f, "Connected to {} ({:#06x})", model, product_id)
            }
            PlotterEvent::Disconnected { reason } => write!(f, "Disconnected: {}", reason),
            PlotterEvent::DeviceStateChanged(state) => write!(f, "State: {}", state),
            PlotterEvent::PollTimedOut => write!(f, "Status poll timed out"),
            PlotterEvent::JobStarted { job, total } => {
                write!(f, "Job {} started ({} bytes)", job, total)
            }
            PlotterEvent::Progress { sent, total, .. } => {
                write!(f, "Progress: {}/{} bytes", sent, total)
            }
            PlotterEvent::JobCompleted(job) => write!(f, "Job {} completed", job),
            PlotterEvent::JobFailed { job, error } => write!(f, "Job {} failed: {}", job, error),
            PlotterEvent::JobCancelled { job, chunks_sent } => {
                write!(f, "Job {} cancelled after {} chunks", job, chunks_sent)
            }
            PlotterEvent::ReleaseFailed { reason } => {
                write!(f, "Interface release failed: {}", reason)
            }
        }
    }
}

impl PlotterEvent {
    /// Whether this event ends a job
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PlotterEvent::JobCompleted(_)
                | PlotterEvent::JobFailed { .. }
                | PlotterEvent::JobCancelled { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_display() {
        let event = PlotterEvent::Connected {
            model: "Portrait".to_string(),
            product_id: 0x1123,
        };
        assert_eq!(event.to_string(), "Connected to Portrait (0x1123)");
        assert_eq!(
            PlotterEvent::DeviceStateChanged(DeviceState::Ready).to_string(),
            "State: Ready"
        );
    }

    #[test]
    fn test_terminal_events() {
        let job = JobId::new();
        assert!(PlotterEvent::JobCompleted(job).is_terminal());
        assert!(!PlotterEvent::Progress {
            job,
            sent: 1,
            total: 2
        }
        .is_terminal());
    }
}
