//! Data models for gerbcut
//!
//! Stroke geometry, cut parameters, encoded jobs and device state.

pub mod geometry;
pub mod job;
pub mod params;
pub mod state;

pub use geometry::{Design, Extent, Point, Stroke};
pub use job::{EncodedJob, JobId};
pub use params::{CutMode, CutParameters, PassSetting, Transform};
pub use state::{ConnectionState, DeviceState};
