//! # gerbcut Core
//!
//! Core types and utilities for gerbcut.
//! Provides the stroke geometry model, cut parameters, encoded jobs,
//! device state, plotter events and the error taxonomy shared by every
//! pipeline stage.

pub mod data;
pub mod error;
pub mod event;
pub mod units;

pub use data::{
    ConnectionState, CutMode, CutParameters, Design, DeviceState, EncodedJob, Extent, JobId,
    PassSetting, Point, Stroke, Transform,
};

pub use error::{EncodeError, Error, GeometryError, Result, Stage, TransportError};

pub use event::PlotterEvent;

pub use units::LengthUnit;
