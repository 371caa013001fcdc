//! # gerbcut CAM Tools
//!
//! Everything between a Gerber file and the bytes a cutter understands.
//!
//! - **Gerber Import**: RS-274X to a typed primitive [`Layer`]
//! - **Geometry Normalizer**: primitives to strokes in inches, Y up
//! - **Feature Merger**: convex-hull merging of near features, noise removal
//! - **Path Sequencer**: stroke ordering into a pen-up/pen-down tool path
//! - **Protocol Encoder**: GP-GL job bytes with per-pass speed and force
//! - **Decoder**: GP-GL job bytes back into commands

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod gerber_import;
pub mod merger;
pub mod normalizer;
pub mod primitives;
pub mod sequencer;
mod spatial;

pub use decoder::{decode, Command};
pub use encoder::{validate, ProtocolEncoder, Steps};
pub use error::{FileFormatError, FileFormatResult};
pub use gerber_import::GerberImporter;
pub use merger::{FeatureMerger, MergeReport};
pub use normalizer::{GeometryNormalizer, NormalizerConfig, UnsupportedPolicy};
pub use primitives::{Aperture, Layer, Primitive, YAxis};
pub use sequencer::{Mode, Motion, PathSequencer, ToolPath};
