//! # gerbcut
//!
//! Cuts Gerber designs on Graphtec and Silhouette cutting plotters:
//! - Gerber (RS-274X) import into typed primitives
//! - Stroke normalization, feature merging and tool path sequencing
//! - GP-GL job encoding with per-pass speed and force
//! - USB bulk streaming with status polling and safe cancellation
//!
//! ## Architecture
//!
//! gerbcut is organized as a workspace with multiple crates:
//!
//! 1. **gerbcut-core** - Data model, errors, plotter events, units
//! 2. **gerbcut-devicedb** - Supported cutters and their command dialects
//! 3. **gerbcut-camtools** - Gerber import, geometry stages, encoder and decoder
//! 4. **gerbcut-communication** - USB transport and the plotter engine
//! 5. **gerbcut** - Configuration, job pipeline and logging setup

pub mod config;
pub mod pipeline;

pub use config::GerbcutConfig;
pub use pipeline::{prepare_gerber, prepare_job, send_to_cutter, JobOptions, PreparedJob};

pub use gerbcut_core::{
    ConnectionState, CutMode, CutParameters, Design, DeviceState, EncodeError, EncodedJob,
    Error, Extent, GeometryError, JobId, LengthUnit, PassSetting, PlotterEvent, Point, Result,
    Stage, Stroke, Transform, TransportError,
};

pub use gerbcut_devicedb::{DeviceModel, Dialect, Quirks, VENDOR_ID};

pub use gerbcut_camtools::{
    decode, Aperture, Command, FeatureMerger, FileFormatError, GeometryNormalizer,
    GerberImporter, Layer, MergeReport, Motion, NormalizerConfig, PathSequencer, Primitive,
    ProtocolEncoder, ToolPath, UnsupportedPolicy, YAxis,
};

pub use gerbcut_communication::{
    CancelToken, EventReceiver, JobHandle, JobOutcome, MockBus, MockDevice, MockResponse,
    Plotter, PlotterConfig, RusbBus, UsbBus, UsbError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
