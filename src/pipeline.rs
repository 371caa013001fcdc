//! Job preparation and delivery
//!
//! Chains the stages from a primitive layer to an encoded job, and hands the
//! job to a plotter. Cut parameters are validated before any geometry work,
//! so a rejected parameter set never reaches the device.

use gerbcut_camtools::{
    validate, FeatureMerger, GeometryNormalizer, GerberImporter, Layer, MergeReport,
    NormalizerConfig, PathSequencer, ProtocolEncoder, ToolPath,
};
use gerbcut_communication::{JobOutcome, Plotter};
use gerbcut_core::{CutMode, CutParameters, Design, EncodedJob, Result};
use gerbcut_devicedb::Dialect;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Geometry options for one job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobOptions {
    pub normalizer: NormalizerConfig,
    pub merge: FeatureMerger,
    pub mode: CutMode,
}

/// Every intermediate of a prepared job
#[derive(Debug, Clone)]
pub struct PreparedJob {
    /// Merged design, in inches
    pub design: Design,
    pub merge_report: MergeReport,
    pub toolpath: ToolPath,
    pub job: EncodedJob,
}

/// Run normalize, merge, sequence and encode over `layer`
pub fn prepare_job(
    layer: &Layer,
    options: &JobOptions,
    params: &CutParameters,
    dialect: &Dialect,
) -> Result<PreparedJob> {
    validate(params)?;

    let normalizer = GeometryNormalizer::new(options.normalizer.clone());
    let normalized = normalizer.normalize(layer)?;
    let (design, merge_report) = options.merge.merge_with_report(&normalized);
    let toolpath = PathSequencer::new(options.mode).sequence(&design);
    let job = ProtocolEncoder::new(*dialect).encode(&toolpath, params)?;

    info!(
        "Prepared job {}: {} strokes, {} motions, {} bytes ({} mode, {} passes)",
        job.id(),
        design.len(),
        toolpath.len(),
        job.len(),
        options.mode,
        job.passes()
    );
    Ok(PreparedJob {
        design,
        merge_report,
        toolpath,
        job,
    })
}

/// Parse RS-274X text and prepare it
pub fn prepare_gerber(
    gerber: &str,
    options: &JobOptions,
    params: &CutParameters,
    dialect: &Dialect,
) -> Result<PreparedJob> {
    validate(params)?;
    let importer = GerberImporter::new(GeometryNormalizer::new(options.normalizer.clone()));
    let layer = importer.parse(gerber)?;
    prepare_job(&layer, options, params, dialect)
}

/// Connect if needed, stream `job` and wait for it to end
pub async fn send_to_cutter(plotter: &Plotter, job: EncodedJob) -> Result<JobOutcome> {
    let model = plotter.connect()?;
    info!("Sending {} bytes to {}", job.len(), model.name);
    let handle = plotter.stream(job)?;
    Ok(handle.wait().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gerbcut_camtools::{Motion, Primitive};
    use gerbcut_core::{LengthUnit, PassSetting, Point, Stage, Transform};

    fn square_layer() -> Layer {
        Layer::new(
            LengthUnit::Inch,
            vec![Primitive::Polygon {
                outline: vec![
                    Point::new(0.0, 0.0),
                    Point::new(1.0, 0.0),
                    Point::new(1.0, 1.0),
                    Point::new(0.0, 1.0),
                ],
                holes: vec![],
            }],
        )
    }

    fn params(passes: Vec<PassSetting>) -> CutParameters {
        CutParameters {
            offset: Point::new(0.0, 0.0),
            margin: 0.0,
            transform: Transform::IDENTITY,
            passes,
            cut_border: false,
        }
    }

    #[test]
    fn test_prepare_square() {
        let options = JobOptions {
            mode: CutMode::Standard,
            ..Default::default()
        };
        let prepared = prepare_job(
            &square_layer(),
            &options,
            &params(vec![PassSetting::new(5, 10)]),
            &Dialect::GPGL,
        )
        .unwrap();

        assert_eq!(prepared.design.len(), 1);
        assert_eq!(prepared.toolpath.loop_count(), 1);
        assert_eq!(
            prepared.toolpath.motions().first(),
            Some(&Motion::Travel(Point::new(0.0, 0.0)))
        );
        assert!(prepared.job.as_bytes().starts_with(b"\x1b\x04FN0\x03"));
    }

    #[test]
    fn test_bad_parameters_fail_before_geometry() {
        let layer = Layer::new(
            LengthUnit::Inch,
            vec![Primitive::Other {
                kind: "image".to_string(),
            }],
        );
        let err = prepare_job(
            &layer,
            &JobOptions::default(),
            &params(vec![PassSetting::new(2, 8); 4]),
            &Dialect::GPGL,
        )
        .unwrap_err();
        assert_eq!(err.stage(), Stage::Encoding);
    }

    #[test]
    fn test_unsupported_primitive_is_geometry_error() {
        let layer = Layer::new(
            LengthUnit::Inch,
            vec![Primitive::Other {
                kind: "image".to_string(),
            }],
        );
        let err = prepare_job(
            &layer,
            &JobOptions::default(),
            &params(vec![PassSetting::new(2, 8)]),
            &Dialect::GPGL,
        )
        .unwrap_err();
        assert_eq!(err.stage(), Stage::Geometry);
    }
}
