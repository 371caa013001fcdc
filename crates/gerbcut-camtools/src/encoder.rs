//! Protocol Encoder
//!
//! Renders a tool path as a GP-GL command stream. Parameters are validated
//! before any byte is produced. Each point is transformed, offset and then
//! quantized on its own, so rounding never accumulates along a stroke.

use crate::sequencer::{Motion, ToolPath};
use gerbcut_core::{CutParameters, EncodeError, EncodedJob, Extent, PassSetting, Point};
use gerbcut_devicedb::Dialect;
use tracing::debug;

/// Escape prefix of the device control sequences
pub const ESC: u8 = 0x1b;
/// Second byte of the initialize sequence
pub const EOT: u8 = 0x04;
/// Second byte of the status query sequence
pub const ENQ: u8 = 0x05;

/// Device coordinate, in steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Steps {
    pub x: i64,
    pub y: i64,
}

/// Encodes tool paths for one dialect
#[derive(Debug, Clone, Copy)]
pub struct ProtocolEncoder {
    dialect: Dialect,
}

impl ProtocolEncoder {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Round a point in inches to the step grid
    pub fn quantize(&self, p: Point) -> Steps {
        let spi = self.dialect.steps_per_inch as f64;
        Steps {
            x: (p.x * spi).round() as i64,
            y: (p.y * spi).round() as i64,
        }
    }

    /// Encode `path` with `params`
    pub fn encode(&self, path: &ToolPath, params: &CutParameters) -> Result<EncodedJob, EncodeError> {
        validate(params)?;

        let placed = path.transformed(&params.transform, params.offset);
        let extent = Extent::from_points(placed.points().collect::<Vec<_>>().iter())
            .unwrap_or_else(|| Extent::from_points(&[params.offset]).unwrap_or_default())
            .padded(params.margin);
        let lower_left = self.quantize(extent.min());
        let upper_right = self.quantize(extent.max());

        let mut out = CommandWriter::new(&self.dialect);
        out.raw(&[ESC, EOT]);
        out.command("FN0");
        out.point_command("\\", lower_left);
        out.point_command("Z", upper_right);

        for pass in &params.passes {
            out.command(&format!("!{}", pass.speed));
            out.command(&format!("FX{}", pass.force));
            for motion in placed.motions() {
                match motion {
                    Motion::Travel(p) => out.point_command("M", self.quantize(*p)),
                    Motion::Cut(p) => out.point_command("D", self.quantize(*p)),
                    // lifting is implied by the next M
                    Motion::PenUp => {}
                }
            }
            if params.cut_border && params.margin > 0.0 {
                let corners = [
                    lower_left,
                    Steps {
                        x: upper_right.x,
                        y: lower_left.y,
                    },
                    upper_right,
                    Steps {
                        x: lower_left.x,
                        y: upper_right.y,
                    },
                    lower_left,
                ];
                out.point_command("M", corners[0]);
                for c in &corners[1..] {
                    out.point_command("D", *c);
                }
            }
            out.point_command("M", lower_left);
        }

        out.command("&1,1,1");
        if self.dialect.quirks.media_feed_out {
            out.command("FO0");
        }
        if self.dialect.quirks.return_home {
            out.command("H");
        }

        let bytes = out.finish();
        debug!(
            "Encoded {} motions x {} passes into {} bytes",
            path.len(),
            params.pass_count(),
            bytes.len()
        );
        Ok(EncodedJob::new(bytes, params.pass_count()))
    }
}

/// Check every parameter against its bounds
pub fn validate(params: &CutParameters) -> Result<(), EncodeError> {
    let passes = params.pass_count();
    check_range(
        "passes",
        passes as f64,
        CutParameters::MIN_PASSES as f64,
        CutParameters::MAX_PASSES as f64,
    )?;
    for (i, pass) in params.passes.iter().enumerate() {
        check_range(
            &format!("speed[{}]", i),
            pass.speed as f64,
            PassSetting::SPEED_MIN as f64,
            PassSetting::SPEED_MAX as f64,
        )?;
        check_range(
            &format!("force[{}]", i),
            pass.force as f64,
            PassSetting::FORCE_MIN as f64,
            PassSetting::FORCE_MAX as f64,
        )?;
    }

    let t = &params.transform;
    for (name, value) in [
        ("transform.a", t.a),
        ("transform.b", t.b),
        ("transform.c", t.c),
        ("transform.d", t.d),
        ("offset.x", params.offset.x),
        ("offset.y", params.offset.y),
    ] {
        check_range(name, value, f64::MIN, f64::MAX)?;
    }
    check_range("margin", params.margin, 0.0, f64::MAX)
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<(), EncodeError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(EncodeError::ParameterOutOfRange {
            name: name.to_string(),
            value,
            min,
            max,
        })
    }
}

/// Accumulates terminated commands
struct CommandWriter<'a> {
    dialect: &'a Dialect,
    buf: Vec<u8>,
}

impl<'a> CommandWriter<'a> {
    fn new(dialect: &'a Dialect) -> Self {
        Self {
            dialect,
            buf: Vec::new(),
        }
    }

    fn raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn command(&mut self, cmd: &str) {
        self.buf.extend_from_slice(cmd.as_bytes());
        self.buf.push(self.dialect.terminator);
    }

    fn point_command(&mut self, mnemonic: &str, p: Steps) {
        let (first, second) = if self.dialect.swap_axes {
            (p.y, p.x)
        } else {
            (p.x, p.y)
        };
        self.command(&format!("{}{},{}", mnemonic, first, second));
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::{Mode, PathSequencer};
    use gerbcut_core::{Design, Stroke, Transform};

    fn unit_square_path() -> ToolPath {
        let square = Stroke::closed(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ])
        .unwrap();
        PathSequencer::new(Mode::Standard).sequence(&Design::new(vec![square]))
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
    fn test_square_job_bytes() {
        let job = ProtocolEncoder::new(Dialect::GPGL)
            .encode(&unit_square_path(), &params(vec![PassSetting::new(5, 10)]))
            .unwrap();
        let expected = b"\x1b\x04FN0\x03\\0,0\x03Z508,508\x03!5\x03FX10\x03M0,0\x03D0,508\x03D508,508\x03D508,0\x03D0,0\x03M0,0\x03&1,1,1\x03FO0\x03H\x03";
        assert_eq!(job.as_bytes(), &expected[..]);
        assert_eq!(job.passes(), 1);
    }

    #[test]
    fn test_too_many_passes_rejected() {
        let err = ProtocolEncoder::new(Dialect::GPGL)
            .encode(&unit_square_path(), &params(vec![PassSetting::new(2, 8); 4]))
            .unwrap_err();
        assert_eq!(
            err,
            EncodeError::ParameterOutOfRange {
                name: "passes".to_string(),
                value: 4.0,
                min: 1.0,
                max: 3.0
            }
        );
    }

    #[test]
    fn test_zero_passes_rejected() {
        assert!(validate(&params(vec![])).is_err());
    }

    #[test]
    fn test_force_out_of_range_names_pass() {
        let err = validate(&params(vec![PassSetting::new(2, 8), PassSetting::new(2, 34)])).unwrap_err();
        match err {
            EncodeError::ParameterOutOfRange { name, value, .. } => {
                assert_eq!(name, "force[1]");
                assert_eq!(value, 34.0);
            }
        }
    }

    #[test]
    fn test_speed_zero_rejected() {
        let err = validate(&params(vec![PassSetting::new(0, 8)])).unwrap_err();
        assert!(err.to_string().contains("speed[0]"));
    }

    #[test]
    fn test_non_finite_transform_rejected() {
        let mut p = params(vec![PassSetting::new(2, 8)]);
        p.transform.b = f64::NAN;
        assert!(validate(&p).is_err());
        p.transform.b = 0.0;
        p.margin = -0.1;
        assert!(validate(&p).is_err());
    }

    #[test]
    fn test_quantize_rounds_each_point() {
        let enc = ProtocolEncoder::new(Dialect::GPGL);
        assert_eq!(enc.quantize(Point::new(0.001, -0.001)), Steps { x: 1, y: -1 });
        assert_eq!(enc.quantize(Point::new(1.0 / 1016.0 * 0.99, 0.0)), Steps { x: 0, y: 0 });
    }

    #[test]
    fn test_margin_and_border() {
        let mut p = params(vec![PassSetting::new(2, 8)]);
        p.margin = 0.5;
        p.cut_border = true;
        let job = ProtocolEncoder::new(Dialect::GPGL)
            .encode(&unit_square_path(), &p)
            .unwrap();
        let text = String::from_utf8_lossy(job.as_bytes()).replace('\x03', ";");
        assert!(text.contains("\\-254,-254;Z762,762;"));
        assert!(text.contains("M-254,-254;D-254,762;D762,762;D762,-254;D-254,-254;M-254,-254;"));
    }

    #[test]
    fn test_passes_repeat_geometry() {
        let job = ProtocolEncoder::new(Dialect::GPGL)
            .encode(
                &unit_square_path(),
                &params(vec![PassSetting::new(2, 8), PassSetting::new(3, 30)]),
            )
            .unwrap();
        let text = String::from_utf8_lossy(job.as_bytes()).into_owned();
        assert_eq!(text.matches("D508,508").count(), 2);
        let first = text.find("!2\x03FX8").unwrap();
        let second = text.find("!3\x03FX30").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_quirks_follow_dialect() {
        let mut dialect = Dialect::GPGL;
        dialect.quirks.media_feed_out = false;
        dialect.quirks.return_home = false;
        let job = ProtocolEncoder::new(dialect)
            .encode(&unit_square_path(), &params(vec![PassSetting::new(1, 1)]))
            .unwrap();
        assert!(job.as_bytes().ends_with(b"&1,1,1\x03"));
    }
}
