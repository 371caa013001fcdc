use crate::error::{FileFormatError, FileFormatResult};
use crate::normalizer::GeometryNormalizer;
use crate::primitives::{Aperture, Layer, Primitive, YAxis};
use gerber_parser::parse;
use gerber_types::{Command, CoordinateNumber, DCode, FunctionCode, InterpolationMode, Operation, Unit};
use gerbcut_core::{LengthUnit, Point};
use regex::Regex;
use std::fs;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, warn};

/// Reads RS-274X Gerber data into a primitive [`Layer`].
///
/// Draws become lines and arcs on the trace centerline, flashes keep their
/// aperture and G36/G37 regions become polygons. Coordinates stay in the
/// file's own units.
#[derive(Debug, Default)]
pub struct GerberImporter {
    normalizer: GeometryNormalizer,
}

/// Region being collected between G36 and G37
#[derive(Debug, Default)]
struct RegionBuilder {
    contours: Vec<Vec<Point>>,
    current: Vec<Point>,
}

impl RegionBuilder {
    fn move_to(&mut self, p: Point) {
        self.finish_contour();
        self.current.push(p);
    }

    fn line_to(&mut self, from: Point, p: Point) {
        if self.current.is_empty() {
            self.current.push(from);
        }
        self.current.push(p);
    }

    fn finish_contour(&mut self) {
        let contour = std::mem::take(&mut self.current);
        if contour.len() >= 3 {
            self.contours.push(contour);
        }
    }

    fn into_primitives(mut self) -> Vec<Primitive> {
        self.finish_contour();
        self.contours
            .into_iter()
            .map(|outline| Primitive::Polygon {
                outline,
                holes: Vec::new(),
            })
            .collect()
    }
}

impl GerberImporter {
    pub fn new(normalizer: GeometryNormalizer) -> Self {
        Self { normalizer }
    }

    /// Read and parse a Gerber file
    pub fn from_file(&self, path: impl AsRef<Path>) -> FileFormatResult<Layer> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Err(FileFormatError::EmptyFile(path.display().to_string()));
        }
        self.parse(&content)
    }

    /// Parse Gerber source text
    pub fn parse(&self, gerber_content: &str) -> FileFormatResult<Layer> {
        if gerber_content.trim().is_empty() {
            return Err(FileFormatError::EmptyFile("<input>".to_string()));
        }

        let sanitized = sanitize(gerber_content)?;
        let reader = BufReader::new(sanitized.as_bytes());
        let doc = match parse(reader) {
            Ok(d) => d,
            Err((d, e)) => {
                warn!(
                    "Gerber parser returned error, attempting to use partial document. Error: {:?}",
                    e
                );
                d
            }
        };

        let decimals = match &doc.format_specification {
            Some(fmt) => {
                debug!("Format specification: {}.{}", fmt.integer, fmt.decimal);
                fmt.decimal
            }
            None => {
                warn!("No Format Specification found, assuming 2.4");
                4
            }
        };
        let divisor = 10f64.powi(decimals as i32);

        let units = match &doc.units {
            Some(Unit::Millimeters) => LengthUnit::Millimeter,
            Some(Unit::Inches) => LengthUnit::Inch,
            None => {
                warn!("No Units found, assuming Millimeters");
                LengthUnit::Millimeter
            }
        };

        let convert_coord = |c: &CoordinateNumber| -> f64 { coordinate_value(c) / divisor };

        let mut primitives = Vec::new();
        let mut current = Point::default();
        let mut current_aperture_code = 0;
        let mut interpolation = InterpolationMode::Linear;
        let mut region: Option<RegionBuilder> = None;

        for command in doc.commands() {
            match command {
                Command::FunctionCode(FunctionCode::DCode(dcode)) => match dcode {
                    DCode::Operation(op) => match op {
                        Operation::Interpolate(coord, offset) => {
                            // D01 - Draw
                            let target = Point::new(
                                coord
                                    .as_ref()
                                    .and_then(|c| c.x.as_ref())
                                    .map(convert_coord)
                                    .unwrap_or(current.x),
                                coord
                                    .as_ref()
                                    .and_then(|c| c.y.as_ref())
                                    .map(convert_coord)
                                    .unwrap_or(current.y),
                            );

                            let draw = match interpolation {
                                InterpolationMode::Linear => Primitive::Line {
                                    start: current,
                                    end: target,
                                },
                                InterpolationMode::ClockwiseCircular
                                | InterpolationMode::CounterclockwiseCircular => {
                                    let i = offset
                                        .as_ref()
                                        .and_then(|c| c.x.as_ref())
                                        .map(convert_coord)
                                        .unwrap_or(0.0);
                                    let j = offset
                                        .as_ref()
                                        .and_then(|c| c.y.as_ref())
                                        .map(convert_coord)
                                        .unwrap_or(0.0);
                                    arc_between(
                                        current,
                                        target,
                                        Point::new(current.x + i, current.y + j),
                                        matches!(
                                            interpolation,
                                            InterpolationMode::ClockwiseCircular
                                        ),
                                    )
                                }
                            };

                            match region.as_mut() {
                                Some(builder) => match draw {
                                    Primitive::Arc {
                                        center,
                                        radius,
                                        start_angle,
                                        end_angle,
                                        clockwise,
                                    } => {
                                        let pts = self.normalizer.arc_points(
                                            center,
                                            radius,
                                            start_angle,
                                            end_angle,
                                            clockwise,
                                            units.to_inches(1.0),
                                        );
                                        for p in pts.into_iter().skip(1) {
                                            builder.line_to(current, p);
                                        }
                                    }
                                    _ => builder.line_to(current, target),
                                },
                                None => primitives.push(draw),
                            }
                            current = target;
                        }
                        Operation::Move(coord) => {
                            // D02 - Move
                            current = Point::new(
                                coord
                                    .as_ref()
                                    .and_then(|c| c.x.as_ref())
                                    .map(convert_coord)
                                    .unwrap_or(current.x),
                                coord
                                    .as_ref()
                                    .and_then(|c| c.y.as_ref())
                                    .map(convert_coord)
                                    .unwrap_or(current.y),
                            );
                            if let Some(builder) = region.as_mut() {
                                builder.move_to(current);
                            }
                        }
                        Operation::Flash(coord) => {
                            // D03 - Flash
                            let position = Point::new(
                                coord
                                    .as_ref()
                                    .and_then(|c| c.x.as_ref())
                                    .map(convert_coord)
                                    .unwrap_or(current.x),
                                coord
                                    .as_ref()
                                    .and_then(|c| c.y.as_ref())
                                    .map(convert_coord)
                                    .unwrap_or(current.y),
                            );
                            match doc.apertures.get(&current_aperture_code) {
                                Some(ap) => primitives.push(Primitive::Flash {
                                    position,
                                    aperture: convert_aperture(ap),
                                }),
                                None => warn!(
                                    "Flash with undefined aperture D{}, skipping",
                                    current_aperture_code
                                ),
                            }
                            current = position;
                        }
                    },
                    DCode::SelectAperture(code) => {
                        current_aperture_code = *code;
                    }
                },
                Command::FunctionCode(FunctionCode::GCode(gcode)) => {
                    use gerber_types::GCode as GGCode;
                    match gcode {
                        GGCode::InterpolationMode(mode) => {
                            interpolation = *mode;
                        }
                        GGCode::RegionMode(true) => {
                            region = Some(RegionBuilder::default());
                        }
                        GGCode::RegionMode(false) => {
                            if let Some(builder) = region.take() {
                                primitives.extend(builder.into_primitives());
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        if let Some(builder) = region.take() {
            warn!("Unterminated G36 region, closing at end of file");
            primitives.extend(builder.into_primitives());
        }

        if primitives.is_empty() {
            warn!("Gerber data produced no drawable primitives");
        }
        debug!("Imported {} primitives ({})", primitives.len(), units.label());

        Ok(Layer {
            units,
            y_axis: YAxis::Up,
            primitives,
        })
    }
}

/// Drop repeated `%FS` and `%MO` headers, which the parser rejects
fn sanitize(gerber_content: &str) -> FileFormatResult<String> {
    let mut sanitized = gerber_content.to_string();
    for pattern in [r"%FS.*?\*%", r"%MO.*?\*%"] {
        let re = Regex::new(pattern).map_err(|e| FileFormatError::GerberParseError(e.to_string()))?;
        let mut count = 0;
        sanitized = re
            .replace_all(&sanitized, |caps: &regex::Captures| {
                count += 1;
                if count > 1 {
                    String::new()
                } else {
                    caps[0].to_string()
                }
            })
            .to_string();
    }
    Ok(sanitized)
}

/// Raw integer value of a coordinate, read from its debug form
fn coordinate_value(c: &CoordinateNumber) -> f64 {
    let s = format!("{:?}", c);
    if let Some(start) = s.find("nano: ") {
        let rest = &s[start + 6..];
        let end = rest.find([' ', '}']).unwrap_or(rest.len());
        rest[..end].parse::<f64>().unwrap_or(0.0)
    } else {
        s.trim_start_matches("CoordinateNumber(")
            .trim_end_matches(')')
            .trim_start_matches("CoordinateNumber {")
            .trim_end_matches('}')
            .trim()
            .parse::<f64>()
            .unwrap_or(0.0)
    }
}

fn arc_between(start: Point, end: Point, center: Point, clockwise: bool) -> Primitive {
    Primitive::Arc {
        center,
        radius: start.distance(&center),
        start_angle: (start.y - center.y).atan2(start.x - center.x),
        end_angle: (end.y - center.y).atan2(end.x - center.x),
        clockwise,
    }
}

fn convert_aperture(ap: &gerber_types::Aperture) -> Aperture {
    use gerber_types::Aperture as GAperture;
    match ap {
        GAperture::Circle(c) => Aperture::Circle {
            diameter: c.diameter,
        },
        GAperture::Rectangle(r) => Aperture::Rectangle {
            width: r.x,
            height: r.y,
        },
        GAperture::Obround(o) => Aperture::Obround {
            width: o.x,
            height: o.y,
        },
        GAperture::Polygon(p) => Aperture::RegularPolygon {
            diameter: p.diameter,
            vertices: p.vertices as u32,
            rotation: p.rotation.unwrap_or(0.0),
        },
        GAperture::Macro(name, ..) => Aperture::Macro { name: name.clone() },
    }
}
