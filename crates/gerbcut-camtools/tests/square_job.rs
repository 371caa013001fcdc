use gerbcut_camtools::{
    decode, Command, FeatureMerger, GeometryNormalizer, Layer, Mode, PathSequencer, Primitive,
    ProtocolEncoder,
};
use gerbcut_core::{CutParameters, EncodeError, LengthUnit, PassSetting, Point, Transform};
use gerbcut_devicedb::Dialect;

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

fn scenario_params(passes: Vec<PassSetting>) -> CutParameters {
    CutParameters {
        offset: Point::new(0.0, 0.0),
        margin: 0.0,
        transform: Transform::IDENTITY,
        passes,
        cut_border: false,
    }
}

#[test]
fn test_unit_square_decodes_to_single_loop() {
    let design = GeometryNormalizer::default().normalize(&square_layer()).unwrap();
    let design = FeatureMerger::new(0.0, 0.0).merge(&design);
    let path = PathSequencer::new(Mode::Standard).sequence(&design);
    let job = ProtocolEncoder::new(Dialect::GPGL)
        .encode(&path, &scenario_params(vec![PassSetting::new(5, 10)]))
        .unwrap();

    let commands = decode(job.as_bytes(), &Dialect::GPGL);
    let speeds: Vec<_> = commands
        .iter()
        .filter(|c| matches!(c, Command::Speed(_)))
        .collect();
    let forces: Vec<_> = commands
        .iter()
        .filter(|c| matches!(c, Command::Force(_)))
        .collect();
    assert_eq!(speeds, vec![&Command::Speed(5)]);
    assert_eq!(forces, vec![&Command::Force(10)]);

    let draws: Vec<Point> = commands
        .iter()
        .filter(|c| matches!(c, Command::Draw { .. }))
        .filter_map(|c| c.point(&Dialect::GPGL))
        .collect();
    assert_eq!(
        draws,
        vec![
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
            Point::new(0.0, 0.0),
        ]
    );
    assert_eq!(path.loop_count(), 1);
    assert_eq!(commands.last(), Some(&Command::Home));
}

#[test]
fn test_four_passes_fail_before_encoding() {
    let design = GeometryNormalizer::default().normalize(&square_layer()).unwrap();
    let path = PathSequencer::new(Mode::Standard).sequence(&design);
    let result = ProtocolEncoder::new(Dialect::GPGL)
        .encode(&path, &scenario_params(vec![PassSetting::new(5, 10); 4]));
    assert!(matches!(
        result,
        Err(EncodeError::ParameterOutOfRange { ref name, .. }) if name == "passes"
    ));
}

#[test]
fn test_close_squares_merge_only_under_wide_threshold() {
    let square = |x: f64| Primitive::Polygon {
        outline: vec![
            Point::new(x, 0.0),
            Point::new(x + 0.5, 0.0),
            Point::new(x + 0.5, 0.5),
            Point::new(x, 0.5),
        ],
        holes: vec![],
    };
    let layer = Layer::new(LengthUnit::Inch, vec![square(0.0), square(0.501)]);
    let design = GeometryNormalizer::default().normalize(&layer).unwrap();

    assert_eq!(FeatureMerger::new(0.0, 0.01).merge(&design).len(), 1);
    assert_eq!(FeatureMerger::new(0.0, 0.0001).merge(&design).len(), 2);
}
