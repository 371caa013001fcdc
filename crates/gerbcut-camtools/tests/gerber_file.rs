use gerbcut_camtools::{FileFormatError, GeometryNormalizer, GerberImporter, Primitive};
use gerbcut_core::LengthUnit;
use std::io::Write;

const PADS_AND_TRACE: &str = "%FSLAX26Y26*%
%MOMM*%
%ADD10C,0.250000*%
%ADD11R,1.000000X0.500000*%
D10*
X0Y0D02*
X5000000Y0D01*
D11*
X10000000Y0D03*
X12000000Y0D03*
M02*
";

#[test]
fn test_import_file_and_normalize() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(PADS_AND_TRACE.as_bytes()).unwrap();

    let layer = GerberImporter::default().from_file(file.path()).unwrap();
    assert_eq!(layer.units, LengthUnit::Millimeter);
    assert_eq!(layer.primitives.len(), 3);
    assert!(matches!(layer.primitives[0], Primitive::Line { .. }));
    assert!(matches!(layer.primitives[1], Primitive::Flash { .. }));

    let design = GeometryNormalizer::default().normalize(&layer).unwrap();
    assert_eq!(design.len(), 3);
    assert_eq!(design.closed_count(), 2);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = GerberImporter::default().from_file(dir.path().join("absent.gbr"));
    assert!(matches!(result, Err(FileFormatError::IoError(_))));
}

#[test]
fn test_empty_file_rejected() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let result = GerberImporter::default().from_file(file.path());
    assert!(matches!(result, Err(FileFormatError::EmptyFile(_))));
}
