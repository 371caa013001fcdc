use gerbcut_core::{
    ConnectionState, CutParameters, Design, DeviceState, PassSetting, Point, Stroke, Transform,
};

#[test]
fn test_cut_parameters_json_uses_defaults_for_missing_fields() {
    let params: CutParameters =
        serde_json::from_str(r#"{ "margin": 0.25, "passes": [{ "speed": 5, "force": 12 }] }"#)
            .unwrap();
    assert_eq!(params.margin, 0.25);
    assert_eq!(params.passes, vec![PassSetting::new(5, 12)]);
    assert_eq!(params.offset, Point::new(1.0, 4.5));
    assert_eq!(params.transform, Transform::IDENTITY);
    assert!(!params.cut_border);
}

#[test]
fn test_design_serialization_keeps_strokes() {
    let tri = Stroke::closed(vec![
        Point::new(0.0, 0.0),
        Point::new(2.0, 0.0),
        Point::new(1.0, 1.0),
    ])
    .unwrap();
    let design = Design::new(vec![tri]);

    let json = serde_json::to_string(&design).unwrap();
    let back: Design = serde_json::from_str(&json).unwrap();
    assert_eq!(back, design);
    assert_eq!(back.extent().width(), 2.0);
}

#[test]
fn test_connection_state_serializes_device_state() {
    let state = ConnectionState::Connected(DeviceState::NotReady);
    let json = serde_json::to_string(&state).unwrap();
    assert_eq!(json, r#"{"Connected":"NotReady"}"#);
}

#[test]
fn test_short_stroke_is_rejected_on_deserialize() {
    let err = serde_json::from_str::<Stroke>(r#"{ "points": [], "closed": true }"#).unwrap_err();
    assert!(err.to_string().contains("at least 2 points"));

    let one = r#"{ "strokes": [{ "points": [{ "x": 1.0, "y": 1.0 }], "closed": false }],
                   "extent": { "min_x": 0.0, "min_y": 0.0, "max_x": 0.0, "max_y": 0.0 } }"#;
    assert!(serde_json::from_str::<Design>(one).is_err());
}

#[test]
fn test_design_extent_is_recomputed_on_deserialize() {
    let json = r#"{ "strokes": [{ "points": [{ "x": 0.0, "y": 0.0 }, { "x": 3.0, "y": 1.0 }],
                                  "closed": false }],
                    "extent": { "min_x": 9.0, "min_y": 9.0, "max_x": 9.0, "max_y": 9.0 } }"#;
    let design: Design = serde_json::from_str(json).unwrap();
    assert_eq!(design.extent().width(), 3.0);
    assert_eq!(design.strokes()[0].end(), Point::new(3.0, 1.0));
}
