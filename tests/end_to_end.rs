use gerbcut::{
    decode, prepare_gerber, prepare_job, send_to_cutter, CancelToken, Command, CutMode,
    CutParameters, Dialect, GerbcutConfig, JobOptions, JobOutcome, LengthUnit, Layer, MockBus,
    EncodedJob, Error, PassSetting, Plotter, PlotterConfig, PlotterEvent, Point, Primitive, Stage,
    Transform, TransportError, VENDOR_ID,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

const SQUARE_JOB: &[u8] = b"\x1b\x04FN0\x03\\0,0\x03Z508,508\x03!5\x03FX10\x03M0,0\x03D0,508\x03D508,508\x03D508,0\x03D0,0\x03M0,0\x03&1,1,1\x03FO0\x03H\x03";

fn unit_square() -> Layer {
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

fn standard() -> JobOptions {
    JobOptions {
        mode: CutMode::Standard,
        ..Default::default()
    }
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

#[tokio::test]
async fn test_unit_square_reaches_device() {
    let prepared = prepare_job(
        &unit_square(),
        &standard(),
        &params(vec![PassSetting::new(5, 10)]),
        &Dialect::GPGL,
    )
    .unwrap();
    assert_eq!(prepared.job.as_bytes(), SQUARE_JOB);

    let bus = Arc::new(MockBus::new());
    let device = bus.attach(VENDOR_ID, 0x112F);
    let (plotter, mut rx) = Plotter::new(
        PlotterConfig {
            chunk_size: 16,
            ..Default::default()
        },
        bus.clone(),
    );

    let outcome = send_to_cutter(&plotter, prepared.job).await.unwrap();
    assert_eq!(outcome, JobOutcome::Completed);
    assert_eq!(device.written_bytes(), SQUARE_JOB);
    assert_eq!(device.writes().len(), SQUARE_JOB.len().div_ceil(16));
    assert!(!device.is_claimed());

    let mut progress = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let PlotterEvent::Progress { sent, .. } = event {
            progress.push(sent);
        }
    }
    assert!(progress.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(progress.last(), Some(&SQUARE_JOB.len()));
}

#[tokio::test]
async fn test_four_passes_never_touch_the_device() {
    let bus = Arc::new(MockBus::new());
    let device = bus.attach(VENDOR_ID, 0x1123);
    let (plotter, _rx) = Plotter::new(PlotterConfig::default(), bus.clone());

    let err = prepare_job(
        &unit_square(),
        &standard(),
        &params(vec![PassSetting::new(2, 8); 4]),
        &Dialect::GPGL,
    )
    .unwrap_err();

    assert_eq!(err.stage(), Stage::Encoding);
    assert!(err.to_string().contains("passes"));
    assert_eq!(bus.open_count(), 0);
    assert!(device.writes().is_empty());
    assert!(!plotter.state().is_connected());
}

#[tokio::test]
async fn test_cancel_mid_job() {
    let mut cut = params(vec![PassSetting::new(2, 8), PassSetting::new(2, 30)]);
    cut.margin = 0.5;
    cut.cut_border = true;
    let prepared = prepare_job(&unit_square(), &standard(), &cut, &Dialect::GPGL).unwrap();

    let bus = Arc::new(MockBus::new());
    let device = bus.attach(VENDOR_ID, 0x1137);
    let (plotter, _rx) = Plotter::new(
        PlotterConfig {
            chunk_size: 8,
            ..Default::default()
        },
        bus.clone(),
    );
    plotter.connect().unwrap();

    let token = CancelToken::new();
    let trigger = token.clone();
    device.after_writes(2, move || trigger.cancel());
    let outcome = plotter
        .stream_with_cancel(prepared.job, token)
        .unwrap()
        .wait()
        .await;

    assert_eq!(
        outcome,
        JobOutcome::Cancelled {
            chunks_sent: 2,
            bytes_sent: 16
        }
    );
    assert_eq!(device.writes().len(), 2);
    assert_eq!(device.releases(), 1);
    assert!(plotter.state().is_connected());
}

#[tokio::test]
async fn test_second_send_is_rejected_while_streaming() {
    let bus = Arc::new(MockBus::new());
    let device = bus.attach(VENDOR_ID, 0x1123);
    device.set_write_delay(Duration::from_millis(50));
    let (plotter, _rx) = Plotter::new(
        PlotterConfig {
            chunk_size: 4,
            ..Default::default()
        },
        bus.clone(),
    );
    plotter.connect().unwrap();
    let first = plotter.stream(EncodedJob::new(vec![0x20; 80], 1)).unwrap();

    let started = Instant::now();
    let err = send_to_cutter(&plotter, EncodedJob::new(vec![0x20; 8], 1))
        .await
        .unwrap_err();
    assert!(started.elapsed() < Duration::from_millis(200));
    assert!(matches!(
        err,
        Error::Transport(TransportError::AlreadyStreaming)
    ));

    first.cancel();
    first.wait().await;
}

#[test]
fn test_gerber_text_to_job() {
    let gerber = "%FSLAX26Y26*%
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
    let config = GerbcutConfig::default();
    let (options, cut) = config.job();
    let prepared = prepare_gerber(gerber, &options, &cut, &Dialect::GPGL).unwrap();

    assert!(!prepared.design.is_empty());
    let commands = decode(prepared.job.as_bytes(), &Dialect::GPGL);
    assert_eq!(commands.first(), Some(&Command::Initialize));
    assert!(commands.iter().any(|c| matches!(c, Command::Draw { .. })));
    let passes = commands
        .iter()
        .filter(|c| matches!(c, Command::Speed(_)))
        .count();
    assert_eq!(passes, 2);
    assert_eq!(commands.last(), Some(&Command::Home));
}

#[test]
fn test_bad_gerber_is_reported() {
    let (options, cut) = GerbcutConfig::default().job();
    let err = prepare_gerber("", &options, &cut, &Dialect::GPGL).unwrap_err();
    assert_eq!(err.stage(), Stage::Other);
}
