use gerbcut_communication::{JobOutcome, MockBus, Plotter, PlotterConfig};
use gerbcut_core::EncodedJob;
use gerbcut_devicedb::VENDOR_ID;
use proptest::prelude::*;
use std::sync::Arc;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn streamed_bytes_match_job(len in 0usize..300, chunk_size in 1usize..64) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let bus = Arc::new(MockBus::new());
        let device = bus.attach(VENDOR_ID, 0x1137);
        let config = PlotterConfig { chunk_size, ..Default::default() };
        let (plotter, _rx) = Plotter::new(config, bus.clone());
        let job = EncodedJob::new((0..len).map(|i| i as u8).collect(), 1);
        let expected = job.as_bytes().to_vec();
        let chunks = job.chunk_count(chunk_size);

        let outcome = runtime.block_on(async {
            plotter.connect().unwrap();
            plotter.stream(job).unwrap().wait().await
        });

        prop_assert_eq!(outcome, JobOutcome::Completed);
        prop_assert_eq!(device.writes().len(), chunks);
        prop_assert!(device.writes().iter().all(|w| w.len() <= chunk_size));
        prop_assert_eq!(device.written_bytes(), expected);
    }
}
