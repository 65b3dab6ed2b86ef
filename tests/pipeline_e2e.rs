//! End-to-end tests of the tick pipeline against the synthetic sensor

use std::sync::Arc;

use rgbd_recorder::capture::{Sensor, SensorStats, StreamType, SyntheticSensor, TickPlan};
use rgbd_recorder::display::{DisplayImage, PixelLayout, PresentationSink};
use rgbd_recorder::error::{StorageError, TickError};
use rgbd_recorder::pipeline::{run_event_loop, Command, DepthUpperBound, TickProcessor};
use rgbd_recorder::recording::{
    RecorderEvent, RecordingController, RecordingSession, StorageSink,
};
use rgbd_recorder::{DepthConfig, SensorConfig};

/// Storage sink that keeps every write in memory
#[derive(Default)]
struct MemoryStorage {
    writes: Vec<(StreamType, u64, DisplayImage)>,
    fail_every: Option<u64>,
}

impl MemoryStorage {
    fn sequences(&self, stream: StreamType) -> Vec<u64> {
        self.writes
            .iter()
            .filter(|(s, _, _)| *s == stream)
            .map(|(_, n, _)| *n)
            .collect()
    }
}

impl StorageSink for MemoryStorage {
    fn write_frame(
        &mut self,
        stream: StreamType,
        sequence: u64,
        image: &DisplayImage,
    ) -> Result<(), StorageError> {
        if self.fail_every.is_some_and(|n| sequence % n == n - 1) {
            return Err(StorageError::Io {
                path: format!("{stream}/{sequence}.png").into(),
                source: std::io::Error::other("device full"),
            });
        }
        self.writes.push((stream, sequence, image.clone()));
        Ok(())
    }
}

/// Presentation sink that records what was shown
#[derive(Default)]
struct Screen {
    shown: Vec<(StreamType, PixelLayout)>,
}

impl PresentationSink for Screen {
    fn present(&mut self, stream: StreamType, image: &DisplayImage) {
        self.shown.push((stream, image.layout));
    }
}

type Processor = TickProcessor<SyntheticSensor, Screen, MemoryStorage>;

fn small_sensor() -> SensorConfig {
    SensorConfig {
        color_width: 16,
        color_height: 12,
        depth_width: 8,
        depth_height: 6,
        fps: 0,
    }
}

fn build(
    schedule: Vec<TickPlan>,
    storage: MemoryStorage,
) -> (
    Processor,
    Arc<SensorStats>,
    flume::Receiver<rgbd_recorder::capture::FrameArrival>,
    flume::Receiver<RecorderEvent>,
) {
    let mut sensor = SyntheticSensor::new(small_sensor()).with_schedule(schedule);
    let arrivals = sensor.open().unwrap();
    let stats = sensor.stats();
    let (tx, events) = flume::unbounded();
    let processor = TickProcessor::new(
        sensor,
        Screen::default(),
        RecordingController::new(storage, tx),
        &DepthConfig::default(),
    )
    .unwrap();
    (processor, stats, arrivals, events)
}

#[test]
fn three_tick_scenario_records_two_pairs() {
    let schedule = vec![TickPlan::FULL, TickPlan::DEPTH_ONLY, TickPlan::FULL];
    let (mut processor, stats, _arrivals, _events) = build(schedule, MemoryStorage::default());
    let mut session = RecordingSession::new();
    processor.start_recording(&mut session);

    let outcomes: Vec<_> = (0..3)
        .map(|_| {
            let arrival = processor.sensor().trigger().unwrap();
            processor.process_tick(&mut session, &arrival)
        })
        .collect();

    assert_eq!(outcomes[0].as_ref().unwrap().recorded.unwrap().sequence, 0);
    assert_eq!(
        outcomes[1],
        Err(TickError::IncompletePair {
            color: false,
            depth: true
        })
    );
    assert_eq!(outcomes[2].as_ref().unwrap().recorded.unwrap().sequence, 1);

    let storage = processor.storage();
    assert_eq!(storage.sequences(StreamType::Color), vec![0, 1]);
    assert_eq!(storage.sequences(StreamType::Depth), vec![0, 1]);

    // Tick 2 never reached mapping, normalization or display
    assert_eq!(stats.projections(), 2);
    assert_eq!(processor.presenter().shown.len(), 4);
    assert_eq!(stats.acquired(), stats.released());
}

#[test]
fn recorded_depth_is_normalized_gray() {
    let (mut processor, _stats, _arrivals, _events) = build(vec![], MemoryStorage::default());
    let mut session = RecordingSession::new();
    processor.start_recording(&mut session);

    let arrival = processor.sensor().trigger().unwrap();
    processor.process_tick(&mut session, &arrival).unwrap();

    let (_, _, depth) = processor
        .storage()
        .writes
        .iter()
        .find(|(s, _, _)| *s == StreamType::Depth)
        .unwrap();
    assert_eq!(depth.layout, PixelLayout::Gray8);
    assert_eq!((depth.width, depth.height), (8, 6));
    assert_eq!(depth.data.len(), 48);
    // Near samples sit above black, the far-field strip saturates
    assert!(depth.data.iter().all(|&v| v >= 16));
    assert_eq!(depth.data[7], 255);

    let (_, _, color) = processor
        .storage()
        .writes
        .iter()
        .find(|(s, _, _)| *s == StreamType::Color)
        .unwrap();
    assert_eq!(color.layout, PixelLayout::Bgra8);
    assert_eq!(color.data.len(), 16 * 12 * 4);
}

#[test]
fn reliable_upper_bound_blacks_out_far_field() {
    let mut sensor = SyntheticSensor::new(small_sensor());
    sensor.open().unwrap();
    let (tx, _events) = flume::unbounded();
    let config = DepthConfig {
        upper_bound: DepthUpperBound::Reliable,
        min_depth: None,
    };
    let mut processor = TickProcessor::new(
        sensor,
        Screen::default(),
        RecordingController::new(MemoryStorage::default(), tx),
        &config,
    )
    .unwrap();
    let mut session = RecordingSession::new();
    processor.start_recording(&mut session);

    let arrival = processor.sensor().trigger().unwrap();
    processor.process_tick(&mut session, &arrival).unwrap();

    let (_, _, depth) = &processor.storage().writes[1];
    assert!(depth.data.iter().all(|&v| v <= 145));
}

#[test]
fn release_count_matches_acquisitions_under_any_schedule() {
    let schedules = [
        vec![TickPlan::EXPIRED],
        vec![TickPlan::COLOR_ONLY, TickPlan::DEPTH_ONLY],
        vec![
            TickPlan::FULL,
            TickPlan::EXPIRED,
            TickPlan::DEPTH_ONLY,
            TickPlan::FULL,
            TickPlan::COLOR_ONLY,
            TickPlan::FULL,
        ],
    ];

    for schedule in schedules {
        let (mut processor, stats, _arrivals, _events) =
            build(schedule, MemoryStorage::default());
        let mut session = RecordingSession::new();
        processor.start_recording(&mut session);

        let mut pairs = 0;
        for _ in 0..60 {
            let arrival = processor.sensor().trigger().unwrap();
            if processor.process_tick(&mut session, &arrival).is_ok() {
                pairs += 1;
            }
            assert_eq!(stats.outstanding(), 0);
        }

        assert!(pairs <= 60);
        assert_eq!(stats.acquired(), stats.released());
        assert_eq!(session.frames_recorded(), pairs);
    }
}

#[test]
fn write_failures_keep_sequence_contiguous() {
    let storage = MemoryStorage {
        fail_every: Some(3),
        ..Default::default()
    };
    let (mut processor, _stats, _arrivals, events) = build(vec![], storage);
    let mut session = RecordingSession::new();
    processor.start_recording(&mut session);

    let sequences: Vec<u64> = (0..9)
        .map(|_| {
            let arrival = processor.sensor().trigger().unwrap();
            processor
                .process_tick(&mut session, &arrival)
                .unwrap()
                .recorded
                .unwrap()
                .sequence
        })
        .collect();

    assert_eq!(sequences, (0..9).collect::<Vec<_>>());
    assert!(session.is_recording());
    assert_eq!(
        processor.storage().sequences(StreamType::Color),
        vec![0, 1, 3, 4, 6, 7]
    );

    let failures = events
        .drain()
        .filter(|e| matches!(e, RecorderEvent::FrameWriteFailed { .. }))
        .count();
    assert_eq!(failures, 6);
}

#[test]
fn restart_begins_a_new_interval_at_zero() {
    let (mut processor, _stats, _arrivals, _events) = build(vec![], MemoryStorage::default());
    let mut session = RecordingSession::new();

    processor.start_recording(&mut session);
    for _ in 0..4 {
        let arrival = processor.sensor().trigger().unwrap();
        processor.process_tick(&mut session, &arrival).unwrap();
    }
    processor.stop_recording(&mut session);

    let arrival = processor.sensor().trigger().unwrap();
    let idle = processor.process_tick(&mut session, &arrival).unwrap();
    assert_eq!(idle.recorded, None);

    processor.start_recording(&mut session);
    let arrival = processor.sensor().trigger().unwrap();
    let report = processor.process_tick(&mut session, &arrival).unwrap();
    assert_eq!(report.recorded.unwrap().sequence, 0);
    assert_eq!(
        processor.storage().sequences(StreamType::Depth),
        vec![0, 1, 2, 3, 0]
    );
}

#[test]
fn event_loop_processes_queued_arrivals() {
    let schedule = vec![TickPlan::FULL, TickPlan::EXPIRED];
    let (mut processor, stats, arrivals, events) = build(schedule, MemoryStorage::default());
    let mut session = RecordingSession::new();
    processor.start_recording(&mut session);

    for _ in 0..6 {
        processor.sensor().trigger().unwrap();
    }
    let (_cmd_tx, cmd_rx) = flume::unbounded::<Command>();

    let tick_stats = run_event_loop(&mut processor, &mut session, &arrivals, &cmd_rx, Some(6));

    assert_eq!(tick_stats.ticks, 6);
    assert_eq!(tick_stats.pairs, 3);
    assert_eq!(tick_stats.no_frame, 3);
    assert_eq!(tick_stats.recorded, 3);
    assert!(!session.is_recording());
    assert_eq!(stats.acquired(), stats.released());

    let events: Vec<RecorderEvent> = events.drain().collect();
    assert_eq!(
        events,
        vec![
            RecorderEvent::RecordingStarted,
            RecorderEvent::RecordingStopped { frames: 3 }
        ]
    );
}

#[test]
fn event_loop_exits_on_shutdown() {
    let (mut processor, _stats, arrivals, _events) = build(vec![], MemoryStorage::default());
    let mut session = RecordingSession::new();
    let (cmd_tx, cmd_rx) = flume::unbounded();
    cmd_tx.send(Command::Shutdown).unwrap();

    let tick_stats = run_event_loop(&mut processor, &mut session, &arrivals, &cmd_rx, None);
    assert_eq!(tick_stats.ticks, 0);
}
