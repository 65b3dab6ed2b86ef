//! Per-tick processing: acquire, map, normalize, present, record

use std::time::Instant;

use tracing::{debug, info, instrument};

use crate::capture::acquire::acquire_pair;
use crate::capture::frame::{FrameDescriptor, StreamType};
use crate::capture::mapping::map_color_to_depth;
use crate::capture::sensor::{FrameArrival, Sensor};
use crate::display::image::to_display_frames;
use crate::display::PresentationSink;
use crate::error::{SensorError, TickError};
use crate::pipeline::depth::DepthNormalizer;
use crate::recording::{Recorded, RecordingController, RecordingSession, StorageSink};
use crate::DepthConfig;

/// What a completed tick produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Set when the pair was handed to storage
    pub recorded: Option<Recorded>,
    /// Color pixels with a depth correspondence this tick
    pub mapped_pixels: usize,
}

pub type TickOutcome = Result<TickReport, TickError>;

/// Drives one sensor through the frame pipeline
pub struct TickProcessor<S, P, W> {
    sensor: S,
    presenter: P,
    recorder: RecordingController<W>,
    normalizer: DepthNormalizer,
    color: FrameDescriptor,
    depth: FrameDescriptor,
}

impl<S, P, W> TickProcessor<S, P, W>
where
    S: Sensor,
    P: PresentationSink,
    W: StorageSink,
{
    /// Negotiate stream descriptors and the depth filter range. The sensor
    /// must already be open.
    #[instrument(skip_all)]
    pub fn new(
        sensor: S,
        presenter: P,
        recorder: RecordingController<W>,
        depth_config: &DepthConfig,
    ) -> Result<Self, SensorError> {
        let color = sensor.frame_descriptor(StreamType::Color)?;
        let depth = sensor.frame_descriptor(StreamType::Depth)?;
        let normalizer = DepthNormalizer::from_reliable(
            sensor.reliable_depth_range(),
            depth_config.upper_bound,
            depth_config.min_depth,
        );

        info!(
            ?color,
            ?depth,
            range = ?normalizer.range(),
            "Tick processor ready"
        );

        Ok(Self {
            sensor,
            presenter,
            recorder,
            normalizer,
            color,
            depth,
        })
    }

    /// Process one arrival. Frame-level failures abandon the tick and leave
    /// the session untouched; sensor buffers are released on every path.
    pub fn process_tick(
        &mut self,
        session: &mut RecordingSession,
        arrival: &FrameArrival,
    ) -> TickOutcome {
        let started = Instant::now();
        metrics::counter!("ticks_total").increment(1);

        let outcome = self.run_tick(session, arrival);

        match &outcome {
            Ok(_) => {
                metrics::histogram!("tick_time_us").record(started.elapsed().as_micros() as f64);
            }
            Err(e) => {
                debug!(tick = arrival.captured.tick(), "tick skipped: {e}");
                metrics::counter!("ticks_skipped", "reason" => e.reason()).increment(1);
            }
        }
        outcome
    }

    fn run_tick(&mut self, session: &mut RecordingSession, arrival: &FrameArrival) -> TickOutcome {
        let pair = acquire_pair(&mut self.sensor, arrival)?;

        // Mapping needs the depth buffer locked; the table dies with this scope
        let mapping = map_color_to_depth(&mut self.sensor, &pair.depth, &self.color)?;
        let mapped_pixels = mapping.mapped_count();
        drop(mapping);

        let normalized = self.normalizer.normalize(&pair.depth.data, &self.depth)?;
        let frames = to_display_frames(&pair.color, &normalized);

        self.presenter.present(StreamType::Color, &frames.color);
        self.presenter.present(StreamType::Depth, &frames.depth);

        let recorded = self.recorder.record(session, &frames);
        pair.release();

        Ok(TickReport {
            recorded,
            mapped_pixels,
        })
    }

    pub fn start_recording(&mut self, session: &mut RecordingSession) -> bool {
        self.recorder.start(session)
    }

    pub fn stop_recording(&mut self, session: &mut RecordingSession) -> bool {
        self.recorder.stop(session)
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn storage(&self) -> &W {
        self.recorder.storage()
    }

    pub fn into_parts(self) -> (S, P, W) {
        (self.sensor, self.presenter, self.recorder.into_storage())
    }
}
