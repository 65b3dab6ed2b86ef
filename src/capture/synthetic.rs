//! Synthetic RGB-D sensor
//!
//! Generates a deterministic color gradient and a depth ramp so the pipeline
//! can run without hardware. A per-tick schedule decides whether the bundle
//! and each sub-frame are available, and every locked buffer is accounted for.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use crossbeam::utils::CachePadded;
use tracing::{debug, info, instrument};

use crate::capture::frame::{CaptureInstant, FrameDescriptor, Lease, RawFrame, StreamType};
use crate::capture::mapping::{CoordinateMappingTable, DepthSpacePoint};
use crate::capture::sensor::{FrameArrival, Sensor};
use crate::error::SensorError;
use crate::pipeline::depth::DepthRange;
use crate::SensorConfig;

/// Closest distance (mm) the synthetic device reports as reliable
pub const MIN_RELIABLE_DEPTH: u16 = 500;
/// Farthest distance (mm) the synthetic device reports as reliable
pub const MAX_RELIABLE_DEPTH: u16 = 4500;

const COLOR_BYTES_PER_PIXEL: u32 = 4;
const DEPTH_BYTES_PER_PIXEL: u32 = 2;

/// What the device delivers on one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPlan {
    pub bundle: bool,
    pub color: bool,
    pub depth: bool,
    /// Depth sub-frame is stamped with the previous tick's instant (no effect on tick 0)
    pub stale_depth: bool,
}

impl TickPlan {
    pub const FULL: Self = Self {
        bundle: true,
        color: true,
        depth: true,
        stale_depth: false,
    };
    pub const EXPIRED: Self = Self {
        bundle: false,
        color: false,
        depth: false,
        stale_depth: false,
    };
    pub const COLOR_ONLY: Self = Self {
        bundle: true,
        color: true,
        depth: false,
        stale_depth: false,
    };
    pub const DEPTH_ONLY: Self = Self {
        bundle: true,
        color: false,
        depth: true,
        stale_depth: false,
    };
    pub const DESYNCED: Self = Self {
        bundle: true,
        color: true,
        depth: true,
        stale_depth: true,
    };
}

/// Buffer and projection accounting, shared with whoever wants to observe it
#[derive(Debug, Default)]
pub struct SensorStats {
    acquired: CachePadded<AtomicUsize>,
    released: CachePadded<AtomicUsize>,
    projections: CachePadded<AtomicUsize>,
}

impl SensorStats {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Buffers currently locked
    pub fn outstanding(&self) -> usize {
        self.acquired().saturating_sub(self.released())
    }

    pub fn projections(&self) -> usize {
        self.projections.load(Ordering::SeqCst)
    }
}

pub struct SyntheticBundle {
    captured: CaptureInstant,
    plan: TickPlan,
}

pub struct SyntheticSensor {
    config: SensorConfig,
    schedule: Vec<TickPlan>,
    stats: Arc<SensorStats>,
    next_tick: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    arrivals: Option<flume::Sender<FrameArrival>>,
}

impl SyntheticSensor {
    pub fn new(config: SensorConfig) -> Self {
        Self {
            config,
            schedule: Vec::new(),
            stats: Arc::new(SensorStats::default()),
            next_tick: Arc::new(AtomicU64::new(0)),
            running: Arc::new(AtomicBool::new(false)),
            arrivals: None,
        }
    }

    /// Availability per tick, cycled. An empty schedule delivers every frame.
    pub fn with_schedule(mut self, schedule: Vec<TickPlan>) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn stats(&self) -> Arc<SensorStats> {
        Arc::clone(&self.stats)
    }

    /// Emit one arrival notification by hand
    pub fn trigger(&self) -> Result<FrameArrival, SensorError> {
        let tx = self.arrivals.as_ref().ok_or(SensorError::NotOpen)?;
        let arrival = FrameArrival {
            captured: CaptureInstant::new(self.next_tick.fetch_add(1, Ordering::SeqCst)),
        };
        // Nobody listening is not an error for a manual trigger
        let _ = tx.send(arrival);
        Ok(arrival)
    }

    fn plan_for(&self, tick: u64) -> TickPlan {
        if self.schedule.is_empty() {
            return TickPlan::FULL;
        }
        self.schedule[(tick % self.schedule.len() as u64) as usize]
    }

    fn descriptor(&self, stream: StreamType) -> FrameDescriptor {
        match stream {
            StreamType::Color => FrameDescriptor::new(
                self.config.color_width,
                self.config.color_height,
                COLOR_BYTES_PER_PIXEL,
            ),
            StreamType::Depth => FrameDescriptor::new(
                self.config.depth_width,
                self.config.depth_height,
                DEPTH_BYTES_PER_PIXEL,
            ),
        }
    }

    fn lease(&self) -> Lease {
        self.stats.acquired.fetch_add(1, Ordering::SeqCst);
        let stats = Arc::clone(&self.stats);
        Lease::new(move || {
            stats.released.fetch_add(1, Ordering::SeqCst);
        })
    }
}

impl Sensor for SyntheticSensor {
    type Bundle = SyntheticBundle;

    #[instrument(skip(self), fields(fps = self.config.fps))]
    fn open(&mut self) -> Result<flume::Receiver<FrameArrival>, SensorError> {
        if self.config.color_width == 0
            || self.config.color_height == 0
            || self.config.depth_width == 0
            || self.config.depth_height == 0
        {
            return Err(SensorError::OpenFailed(
                "frame dimensions must be non-zero".into(),
            ));
        }

        let (tx, rx) = flume::unbounded();
        self.running.store(true, Ordering::SeqCst);

        if self.config.fps > 0 {
            let interval = Duration::from_secs_f64(1.0 / self.config.fps as f64);
            let ticker_tx = tx.clone();
            let next_tick = Arc::clone(&self.next_tick);
            let running = Arc::clone(&self.running);

            thread::Builder::new()
                .name("synthetic-sensor".into())
                .spawn(move || {
                    while running.load(Ordering::SeqCst) {
                        let arrival = FrameArrival {
                            captured: CaptureInstant::new(next_tick.fetch_add(1, Ordering::SeqCst)),
                        };
                        if ticker_tx.send(arrival).is_err() {
                            break;
                        }
                        thread::sleep(interval);
                    }
                    debug!("synthetic ticker stopped");
                })
                .map_err(|e| SensorError::OpenFailed(e.to_string()))?;
        }

        self.arrivals = Some(tx);
        info!(
            "Synthetic sensor open: color {}x{}, depth {}x{}",
            self.config.color_width,
            self.config.color_height,
            self.config.depth_width,
            self.config.depth_height
        );
        Ok(rx)
    }

    fn frame_descriptor(&self, stream: StreamType) -> Result<FrameDescriptor, SensorError> {
        if self.arrivals.is_none() {
            return Err(SensorError::NotOpen);
        }
        Ok(self.descriptor(stream))
    }

    fn reliable_depth_range(&self) -> DepthRange {
        DepthRange::new(MIN_RELIABLE_DEPTH, MAX_RELIABLE_DEPTH)
    }

    fn acquire_bundle(&mut self, arrival: &FrameArrival) -> Option<SyntheticBundle> {
        let plan = self.plan_for(arrival.captured.tick());
        plan.bundle.then_some(SyntheticBundle {
            captured: arrival.captured,
            plan,
        })
    }

    fn acquire_sub_frame(
        &mut self,
        bundle: &SyntheticBundle,
        stream: StreamType,
    ) -> Option<RawFrame> {
        let available = match stream {
            StreamType::Color => bundle.plan.color,
            StreamType::Depth => bundle.plan.depth,
        };
        if !available {
            return None;
        }

        let descriptor = self.descriptor(stream);
        let tick = bundle.captured.tick();
        let data = match stream {
            StreamType::Color => color_pattern(&descriptor, tick),
            StreamType::Depth => depth_pattern(&descriptor, tick),
        };

        let captured = match stream {
            StreamType::Depth if bundle.plan.stale_depth => {
                CaptureInstant::new(tick.saturating_sub(1))
            }
            _ => bundle.captured,
        };

        Some(RawFrame::new(stream, descriptor, data, captured, self.lease()))
    }

    fn project_color_to_depth_space(
        &mut self,
        depth: &[u8],
    ) -> Result<CoordinateMappingTable, SensorError> {
        self.stats.projections.fetch_add(1, Ordering::SeqCst);

        let color = self.descriptor(StreamType::Color);
        let depth_desc = self.descriptor(StreamType::Depth);
        if depth.len() != depth_desc.frame_size() {
            return Err(SensorError::Projection(format!(
                "expected {} depth bytes, got {}",
                depth_desc.frame_size(),
                depth.len()
            )));
        }

        let sx = depth_desc.width as f32 / color.width as f32;
        let sy = depth_desc.height as f32 / color.height as f32;

        let mut points = Vec::with_capacity(color.pixel_count());
        for v in 0..color.height {
            for u in 0..color.width {
                let x = u as f32 * sx;
                let y = v as f32 * sy;
                let idx = (y as usize * depth_desc.width as usize + x as usize) * 2;
                let sample = u16::from_le_bytes([depth[idx], depth[idx + 1]]);
                points.push(if sample == 0 {
                    DepthSpacePoint::UNMAPPED
                } else {
                    DepthSpacePoint { x, y }
                });
            }
        }

        Ok(CoordinateMappingTable { points })
    }
}

impl Drop for SyntheticSensor {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// BGRA gradient whose red channel drifts with the tick
fn color_pattern(desc: &FrameDescriptor, tick: u64) -> Bytes {
    let mut data = Vec::with_capacity(desc.frame_size());
    let red = ((tick * 4) % 256) as u8;
    for y in 0..desc.height {
        for x in 0..desc.width {
            data.push((x * 255 / desc.width.max(1)) as u8);
            data.push((y * 255 / desc.height.max(1)) as u8);
            data.push(red);
            data.push(255);
        }
    }
    Bytes::from(data)
}

/// Little-endian depth ramp from near to far, with a dropout row every 16
/// lines and a far-field strip past the reliable range on the right edge.
fn depth_pattern(desc: &FrameDescriptor, tick: u64) -> Bytes {
    let mut data = Vec::with_capacity(desc.frame_size());
    let wobble = ((tick % 64) * 8) as u32;
    let span = (MAX_RELIABLE_DEPTH - MIN_RELIABLE_DEPTH) as u32;
    for y in 0..desc.height {
        for x in 0..desc.width {
            let sample = if y % 16 == 15 {
                0
            } else if x >= desc.width - desc.width / 8 {
                9000 + wobble
            } else {
                MIN_RELIABLE_DEPTH as u32 + x * span / desc.width + wobble
            };
            data.extend_from_slice(&(sample.min(u16::MAX as u32) as u16).to_le_bytes());
        }
    }
    Bytes::from(data)
}
