//! Sensor collaborator interface
//!
//! The device driver is opaque to the recorder. Anything that can hand out
//! frame bundles, lock color/depth sub-frames out of them and project color
//! pixels into depth space can drive the pipeline.

use crate::capture::frame::{CaptureInstant, FrameDescriptor, RawFrame, StreamType};
use crate::capture::mapping::CoordinateMappingTable;
use crate::error::SensorError;
use crate::pipeline::depth::DepthRange;

/// Notification that a new bundle is ready on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameArrival {
    pub captured: CaptureInstant,
}

pub trait Sensor {
    /// Handle from which sub-frames are acquired
    type Bundle;

    /// Open the device and start delivering arrival notifications
    fn open(&mut self) -> Result<flume::Receiver<FrameArrival>, SensorError>;

    fn frame_descriptor(&self, stream: StreamType) -> Result<FrameDescriptor, SensorError>;

    /// Range of depth values the device considers reliable
    fn reliable_depth_range(&self) -> DepthRange;

    /// Resolve an arrival into a bundle. `None` when the bundle has already expired.
    fn acquire_bundle(&mut self, arrival: &FrameArrival) -> Option<Self::Bundle>;

    /// Lock one stream's sub-frame. `None` when that stream is unavailable this tick.
    fn acquire_sub_frame(&mut self, bundle: &Self::Bundle, stream: StreamType)
        -> Option<RawFrame>;

    /// Project every color pixel into depth space using the device calibration
    fn project_color_to_depth_space(
        &mut self,
        depth: &[u8],
    ) -> Result<CoordinateMappingTable, SensorError>;
}
