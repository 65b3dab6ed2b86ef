//! Color to depth coordinate mapping
//!
//! The projection itself belongs to the device calibration. This module only
//! invokes it once per tick while the depth frame is still locked and checks
//! that the table covers the color frame.

use crate::capture::frame::{FrameDescriptor, RawFrame};
use crate::capture::sensor::Sensor;
use crate::error::TickError;

/// Depth-space coordinate of one color pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthSpacePoint {
    pub x: f32,
    pub y: f32,
}

impl DepthSpacePoint {
    /// Marker for color pixels with no depth correspondence
    pub const UNMAPPED: Self = Self {
        x: f32::NEG_INFINITY,
        y: f32::NEG_INFINITY,
    };

    pub fn is_mapped(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One depth-space point per color pixel, row-major
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinateMappingTable {
    pub points: Vec<DepthSpacePoint>,
}

impl CoordinateMappingTable {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of color pixels that landed inside the depth frame
    pub fn mapped_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_mapped()).count()
    }

    /// Depth sample index for a color pixel, if it maps inside `depth`
    pub fn depth_index(&self, color_index: usize, depth: &FrameDescriptor) -> Option<usize> {
        let point = self.points.get(color_index)?;
        if !point.is_mapped() {
            return None;
        }
        let x = (point.x + 0.5).floor();
        let y = (point.y + 0.5).floor();
        if x < 0.0 || y < 0.0 || x >= depth.width as f32 || y >= depth.height as f32 {
            return None;
        }
        Some(y as usize * depth.width as usize + x as usize)
    }
}

/// Map the color frame into the space of `depth` for this tick
pub fn map_color_to_depth<S: Sensor>(
    sensor: &mut S,
    depth: &RawFrame,
    color: &FrameDescriptor,
) -> Result<CoordinateMappingTable, TickError> {
    let table = sensor
        .project_color_to_depth_space(&depth.data)
        .map_err(|e| TickError::Mapping(e.to_string()))?;

    if table.len() != color.pixel_count() {
        return Err(TickError::MappingSizeMismatch {
            expected: color.pixel_count(),
            actual: table.len(),
        });
    }

    Ok(table)
}
