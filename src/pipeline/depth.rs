//! Depth to intensity normalization

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::capture::frame::FrameDescriptor;
use crate::error::TickError;

/// Largest depth (mm) the intensity scale is laid out for
pub const MAX_ENCODABLE_DEPTH: u16 = 8000;

/// Raw depth units folded into one intensity level
pub const DEPTH_UNITS_PER_LEVEL: u16 = MAX_ENCODABLE_DEPTH / 256;

const DEPTH_BYTES_PER_SAMPLE: usize = 2;

/// Inclusive range of depth values rendered as non-black
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthRange {
    pub min: u16,
    pub max: u16,
}

impl DepthRange {
    pub fn new(min: u16, max: u16) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, depth: u16) -> bool {
        depth >= self.min && depth <= self.max
    }
}

/// Which upper bound filters depth samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthUpperBound {
    /// Everything up to `u16::MAX`, so the far field stays visible
    #[default]
    FullRange,
    /// Cut at the sensor's reliable maximum
    Reliable,
}

/// 8-bit intensity image derived from one depth frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDepthFrame {
    pub descriptor: FrameDescriptor,
    pub intensities: Bytes,
}

/// Intensity level for a single depth sample
#[inline]
pub fn depth_to_intensity(depth: u16, range: DepthRange) -> u8 {
    if !range.contains(depth) {
        return 0;
    }
    (depth / DEPTH_UNITS_PER_LEVEL).min(u8::MAX as u16) as u8
}

/// Maps raw 16-bit depth frames to 8-bit intensities
#[derive(Debug, Clone, Copy)]
pub struct DepthNormalizer {
    range: DepthRange,
}

impl DepthNormalizer {
    pub fn new(range: DepthRange) -> Self {
        Self { range }
    }

    /// Build the filter range from the sensor's reliable range and the
    /// configured upper bound. `min_override` replaces the sensor minimum.
    pub fn from_reliable(
        reliable: DepthRange,
        upper: DepthUpperBound,
        min_override: Option<u16>,
    ) -> Self {
        let min = min_override.unwrap_or(reliable.min);
        let max = match upper {
            DepthUpperBound::FullRange => u16::MAX,
            DepthUpperBound::Reliable => reliable.max,
        };
        Self::new(DepthRange::new(min, max))
    }

    pub fn range(&self) -> DepthRange {
        self.range
    }

    /// Normalize a little-endian 16-bit depth buffer.
    ///
    /// The buffer must hold exactly one 2-byte sample per pixel of
    /// `descriptor`. The output has one byte per pixel and carries the
    /// descriptor through with a bytes-per-pixel of 1.
    pub fn normalize(
        &self,
        depth: &[u8],
        descriptor: &FrameDescriptor,
    ) -> Result<NormalizedDepthFrame, TickError> {
        let bytes_per_pixel = descriptor.bytes_per_pixel as usize;
        let mismatch = TickError::BufferSizeMismatch {
            len: depth.len(),
            bytes_per_pixel,
        };
        if bytes_per_pixel != DEPTH_BYTES_PER_SAMPLE
            || depth.len() % bytes_per_pixel != 0
            || depth.len() / bytes_per_pixel != descriptor.pixel_count()
        {
            return Err(mismatch);
        }

        let intensities: Vec<u8> = depth
            .chunks_exact(DEPTH_BYTES_PER_SAMPLE)
            .map(|s| depth_to_intensity(u16::from_le_bytes([s[0], s[1]]), self.range))
            .collect();

        Ok(NormalizedDepthFrame {
            descriptor: FrameDescriptor::new(descriptor.width, descriptor.height, 1),
            intensities: Bytes::from(intensities),
        })
    }
}
