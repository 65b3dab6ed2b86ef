//! Conversion of tick output into presentable images

use std::fmt;

use bytes::Bytes;

use crate::capture::frame::{RawFrame, StreamType};
use crate::pipeline::depth::NormalizedDepthFrame;

/// Pixel layouts produced for presentation and storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// 32-bit blue, green, red, alpha
    Bgra8,
    /// 8-bit intensity
    Gray8,
}

impl PixelLayout {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelLayout::Bgra8 => 4,
            PixelLayout::Gray8 => 1,
        }
    }
}

impl fmt::Display for PixelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelLayout::Bgra8 => f.write_str("bgra8"),
            PixelLayout::Gray8 => f.write_str("gray8"),
        }
    }
}

/// Image ready for a presentation or storage sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayImage {
    pub stream: StreamType,
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub data: Bytes,
}

impl DisplayImage {
    /// Row length in bytes
    pub fn stride(&self) -> usize {
        self.width as usize * self.layout.bytes_per_pixel()
    }

    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.stride() * self.height as usize
    }

    /// Pixel data reordered to RGBA (color) or passed through (gray)
    pub fn to_rgba_or_gray(&self) -> Vec<u8> {
        match self.layout {
            PixelLayout::Bgra8 => {
                let mut rgba = Vec::with_capacity(self.data.len());
                for px in self.data.chunks_exact(4) {
                    rgba.push(px[2]); // R
                    rgba.push(px[1]); // G
                    rgba.push(px[0]); // B
                    rgba.push(px[3]); // A
                }
                rgba
            }
            PixelLayout::Gray8 => self.data.to_vec(),
        }
    }
}

/// One tick's worth of images
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFrames {
    pub color: DisplayImage,
    pub depth: DisplayImage,
}

/// Wrap the raw color frame and the normalized depth frame as images.
///
/// Buffers are reference counted, so no pixel data is copied here.
pub fn to_display_frames(color: &RawFrame, depth: &NormalizedDepthFrame) -> DisplayFrames {
    DisplayFrames {
        color: DisplayImage {
            stream: StreamType::Color,
            width: color.descriptor.width,
            height: color.descriptor.height,
            layout: PixelLayout::Bgra8,
            data: color.data.clone(),
        },
        depth: DisplayImage {
            stream: StreamType::Depth,
            width: depth.descriptor.width,
            height: depth.descriptor.height,
            layout: PixelLayout::Gray8,
            data: depth.intensities.clone(),
        },
    }
}
