use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Streams delivered by the sensor in each bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamType {
    Color,
    Depth,
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamType::Color => f.write_str("color"),
            StreamType::Depth => f.write_str("depth"),
        }
    }
}

/// Geometry of one stream, negotiated once when the session starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDescriptor {
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,
}

impl FrameDescriptor {
    pub fn new(width: u32, height: u32, bytes_per_pixel: u32) -> Self {
        Self {
            width,
            height,
            bytes_per_pixel,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size in bytes of a full frame
    pub fn frame_size(&self) -> usize {
        self.pixel_count() * self.bytes_per_pixel as usize
    }
}

/// Opaque, monotonic identifier of the device tick a frame was captured on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaptureInstant(u64);

impl CaptureInstant {
    pub fn new(tick: u64) -> Self {
        Self(tick)
    }

    pub fn tick(&self) -> u64 {
        self.0
    }
}

/// Release hook for a locked sensor buffer. Runs exactly once, on drop.
pub struct Lease(Option<Box<dyn FnOnce() + Send>>);

impl Lease {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(release)))
    }

    /// A lease with nothing to give back (owned copies)
    pub fn detached() -> Self {
        Self(None)
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Some(release) = self.0.take() {
            release();
        }
    }
}

impl fmt::Debug for Lease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Lease").field(&self.0.is_some()).finish()
    }
}

/// A sub-frame acquired from the sensor.
///
/// The underlying sensor buffer stays locked until this value is dropped or
/// [`RawFrame::release`] is called, whichever comes first.
#[derive(Debug)]
pub struct RawFrame {
    pub stream: StreamType,
    pub descriptor: FrameDescriptor,
    /// Frame bytes as delivered by the sensor (BGRA for color, little-endian u16 for depth)
    pub data: Bytes,
    pub captured: CaptureInstant,
    lease: Lease,
}

impl RawFrame {
    pub fn new(
        stream: StreamType,
        descriptor: FrameDescriptor,
        data: Bytes,
        captured: CaptureInstant,
        lease: Lease,
    ) -> Self {
        Self {
            stream,
            descriptor,
            data,
            captured,
            lease,
        }
    }

    /// Give the buffer back to the sensor now instead of at end of scope
    pub fn release(self) {
        drop(self.lease);
    }
}

/// Color and depth frames from the same capture instant
#[derive(Debug)]
pub struct FramePair {
    pub color: RawFrame,
    pub depth: RawFrame,
}

impl FramePair {
    pub fn captured(&self) -> CaptureInstant {
        self.color.captured
    }

    /// Release both sensor buffers, depth first
    pub fn release(self) {
        self.depth.release();
        self.color.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counted_frame(counter: &Arc<AtomicUsize>) -> RawFrame {
        let counter = Arc::clone(counter);
        RawFrame::new(
            StreamType::Depth,
            FrameDescriptor::new(2, 2, 2),
            Bytes::from_static(&[0; 8]),
            CaptureInstant::new(7),
            Lease::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn lease_runs_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        {
            let _frame = counted_frame(&released);
            assert_eq!(released.load(Ordering::SeqCst), 0);
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_release_runs_once() {
        let released = Arc::new(AtomicUsize::new(0));
        counted_frame(&released).release();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn descriptor_sizes() {
        let desc = FrameDescriptor::new(512, 424, 2);
        assert_eq!(desc.pixel_count(), 217_088);
        assert_eq!(desc.frame_size(), 434_176);
    }
}
