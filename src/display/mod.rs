pub mod image;
pub mod preview;

pub use image::{to_display_frames, DisplayFrames, DisplayImage, PixelLayout};
pub use preview::PreviewBuffer;

use crate::capture::frame::StreamType;

/// Presentation layer collaborator. Called once per stream per completed tick.
pub trait PresentationSink {
    fn present(&mut self, stream: StreamType, image: &DisplayImage);
}
