//! Storage sinks for recorded frames

use std::path::{Path, PathBuf};

use image::{ExtendedColorType, ImageError, ImageFormat};
use tracing::trace;

use crate::capture::frame::StreamType;
use crate::display::image::{DisplayImage, PixelLayout};
use crate::error::StorageError;

/// Storage collaborator.
///
/// The recorder issues at most one write per (stream, sequence), in
/// increasing sequence order per stream.
pub trait StorageSink {
    fn write_frame(
        &mut self,
        stream: StreamType,
        sequence: u64,
        image: &DisplayImage,
    ) -> Result<(), StorageError>;
}

/// Writes each frame as `<root>/<stream dir>/<sequence>.png`
#[derive(Debug, Clone)]
pub struct PngDirectoryStorage {
    color_dir: PathBuf,
    depth_dir: PathBuf,
}

impl PngDirectoryStorage {
    pub fn new(root: &Path, color_dir: &str, depth_dir: &str) -> Self {
        Self {
            color_dir: root.join(color_dir),
            depth_dir: root.join(depth_dir),
        }
    }

    pub fn dir(&self, stream: StreamType) -> &Path {
        match stream {
            StreamType::Color => &self.color_dir,
            StreamType::Depth => &self.depth_dir,
        }
    }

    pub fn path_for(&self, stream: StreamType, sequence: u64) -> PathBuf {
        self.dir(stream).join(format!("{sequence}.png"))
    }
}

impl StorageSink for PngDirectoryStorage {
    fn write_frame(
        &mut self,
        stream: StreamType,
        sequence: u64,
        image: &DisplayImage,
    ) -> Result<(), StorageError> {
        if !image.is_well_formed() {
            return Err(StorageError::InvalidImage {
                width: image.width,
                height: image.height,
                layout: image.layout,
                len: image.data.len(),
            });
        }

        let path = self.path_for(stream, sequence);
        let color_type = match image.layout {
            PixelLayout::Bgra8 => ExtendedColorType::Rgba8,
            PixelLayout::Gray8 => ExtendedColorType::L8,
        };

        image::save_buffer_with_format(
            &path,
            &image.to_rgba_or_gray(),
            image.width,
            image.height,
            color_type,
            ImageFormat::Png,
        )
        .map_err(|e| match e {
            ImageError::IoError(source) => StorageError::Io {
                path: path.clone(),
                source,
            },
            source => StorageError::Encode {
                path: path.clone(),
                source,
            },
        })?;

        trace!("wrote {}", path.display());
        Ok(())
    }
}
