//! Error taxonomy for the recorder
//!
//! Frame-level errors ([`TickError`], [`StorageError`]) are recovered inside
//! the tick that raised them. [`SensorError`] during setup is fatal.

use std::path::PathBuf;

use thiserror::Error;

use crate::capture::{CaptureInstant, StreamType};
use crate::display::PixelLayout;

/// Reasons a single tick is abandoned
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TickError {
    /// The frame bundle expired before it could be processed
    #[error("frame bundle expired before processing")]
    NoFrame,

    /// One of the two sub-frames was unavailable
    #[error("incomplete frame pair (color: {color}, depth: {depth})")]
    IncompletePair { color: bool, depth: bool },

    /// Both sub-frames were acquired but belong to different capture instants
    #[error("color frame {color:?} and depth frame {depth:?} are not from the same capture")]
    Desynchronized {
        color: CaptureInstant,
        depth: CaptureInstant,
    },

    /// Depth buffer length is not a whole number of samples
    #[error("depth buffer of {len} bytes is not a multiple of {bytes_per_pixel} bytes per pixel")]
    BufferSizeMismatch { len: usize, bytes_per_pixel: usize },

    /// The coordinate mapper returned a table that does not cover the color frame
    #[error("coordinate mapping has {actual} points, color frame has {expected} pixels")]
    MappingSizeMismatch { expected: usize, actual: usize },

    /// The sensor failed to project the depth frame
    #[error("coordinate mapping failed: {0}")]
    Mapping(String),
}

impl TickError {
    /// Short label used for metrics and stats
    pub fn reason(&self) -> &'static str {
        match self {
            TickError::NoFrame => "no_frame",
            TickError::IncompletePair { .. } => "incomplete_pair",
            TickError::Desynchronized { .. } => "desynchronized",
            TickError::BufferSizeMismatch { .. } => "buffer_size_mismatch",
            TickError::MappingSizeMismatch { .. } | TickError::Mapping(_) => "mapping",
        }
    }
}

/// Storage write failures. Reported per frame, never fatal to a session.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image buffer of {len} bytes does not match {width}x{height} {layout}")]
    InvalidImage {
        width: u32,
        height: u32,
        layout: PixelLayout,
        len: usize,
    },

    #[error("background writer queue is full, dropped {stream} frame {sequence}")]
    QueueFull { stream: StreamType, sequence: u64 },

    #[error("background writer has shut down")]
    WriterClosed,
}

/// Device setup failures. Without these nothing can ever be captured.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("failed to open sensor: {0}")]
    OpenFailed(String),

    #[error("sensor has no frame description for the {0} stream")]
    DescriptorUnavailable(StreamType),

    #[error("sensor is not open")]
    NotOpen,

    #[error("color to depth projection failed: {0}")]
    Projection(String),
}
