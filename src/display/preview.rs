//! Bounded preview buffer for presented images

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::utils::CachePadded;
use ringbuf::traits::{Consumer, Observer, RingBuffer};
use ringbuf::HeapRb;

use crate::capture::frame::StreamType;
use crate::display::image::DisplayImage;
use crate::display::PresentationSink;

/// Keeps the most recent images per stream for a renderer to pick up
pub struct PreviewBuffer {
    color: HeapRb<DisplayImage>,
    depth: HeapRb<DisplayImage>,

    /// Statistics
    stats: CachePadded<Stats>,
}

#[derive(Default)]
struct Stats {
    presented: AtomicUsize,
    taken: AtomicUsize,
    overwritten: AtomicUsize,
}

impl PreviewBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            color: HeapRb::new(capacity),
            depth: HeapRb::new(capacity),
            stats: CachePadded::new(Stats::default()),
        }
    }

    fn ring(&mut self, stream: StreamType) -> &mut HeapRb<DisplayImage> {
        match stream {
            StreamType::Color => &mut self.color,
            StreamType::Depth => &mut self.depth,
        }
    }

    /// Oldest image still buffered for `stream`
    pub fn pop(&mut self, stream: StreamType) -> Option<DisplayImage> {
        let image = self.ring(stream).try_pop()?;
        self.stats.taken.fetch_add(1, Ordering::Relaxed);
        Some(image)
    }

    /// Newest image for `stream`, discarding anything older
    pub fn latest(&mut self, stream: StreamType) -> Option<DisplayImage> {
        let mut newest = None;
        while let Some(image) = self.pop(stream) {
            newest = Some(image);
        }
        newest
    }

    pub fn len(&self, stream: StreamType) -> usize {
        match stream {
            StreamType::Color => self.color.occupied_len(),
            StreamType::Depth => self.depth.occupied_len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_empty() && self.depth.is_empty()
    }

    /// (presented, taken, overwritten)
    pub fn stats(&self) -> (usize, usize, usize) {
        (
            self.stats.presented.load(Ordering::Relaxed),
            self.stats.taken.load(Ordering::Relaxed),
            self.stats.overwritten.load(Ordering::Relaxed),
        )
    }
}

impl PresentationSink for PreviewBuffer {
    fn present(&mut self, stream: StreamType, image: &DisplayImage) {
        if self.ring(stream).push_overwrite(image.clone()).is_some() {
            self.stats.overwritten.fetch_add(1, Ordering::Relaxed);
        }
        self.stats.presented.fetch_add(1, Ordering::Relaxed);
    }
}
