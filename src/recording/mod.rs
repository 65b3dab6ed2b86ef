//! Recording controller
//!
//! While the session is recording, every accepted frame pair claims the next
//! sequence number and both images are handed to storage under it. A failed
//! write is reported and the session carries on.

pub mod session;
pub mod storage;
pub mod writer;

pub use session::{RecordingSession, RecordingState};
pub use storage::{PngDirectoryStorage, StorageSink};
pub use writer::{BackgroundWriter, WriterReport};

use tracing::{info, warn};

use crate::capture::frame::StreamType;
use crate::display::image::DisplayFrames;

/// Notifications for whoever drives the recorder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    RecordingStarted,
    RecordingStopped { frames: u64 },
    /// A frame could not be persisted; the session is still recording
    FrameWriteFailed {
        stream: StreamType,
        sequence: u64,
        reason: String,
    },
}

/// Result of recording one pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recorded {
    pub sequence: u64,
    /// Streams whose write was rejected synchronously
    pub failed_writes: usize,
}

impl Recorded {
    /// At least one of the two streams was handed to storage
    pub fn saved_any(&self) -> bool {
        self.failed_writes < 2
    }
}

pub struct RecordingController<W> {
    storage: W,
    events: flume::Sender<RecorderEvent>,
}

impl<W: StorageSink> RecordingController<W> {
    pub fn new(storage: W, events: flume::Sender<RecorderEvent>) -> Self {
        Self { storage, events }
    }

    pub fn start(&mut self, session: &mut RecordingSession) -> bool {
        let changed = session.start();
        if changed {
            info!("Recording started");
            self.notify(RecorderEvent::RecordingStarted);
        }
        changed
    }

    pub fn stop(&mut self, session: &mut RecordingSession) -> bool {
        let changed = session.stop();
        if changed {
            let frames = session.frames_recorded();
            info!("Recording stopped after {} frames", frames);
            self.notify(RecorderEvent::RecordingStopped { frames });
        }
        changed
    }

    /// Persist one tick's frames if the session is recording.
    ///
    /// The sequence number is consumed even when a write fails.
    pub fn record(
        &mut self,
        session: &mut RecordingSession,
        frames: &DisplayFrames,
    ) -> Option<Recorded> {
        let sequence = session.claim_sequence()?;
        let mut failed_writes = 0;

        for image in [&frames.color, &frames.depth] {
            if let Err(error) = self.storage.write_frame(image.stream, sequence, image) {
                failed_writes += 1;
                warn!(
                    stream = %image.stream,
                    sequence,
                    "dropping frame: {error}"
                );
                metrics::counter!("frame_writes_failed", "stream" => image.stream.to_string())
                    .increment(1);
                self.notify(RecorderEvent::FrameWriteFailed {
                    stream: image.stream,
                    sequence,
                    reason: error.to_string(),
                });
            }
        }

        let recorded = Recorded {
            sequence,
            failed_writes,
        };
        if recorded.saved_any() {
            metrics::counter!("frames_recorded").increment(1);
        }
        Some(recorded)
    }

    pub fn storage(&self) -> &W {
        &self.storage
    }

    pub fn into_storage(self) -> W {
        self.storage
    }

    fn notify(&self, event: RecorderEvent) {
        // No listener is fine; the event was already logged
        let _ = self.events.send(event);
    }
}
