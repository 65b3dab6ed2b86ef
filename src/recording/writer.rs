//! Background frame writer
//!
//! Ticks hand frames to a bounded queue and move on. A single blocking worker
//! drains the queue in order, so writes land in sequence order per stream.

use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::capture::frame::StreamType;
use crate::display::image::DisplayImage;
use crate::error::StorageError;
use crate::recording::storage::StorageSink;
use crate::recording::RecorderEvent;

struct WriteJob {
    stream: StreamType,
    sequence: u64,
    image: DisplayImage,
}

/// Totals reported when the writer is drained
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriterReport {
    pub written: u64,
    pub failed: u64,
}

/// Queueing front end for a [`StorageSink`]
pub struct BackgroundWriter {
    tx: flume::Sender<WriteJob>,
    handle: JoinHandle<WriterReport>,
}

impl BackgroundWriter {
    /// Move `sink` onto a blocking worker. Must be called inside a Tokio runtime.
    pub fn spawn<W>(mut sink: W, capacity: usize, events: flume::Sender<RecorderEvent>) -> Self
    where
        W: StorageSink + Send + 'static,
    {
        let (tx, rx) = flume::bounded::<WriteJob>(capacity.max(1));

        let handle = tokio::task::spawn_blocking(move || {
            let mut report = WriterReport::default();
            while let Ok(job) = rx.recv() {
                let started = Instant::now();
                match sink.write_frame(job.stream, job.sequence, &job.image) {
                    Ok(()) => {
                        report.written += 1;
                        metrics::histogram!("frame_write_time_us")
                            .record(started.elapsed().as_micros() as f64);
                    }
                    Err(error) => {
                        report.failed += 1;
                        warn!(
                            stream = %job.stream,
                            sequence = job.sequence,
                            "frame write failed: {error}"
                        );
                        metrics::counter!("frame_writes_failed", "stream" => job.stream.to_string())
                            .increment(1);
                        let _ = events.send(RecorderEvent::FrameWriteFailed {
                            stream: job.stream,
                            sequence: job.sequence,
                            reason: error.to_string(),
                        });
                    }
                }
            }
            debug!("writer queue closed");
            report
        });

        Self { tx, handle }
    }

    /// Close the queue and wait until every queued frame has been written
    pub async fn finish(self) -> WriterReport {
        let Self { tx, handle } = self;
        drop(tx);
        match handle.await {
            Ok(report) => {
                info!(
                    "Writer drained: {} written, {} failed",
                    report.written, report.failed
                );
                report
            }
            Err(e) => {
                tracing::error!("Writer task failed: {}", e);
                WriterReport::default()
            }
        }
    }
}

impl StorageSink for BackgroundWriter {
    /// Queue a frame without blocking. A full queue drops the frame.
    fn write_frame(
        &mut self,
        stream: StreamType,
        sequence: u64,
        image: &DisplayImage,
    ) -> Result<(), StorageError> {
        let job = WriteJob {
            stream,
            sequence,
            image: image.clone(),
        };
        self.tx.try_send(job).map_err(|e| match e {
            flume::TrySendError::Full(_) => StorageError::QueueFull { stream, sequence },
            flume::TrySendError::Disconnected(_) => StorageError::WriterClosed,
        })
    }
}
