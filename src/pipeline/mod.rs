pub mod depth;
pub mod event_loop;
pub mod tick;

pub use depth::{DepthNormalizer, DepthRange, DepthUpperBound, NormalizedDepthFrame};
pub use event_loop::{handle_command, run_event_loop, Command};
pub use tick::{TickOutcome, TickProcessor, TickReport};

use crate::error::TickError;

/// Counters collected by the event loop
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickStats {
    pub ticks: u64,
    pub pairs: u64,
    pub no_frame: u64,
    pub incomplete: u64,
    /// Ticks dropped for malformed buffers, mapping failures or desync
    pub faulted: u64,
    pub recorded: u64,
    pub failed_writes: u64,
}

impl TickStats {
    pub fn observe(&mut self, outcome: &TickOutcome) {
        self.ticks += 1;
        match outcome {
            Ok(report) => {
                self.pairs += 1;
                if let Some(recorded) = report.recorded {
                    self.recorded += 1;
                    self.failed_writes += recorded.failed_writes as u64;
                }
            }
            Err(TickError::NoFrame) => self.no_frame += 1,
            Err(TickError::IncompletePair { .. }) => self.incomplete += 1,
            Err(_) => self.faulted += 1,
        }
    }

    pub fn skipped(&self) -> u64 {
        self.no_frame + self.incomplete + self.faulted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::Recorded;

    #[test]
    fn observe_counts_by_outcome() {
        let mut stats = TickStats::default();
        stats.observe(&Ok(TickReport {
            recorded: Some(Recorded {
                sequence: 0,
                failed_writes: 1,
            }),
            mapped_pixels: 4,
        }));
        stats.observe(&Err(TickError::NoFrame));
        stats.observe(&Err(TickError::IncompletePair {
            color: true,
            depth: false,
        }));
        stats.observe(&Err(TickError::BufferSizeMismatch {
            len: 3,
            bytes_per_pixel: 2,
        }));

        assert_eq!(stats.ticks, 4);
        assert_eq!(stats.pairs, 1);
        assert_eq!(stats.recorded, 1);
        assert_eq!(stats.failed_writes, 1);
        assert_eq!(stats.skipped(), 3);
    }
}
