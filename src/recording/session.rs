//! Recording session state machine

use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
}

/// The single recording session of a recorder process.
///
/// Owned by the event loop and handed by reference to tick and command
/// handlers, so no locking is involved.
#[derive(Debug)]
pub struct RecordingSession {
    state: RecordingState,
    next_sequence: u64,
    started_at: Option<Instant>,
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSession {
    pub fn new() -> Self {
        Self {
            state: RecordingState::Idle,
            next_sequence: 0,
            started_at: None,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    /// Frames recorded in the current (or last) interval
    pub fn frames_recorded(&self) -> u64 {
        self.next_sequence
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Enter `Recording` with the counter at 0. Returns false if already recording.
    pub fn start(&mut self) -> bool {
        if self.is_recording() {
            return false;
        }
        self.state = RecordingState::Recording;
        self.next_sequence = 0;
        self.started_at = Some(Instant::now());
        true
    }

    /// Return to `Idle`. Returns false if already idle.
    pub fn stop(&mut self) -> bool {
        if !self.is_recording() {
            return false;
        }
        self.state = RecordingState::Idle;
        self.started_at = None;
        true
    }

    /// Claim the next sequence number for an accepted pair.
    ///
    /// `None` while idle. Each call while recording returns a distinct,
    /// contiguous value.
    pub fn claim_sequence(&mut self) -> Option<u64> {
        if !self.is_recording() {
            return None;
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Some(sequence)
    }
}
