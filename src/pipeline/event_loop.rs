//! Single-threaded event loop multiplexing device ticks and commands
//!
//! Ticks never overlap: each arrival is processed to completion before the
//! next message is taken. A command observed between two ticks therefore
//! applies from the next tick on.

use tracing::{debug, info};

use crate::capture::sensor::{FrameArrival, Sensor};
use crate::display::PresentationSink;
use crate::pipeline::tick::TickProcessor;
use crate::pipeline::TickStats;
use crate::recording::{RecordingSession, StorageSink};

/// External commands accepted by the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Shutdown,
}

impl std::str::FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            "quit" | "exit" | "shutdown" => Ok(Command::Shutdown),
            other => Err(format!("unknown command '{other}'")),
        }
    }
}

enum Step {
    Tick(FrameArrival),
    Command(Command),
    Closed(&'static str),
}

/// Apply a command to the session. Returns false on shutdown.
pub fn handle_command<S, P, W>(
    processor: &mut TickProcessor<S, P, W>,
    session: &mut RecordingSession,
    command: Command,
) -> bool
where
    S: Sensor,
    P: PresentationSink,
    W: StorageSink,
{
    match command {
        Command::Start => {
            if !processor.start_recording(session) {
                debug!("start ignored, already recording");
            }
            true
        }
        Command::Stop => {
            if !processor.stop_recording(session) {
                debug!("stop ignored, not recording");
            }
            true
        }
        Command::Shutdown => false,
    }
}

/// Run until shutdown, a closed channel, or `max_ticks` arrivals.
///
/// Recording is stopped on exit so the stop event is always emitted.
pub fn run_event_loop<S, P, W>(
    processor: &mut TickProcessor<S, P, W>,
    session: &mut RecordingSession,
    arrivals: &flume::Receiver<FrameArrival>,
    commands: &flume::Receiver<Command>,
    max_ticks: Option<u64>,
) -> TickStats
where
    S: Sensor,
    P: PresentationSink,
    W: StorageSink,
{
    let mut stats = TickStats::default();
    info!("Event loop running");

    loop {
        if max_ticks.is_some_and(|max| stats.ticks >= max) {
            info!("Tick limit reached");
            break;
        }

        let step = flume::Selector::new()
            .recv(commands, |r| r.map_or(Step::Closed("commands"), Step::Command))
            .recv(arrivals, |r| r.map_or(Step::Closed("arrivals"), Step::Tick))
            .wait();

        match step {
            Step::Tick(arrival) => {
                let outcome = processor.process_tick(session, &arrival);
                stats.observe(&outcome);
            }
            Step::Command(command) => {
                if !handle_command(processor, session, command) {
                    info!("Shutdown requested");
                    break;
                }
            }
            Step::Closed(channel) => {
                info!("{} channel closed", channel);
                break;
            }
        }
    }

    processor.stop_recording(session);
    info!(
        "Event loop finished: {} ticks, {} pairs, {} recorded",
        stats.ticks, stats.pairs, stats.recorded
    );
    stats
}
