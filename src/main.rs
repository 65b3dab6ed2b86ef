//! RGB-D recorder: synthetic sensor, live preview buffer and PNG recording

use std::io::BufRead;
use std::path::PathBuf;
use std::thread;

use clap::Parser;
use color_eyre::eyre::bail;
use color_eyre::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rgbd_recorder::capture::{Sensor, StreamType, SyntheticSensor};
use rgbd_recorder::display::PreviewBuffer;
use rgbd_recorder::pipeline::{run_event_loop, Command, TickProcessor};
use rgbd_recorder::recording::{
    BackgroundWriter, PngDirectoryStorage, RecorderEvent, RecordingController, RecordingSession,
};
use rgbd_recorder::{utils, Config};

#[derive(Debug, Parser)]
#[command(name = "rgbd-recorder", version, about = "Record synchronized color and depth frames")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start recording immediately
    #[arg(long)]
    record: bool,

    /// Stop after this many device ticks
    #[arg(long)]
    ticks: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rgbd_recorder=info")),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    let args = Args::parse();
    info!("RGB-D recorder launching...");

    // Load configuration
    let config = Config::load(args.config.as_deref())?;
    let rec = &config.recording;
    if !config.sensor.is_free_running() {
        // Nothing would ever trigger an arrival
        bail!("sensor.fps must be greater than zero");
    }

    utils::prepare_output_dirs(
        &rec.output_dir,
        &[rec.color_dir.as_str(), rec.depth_dir.as_str()],
        rec.clear_on_start,
    )?;

    // Open the sensor; failure here is fatal
    let mut sensor = SyntheticSensor::new(config.sensor.clone());
    let arrivals = sensor.open()?;

    // Storage runs on a background worker so ticks never wait on disk
    let (event_tx, event_rx) = flume::unbounded::<RecorderEvent>();
    let storage = PngDirectoryStorage::new(&rec.output_dir, &rec.color_dir, &rec.depth_dir);
    let writer = BackgroundWriter::spawn(storage, rec.writer_queue, event_tx.clone());
    let recorder = RecordingController::new(writer, event_tx);

    let mut processor = TickProcessor::new(
        sensor,
        PreviewBuffer::new(config.display.preview_frames),
        recorder,
        &config.depth,
    )?;

    let mut session = RecordingSession::new();
    if args.record || rec.start_recording {
        processor.start_recording(&mut session);
    }

    let (cmd_tx, cmd_rx) = flume::unbounded::<Command>();

    // Commands from stdin, one per line
    let stdin_tx = cmd_tx.clone();
    thread::Builder::new()
        .name("stdin-commands".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines().map_while(|l| l.ok()) {
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(command) => {
                        if stdin_tx.send(command).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("{} (expected start, stop or quit)", e),
                }
            }
        })?;

    let _signal_handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            let _ = cmd_tx.send(Command::Shutdown);
        }
    });

    let events_handle = tokio::spawn(async move {
        while let Ok(event) = event_rx.recv_async().await {
            match event {
                RecorderEvent::RecordingStarted => info!("Recording"),
                RecorderEvent::RecordingStopped { frames } => {
                    info!("Recording stopped, {} frames captured", frames)
                }
                RecorderEvent::FrameWriteFailed {
                    stream,
                    sequence,
                    reason,
                } => warn!("Frame {} ({}) was not saved: {}", sequence, stream, reason),
            }
        }
    });

    // Ticks and commands share one thread; the session never needs a lock
    let max_ticks = args.ticks;
    let (processor, stats) = tokio::task::spawn_blocking(move || {
        let stats = run_event_loop(&mut processor, &mut session, &arrivals, &cmd_rx, max_ticks);
        (processor, stats)
    })
    .await?;

    let (sensor, mut preview, writer) = processor.into_parts();
    let sensor_stats = sensor.stats();
    drop(sensor);

    let report = writer.finish().await;
    let _ = events_handle.await;

    if let Some(image) = preview.latest(StreamType::Depth) {
        info!("Last depth preview: {}x{}", image.width, image.height);
    }
    let (presented, _, overwritten) = preview.stats();
    info!(
        "Ticks: {} ({} pairs, {} skipped), frames written: {}, write failures: {}",
        stats.ticks,
        stats.pairs,
        stats.skipped(),
        report.written,
        report.failed + stats.failed_writes
    );
    info!(
        "Preview: {} images presented, {} overwritten; sensor buffers {} locked / {} released",
        presented,
        overwritten,
        sensor_stats.acquired(),
        sensor_stats.released()
    );

    info!("RGB-D recorder shutting down");
    Ok(())
}
