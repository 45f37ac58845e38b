mod capture;
mod overlay;

use anyhow::{Context, Result};
use ball_tracker::config::TrackerConfig;
use ball_tracker::{tracking_loop, SessionClock, StopReason};
use capture::{CaptureSource, Input};
use clap::Parser;
use overlay::OverlayViewer;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Track a colored ball in a camera or video stream and log its position to CSV.
#[derive(Parser, Debug)]
#[command(name = "live_tracker", version)]
struct Args {
    /// Camera index to open when no file is given.
    #[arg(long, default_value_t = 0, conflicts_with = "file")]
    camera: i32,
    /// Video file to read instead of a camera.
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
    /// TOML file overriding the built-in defaults.
    #[arg(long, value_name = "PATH", env = "BALL_TRACKER_CONFIG")]
    config: Option<PathBuf>,
    /// Directory for the coordinate log.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
    /// File name prefix for the coordinate log.
    #[arg(long)]
    prefix: Option<String>,
    /// Detections with a radius at or below this are ignored.
    #[arg(long, value_name = "PIXELS")]
    min_radius: Option<f64>,
    /// Minimum seconds between two recorded samples.
    #[arg(long, value_name = "SECONDS")]
    record_interval: Option<f64>,
    /// Run without display windows; Ctrl-C ends the session.
    #[arg(long)]
    headless: bool,
    /// Also write the annotated frames to this video file (mp4v).
    #[arg(long, value_name = "PATH")]
    output_video: Option<PathBuf>,
}

impl Args {
    fn input(&self) -> Input {
        match &self.file {
            Some(path) => Input::File(path.clone()),
            None => Input::Camera(self.camera),
        }
    }

    /// Defaults, then the config file, then command-line overrides.
    fn tracker_config(&self) -> Result<TrackerConfig> {
        let mut config = TrackerConfig::load(self.config.as_deref()).context("Failed to load configuration")?;
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.output.prefix = prefix.clone();
        }
        if let Some(min_radius) = self.min_radius {
            config.min_radius = min_radius;
        }
        if let Some(interval) = self.record_interval {
            config.record_interval = interval;
        }
        config.validate().context("Invalid command-line override")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = args.tracker_config()?;
    log::debug!("{:?}", config);

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst))
            .context("Failed to install Ctrl-C handler")?;
    }

    let input = args.input();
    let source = CaptureSource::open(input.clone(), config.frame_timeout)
        .with_context(|| format!("Failed to open input source: {input}"))?;
    let viewer = OverlayViewer::new(!args.headless, args.output_video.clone(), source.fps(), interrupted);

    let summary = tracking_loop::track(&config, source, viewer, SessionClock::start())?;
    if summary.stop_reason == StopReason::QuitKey {
        log::info!("Stopped by user after {} frames", summary.frames_processed);
    }
    Ok(())
}
