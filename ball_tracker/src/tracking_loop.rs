// THEORY:
// The `tracking_loop` drives one session: it pulls frames from a `FrameSource`,
// runs the `DetectionPipeline`, passes accepted detections to the sample
// recorder, hands the result to a `Viewer`, and polls for the quit key.
//
// Key architectural principles:
// 1.  **Explicit session state**: the open log and the sampling gate live in a
//     `SessionState` value that the caller creates and the loop borrows for each
//     iteration. Nothing is global.
// 2.  **Strictly sequential**: acquire → analyze → record → render → poll. There
//     is no overlap between frames and no cancellation inside an iteration.
// 3.  **Lifecycle**: `Idle` → `Running` → `Stopped`. Entering `Stopped` always
//     releases the source, closes the viewer and closes the log, whether the
//     session ended by the quit key, end of stream, or an error.
// 4.  **Fail fast, no retries**: acquisition and persistence errors end the
//     session. Viewer errors are only logged.

use crate::clock::Clock;
use crate::config::TrackerConfig;
use crate::core_modules::sample_recorder::{self, SampleLog, SessionState};
use crate::error::TrackerError;
use crate::pipeline::{DetectionPipeline, Outcome, PipelineConfig};
use crate::source::{FrameSource, FrameView, QUIT_KEY, Viewer};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

/// Why a session ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    QuitKey,
    EndOfStream,
}

/// Result of a single iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Stop(StopReason),
}

/// Final report of a finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub log_path: PathBuf,
    pub frames_processed: u64,
    pub samples_written: u64,
    pub stop_reason: StopReason,
}

/// Opens the session log in the configured output directory.
pub fn start_session(config: &TrackerConfig) -> Result<SessionState, TrackerError> {
    let log = SampleLog::create_in(&config.output.dir, &config.output.prefix)?;
    log::info!("Saving coordinates to: {}", log.path().display());
    Ok(SessionState::new(config.record_interval, log))
}

pub struct TrackingLoop<S, V, C> {
    pipeline: DetectionPipeline,
    frame_timeout: Duration,
    source: S,
    viewer: V,
    clock: C,
    state: LoopState,
    stopped_by: Option<StopReason>,
    frames_processed: u64,
}

impl<S: FrameSource, V: Viewer, C: Clock> TrackingLoop<S, V, C> {
    pub fn new(config: &TrackerConfig, source: S, viewer: V, clock: C) -> Self {
        Self {
            pipeline: DetectionPipeline::new(PipelineConfig::from(config)),
            frame_timeout: config.frame_timeout,
            source,
            viewer,
            clock,
            state: LoopState::Idle,
            stopped_by: None,
            frames_processed: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Runs one acquire → analyze → record → render → poll iteration.
    ///
    /// Once an iteration has reported a stop, later calls repeat that reason
    /// without touching the source again.
    pub fn step(&mut self, session: &mut SessionState) -> Result<Step, TrackerError> {
        if let Some(reason) = self.stopped_by {
            return Ok(Step::Stop(reason));
        }
        self.state = LoopState::Running;

        let Some(frame) = self.source.read_frame(self.frame_timeout)? else {
            return Ok(self.finish(StopReason::EndOfStream));
        };
        let now = self.clock.now();
        self.frames_processed += 1;

        let analysis = self.pipeline.analyze(&frame);
        match &analysis.outcome {
            Outcome::NoTarget => {
                log::trace!("frame {}: no target", self.frames_processed);
            }
            Outcome::BelowMinRadius(detection) => {
                log::debug!(
                    "frame {}: candidate radius {:.2} at or below minimum",
                    self.frames_processed,
                    detection.radius
                );
            }
            Outcome::Accepted(detection) => {
                sample_recorder::maybe_record(detection, now, session)?;
            }
        }

        let view = FrameView {
            frame: &frame,
            mask: &analysis.mask,
            detection: analysis.outcome.accepted(),
        };
        if let Err(err) = self.viewer.render(&view) {
            log::warn!("frame {}: {}", self.frames_processed, err);
        }

        if self.viewer.poll_key() == Some(QUIT_KEY) {
            return Ok(self.finish(StopReason::QuitKey));
        }
        Ok(Step::Continue)
    }

    fn finish(&mut self, reason: StopReason) -> Step {
        self.stopped_by = Some(reason);
        Step::Stop(reason)
    }

    /// Loops until the quit key, end of stream, or an error, then shuts down.
    pub fn run(mut self, mut session: SessionState) -> Result<SessionSummary, TrackerError> {
        let outcome = loop {
            match self.step(&mut session) {
                Ok(Step::Continue) => continue,
                Ok(Step::Stop(reason)) => break Ok(reason),
                Err(err) => break Err(err),
            }
        };

        self.stop();
        let samples_written = session.samples_written();
        let closed = session.close();

        match outcome {
            Ok(stop_reason) => {
                let log_path = closed?;
                log::info!(
                    "Tracking completed. Coordinates saved to: {} ({} samples, {} frames)",
                    log_path.display(),
                    samples_written,
                    self.frames_processed
                );
                Ok(SessionSummary {
                    log_path,
                    frames_processed: self.frames_processed,
                    samples_written,
                    stop_reason,
                })
            }
            Err(err) => {
                match closed {
                    Ok(path) => log::error!(
                        "Tracking aborted: {}. {} samples kept in {}",
                        err,
                        samples_written,
                        path.display()
                    ),
                    Err(close_err) => log::error!("Tracking aborted: {}. Closing log also failed: {}", err, close_err),
                }
                Err(err)
            }
        }
    }

    fn stop(&mut self) {
        if self.state != LoopState::Stopped {
            self.source.release();
            self.viewer.close();
            self.state = LoopState::Stopped;
        }
    }
}

/// Opens the log and runs a whole session.
pub fn track<S: FrameSource, V: Viewer, C: Clock>(
    config: &TrackerConfig,
    source: S,
    viewer: V,
    clock: C,
) -> Result<SessionSummary, TrackerError> {
    let session = start_session(config)?;
    TrackingLoop::new(config, source, viewer, clock).run(session)
}
