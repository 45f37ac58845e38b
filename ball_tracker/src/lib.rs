// THEORY:
// This file is the main entry point for the `ball_tracker` library crate.
// It exports the per-frame `DetectionPipeline`, the session-level
// `TrackingLoop`, and the collaborator traits (`FrameSource`, `Viewer`,
// `Clock`) that front-ends implement to feed frames in and show results.
//
// The detection stages themselves live in `core_modules` and are public so
// that each one can be exercised on its own, but a typical consumer only needs
// `TrackerConfig`, `tracking_loop::track` and its own collaborator impls.

pub mod clock;
pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod source;
pub mod tracking_loop;

pub use clock::{Clock, SessionClock};
pub use config::TrackerConfig;
pub use core_modules::circle_fitter::Detection;
pub use core_modules::mask::Mask;
pub use core_modules::sample_recorder::{LogSink, Sample, SampleLog, SessionState};
pub use error::{AcquisitionError, ConfigError, TrackerError, ViewerError};
pub use pipeline::{DetectionPipeline, FrameAnalysis, Outcome};
pub use source::{Frame, FrameSource, FrameView, NullViewer, Viewer};
pub use tracking_loop::{SessionSummary, StopReason, TrackingLoop};
