//! Collaborator contracts the tracking loop depends on.
//!
//! Acquisition and display are I/O shims. The loop only sees these traits; the
//! `live_tracker` binary implements them on top of OpenCV, and tests implement
//! them with scripted frames.

use crate::core_modules::circle_fitter::Detection;
use crate::core_modules::mask::Mask;
use crate::error::{AcquisitionError, ViewerError};
use image::RgbImage;
use std::time::Duration;

/// One captured image.
pub type Frame = RgbImage;

/// The key that ends a session.
pub const QUIT_KEY: char = 'q';

pub trait FrameSource {
    /// Blocks for at most `timeout` waiting for the next frame.
    ///
    /// `Ok(None)` means the stream ended cleanly.
    fn read_frame(&mut self, timeout: Duration) -> Result<Option<Frame>, AcquisitionError>;

    /// Releases the device. Called once when the session stops.
    fn release(&mut self) {}
}

/// Everything a viewer needs to draw one iteration.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub frame: &'a Frame,
    pub mask: &'a Mask,
    /// Present only when the detection passed the size filter.
    pub detection: Option<&'a Detection>,
}

pub trait Viewer {
    fn render(&mut self, view: &FrameView<'_>) -> Result<(), ViewerError>;

    /// The key pressed since the last poll, if any.
    fn poll_key(&mut self) -> Option<char>;

    /// Tears down any windows. Called once when the session stops.
    fn close(&mut self) {}
}

/// A viewer that draws nothing and never asks to stop.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullViewer;

impl Viewer for NullViewer {
    fn render(&mut self, _view: &FrameView<'_>) -> Result<(), ViewerError> {
        Ok(())
    }

    fn poll_key(&mut self) -> Option<char> {
        None
    }
}
