use ball_tracker::source::QUIT_KEY;
use ball_tracker::{Detection, Frame, FrameView, Mask, Viewer, ViewerError};
use opencv::{
    core::{self, Mat, Point, Scalar, Size},
    highgui, imgproc,
    prelude::*,
    videoio::VideoWriter,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const TRACKING_WINDOW: &str = "Ball Tracking";
pub const MASK_WINDOW: &str = "Mask";

/// Used for the output video when the source does not report a frame rate.
const FALLBACK_FPS: f64 = 30.0;

// BGR
const CIRCLE_COLOR: (f64, f64, f64) = (0.0, 255.0, 0.0);
const CENTER_COLOR: (f64, f64, f64) = (0.0, 0.0, 255.0);
const LABEL_COLOR: (f64, f64, f64) = (255.0, 255.0, 255.0);

/// Draws the detection over each frame, shows it next to the mask, and
/// optionally writes the annotated stream to a video file.
///
/// With windows disabled the viewer still records video and still honours the
/// interrupt flag, which is how Ctrl-C maps onto the quit key.
pub struct OverlayViewer {
    windows: bool,
    recorder: Option<VideoRecorder>,
    interrupted: Arc<AtomicBool>,
}

impl OverlayViewer {
    pub fn new(windows: bool, output_video: Option<PathBuf>, fps: f64, interrupted: Arc<AtomicBool>) -> Self {
        let mut windows = windows;
        if windows {
            for name in [TRACKING_WINDOW, MASK_WINDOW] {
                if let Err(err) = highgui::named_window(name, highgui::WINDOW_AUTOSIZE) {
                    log::warn!("Failed to open display window: {}. Running headless.", err);
                    windows = false;
                    break;
                }
            }
        }
        Self {
            windows,
            recorder: output_video.map(|path| VideoRecorder::new(path, fps)),
            interrupted,
        }
    }

    fn draw(&mut self, view: &FrameView<'_>) -> opencv::Result<()> {
        let mut canvas = frame_to_bgr(view.frame)?;
        if let Some(detection) = view.detection {
            annotate(&mut canvas, detection)?;
        }

        if self.windows {
            highgui::imshow(TRACKING_WINDOW, &canvas)?;
            highgui::imshow(MASK_WINDOW, &mask_to_mat(view.mask)?)?;
        }
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.write(&canvas)?;
        }
        Ok(())
    }
}

impl Viewer for OverlayViewer {
    fn render(&mut self, view: &FrameView<'_>) -> Result<(), ViewerError> {
        self.draw(view).map_err(|e| ViewerError(e.to_string()))
    }

    fn poll_key(&mut self) -> Option<char> {
        if self.interrupted.load(Ordering::SeqCst) {
            return Some(QUIT_KEY);
        }
        if !self.windows {
            return None;
        }
        match highgui::wait_key(1) {
            Ok(key) if key >= 0 => char::from_u32((key & 0xFF) as u32),
            Ok(_) => None,
            Err(err) => {
                log::warn!("wait_key failed: {}", err);
                None
            }
        }
    }

    fn close(&mut self) {
        if let Some(mut recorder) = self.recorder.take() {
            recorder.finish();
        }
        if self.windows {
            if let Err(err) = highgui::destroy_all_windows() {
                log::warn!("Failed to close display windows: {}", err);
            }
            self.windows = false;
        }
    }
}

/// Lazily opened on the first frame, when the frame size is known.
struct VideoRecorder {
    path: PathBuf,
    fps: f64,
    writer: Option<VideoWriter>,
}

impl VideoRecorder {
    fn new(path: PathBuf, fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { FALLBACK_FPS };
        Self { path, fps, writer: None }
    }

    fn write(&mut self, frame: &Mat) -> opencv::Result<()> {
        if self.writer.is_none() {
            let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
            let writer = VideoWriter::new(
                &self.path.to_string_lossy(),
                fourcc,
                self.fps,
                Size::new(frame.cols(), frame.rows()),
                true,
            )?;
            if !writer.is_opened()? {
                return Err(opencv::Error::new(
                    core::StsError,
                    format!("cannot open video writer at {}", self.path.display()),
                ));
            }
            log::info!("Writing annotated video to: {}", self.path.display());
            self.writer = Some(writer);
        }
        match self.writer.as_mut() {
            Some(writer) => writer.write(frame),
            None => Ok(()),
        }
    }

    fn finish(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(err) = writer.release() {
                log::warn!("Failed to finalize {}: {}", self.path.display(), err);
            }
        }
    }
}

fn scalar((b, g, r): (f64, f64, f64)) -> Scalar {
    Scalar::new(b, g, r, 0.0)
}

/// Enclosing circle, centre dot, and a coordinate label above the circle.
fn annotate(canvas: &mut Mat, detection: &Detection) -> opencv::Result<()> {
    let x = detection.center.0 as i32;
    let y = detection.center.1 as i32;
    let radius = detection.radius as i32;
    let center = Point::new(x, y);

    imgproc::circle(canvas, center, radius, scalar(CIRCLE_COLOR), 2, imgproc::LINE_8, 0)?;
    imgproc::circle(canvas, center, 5, scalar(CENTER_COLOR), -1, imgproc::LINE_8, 0)?;

    let label = format!("X: {}, Y: {}", x, y);
    let origin = Point::new(x - 50, (detection.center.1 - detection.radius - 10.0) as i32);
    imgproc::put_text(
        canvas,
        &label,
        origin,
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.5,
        scalar(LABEL_COLOR),
        2,
        imgproc::LINE_8,
        false,
    )
}

fn frame_to_bgr(frame: &Frame) -> opencv::Result<Mat> {
    let mut rgb = Mat::new_rows_cols_with_default(
        frame.height() as i32,
        frame.width() as i32,
        core::CV_8UC3,
        Scalar::all(0.0),
    )?;
    rgb.data_bytes_mut()?.copy_from_slice(frame.as_raw());

    let mut bgr = Mat::default();
    imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
    Ok(bgr)
}

fn mask_to_mat(mask: &Mask) -> opencv::Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        mask.height() as i32,
        mask.width() as i32,
        core::CV_8UC1,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(mask.as_raw());
    Ok(mat)
}
