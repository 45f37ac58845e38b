//! OpenCV acquisition behind the `FrameSource` contract.
//!
//! `VideoCapture::read` blocks without a deadline, so the device lives on its
//! own thread. Each `read_frame` sends the thread one request and waits for the
//! answer with `recv_timeout`: a stalled camera becomes
//! `AcquisitionError::Timeout` instead of a frozen session, and the thread never
//! reads ahead, so a live frame is captured after the loop asked for it.

use ball_tracker::{AcquisitionError, Frame, FrameSource};
use image::RgbImage;
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How long `release` waits for the capture thread before detaching it.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub enum Input {
    Camera(i32),
    File(PathBuf),
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Camera(index) => write!(f, "camera {index}"),
            Input::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// What the capture thread hands over per read: a frame, end of stream, or a
/// device error rendered as text.
type Delivery = Result<Option<Frame>, String>;

pub struct CaptureSource {
    input: Input,
    requests: Option<Sender<()>>,
    frames: Option<Receiver<Delivery>>,
    worker: Option<JoinHandle<()>>,
    fps: f64,
}

impl CaptureSource {
    /// Starts the capture thread and waits up to `timeout` for the device to open.
    pub fn open(input: Input, timeout: Duration) -> Result<Self, AcquisitionError> {
        let (opened_tx, opened_rx) = mpsc::channel();
        let (request_tx, request_rx) = mpsc::channel();
        let (frame_tx, frame_rx) = mpsc::sync_channel(1);

        let worker = {
            let input = input.clone();
            thread::Builder::new()
                .name("capture".to_string())
                .spawn(move || capture_worker(input, opened_tx, request_rx, frame_tx))
                .map_err(|e| AcquisitionError::Open(format!("cannot start capture thread: {e}")))?
        };

        let fps = match opened_rx.recv_timeout(timeout) {
            Ok(Ok(fps)) => fps,
            Ok(Err(msg)) => return Err(AcquisitionError::Open(msg)),
            // Dropping `request_tx` here lets a late-opening worker exit on its own.
            Err(RecvTimeoutError::Timeout) => return Err(AcquisitionError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(AcquisitionError::Open(format!("capture thread for {input} exited")));
            }
        };
        log::info!("Opened {input} ({fps:.1} fps reported)");

        Ok(Self {
            input,
            requests: Some(request_tx),
            frames: Some(frame_rx),
            worker: Some(worker),
            fps,
        })
    }

    /// Frame rate reported by the device; zero or NaN when unknown.
    pub fn fps(&self) -> f64 {
        self.fps
    }
}

impl FrameSource for CaptureSource {
    fn read_frame(&mut self, timeout: Duration) -> Result<Option<Frame>, AcquisitionError> {
        let (Some(requests), Some(frames)) = (self.requests.as_ref(), self.frames.as_ref()) else {
            return Ok(None);
        };
        if requests.send(()).is_err() {
            return Err(AcquisitionError::Read(format!("capture thread for {} stopped", self.input)));
        }
        match frames.recv_timeout(timeout) {
            Ok(Ok(frame)) => Ok(frame),
            Ok(Err(msg)) => Err(AcquisitionError::Read(msg)),
            Err(RecvTimeoutError::Timeout) => Err(AcquisitionError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                Err(AcquisitionError::Read(format!("capture thread for {} stopped", self.input)))
            }
        }
    }

    fn release(&mut self) {
        // With the request side gone the worker exits after any read in flight.
        self.requests.take();
        self.frames.take();

        let Some(worker) = self.worker.take() else {
            return;
        };
        let deadline = Instant::now() + SHUTDOWN_GRACE;
        while !worker.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        if worker.is_finished() {
            if worker.join().is_err() {
                log::warn!("capture thread for {} panicked", self.input);
            }
        } else {
            log::warn!("capture thread for {} did not stop in time; detaching it", self.input);
        }
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        self.release();
    }
}

fn capture_worker(input: Input, opened: Sender<Result<f64, String>>, requests: Receiver<()>, frames: SyncSender<Delivery>) {
    let mut capture = match open_capture(&input) {
        Ok(capture) => capture,
        Err(msg) => {
            let _ = opened.send(Err(msg));
            return;
        }
    };
    if matches!(input, Input::Camera(_)) {
        // Keep the driver from queueing frames behind the one we are about to ask for.
        let _ = capture.set(videoio::CAP_PROP_BUFFERSIZE, 1.0);
    }
    let fps = capture.get(videoio::CAP_PROP_FPS).unwrap_or(0.0);

    if opened.send(Ok(fps)).is_ok() {
        let mut raw = Mat::default();
        serve_reads(&requests, &frames, || match capture.read(&mut raw) {
            Ok(true) if !raw.empty() => bgr_to_frame(&raw).map(Some),
            Ok(_) => Ok(None),
            Err(err) => Err(format!("read from {input} failed: {err}")),
        });
    }
    if let Err(err) = capture.release() {
        log::warn!("releasing {input} failed: {err}");
    }
}

/// Answers each request with exactly one read. Returns after end of stream, a
/// read error, or once either side of the handoff hangs up.
fn serve_reads(requests: &Receiver<()>, frames: &SyncSender<Delivery>, mut read: impl FnMut() -> Delivery) {
    for () in requests.iter() {
        let delivery = read();
        let last = !matches!(delivery, Ok(Some(_)));
        if frames.send(delivery).is_err() || last {
            break;
        }
    }
}

fn open_capture(input: &Input) -> Result<VideoCapture, String> {
    let capture = match input {
        Input::Camera(index) => VideoCapture::new(*index, videoio::CAP_ANY),
        Input::File(path) => VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY),
    }
    .map_err(|e| format!("could not open {input}: {e}"))?;

    match capture.is_opened() {
        Ok(true) => Ok(capture),
        Ok(false) => Err(format!("could not open {input}")),
        Err(e) => Err(format!("could not open {input}: {e}")),
    }
}

/// Converts an OpenCV BGR frame into the RGB layout the detector expects.
fn bgr_to_frame(bgr: &Mat) -> Result<Frame, String> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0).map_err(|e| format!("color conversion failed: {e}"))?;

    let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
    let bytes = rgb
        .data_bytes()
        .map_err(|e| format!("frame buffer unavailable: {e}"))?
        .to_vec();
    RgbImage::from_raw(width, height, bytes).ok_or_else(|| format!("unexpected {width}x{height} frame layout"))
}
