#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use ball_tracker::config::TrackerConfig;
use ball_tracker::{AcquisitionError, Clock, Detection, Frame, FrameSource, FrameView, LogSink, Viewer, ViewerError};
use image::{Rgb, RgbImage};

pub const ORANGE: Rgb<u8> = Rgb([255, 128, 0]);
pub const BACKDROP: Rgb<u8> = Rgb([30, 60, 150]);

pub fn blank_frame(width: u32, height: u32) -> Frame {
    RgbImage::from_pixel(width, height, BACKDROP)
}

pub fn disk_frame(width: u32, height: u32, cx: i64, cy: i64, r: i64) -> Frame {
    RgbImage::from_fn(width, height, |x, y| {
        let dx = x as i64 - cx;
        let dy = y as i64 - cy;
        if dx * dx + dy * dy <= r * r { ORANGE } else { BACKDROP }
    })
}

pub fn config_in(dir: &Path, record_interval: f64) -> TrackerConfig {
    let mut cfg = TrackerConfig::default();
    cfg.record_interval = record_interval;
    cfg.output.dir = dir.to_path_buf();
    cfg.output.prefix = "test_run".to_string();
    cfg
}

/// Data rows (header excluded) of a CSV log, read fresh from disk.
pub fn read_rows(path: &Path) -> Vec<Vec<String>> {
    std::fs::read_to_string(path)
        .expect("read log")
        .lines()
        .skip(1)
        .map(|line| line.split(',').map(str::to_owned).collect())
        .collect()
}

/// Log sink that writes through to a file until `lines` newline-terminated
/// lines have landed, then fails every write like a full disk.
pub struct FillingSink {
    file: File,
    lines_left: usize,
}

impl FillingSink {
    pub fn new(path: &Path, lines: usize) -> Self {
        Self {
            file: File::create(path).expect("create log file"),
            lines_left: lines,
        }
    }
}

impl Write for FillingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.lines_left == 0 {
            return Err(io::Error::other("no space left on device"));
        }
        self.file.write_all(buf)?;
        let lines = buf.iter().filter(|&&b| b == b'\n').count();
        self.lines_left = self.lines_left.saturating_sub(lines);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl LogSink for FillingSink {
    fn persist(&mut self) -> io::Result<()> {
        self.file.sync_data()
    }
}

pub enum Scripted {
    Frame(Frame),
    Fail(AcquisitionError),
}

/// Plays back a fixed list of frames, then reports end of stream.
pub struct ScriptedSource {
    script: VecDeque<Scripted>,
    pub released: Rc<Cell<bool>>,
}

impl ScriptedSource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            script: frames.into_iter().map(Scripted::Frame).collect(),
            released: Rc::new(Cell::new(false)),
        }
    }

    pub fn then_fail(mut self, err: AcquisitionError) -> Self {
        self.script.push_back(Scripted::Fail(err));
        self
    }
}

impl FrameSource for ScriptedSource {
    fn read_frame(&mut self, _timeout: Duration) -> Result<Option<Frame>, AcquisitionError> {
        match self.script.pop_front() {
            Some(Scripted::Frame(frame)) => Ok(Some(frame)),
            Some(Scripted::Fail(err)) => Err(err),
            None => Ok(None),
        }
    }

    fn release(&mut self) {
        self.released.set(true);
    }
}

/// Returns the listed timestamps in order, then keeps repeating the last one.
pub struct ManualClock {
    times: VecDeque<f64>,
    last: f64,
}

impl ManualClock {
    pub fn new(times: impl IntoIterator<Item = f64>) -> Self {
        Self {
            times: times.into_iter().collect(),
            last: 0.0,
        }
    }

    /// `start`, `start + step`, `start + 2 * step`, ...
    pub fn ticking(start: f64, step: f64, ticks: usize) -> Self {
        Self::new((0..ticks).map(|i| start + step * i as f64))
    }
}

impl Clock for ManualClock {
    fn now(&mut self) -> f64 {
        if let Some(t) = self.times.pop_front() {
            self.last = t;
        }
        self.last
    }
}

/// What a `RecordingViewer` saw on one render call.
#[derive(Debug, Clone)]
pub struct RenderRecord {
    pub detection: Option<Detection>,
    pub mask_pixels: usize,
    /// Data rows in the log file at render time, when a log path was given.
    pub rows_on_disk: Option<usize>,
}

/// Records every render, optionally fails them, and presses keys on cue.
#[derive(Default)]
pub struct RecordingViewer {
    pub renders: Rc<RefCell<Vec<RenderRecord>>>,
    pub closed: Rc<Cell<bool>>,
    log_path: Option<PathBuf>,
    quit_after: Option<usize>,
    fail_renders: bool,
    polls: usize,
}

impl RecordingViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watching_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Presses `q` on the `n`-th poll (1-based).
    pub fn quit_after(mut self, n: usize) -> Self {
        self.quit_after = Some(n);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_renders = true;
        self
    }
}

impl Viewer for RecordingViewer {
    fn render(&mut self, view: &FrameView<'_>) -> Result<(), ViewerError> {
        let rows_on_disk = self.log_path.as_deref().map(|path| read_rows(path).len());
        self.renders.borrow_mut().push(RenderRecord {
            detection: view.detection.copied(),
            mask_pixels: view.mask.count(),
            rows_on_disk,
        });
        if self.fail_renders {
            return Err(ViewerError("window went away".to_string()));
        }
        Ok(())
    }

    fn poll_key(&mut self) -> Option<char> {
        self.polls += 1;
        match self.quit_after {
            Some(n) if self.polls >= n => Some('q'),
            _ => None,
        }
    }

    fn close(&mut self) {
        self.closed.set(true);
    }
}
