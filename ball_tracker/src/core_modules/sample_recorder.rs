// THEORY:
// The `sample_recorder` is the only stateful stage of the pipeline and the only
// one with side effects. It decouples the camera's frame rate from the rate at
// which the trajectory is persisted.
//
// Key architectural principles:
// 1.  **Sampling gate**: a detection becomes a `Sample` only when at least
//     `record_interval` seconds have passed since the last accepted sample. The
//     first candidate of a session is always due.
// 2.  **Commit after write**: `last_record_time` moves only after the row is on
//     disk. A failed write leaves the gate untouched and surfaces as a
//     `TrackerError::Persistence`.
// 3.  **Durable, append-only log**: every row is flushed and `sync_data`-ed
//     before `maybe_record` returns, so a crash never loses an accepted sample.
//     Rows are never rewritten.
// 4.  **Ordered output**: `now` earlier than the last accepted time is never due,
//     which keeps log timestamps non-decreasing even with a misbehaving clock.

use crate::core_modules::circle_fitter::Detection;
use crate::error::TrackerError;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const CSV_HEADER: &str = "Timestamp,X,Y,Radius";

/// Upper bound on `_N` suffixes tried when a timestamped name is taken.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// One persisted observation of the tracked object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Seconds, from the session clock.
    pub timestamp: f64,
    pub x: i32,
    pub y: i32,
    pub radius: i32,
}

impl Sample {
    /// Truncates the fitted floats toward zero.
    pub fn from_detection(detection: &Detection, timestamp: f64) -> Self {
        Self {
            timestamp,
            x: detection.center.0 as i32,
            y: detection.center.1 as i32,
            radius: detection.radius as i32,
        }
    }

    pub fn to_csv_row(&self) -> String {
        format!("{:.6},{},{},{}", self.timestamp, self.x, self.y, self.radius)
    }
}

/// Where log bytes go. `persist` must not return until written data is durable.
pub trait LogSink: Write {
    fn persist(&mut self) -> io::Result<()>;
}

impl LogSink for File {
    fn persist(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

/// Append-only CSV trajectory log.
pub struct SampleLog {
    path: PathBuf,
    writer: BufWriter<Box<dyn LogSink>>,
    rows: u64,
}

impl fmt::Debug for SampleLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleLog")
            .field("path", &self.path)
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}

impl SampleLog {
    /// Creates `<dir>/<prefix>_<YYYYMMDD_HHMMSS>.csv`, adding `_N` if that name
    /// is already taken.
    pub fn create_in(dir: &Path, prefix: &str) -> Result<Self, TrackerError> {
        fs::create_dir_all(dir).map_err(|e| TrackerError::persistence(dir, e))?;
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let base = format!("{prefix}_{stamp}");

        let mut last_err = None;
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("{base}.csv")
            } else {
                format!("{base}_{attempt}.csv")
            };
            match Self::create(dir.join(name)) {
                Err(TrackerError::Persistence { path, source }) if source.kind() == io::ErrorKind::AlreadyExists => {
                    last_err = Some(TrackerError::Persistence { path, source });
                }
                other => return other,
            }
        }
        Err(last_err.unwrap_or_else(|| {
            TrackerError::persistence(dir, io::Error::other("no free log file name"))
        }))
    }

    /// Creates a new log at exactly `path`; fails if the file exists.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, TrackerError> {
        let path = path.into();
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| TrackerError::persistence(&path, e))?;
        Self::with_sink(path, file)
    }

    /// Starts a log on an already opened sink; `path` is only reported back.
    pub fn with_sink(path: impl Into<PathBuf>, sink: impl LogSink + 'static) -> Result<Self, TrackerError> {
        let mut log = Self {
            path: path.into(),
            writer: BufWriter::new(Box::new(sink)),
            rows: 0,
        };
        log.write_line(CSV_HEADER)?;
        Ok(log)
    }

    pub fn append(&mut self, sample: &Sample) -> Result<(), TrackerError> {
        self.write_line(&sample.to_csv_row())?;
        self.rows += 1;
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<(), TrackerError> {
        let result = writeln!(self.writer, "{line}")
            .and_then(|_| self.writer.flush())
            .and_then(|_| self.writer.get_mut().persist());
        result.map_err(|e| TrackerError::persistence(&self.path, e))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows written so far, header excluded.
    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    /// Flushes and closes the log, returning its path.
    pub fn close(mut self) -> Result<PathBuf, TrackerError> {
        self.writer
            .flush()
            .map_err(|e| TrackerError::persistence(&self.path, e))?;
        Ok(self.path)
    }
}

/// Process-lifetime state of one tracking session.
#[derive(Debug)]
pub struct SessionState {
    /// Timestamp of the last accepted sample; `None` until the first one.
    pub last_record_time: Option<f64>,
    /// Minimum seconds between two accepted samples.
    pub record_interval: f64,
    log: SampleLog,
}

impl SessionState {
    pub fn new(record_interval: f64, log: SampleLog) -> Self {
        Self {
            last_record_time: None,
            record_interval,
            log,
        }
    }

    pub fn is_due(&self, now: f64) -> bool {
        match self.last_record_time {
            None => true,
            Some(last) => now >= last && now - last >= self.record_interval,
        }
    }

    pub fn log(&self) -> &SampleLog {
        &self.log
    }

    pub fn samples_written(&self) -> u64 {
        self.log.rows_written()
    }

    pub fn close(self) -> Result<PathBuf, TrackerError> {
        self.log.close()
    }
}

/// Records `detection` at `now` if the sampling interval has elapsed.
pub fn maybe_record(
    detection: &Detection,
    now: f64,
    state: &mut SessionState,
) -> Result<Option<Sample>, TrackerError> {
    if !state.is_due(now) {
        return Ok(None);
    }

    let sample = Sample::from_detection(detection, now);
    state.log.append(&sample)?;
    state.last_record_time = Some(now);
    log::info!(
        "Recorded: X: {}, Y: {}, Radius: {}",
        sample.x,
        sample.y,
        sample.radius
    );
    Ok(Some(sample))
}
