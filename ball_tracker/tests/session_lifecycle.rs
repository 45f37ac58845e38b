mod common;

use std::time::Duration;

use ball_tracker::tracking_loop::{self, LoopState, Step, StopReason, TrackingLoop};
use ball_tracker::{AcquisitionError, SampleLog, SessionState, TrackerError};
use common::*;
use tempfile::tempdir;

#[test]
fn quit_key_stops_and_releases_everything() {
    let dir = tempdir().unwrap();
    let cfg = config_in(dir.path(), 0.0);
    let source = ScriptedSource::new((0..10).map(|_| disk_frame(160, 120, 80, 60, 25)));
    let released = source.released.clone();
    let viewer = RecordingViewer::new().quit_after(3);
    let closed = viewer.closed.clone();

    let summary = tracking_loop::track(&cfg, source, viewer, ManualClock::ticking(0.0, 0.1, 10)).unwrap();

    assert_eq!(summary.stop_reason, StopReason::QuitKey);
    assert_eq!(summary.frames_processed, 3);
    assert_eq!(summary.samples_written, 3);
    assert!(released.get());
    assert!(closed.get());
}

#[test]
fn read_failure_ends_session_but_keeps_flushed_rows() {
    let dir = tempdir().unwrap();
    let cfg = config_in(dir.path(), 0.0);
    let session = tracking_loop::start_session(&cfg).unwrap();
    let log_path = session.log().path().to_path_buf();

    let source = ScriptedSource::new((0..2).map(|i| disk_frame(160, 120, 70 + i, 60, 25)))
        .then_fail(AcquisitionError::Read("device unplugged".to_string()));
    let released = source.released.clone();

    let err = TrackingLoop::new(&cfg, source, RecordingViewer::new(), ManualClock::ticking(0.0, 0.1, 5))
        .run(session)
        .unwrap_err();

    assert!(matches!(err, TrackerError::Acquisition(AcquisitionError::Read(_))));
    assert!(released.get());
    let rows = read_rows(&log_path);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][1], "70");
    assert_eq!(rows[1][1], "71");
}

#[test]
fn write_failure_ends_session_but_keeps_flushed_rows() {
    let dir = tempdir().unwrap();
    let cfg = config_in(dir.path(), 0.0);
    let path = dir.path().join("filling.csv");
    // Header plus two rows fit; the third row hits a full disk.
    let log = SampleLog::with_sink(&path, FillingSink::new(&path, 3)).unwrap();
    let session = SessionState::new(cfg.record_interval, log);

    let source = ScriptedSource::new((0..5).map(|i| disk_frame(160, 120, 70 + i, 60, 25)));
    let released = source.released.clone();
    let viewer = RecordingViewer::new();
    let closed = viewer.closed.clone();
    let renders = viewer.renders.clone();

    let err = TrackingLoop::new(&cfg, source, viewer, ManualClock::ticking(0.0, 0.1, 5))
        .run(session)
        .unwrap_err();

    assert!(matches!(err, TrackerError::Persistence { ref path, .. } if path.ends_with("filling.csv")));
    assert!(released.get());
    assert!(closed.get());
    assert_eq!(renders.borrow().len(), 2);
    let rows = read_rows(&path);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][1], "70");
    assert_eq!(rows[1][1], "71");
}

#[test]
fn timeout_is_reported_as_its_own_error() {
    let dir = tempdir().unwrap();
    let cfg = config_in(dir.path(), 0.0);
    let source = ScriptedSource::new([]).then_fail(AcquisitionError::Timeout(Duration::from_millis(250)));

    let err = tracking_loop::track(&cfg, source, RecordingViewer::new(), ManualClock::new([0.0])).unwrap_err();

    match err {
        TrackerError::Acquisition(AcquisitionError::Timeout(waited)) => {
            assert_eq!(waited, Duration::from_millis(250));
        }
        other => panic!("expected a timeout, got {other:?}"),
    }
}

#[test]
fn viewer_failures_do_not_stop_recording() {
    let dir = tempdir().unwrap();
    let cfg = config_in(dir.path(), 0.0);
    let viewer = RecordingViewer::new().failing();
    let renders = viewer.renders.clone();

    let summary = tracking_loop::track(
        &cfg,
        ScriptedSource::new((0..3).map(|_| disk_frame(160, 120, 80, 60, 25))),
        viewer,
        ManualClock::ticking(0.0, 0.1, 3),
    )
    .unwrap();

    assert_eq!(renders.borrow().len(), 3);
    assert_eq!(summary.samples_written, 3);
}

#[test]
fn frames_without_target_still_render_the_mask() {
    let dir = tempdir().unwrap();
    let cfg = config_in(dir.path(), 0.0);
    let viewer = RecordingViewer::new();
    let renders = viewer.renders.clone();

    let summary = tracking_loop::track(
        &cfg,
        ScriptedSource::new([blank_frame(64, 48), blank_frame(64, 48)]),
        viewer,
        ManualClock::new([0.0, 1.0]),
    )
    .unwrap();

    assert_eq!(summary.samples_written, 0);
    let renders = renders.borrow();
    assert_eq!(renders.len(), 2);
    assert!(renders.iter().all(|r| r.detection.is_none() && r.mask_pixels == 0));
}

#[test]
fn loop_moves_from_idle_to_running() {
    let dir = tempdir().unwrap();
    let cfg = config_in(dir.path(), 0.0);
    let mut session = tracking_loop::start_session(&cfg).unwrap();
    let mut tracker = TrackingLoop::new(
        &cfg,
        ScriptedSource::new([blank_frame(32, 32)]),
        RecordingViewer::new(),
        ManualClock::new([0.0]),
    );

    assert_eq!(tracker.state(), LoopState::Idle);
    assert_eq!(tracker.step(&mut session).unwrap(), Step::Continue);
    assert_eq!(tracker.state(), LoopState::Running);
    assert_eq!(tracker.step(&mut session).unwrap(), Step::Stop(StopReason::EndOfStream));
    assert_eq!(tracker.frames_processed(), 1);
}

#[test]
fn stepping_after_quit_repeats_the_quit_without_reading() {
    let dir = tempdir().unwrap();
    let cfg = config_in(dir.path(), 0.0);
    let mut session = tracking_loop::start_session(&cfg).unwrap();
    let mut tracker = TrackingLoop::new(
        &cfg,
        ScriptedSource::new([blank_frame(32, 32), blank_frame(32, 32)]),
        RecordingViewer::new().quit_after(1),
        ManualClock::new([0.0, 1.0]),
    );

    assert_eq!(tracker.step(&mut session).unwrap(), Step::Stop(StopReason::QuitKey));
    assert_eq!(tracker.step(&mut session).unwrap(), Step::Stop(StopReason::QuitKey));
    assert_eq!(tracker.frames_processed(), 1);
}

#[test]
fn unwritable_output_directory_fails_before_any_frame() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, b"").unwrap();
    let cfg = config_in(&blocker, 0.0);

    let err = tracking_loop::start_session(&cfg).unwrap_err();
    assert!(matches!(err, TrackerError::Persistence { .. }));
}
