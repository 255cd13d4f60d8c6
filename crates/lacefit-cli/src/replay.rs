//! Drives a recorded frame stream through the frame gate, the engine and the
//! tracking session, the same way a live camera feed would be.

use crate::engine::{EngineError, EngineHandle, Submit};
use lacefit_capture::{CameraError, Frame, FrameSource};
use lacefit_core::{DetectionOutcome, FrameGate, GuidelineState, TrackingSession};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    /// Pace frames by their timestamps and drop frames that arrive while a
    /// derivation is in flight. Otherwise every admitted frame is awaited.
    pub realtime: bool,
    /// Take a snapshot (freezing the overlay) at this offset.
    pub freeze_at: Option<Duration>,
    /// Resume live guidance at this offset.
    pub resume_at: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct ReplayReport {
    pub frames: usize,
    /// Frames rejected by the gate (throttled or frozen).
    pub gated: usize,
    /// Frames admitted by the gate but dropped because the engine was busy.
    pub dropped: usize,
    pub processed: usize,
    /// Bad frames reported by the source. Replay carries on past them.
    pub source_errors: usize,
    /// Every status change, stamped with the frame offset that caused it.
    pub status_log: Vec<(Duration, String)>,
    pub snapshot: Option<GuidelineState>,
    pub final_state: Option<GuidelineState>,
}

struct Replay<'a> {
    session: TrackingSession,
    gate: FrameGate,
    opts: &'a ReplayOptions,
    froze: bool,
    resumed: bool,
    report: ReplayReport,
}

impl<'a> Replay<'a> {
    fn new(gate: FrameGate, opts: &'a ReplayOptions) -> Self {
        let session = TrackingSession::new();
        let report = ReplayReport {
            status_log: vec![(Duration::ZERO, session.status().to_string())],
            ..Default::default()
        };
        Self {
            session,
            gate,
            opts,
            froze: false,
            resumed: false,
            report,
        }
    }

    fn record_status(&mut self, at: Duration) {
        let status = self.session.status();
        let changed = self
            .report
            .status_log
            .last()
            .map_or(true, |(_, last)| last != status);
        if changed {
            tracing::info!(at_ms = at.as_millis() as u64, status, "status");
            self.report.status_log.push((at, status.to_string()));
        }
    }

    /// Fire freeze/resume controls due at `now`.
    fn controls(&mut self, now: Duration) {
        if !self.froze && self.opts.freeze_at.is_some_and(|t| now >= t) {
            self.froze = true;
            self.report.snapshot = self.session.capture_frame();
            self.record_status(now);
        }
        if self.froze && !self.resumed && self.opts.resume_at.is_some_and(|t| now >= t) {
            self.resumed = true;
            self.session.set_overlay_frozen(false);
            self.record_status(now);
        }
    }

    fn admit(&mut self, frame: &Frame) -> bool {
        self.report.frames += 1;
        self.controls(frame.timestamp);
        let admitted = self.gate.admit(frame.timestamp, self.session.mode());
        if !admitted {
            self.report.gated += 1;
            tracing::trace!(seq = frame.sequence, "frame gated");
        }
        admitted
    }

    fn apply(&mut self, outcome: DetectionOutcome, at: Duration) {
        self.report.processed += 1;
        self.session.apply(outcome);
        self.record_status(at);
    }

    fn source_error(&mut self, err: &CameraError, at: Duration) {
        self.report.source_errors += 1;
        self.session.report_camera_error(&err.to_string());
        self.record_status(at);
    }

    fn engine_failed(&mut self, err: &EngineError, at: Duration) {
        self.session.report_processing_error(&err.to_string());
        self.record_status(at);
    }

    fn finish(mut self) -> ReplayReport {
        self.report.final_state = self.session.state().cloned();
        self.report
    }
}

/// Replay every frame `source` yields through the engine.
///
/// Bad frames from the source become status text and replay continues.
/// If the engine goes away the failure is reported the same way and the
/// replay stops early.
pub async fn run_replay<S: FrameSource>(
    source: &mut S,
    engine: &EngineHandle<Frame>,
    outcomes: &mut mpsc::Receiver<DetectionOutcome>,
    gate: FrameGate,
    opts: &ReplayOptions,
) -> ReplayReport {
    let mut replay = Replay::new(gate, opts);
    let mut last_ts = Duration::ZERO;

    if !opts.realtime {
        while let Some(next) = source.next_frame() {
            let frame = match next {
                Ok(frame) => frame,
                Err(e) => {
                    replay.source_error(&e, last_ts);
                    continue;
                }
            };
            last_ts = frame.timestamp;
            if !replay.admit(&frame) {
                continue;
            }
            match engine.process(frame).await {
                Ok(outcome) => replay.apply(outcome, last_ts),
                Err(e) => {
                    replay.engine_failed(&e, last_ts);
                    break;
                }
            }
        }
        return replay.finish();
    }

    let start = tokio::time::Instant::now();
    // Accepted submissions whose outcome has not been applied yet.
    let mut pending = 0usize;

    while let Some(next) = source.next_frame() {
        let frame = match next {
            Ok(frame) => frame,
            Err(e) => {
                replay.source_error(&e, last_ts);
                continue;
            }
        };
        tokio::time::sleep_until(start + frame.timestamp).await;
        last_ts = frame.timestamp;

        while let Ok(outcome) = outcomes.try_recv() {
            pending = pending.saturating_sub(1);
            replay.apply(outcome, last_ts);
        }

        if !replay.admit(&frame) {
            continue;
        }
        let seq = frame.sequence;
        match engine.try_submit(frame) {
            Ok(Submit::Accepted) => pending += 1,
            Ok(Submit::Dropped) => {
                replay.report.dropped += 1;
                tracing::debug!(seq, "engine busy, frame dropped");
            }
            Err(e) => {
                replay.engine_failed(&e, last_ts);
                break;
            }
        }
    }

    if pending > 0 {
        tracing::debug!(pending, busy = engine.is_busy(), "draining in-flight frames");
    }
    while pending > 0 {
        match outcomes.recv().await {
            Some(outcome) => {
                pending -= 1;
                replay.apply(outcome, last_ts);
            }
            None => {
                replay.engine_failed(&EngineError::ChannelClosed, last_ts);
                break;
            }
        }
    }

    replay.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::spawn_engine;
    use lacefit_capture::{FramePayload, RecordedDetector, ReplayCamera};
    use lacefit_core::session::{STATUS_INITIAL, STATUS_LIVE, STATUS_NO_FACE, STATUS_SNAPSHOT};
    use lacefit_core::{
        DetectorError, FaceLandmarks, FaceObservation, GuidelineCalculator, LandmarkDetector,
        NormalizedRect, Point,
    };
    use std::collections::VecDeque;
    use std::io::Write;

    /// In-memory frame source yielding a fixed script of frames and errors.
    struct Scripted(VecDeque<Result<Frame, CameraError>>);

    impl Scripted {
        fn frames(frames: Vec<Frame>) -> Self {
            Self(frames.into_iter().map(Ok).collect())
        }
    }

    impl FrameSource for Scripted {
        fn next_frame(&mut self) -> Option<Result<Frame, CameraError>> {
            self.0.pop_front()
        }
    }

    /// Recorded detector that holds every frame for `delay`.
    struct SlowRecorded {
        delay: Duration,
    }

    impl LandmarkDetector for SlowRecorded {
        type Frame = Frame;

        fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceObservation>, DetectorError> {
            std::thread::sleep(self.delay);
            RecordedDetector.detect(frame)
        }
    }

    struct PanickingDetector;

    impl LandmarkDetector for PanickingDetector {
        type Frame = Frame;

        fn detect(&mut self, _frame: &Frame) -> Result<Vec<FaceObservation>, DetectorError> {
            panic!("detector crashed");
        }
    }

    fn face() -> FaceObservation {
        FaceObservation {
            bounding_box: NormalizedRect::new(0.2, 0.1, 0.6, 0.8),
            landmarks: Some(FaceLandmarks {
                left_eyebrow: Some(vec![Point::new(0.35, 0.6)]),
                right_eyebrow: Some(vec![Point::new(0.65, 0.6)]),
                left_eye: Some(vec![Point::new(0.33, 0.55)]),
                right_eye: Some(vec![Point::new(0.67, 0.55)]),
            }),
        }
    }

    fn frame(seq: u32, ms: u64, payload: FramePayload) -> Frame {
        Frame {
            timestamp: Duration::from_millis(ms),
            sequence: seq,
            payload,
        }
    }

    fn statuses(report: &ReplayReport) -> Vec<&str> {
        report.status_log.iter().map(|(_, s)| s.as_str()).collect()
    }

    const GOOD: &str = "Great position! Tap snapshot to save this alignment";
    const LOST: &str = "Vision error: detection request failed: lost tracking";

    #[tokio::test]
    async fn test_sequential_replay_throttles() {
        let (engine, mut outcomes) = spawn_engine(RecordedDetector, GuidelineCalculator::new()).unwrap();
        let mut source = Scripted::frames(vec![
            frame(0, 0, FramePayload::Faces(vec![face()])),
            frame(1, 40, FramePayload::Faces(vec![face()])),
            frame(2, 90, FramePayload::Faces(vec![])),
            frame(3, 130, FramePayload::Faces(vec![face()])),
            frame(4, 200, FramePayload::DetectorFailure("lost tracking".into())),
        ]);

        let report = run_replay(
            &mut source,
            &engine,
            &mut outcomes,
            FrameGate::default(),
            &ReplayOptions::default(),
        )
        .await;

        assert_eq!(report.frames, 5);
        assert_eq!(report.processed, 3);
        assert_eq!(report.gated, 2);
        assert_eq!(report.dropped, 0);
        assert_eq!(report.source_errors, 0);
        assert_eq!(statuses(&report), vec![STATUS_INITIAL, GOOD, STATUS_NO_FACE, LOST]);
        assert!(report.final_state.is_none());
    }

    #[tokio::test]
    async fn test_freeze_snapshot_and_resume() {
        let (engine, mut outcomes) = spawn_engine(RecordedDetector, GuidelineCalculator::new()).unwrap();
        let mut source = Scripted::frames(vec![
            frame(0, 0, FramePayload::Faces(vec![face()])),
            frame(1, 90, FramePayload::Faces(vec![face()])),
            frame(2, 130, FramePayload::Faces(vec![])),
            frame(3, 400, FramePayload::Faces(vec![])),
            frame(4, 600, FramePayload::Faces(vec![face()])),
        ]);
        let opts = ReplayOptions {
            realtime: false,
            freeze_at: Some(Duration::from_millis(100)),
            resume_at: Some(Duration::from_millis(500)),
        };

        let report = run_replay(&mut source, &engine, &mut outcomes, FrameGate::default(), &opts).await;

        // Frames at 130 and 400 arrive while frozen.
        assert_eq!(report.gated, 2);
        assert_eq!(report.processed, 3);

        let snap = report.snapshot.as_ref().expect("snapshot taken");
        assert_eq!(snap.temples.len(), 2);
        assert_eq!(snap.advice, GOOD);

        assert_eq!(
            statuses(&report),
            vec![STATUS_INITIAL, GOOD, STATUS_SNAPSHOT, STATUS_LIVE, GOOD]
        );
        assert_eq!(report.status_log[2].0, Duration::from_millis(130));
        assert!(report.final_state.is_some());
    }

    #[tokio::test]
    async fn test_bad_source_frame_reported_and_replay_continues() {
        let (engine, mut outcomes) = spawn_engine(RecordedDetector, GuidelineCalculator::new()).unwrap();
        let mut source = Scripted(VecDeque::from(vec![
            Ok(frame(0, 0, FramePayload::Faces(vec![face()]))),
            Ok(frame(1, 100, FramePayload::Faces(vec![]))),
            Err(CameraError::InvalidRecording {
                line: 3,
                reason: "key must be a string".into(),
            }),
            Ok(frame(2, 300, FramePayload::Faces(vec![face()]))),
        ]));

        let report = run_replay(
            &mut source,
            &engine,
            &mut outcomes,
            FrameGate::default(),
            &ReplayOptions::default(),
        )
        .await;

        assert_eq!(report.frames, 3);
        assert_eq!(report.processed, 3);
        assert_eq!(report.source_errors, 1);
        assert_eq!(
            statuses(&report),
            vec![
                STATUS_INITIAL,
                GOOD,
                STATUS_NO_FACE,
                "invalid recording at line 3: key must be a string",
                GOOD,
            ]
        );
        assert_eq!(report.status_log[3].0, Duration::from_millis(100));
        assert!(report.final_state.is_some());
    }

    #[tokio::test]
    async fn test_recording_with_bad_middle_line() {
        let path = std::env::temp_dir().join(format!("lacefit-replay-{}.jsonl", std::process::id()));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"{\"t_ms\":0,\"faces\":[]}\n{\"t_ms\":100,\"error\":\"lost tracking\"}\n{oops}\n{\"t_ms\":300,\"faces\":[]}\n")
            .unwrap();
        drop(f);

        let mut camera = ReplayCamera::open(&path.to_string_lossy()).unwrap();
        let (engine, mut outcomes) = spawn_engine(RecordedDetector, GuidelineCalculator::new()).unwrap();
        let report = run_replay(
            &mut camera,
            &engine,
            &mut outcomes,
            FrameGate::default(),
            &ReplayOptions::default(),
        )
        .await;
        std::fs::remove_file(&path).ok();

        assert_eq!(report.frames, 3);
        assert_eq!(report.processed, 3);
        assert_eq!(report.source_errors, 1);
        let log = statuses(&report);
        assert_eq!(log.len(), 5);
        assert_eq!(log[2], LOST);
        assert!(log[3].starts_with("invalid recording at line 3:"));
        assert_eq!(log[4], STATUS_NO_FACE);
    }

    #[tokio::test]
    async fn test_engine_failure_reported_as_processing_error() {
        let (engine, mut outcomes) = spawn_engine(PanickingDetector, GuidelineCalculator::new()).unwrap();
        let mut source = Scripted::frames(vec![
            frame(0, 0, FramePayload::Faces(vec![face()])),
            frame(1, 100, FramePayload::Faces(vec![face()])),
        ]);

        let report = run_replay(
            &mut source,
            &engine,
            &mut outcomes,
            FrameGate::default(),
            &ReplayOptions::default(),
        )
        .await;

        assert_eq!(report.processed, 0);
        assert_eq!(report.frames, 1);
        assert_eq!(
            statuses(&report),
            vec![STATUS_INITIAL, "Processing error: engine thread exited"]
        );
    }

    #[tokio::test]
    async fn test_realtime_replay_processes_final_frame() {
        let (engine, mut outcomes) = spawn_engine(RecordedDetector, GuidelineCalculator::new()).unwrap();
        let mut source = Scripted::frames(vec![frame(0, 0, FramePayload::Faces(vec![face()]))]);
        let opts = ReplayOptions {
            realtime: true,
            ..Default::default()
        };

        let report = run_replay(&mut source, &engine, &mut outcomes, FrameGate::default(), &opts).await;

        assert_eq!(report.processed, 1);
        assert_eq!(report.status_log.last().unwrap().1, GOOD);
    }

    #[tokio::test]
    async fn test_realtime_replay_drops_frames_while_busy() {
        let slow = SlowRecorded {
            delay: Duration::from_millis(200),
        };
        let (engine, mut outcomes) = spawn_engine(slow, GuidelineCalculator::new()).unwrap();
        // Every frame clears the 80 ms gate, but the detector takes 200 ms.
        let mut source = Scripted::frames(vec![
            frame(0, 0, FramePayload::Faces(vec![face()])),
            frame(1, 100, FramePayload::Faces(vec![face()])),
            frame(2, 300, FramePayload::DetectorFailure("lost tracking".into())),
            frame(3, 400, FramePayload::Faces(vec![])),
        ]);
        let opts = ReplayOptions {
            realtime: true,
            ..Default::default()
        };

        let report = run_replay(&mut source, &engine, &mut outcomes, FrameGate::default(), &opts).await;

        assert_eq!(report.frames, 4);
        assert_eq!(report.gated, 0);
        assert_eq!(report.dropped, 2);
        assert_eq!(report.processed, 2);
        // The last accepted frame (300 ms) is applied even though it was
        // still in flight when the recording ended.
        assert_eq!(statuses(&report), vec![STATUS_INITIAL, GOOD, LOST]);
        assert!(report.final_state.is_some());
    }
}
