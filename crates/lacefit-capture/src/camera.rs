//! Frame sources: the capture side of the tracking loop.

use crate::frame::{self, Frame};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("We couldn't access the camera source: {0}")]
    DeviceNotFound(String),
    #[error("We were not able to read frames from the camera: {0}")]
    CaptureFailed(String),
    #[error("invalid recording at line {line}: {reason}")]
    InvalidRecording { line: usize, reason: String },
}

/// A source of camera frames, pulled one at a time.
///
/// `None` marks the end of the stream. An `Err` reports a bad frame; the
/// source may still yield further frames afterwards.
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<Result<Frame, CameraError>>;
}

/// Replays a JSON Lines landmark recording as a camera feed.
pub struct ReplayCamera {
    lines: Lines<BufReader<File>>,
    pub path: String,
    line_no: usize,
    sequence: u32,
}

impl ReplayCamera {
    /// Open a recording file (e.g., "session.jsonl").
    pub fn open(path: &str) -> Result<Self, CameraError> {
        if !Path::new(path).exists() {
            return Err(CameraError::DeviceNotFound(path.to_string()));
        }
        let file = File::open(path).map_err(|e| CameraError::DeviceNotFound(format!("{path}: {e}")))?;

        tracing::info!(path, "replay source opened");

        Ok(Self {
            lines: BufReader::new(file).lines(),
            path: path.to_string(),
            line_no: 0,
            sequence: 0,
        })
    }
}

impl FrameSource for ReplayCamera {
    fn next_frame(&mut self) -> Option<Result<Frame, CameraError>> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(CameraError::CaptureFailed(e.to_string()))),
            };
            self.line_no += 1;

            match frame::parse_record(&line, self.sequence) {
                Ok(Some(frame)) => {
                    self.sequence += 1;
                    return Some(Ok(frame));
                }
                Ok(None) => continue,
                Err(e) => {
                    return Some(Err(CameraError::InvalidRecording {
                        line: self.line_no,
                        reason: e.to_string(),
                    }))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FramePayload;
    use std::io::Write;
    use std::time::Duration;

    fn write_recording(name: &str, contents: &str) -> String {
        let path = std::env::temp_dir().join(format!("lacefit-{}-{name}.jsonl", std::process::id()));
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_missing_file() {
        let err = ReplayCamera::open("/nonexistent/lacefit.jsonl").err().unwrap();
        assert!(matches!(err, CameraError::DeviceNotFound(_)));
    }

    #[test]
    fn test_reads_frames_and_skips_blank_lines() {
        let path = write_recording(
            "ok",
            "{\"t_ms\": 0}\n\n{\"t_ms\": 90, \"error\": \"lost\"}\n",
        );
        let mut cam = ReplayCamera::open(&path).unwrap();
        let frames: Vec<Frame> = std::iter::from_fn(|| cam.next_frame())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].sequence, 1);
        assert_eq!(frames[1].timestamp, Duration::from_millis(90));
        assert_eq!(frames[1].payload, FramePayload::DetectorFailure("lost".into()));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_invalid_line_reports_line_number() {
        let path = write_recording("bad", "{\"t_ms\": 0}\n\n{oops}\n");
        let mut cam = ReplayCamera::open(&path).unwrap();
        assert!(cam.next_frame().unwrap().is_ok());
        match cam.next_frame().unwrap() {
            Err(CameraError::InvalidRecording { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected invalid recording, got {other:?}"),
        }
        assert!(cam.next_frame().is_none());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_frames_after_invalid_line_still_read() {
        let path = write_recording("resume", "{\"t_ms\": 0}\n{oops}\n{\"t_ms\": 90}\n");
        let mut cam = ReplayCamera::open(&path).unwrap();
        assert!(cam.next_frame().unwrap().is_ok());
        assert!(cam.next_frame().unwrap().is_err());
        let frame = cam.next_frame().unwrap().unwrap();
        assert_eq!(frame.timestamp, Duration::from_millis(90));
        assert_eq!(frame.sequence, 1);
        assert!(cam.next_frame().is_none());
        std::fs::remove_file(path).ok();
    }
}
