//! Recorded frame type and the detector that replays its landmarks.

use lacefit_core::{DetectorError, FaceObservation, LandmarkDetector};
use serde::Deserialize;
use std::time::Duration;

/// One frame from a landmark recording.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Offset from the start of the recording.
    pub timestamp: Duration,
    pub sequence: u32,
    pub payload: FramePayload,
}

/// What the detector reported for the frame when it was recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum FramePayload {
    Faces(Vec<FaceObservation>),
    DetectorFailure(String),
}

/// Wire form of one JSON Lines record.
#[derive(Debug, Deserialize)]
struct RecordLine {
    t_ms: u64,
    #[serde(default)]
    faces: Vec<FaceObservation>,
    #[serde(default)]
    error: Option<String>,
}

/// Parse one recording line. Blank lines yield `Ok(None)`.
pub fn parse_record(line: &str, sequence: u32) -> Result<Option<Frame>, serde_json::Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let record: RecordLine = serde_json::from_str(trimmed)?;
    let payload = match record.error {
        Some(message) => FramePayload::DetectorFailure(message),
        None => FramePayload::Faces(record.faces),
    };
    Ok(Some(Frame {
        timestamp: Duration::from_millis(record.t_ms),
        sequence,
        payload,
    }))
}

/// Detector that returns whatever was recorded alongside each frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordedDetector;

impl LandmarkDetector for RecordedDetector {
    type Frame = Frame;

    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceObservation>, DetectorError> {
        match &frame.payload {
            FramePayload::Faces(faces) => Ok(faces.clone()),
            FramePayload::DetectorFailure(message) => {
                Err(DetectorError::RequestFailed(message.clone()))
            }
        }
    }
}
