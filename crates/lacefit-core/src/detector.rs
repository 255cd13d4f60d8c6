//! Landmark detection boundary.
//!
//! Detection itself is delegated to an external vision service; this module
//! only defines the seam and the per-frame outcome fed back to the session.

use crate::guideline::GuidelineCalculator;
use crate::types::{FaceObservation, GuidelineState};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    #[error("detection request failed: {0}")]
    RequestFailed(String),
}

/// A face landmark detector.
///
/// Implementations return every face found in the frame, best first. An
/// empty vector means no face was found.
pub trait LandmarkDetector {
    type Frame;

    fn detect(&mut self, frame: &Self::Frame) -> Result<Vec<FaceObservation>, DetectorError>;
}

/// Result of running detection and derivation on one admitted frame.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionOutcome {
    Face(GuidelineState),
    NoFace,
    Failed(String),
}

impl DetectionOutcome {
    /// Turn a detector result into an outcome, deriving guidelines for the
    /// first reported face.
    pub fn from_detection(
        result: Result<Vec<FaceObservation>, DetectorError>,
        calculator: &GuidelineCalculator,
    ) -> Self {
        match result {
            Ok(faces) => match faces.first() {
                Some(face) => DetectionOutcome::Face(calculator.guidelines(face)),
                None => DetectionOutcome::NoFace,
            },
            Err(e) => DetectionOutcome::Failed(e.to_string()),
        }
    }
}
