//! Caller-side tracking state: the latest guidelines, the status line and
//! the overlay mode.

use crate::detector::DetectionOutcome;
use crate::throttle::OverlayMode;
use crate::types::GuidelineState;

pub const STATUS_INITIAL: &str = "Center your face and keep still";
pub const STATUS_NO_FACE: &str = "No face detected — keep your head steady";
pub const STATUS_FROZEN: &str = "Frozen overlay — adjust wig referencing the guide";
pub const STATUS_LIVE: &str = "Live guidance active";
pub const STATUS_SNAPSHOT: &str = "Snapshot saved. Resume when ready.";

#[derive(Debug, Clone)]
pub struct TrackingSession {
    state: Option<GuidelineState>,
    status: String,
    mode: OverlayMode,
}

impl Default for TrackingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingSession {
    pub fn new() -> Self {
        Self {
            state: None,
            status: STATUS_INITIAL.to_string(),
            mode: OverlayMode::Live,
        }
    }

    pub fn state(&self) -> Option<&GuidelineState> {
        self.state.as_ref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn mode(&self) -> OverlayMode {
        self.mode
    }

    /// Apply the outcome of one detection.
    pub fn apply(&mut self, outcome: DetectionOutcome) {
        match outcome {
            DetectionOutcome::Face(state) => {
                self.status = state.advice.clone();
                self.state = Some(state);
            }
            DetectionOutcome::NoFace => {
                self.state = None;
                self.status = STATUS_NO_FACE.to_string();
            }
            DetectionOutcome::Failed(message) => {
                tracing::warn!(error = %message, "landmark detection failed");
                self.status = format!("Vision error: {message}");
            }
        }
    }

    /// Report a failure to hand a frame to the detector.
    pub fn report_processing_error(&mut self, message: &str) {
        tracing::warn!(error = message, "frame processing failed");
        self.status = format!("Processing error: {message}");
    }

    /// Report a capture-side failure using its user-facing message.
    pub fn report_camera_error(&mut self, message: &str) {
        tracing::error!(error = message, "camera error");
        self.status = message.to_string();
    }

    pub fn set_overlay_frozen(&mut self, frozen: bool) {
        self.mode = if frozen {
            OverlayMode::Frozen
        } else {
            OverlayMode::Live
        };
        self.status = if frozen { STATUS_FROZEN } else { STATUS_LIVE }.to_string();
        tracing::debug!(frozen, "overlay mode changed");
    }

    /// Freeze the overlay and hand back the guidelines on screen so the
    /// caller can export them.
    pub fn capture_frame(&mut self) -> Option<GuidelineState> {
        self.mode = OverlayMode::Frozen;
        self.status = STATUS_SNAPSHOT.to_string();
        tracing::info!(has_guidelines = self.state.is_some(), "snapshot captured");
        self.state.clone()
    }
}
