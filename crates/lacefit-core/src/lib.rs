//! lacefit-core — Wig placement guideline engine.
//!
//! Derives hairline, symmetry and tilt guidance from facial landmark
//! observations, and holds the caller-side throttling and session state
//! around that derivation.

pub mod detector;
pub mod guideline;
pub mod session;
pub mod throttle;
pub mod types;

pub use detector::{DetectionOutcome, DetectorError, LandmarkDetector};
pub use guideline::{tilt_degrees, GuidelineCalculator};
pub use session::TrackingSession;
pub use throttle::{FrameGate, OverlayMode};
pub use types::{FaceLandmarks, FaceObservation, Guideline, GuidelineState, NormalizedRect, Point};
