//! lacefit-capture — Frame sources for the tracking loop.
//!
//! Provides the frame source abstraction and a replay source that feeds
//! recorded landmark streams through the same path as a live camera.

pub mod camera;
pub mod frame;

pub use camera::{CameraError, FrameSource, ReplayCamera};
pub use frame::{Frame, FramePayload, RecordedDetector};
