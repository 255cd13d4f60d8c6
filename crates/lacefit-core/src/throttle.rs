//! Frame admission: minimum-interval throttling plus the frozen-overlay gate.

use std::time::Duration;

/// Default minimum spacing between derivations.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(80);

/// Whether the overlay follows the live feed or is held in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayMode {
    #[default]
    Live,
    Frozen,
}

impl OverlayMode {
    pub fn is_frozen(self) -> bool {
        self == OverlayMode::Frozen
    }
}

/// Decides which incoming camera frames get a derivation.
///
/// Timestamps are offsets from session start, so the gate behaves the same
/// for live capture and for replayed recordings.
#[derive(Debug, Clone)]
pub struct FrameGate {
    min_interval: Duration,
    last_admitted: Option<Duration>,
}

impl Default for FrameGate {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

impl FrameGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_admitted: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Admit the frame arriving at `now` if the overlay is live and strictly
    /// more than the minimum interval has passed since the last admitted
    /// frame. Rejected frames leave the gate untouched.
    pub fn admit(&mut self, now: Duration, mode: OverlayMode) -> bool {
        if mode.is_frozen() {
            return false;
        }
        if let Some(last) = self.last_admitted {
            // Out-of-order timestamps saturate to zero and are rejected.
            if now.saturating_sub(last) <= self.min_interval {
                return false;
            }
        }
        self.last_admitted = Some(now);
        true
    }
}
