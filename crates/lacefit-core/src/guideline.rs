//! Wig guideline derivation.
//!
//! Turns one face observation into a hairline curve, symmetry lines, temple
//! points, a tilt angle and a placement recommendation. Pure: no state and
//! no I/O, safe to call from any thread.

use crate::types::{FaceLandmarks, FaceObservation, Guideline, GuidelineState, NormalizedRect, Point};

// --- Named constants ---
const FOREHEAD_OFFSET_RATIO: f64 = 0.018;
const MIN_HAIRLINE_Y: f64 = 0.02;
const MILLIMETERS_PER_POINT: f64 = 0.35;
const NORMALIZED_UNITS_PER_POINT: f64 = 1000.0;
const TILT_TOLERANCE_DEGREES: f64 = 2.5;
const MIN_FOREHEAD_OFFSET_MM: f64 = 2.0;
/// Ten uniform steps across the box width, both edges included.
const HAIRLINE_STEPS: usize = 10;

/// Brow row used for the hairline when eyebrows are not available.
const FALLBACK_HAIRLINE_BROW_Y: f64 = 0.75;
/// Brow row used for the forehead offset when eyebrows are not available.
const FALLBACK_OFFSET_BROW_Y: f64 = 0.5;

const ADVICE_SLIDE_FORWARD: &str = "Slide the lace slightly forward to avoid tension";
const ADVICE_GOOD_POSITION: &str = "Great position! Tap snapshot to save this alignment";

/// Derives [`GuidelineState`] values from face observations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuidelineCalculator {
    /// Upward shift of the hairline from the brow row, in normalized height.
    pub forehead_offset_ratio: f64,
    /// Lowest allowed hairline row so the curve never leaves the frame.
    pub min_hairline_y: f64,
    /// Physical size of one point (1/1000 normalized unit), in millimeters.
    pub millimeters_per_point: f64,
    /// Tilt beyond which a rotation instruction is issued.
    pub tilt_tolerance_degrees: f64,
    /// Offset below which the lace is considered too tight.
    pub min_forehead_offset_mm: f64,
}

impl Default for GuidelineCalculator {
    fn default() -> Self {
        Self {
            forehead_offset_ratio: FOREHEAD_OFFSET_RATIO,
            min_hairline_y: MIN_HAIRLINE_Y,
            millimeters_per_point: MILLIMETERS_PER_POINT,
            tilt_tolerance_degrees: TILT_TOLERANCE_DEGREES,
            min_forehead_offset_mm: MIN_FOREHEAD_OFFSET_MM,
        }
    }
}

impl GuidelineCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive placement guidelines for one detected face.
    ///
    /// Returns [`GuidelineState::empty`] when the observation carries no
    /// eyebrow or eye landmarks. Never fails.
    pub fn guidelines(&self, observation: &FaceObservation) -> GuidelineState {
        let landmarks = match &observation.landmarks {
            Some(lm) if !lm.is_empty() => lm,
            _ => return GuidelineState::empty(),
        };
        let bbox = &observation.bounding_box;

        let brow_mid = brow_midpoint(landmarks);
        let left_temple = landmarks
            .left_eye
            .as_ref()
            .and_then(|pts| pts.first())
            .map(Point::mirrored);
        let right_temple = landmarks
            .right_eye
            .as_ref()
            .and_then(|pts| pts.last())
            .map(Point::mirrored);

        let hairline_y = self.hairline_row(brow_mid.map(|p| p.y));
        let hairline_curve = hairline_curve(bbox, hairline_y);

        let ear_to_ear = Guideline::new(
            Point::new(bbox.min_x(), bbox.mid_y()),
            Point::new(bbox.max_x(), bbox.mid_y()),
        );
        let center_line = Guideline::new(
            Point::new(bbox.mid_x(), bbox.max_y()),
            Point::new(bbox.mid_x(), bbox.min_y()),
        );

        let tilt = tilt_degrees(&ear_to_ear);
        let brow_y = brow_mid.map_or(FALLBACK_OFFSET_BROW_Y, |p| p.y);
        let forehead_offset_mm =
            (brow_y - hairline_y).abs() * NORMALIZED_UNITS_PER_POINT * self.millimeters_per_point;

        let advice = self.advice(tilt, forehead_offset_mm);

        tracing::trace!(
            hairline_y,
            tilt,
            forehead_offset_mm,
            temples = left_temple.is_some() as u8 + right_temple.is_some() as u8,
            "guidelines derived"
        );

        GuidelineState {
            hairline_curve,
            ear_to_ear,
            center_line,
            temples: [left_temple, right_temple].into_iter().flatten().collect(),
            tilt_degrees: tilt,
            forehead_offset_mm,
            advice,
        }
    }

    /// Hairline row: brow row shifted up by the offset ratio, floored so the
    /// curve stays inside the frame.
    pub fn hairline_row(&self, brow_y: Option<f64>) -> f64 {
        let brow_y = brow_y.unwrap_or(FALLBACK_HAIRLINE_BROW_Y);
        (brow_y - self.forehead_offset_ratio).max(self.min_hairline_y)
    }

    /// Pick the placement recommendation. Tilt wins over offset, offset
    /// wins over the affirmative message.
    pub fn advice(&self, tilt_degrees: f64, forehead_offset_mm: f64) -> String {
        if tilt_degrees.abs() > self.tilt_tolerance_degrees {
            let direction = if tilt_degrees > 0.0 {
                "clockwise"
            } else {
                "counter-clockwise"
            };
            format!("Rotate the wig {direction} by {:.1}°", tilt_degrees.abs())
        } else if forehead_offset_mm < self.min_forehead_offset_mm {
            ADVICE_SLIDE_FORWARD.to_string()
        } else {
            ADVICE_GOOD_POSITION.to_string()
        }
    }
}

/// Angle of a guideline against the horizontal, in degrees.
///
/// A zero-length segment yields 0 (`atan2(0, 0)`).
pub fn tilt_degrees(guideline: &Guideline) -> f64 {
    let dy = guideline.end.y - guideline.start.y;
    let dx = guideline.end.x - guideline.start.x;
    dy.atan2(dx).to_degrees()
}

/// Midpoint of the two eyebrow cluster means, with y mirrored.
fn brow_midpoint(landmarks: &FaceLandmarks) -> Option<Point> {
    let left = Point::mean(landmarks.left_eyebrow.as_deref()?)?;
    let right = Point::mean(landmarks.right_eyebrow.as_deref()?)?;
    Some(Point::new(
        (left.x + right.x) / 2.0,
        1.0 - (left.y + right.y) / 2.0,
    ))
}

fn hairline_curve(bbox: &NormalizedRect, hairline_y: f64) -> Vec<Point> {
    (0..=HAIRLINE_STEPS)
        .map(|i| {
            let fraction = i as f64 / HAIRLINE_STEPS as f64;
            Point::new(
                bbox.min_x() + bbox.width * fraction,
                bbox.min_y() + bbox.height * hairline_y,
            )
        })
        .collect()
}
