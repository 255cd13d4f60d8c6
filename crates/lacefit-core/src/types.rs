use serde::{Deserialize, Serialize};

/// A 2D point in normalized image coordinates (0..1 on both axes).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Map a normalized point into pixel space for an image of the given size.
    pub fn denormalized(&self, width: f64, height: f64) -> Point {
        Point {
            x: self.x * width,
            y: self.y * height,
        }
    }

    /// Flip the vertical axis (`y -> 1 - y`).
    pub fn mirrored(&self) -> Point {
        Point {
            x: self.x,
            y: 1.0 - self.y,
        }
    }

    /// Arithmetic mean of a point cluster. `None` for an empty slice.
    pub fn mean(points: &[Point]) -> Option<Point> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let (sx, sy) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Some(Point::new(sx / n, sy / n))
    }
}

/// Face bounding box in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn mid_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn mid_y(&self) -> f64 {
        self.y + self.height / 2.0
    }
}

/// A straight guide segment between two normalized points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Guideline {
    pub start: Point,
    pub end: Point,
}

impl Guideline {
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }
}

/// Eyebrow and eye point clusters reported by a landmark detector.
///
/// Each region is optional: detectors may omit regions they could not
/// localize in a given frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceLandmarks {
    pub left_eyebrow: Option<Vec<Point>>,
    pub right_eyebrow: Option<Vec<Point>>,
    pub left_eye: Option<Vec<Point>>,
    pub right_eye: Option<Vec<Point>>,
}

impl FaceLandmarks {
    /// True when none of the four regions carries any point.
    pub fn is_empty(&self) -> bool {
        [
            &self.left_eyebrow,
            &self.right_eyebrow,
            &self.left_eye,
            &self.right_eye,
        ]
        .into_iter()
        .all(|region| region.as_ref().map_or(true, Vec::is_empty))
    }
}

/// One detected face: bounding box plus optional landmark regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    pub bounding_box: NormalizedRect,
    #[serde(default)]
    pub landmarks: Option<FaceLandmarks>,
}

/// Placement guidelines derived from a single face observation.
///
/// All geometry is normalized; callers denormalize for drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidelineState {
    pub hairline_curve: Vec<Point>,
    pub ear_to_ear: Guideline,
    pub center_line: Guideline,
    /// Up to two temple points (left, right). Missing temples are omitted.
    pub temples: Vec<Point>,
    pub tilt_degrees: f64,
    pub forehead_offset_mm: f64,
    pub advice: String,
}

impl GuidelineState {
    /// Advisory shown while no usable landmarks are available.
    pub const IDLE_ADVICE: &'static str = "Hold steady while we find your fit";

    pub fn empty() -> Self {
        Self {
            hairline_curve: Vec::new(),
            ear_to_ear: Guideline::default(),
            center_line: Guideline::default(),
            temples: Vec::new(),
            tilt_degrees: 0.0,
            forehead_offset_mm: 0.0,
            advice: Self::IDLE_ADVICE.to_string(),
        }
    }
}
