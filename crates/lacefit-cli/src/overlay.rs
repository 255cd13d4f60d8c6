//! Guideline overlay rasterization.
//!
//! Maps normalized guideline geometry into pixel space and draws it onto an
//! RGBA canvas: hairline in green, ear-to-ear in blue, center line in
//! orange, temples as pink discs.

use image::{Rgba, RgbaImage};
use lacefit_core::{Guideline, GuidelineState, Point};

const HAIRLINE_COLOR: Rgba<u8> = Rgba([52, 199, 89, 255]);
const EAR_TO_EAR_COLOR: Rgba<u8> = Rgba([0, 122, 255, 255]);
const CENTER_LINE_COLOR: Rgba<u8> = Rgba([255, 149, 0, 255]);
const TEMPLE_COLOR: Rgba<u8> = Rgba([255, 45, 85, 255]);

const HAIRLINE_WIDTH: f64 = 4.0;
const GUIDELINE_WIDTH: f64 = 3.0;
const TEMPLE_RADIUS: f64 = 6.0;

/// Opaque black canvas of the given size.
pub fn blank_canvas(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]))
}

/// Draw the guidelines of `state` onto `canvas`.
pub fn render(state: &GuidelineState, canvas: &mut RgbaImage) {
    let (w, h) = (canvas.width() as f64, canvas.height() as f64);
    let to_px = |p: &Point| p.denormalized(w, h);

    if state.hairline_curve.len() >= 2 {
        let pts: Vec<Point> = state.hairline_curve.iter().map(to_px).collect();
        for pair in pts.windows(2) {
            stroke(canvas, pair[0], pair[1], HAIRLINE_WIDTH, HAIRLINE_COLOR);
        }
    }

    draw_guideline(canvas, &state.ear_to_ear, EAR_TO_EAR_COLOR);
    draw_guideline(canvas, &state.center_line, CENTER_LINE_COLOR);

    for temple in &state.temples {
        fill_disc(canvas, to_px(temple), TEMPLE_RADIUS, TEMPLE_COLOR);
    }
}

fn draw_guideline(canvas: &mut RgbaImage, guideline: &Guideline, color: Rgba<u8>) {
    let (w, h) = (canvas.width() as f64, canvas.height() as f64);
    let start = guideline.start.denormalized(w, h);
    let end = guideline.end.denormalized(w, h);
    stroke(canvas, start, end, GUIDELINE_WIDTH, color);
}

/// Stroke a segment by stamping discs along it. Zero-length segments draw
/// nothing.
fn stroke(canvas: &mut RgbaImage, from: Point, to: Point, width: f64, color: Rgba<u8>) {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    let length = dx.hypot(dy);
    if length < f64::EPSILON {
        return;
    }
    // One stamp per pixel, but never more than it takes to cross the canvas.
    let max_steps = (canvas.width() as usize + canvas.height() as usize).max(1);
    let steps = (length.ceil() as usize).min(max_steps);
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let p = Point::new(from.x + dx * t, from.y + dy * t);
        fill_disc(canvas, p, width / 2.0, color);
    }
}

fn fill_disc(canvas: &mut RgbaImage, center: Point, radius: f64, color: Rgba<u8>) {
    let (w, h) = (canvas.width() as i64, canvas.height() as i64);
    let x0 = ((center.x - radius).floor() as i64).max(0);
    let x1 = ((center.x + radius).ceil() as i64).min(w - 1);
    let y0 = ((center.y - radius).floor() as i64).max(0);
    let y1 = ((center.y + radius).ceil() as i64).min(h - 1);
    let r2 = radius * radius;

    for y in y0..=y1 {
        for x in x0..=x1 {
            let (px, py) = (x as f64 + 0.5 - center.x, y as f64 + 0.5 - center.y);
            if px * px + py * py <= r2 {
                canvas.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}
