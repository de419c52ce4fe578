//! Pure calculation functions for crop geometry and search ladders.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{CropRect, Dimensions, PixelRect, Quality};

/// Slack absorbed before rounding canvas sizes up, so `cos(90°) ≈ 6e-17`
/// does not grow a canvas by a whole pixel.
const CANVAS_EPSILON: f64 = 1e-6;

/// Convert degrees to radians.
pub fn radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

/// Whether a rotation leaves the pixel grid untouched (a multiple of 360°).
pub fn is_identity_rotation(degrees: f64) -> bool {
    degrees.rem_euclid(360.0) == 0.0
}

/// Axis-aligned bounding box of a `W × H` rectangle rotated about its centre.
///
/// ```text
/// bbox_w = |cos θ · W| + |sin θ · H|
/// bbox_h = |sin θ · W| + |cos θ · H|
/// ```
///
/// # Examples
/// ```
/// # use fitcrop::imaging::{Dimensions, rotated_bounds};
/// let (w, h) = rotated_bounds(Dimensions::new(1000, 1000), 45.0);
/// assert!((w - 1414.21).abs() < 0.01);
/// assert!((h - 1414.21).abs() < 0.01);
/// ```
pub fn rotated_bounds(dims: Dimensions, degrees: f64) -> (f64, f64) {
    let theta = radians(degrees);
    let (sin, cos) = theta.sin_cos();
    let w = dims.width as f64;
    let h = dims.height as f64;
    (
        (cos * w).abs() + (sin * h).abs(),
        (sin * w).abs() + (cos * h).abs(),
    )
}

/// Integer canvas that strictly contains the rotated extent.
pub fn rotated_canvas_size(dims: Dimensions, degrees: f64) -> Dimensions {
    let (w, h) = rotated_bounds(dims, degrees);
    Dimensions::new(ceil_canvas(w), ceil_canvas(h))
}

fn ceil_canvas(extent: f64) -> u32 {
    ((extent - CANVAS_EPSILON).ceil().max(1.0)) as u32
}

/// Round an editor crop to whole pixels.
///
/// Returns a description of the problem when the rounded rectangle is
/// empty, negative, or not finite.
pub fn round_crop(crop: &CropRect) -> Result<PixelRect, String> {
    let values = [crop.x, crop.y, crop.width, crop.height];
    if values.iter().any(|v| !v.is_finite()) {
        return Err(format!("crop has non-finite coordinates: {crop:?}"));
    }
    if crop.width <= 0.0 || crop.height <= 0.0 {
        return Err(format!(
            "crop extent must be positive, got {}×{}",
            crop.width, crop.height
        ));
    }

    let [x, y, width, height] = values.map(f64::round);
    if x < 0.0 || y < 0.0 {
        return Err(format!("crop origin ({x}, {y}) is negative"));
    }
    if width < 1.0 || height < 1.0 {
        return Err(format!(
            "crop {}×{} rounds to an empty region",
            crop.width, crop.height
        ));
    }
    if [x, y, width, height].iter().any(|&v| v > u32::MAX as f64) {
        return Err(format!("crop {crop:?} exceeds the addressable pixel range"));
    }

    Ok(PixelRect::new(x as u32, y as u32, width as u32, height as u32))
}

/// Scale `dims` so that its longer edge equals `long_edge`.
///
/// The long edge is exact; the short edge is rounded and never below 1 px.
///
/// # Examples
/// ```
/// # use fitcrop::imaging::{Dimensions, fit_long_edge};
/// assert_eq!(fit_long_edge(Dimensions::new(4000, 3000), 2000), Dimensions::new(2000, 1500));
/// assert_eq!(fit_long_edge(Dimensions::new(1500, 2000), 1000), Dimensions::new(750, 1000));
/// ```
pub fn fit_long_edge(dims: Dimensions, long_edge: u32) -> Dimensions {
    let long_edge = long_edge.max(1);
    if dims.width >= dims.height {
        let ratio = long_edge as f64 / dims.width as f64;
        let h = ((dims.height as f64 * ratio).round() as u32).max(1);
        Dimensions::new(long_edge, h)
    } else {
        let ratio = long_edge as f64 / dims.height as f64;
        let w = ((dims.width as f64 * ratio).round() as u32).max(1);
        Dimensions::new(w, long_edge)
    }
}

/// Build the descending long-edge caps the optimizer walks.
///
/// The sequence opens at `max(floor, initial_max)`, where `floor` is the
/// smallest ladder entry, then continues with every ladder entry below that
/// opening value. Each entry is capped at the image's own long edge (the
/// optimizer never upscales) and repeats collapse.
pub fn dimension_sequence(initial_max: u32, ladder: &[u32], image_long_edge: u32) -> Vec<u32> {
    let floor = ladder.iter().copied().min().unwrap_or(initial_max);
    let base = initial_max.max(floor).max(1);

    let mut sequence: Vec<u32> = std::iter::once(base)
        .chain(ladder.iter().copied().filter(|&d| d < base && d > 0))
        .map(|d| d.min(image_long_edge.max(1)))
        .collect();
    sequence.sort_unstable_by(|a, b| b.cmp(a));
    sequence.dedup();
    sequence
}

/// Clamp and de-duplicate a quality ladder, highest first.
pub fn quality_sequence(ladder: &[f32]) -> Vec<Quality> {
    let mut sequence: Vec<Quality> = ladder.iter().map(|&q| Quality::new(q)).collect();
    sequence.sort_by(|a, b| b.value().total_cmp(&a.value()));
    sequence.dedup();
    sequence
}
