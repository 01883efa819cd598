//! Resolution-independent coordinate space
//!
//! Annotation geometry is stored as fractions of the page canvas so the same
//! point renders in the same place at any zoom level or canvas size.
//! Conversion to pixel space happens only when a pixel-unit measurement is needed.

use serde::{Deserialize, Serialize};

/// Convert a pixel offset into a fraction of `dimension`
///
/// `dimension` must be positive. It is always a live canvas measurement, so
/// no validation happens here.
pub fn normalize(pixel: f64, dimension: f64) -> f64 {
    pixel / dimension
}

/// Convert a fraction of `dimension` back into a pixel offset
pub fn denormalize(normalized: f64, dimension: f64) -> f64 {
    normalized * dimension
}

/// Point relative to a page canvas
///
/// Both axes are expected in `[0, 1]` when the point is normalized. After
/// [`CanvasSize::denormalize_point`] the same type carries pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in whatever space both points are expressed in
    pub fn distance_to(&self, other: &NormalizedPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Pull the point back onto the canvas
    ///
    /// Drawing tools can report pointer positions slightly outside the page
    /// while dragging.
    pub fn clamped(&self) -> Self {
        Self { x: self.x.clamp(0.0, 1.0), y: self.y.clamp(0.0, 1.0) }
    }

    /// Whether both axes lie in `[0, 1]`
    pub fn is_on_canvas(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }
}

/// Pixel dimensions of a rendered page canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Map a pixel position into normalized space
    pub fn normalize_point(&self, pixel: NormalizedPoint) -> NormalizedPoint {
        NormalizedPoint::new(normalize(pixel.x, self.width), normalize(pixel.y, self.height))
    }

    /// Map a normalized position into pixel space
    pub fn denormalize_point(&self, point: NormalizedPoint) -> NormalizedPoint {
        NormalizedPoint::new(denormalize(point.x, self.width), denormalize(point.y, self.height))
    }

    pub fn denormalize_points(&self, points: &[NormalizedPoint]) -> Vec<NormalizedPoint> {
        points.iter().map(|p| self.denormalize_point(*p)).collect()
    }
}
