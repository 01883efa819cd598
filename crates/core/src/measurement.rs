//! Measurement geometry and quantity take-off
//!
//! Pixel-space geometry (path length, Shoelace area) plus the conversion of an
//! annotation into a real-world quantity using a meters-per-pixel scale.
//! Every function here is total: malformed input measures 0 instead of failing.

use crate::annotation::{Annotation, AnnotationShape, MeasurementUnit};
use crate::coords::NormalizedPoint;

/// Total length of an open path
///
/// Works in whatever space the points are in; denormalize first to get pixels.
/// Fewer than 2 points measure 0.
pub fn calculate_line_length(points: &[NormalizedPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
}

/// Area of a closed ring using the Shoelace formula
///
/// The ring does not need to repeat its first point. Fewer than 3 points
/// measure 0. Self-intersecting rings are not rejected; see [`is_simple_polygon`].
pub fn calculate_polygon_area(points: &[NormalizedPoint]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x * points[j].y;
        area -= points[j].x * points[i].y;
    }
    (area / 2.0).abs()
}

/// Real-world quantity of an annotation
///
/// Count units always measure 1. Otherwise a cached `quantity` is returned
/// unchanged; callers that change calibration must clear it first (the
/// [`Project`](crate::project::Project) calibration methods do).
pub fn calculate_quantity(annotation: &Annotation, meters_per_pixel: f64) -> f64 {
    let unit = annotation.unit();
    if unit == MeasurementUnit::Count {
        return 1.0;
    }
    if let Some(quantity) = annotation.quantity() {
        return quantity;
    }

    match unit {
        MeasurementUnit::Count => 1.0,
        MeasurementUnit::LinearMeters => {
            if let Some(length) = annotation.line_length() {
                length * meters_per_pixel
            } else if let Some((width, height)) = annotation.extent() {
                // Rectangle perimeter
                2.0 * (width + height) * meters_per_pixel
            } else {
                0.0
            }
        }
        MeasurementUnit::SquareMeters => {
            let scale = meters_per_pixel * meters_per_pixel;
            if let Some(area) = annotation.polygon_area() {
                area * scale
            } else if let Some((width, height)) = annotation.extent() {
                width * height * scale
            } else {
                0.0
            }
        }
    }
}

/// Whether a ring has no crossing edges
///
/// Adjacent edges share a vertex and are not compared. Repeated consecutive
/// vertices, including a closing copy of the first point, are collapsed
/// first. Rings with fewer than 3 distinct points are reported as not simple.
pub fn is_simple_polygon(points: &[NormalizedPoint]) -> bool {
    let mut ring: Vec<NormalizedPoint> = Vec::with_capacity(points.len());
    for point in points {
        if ring.last() != Some(point) {
            ring.push(*point);
        }
    }
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }

    let points = ring.as_slice();
    let n = points.len();
    if n < 3 {
        return false;
    }
    for i in 0..n {
        let a1 = points[i];
        let a2 = points[(i + 1) % n];
        for j in (i + 1)..n {
            // Neighbouring edges share a vertex
            if (j + 1) % n == i || (i + 1) % n == j {
                continue;
            }
            let b1 = points[j];
            let b2 = points[(j + 1) % n];
            if segments_intersect(&a1, &a2, &b1, &b2) {
                return false;
            }
        }
    }
    true
}

fn orientation(a: &NormalizedPoint, b: &NormalizedPoint, c: &NormalizedPoint) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn on_segment(a: &NormalizedPoint, b: &NormalizedPoint, p: &NormalizedPoint) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

fn segments_intersect(
    p1: &NormalizedPoint,
    p2: &NormalizedPoint,
    q1: &NormalizedPoint,
    q2: &NormalizedPoint,
) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    // Collinear touching
    (d1 == 0.0 && on_segment(q1, q2, p1))
        || (d2 == 0.0 && on_segment(q1, q2, p2))
        || (d3 == 0.0 && on_segment(p1, p2, q1))
        || (d4 == 0.0 && on_segment(p1, p2, q2))
}

/// Mean of the vertices
pub fn polygon_centroid(points: &[NormalizedPoint]) -> Option<NormalizedPoint> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let sum_x: f64 = points.iter().map(|p| p.x).sum();
    let sum_y: f64 = points.iter().map(|p| p.y).sum();
    Some(NormalizedPoint::new(sum_x / n, sum_y / n))
}

/// Point halfway along a path
pub fn path_midpoint(points: &[NormalizedPoint]) -> Option<NormalizedPoint> {
    match points {
        [] => None,
        [only] => Some(*only),
        _ => {
            let half_length = calculate_line_length(points) / 2.0;
            let mut accumulated = 0.0;
            for window in points.windows(2) {
                let segment_length = window[0].distance_to(&window[1]);
                if segment_length > 0.0 && accumulated + segment_length >= half_length {
                    let t = (half_length - accumulated) / segment_length;
                    return Some(NormalizedPoint::new(
                        window[0].x + t * (window[1].x - window[0].x),
                        window[0].y + t * (window[1].y - window[0].y),
                    ));
                }
                accumulated += segment_length;
            }
            points.last().copied()
        }
    }
}

/// Where the quantity label for an annotation is drawn
pub fn label_position(annotation: &Annotation) -> NormalizedPoint {
    let fallback = annotation.position();
    match annotation.shape() {
        AnnotationShape::Marker | AnnotationShape::Label => fallback,
        AnnotationShape::Line { points, .. } => path_midpoint(points).unwrap_or(fallback),
        AnnotationShape::Polygon { points, .. } => polygon_centroid(points).unwrap_or(fallback),
    }
}
