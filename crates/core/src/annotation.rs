//! Annotation data model
//!
//! Annotations are drawn on a page in normalized coordinates and tagged with a
//! label definition that prices them. Geometry lives in a closed enum so every
//! consumer has to handle every annotation type explicitly.

use crate::coords::{CanvasSize, NormalizedPoint};
use crate::measurement::{calculate_line_length, calculate_polygon_area, is_simple_polygon};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an annotation
///
/// Generated as a UUID v4 string, but any string read from a project file is
/// accepted as long as it is unique within the project.
pub type AnnotationId = String;

/// Real-world unit a quantity is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementUnit {
    /// Counted items (fixtures, doors, windows)
    Count,
    /// Length in meters
    LinearMeters,
    /// Area in square meters
    SquareMeters,
}

impl MeasurementUnit {
    /// Wire name, identical to the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementUnit::Count => "count",
            MeasurementUnit::LinearMeters => "linear_meters",
            MeasurementUnit::SquareMeters => "square_meters",
        }
    }

    /// Short suffix for display next to a quantity
    pub fn symbol(&self) -> &'static str {
        match self {
            MeasurementUnit::Count => "ea",
            MeasurementUnit::LinearMeters => "m",
            MeasurementUnit::SquareMeters => "m²",
        }
    }
}

impl fmt::Display for MeasurementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color {0:?}: expected #rrggbb or #rrggbbaa")]
pub struct ColorParseError(String);

/// RGBA display color, serialized as a hex string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255, a: 255 };

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#rrggbb` or `#rrggbbaa` (the leading `#` is optional)
    pub fn from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        let channel = |i: usize| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| ColorParseError(hex.to_string()))
        };

        match digits.len() {
            6 => Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Ok(Self { r: channel(0)?, g: channel(2)?, b: channel(4)?, a: channel(6)? }),
            _ => Err(ColorParseError(hex.to_string())),
        }
    }

    /// Format as `#rrggbb`, or `#rrggbbaa` when not fully opaque
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::RED
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// Geometry of an annotation
///
/// Line and polygon points are normalized. The cached pixel measurements are
/// filled by [`Annotation::refresh_measurements`] and cleared whenever the
/// points change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationShape {
    /// Single counted point
    Marker,

    /// Text callout anchored at a point
    Label,

    /// Open polyline, at least 2 points
    Line {
        points: Vec<NormalizedPoint>,
        /// Length in pixels
        #[serde(rename = "lineLength", default, skip_serializing_if = "Option::is_none")]
        line_length: Option<f64>,
    },

    /// Closed ring, at least 3 points; the last point connects back to the first
    Polygon {
        points: Vec<NormalizedPoint>,
        /// Area in square pixels
        #[serde(rename = "polygonArea", default, skip_serializing_if = "Option::is_none")]
        polygon_area: Option<f64>,
    },
}

impl AnnotationShape {
    pub fn line(points: Vec<NormalizedPoint>) -> Self {
        AnnotationShape::Line { points, line_length: None }
    }

    pub fn polygon(points: Vec<NormalizedPoint>) -> Self {
        AnnotationShape::Polygon { points, polygon_area: None }
    }

    /// Unit implied by the annotation type
    pub fn default_unit(&self) -> MeasurementUnit {
        match self {
            AnnotationShape::Marker | AnnotationShape::Label => MeasurementUnit::Count,
            AnnotationShape::Line { .. } => MeasurementUnit::LinearMeters,
            AnnotationShape::Polygon { .. } => MeasurementUnit::SquareMeters,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            AnnotationShape::Marker => "marker",
            AnnotationShape::Label => "label",
            AnnotationShape::Line { .. } => "line",
            AnnotationShape::Polygon { .. } => "polygon",
        }
    }

    pub fn points(&self) -> &[NormalizedPoint] {
        match self {
            AnnotationShape::Marker | AnnotationShape::Label => &[],
            AnnotationShape::Line { points, .. } | AnnotationShape::Polygon { points, .. } => {
                points.as_slice()
            }
        }
    }

    /// Whether the shape has enough points to measure
    ///
    /// Malformed shapes are still accepted; they just measure 0.
    pub fn is_well_formed(&self) -> bool {
        match self {
            AnnotationShape::Marker | AnnotationShape::Label => true,
            AnnotationShape::Line { points, .. } => points.len() >= 2,
            AnnotationShape::Polygon { points, .. } => points.len() >= 3,
        }
    }
}

/// A single annotation on a project page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    id: AnnotationId,

    /// Owning page (1-based)
    page_number: u32,

    /// Anchor point in normalized coordinates
    position: NormalizedPoint,

    #[serde(default)]
    color: Color,

    /// Free-text label shown next to the annotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,

    /// Label definition this annotation is priced by
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label_id: Option<String>,

    #[serde(flatten)]
    shape: AnnotationShape,

    /// Explicit unit, overriding the type mapping
    #[serde(rename = "unit", default, skip_serializing_if = "Option::is_none")]
    unit_override: Option<MeasurementUnit>,

    /// Rectangle-style extent in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    height: Option<f64>,

    /// Cached real-world quantity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    quantity: Option<f64>,

    /// Unix timestamps in seconds
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    updated_at: i64,
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

impl Annotation {
    /// Create an annotation with a generated id
    pub fn new(page_number: u32, position: NormalizedPoint, shape: AnnotationShape) -> Self {
        let now = unix_now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            page_number,
            position,
            color: Color::default(),
            text: None,
            label_id: None,
            shape,
            unit_override: None,
            width: None,
            height: None,
            quantity: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn marker(page_number: u32, position: NormalizedPoint) -> Self {
        Self::new(page_number, position, AnnotationShape::Marker)
    }

    pub fn label(page_number: u32, position: NormalizedPoint, text: impl Into<String>) -> Self {
        Self::new(page_number, position, AnnotationShape::Label).with_text(text)
    }

    /// Line anchored at its first point
    pub fn line(page_number: u32, points: Vec<NormalizedPoint>) -> Self {
        let position = points.first().copied().unwrap_or_default();
        Self::new(page_number, position, AnnotationShape::line(points))
    }

    /// Polygon anchored at its first vertex
    pub fn polygon(page_number: u32, points: Vec<NormalizedPoint>) -> Self {
        let position = points.first().copied().unwrap_or_default();
        Self::new(page_number, position, AnnotationShape::polygon(points))
    }

    pub fn with_id(mut self, id: impl Into<AnnotationId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_label_id(mut self, label_id: impl Into<String>) -> Self {
        self.label_id = Some(label_id.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_unit(mut self, unit: MeasurementUnit) -> Self {
        self.unit_override = Some(unit);
        self
    }

    /// Attach a rectangle-style extent in pixels
    pub fn with_extent(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Set cached pixel measurements directly, e.g. when measured by the drawing tool
    pub fn with_line_length(mut self, length: f64) -> Self {
        if let AnnotationShape::Line { line_length, .. } = &mut self.shape {
            *line_length = Some(length);
        }
        self
    }

    pub fn with_polygon_area(mut self, area: f64) -> Self {
        if let AnnotationShape::Polygon { polygon_area, .. } = &mut self.shape {
            *polygon_area = Some(area);
        }
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn position(&self) -> NormalizedPoint {
        self.position
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn label_id(&self) -> Option<&str> {
        self.label_id.as_deref()
    }

    pub fn shape(&self) -> &AnnotationShape {
        &self.shape
    }

    /// Effective unit: the explicit override, else the type mapping
    pub fn unit(&self) -> MeasurementUnit {
        self.unit_override.unwrap_or_else(|| self.shape.default_unit())
    }

    /// Rectangle extent in pixels, if both sides are present
    pub fn extent(&self) -> Option<(f64, f64)> {
        self.width.zip(self.height)
    }

    pub fn quantity(&self) -> Option<f64> {
        self.quantity
    }

    /// Cached line length in pixels
    pub fn line_length(&self) -> Option<f64> {
        match &self.shape {
            AnnotationShape::Line { line_length, .. } => *line_length,
            AnnotationShape::Marker | AnnotationShape::Label | AnnotationShape::Polygon { .. } => {
                None
            }
        }
    }

    /// Cached polygon area in square pixels
    pub fn polygon_area(&self) -> Option<f64> {
        match &self.shape {
            AnnotationShape::Polygon { polygon_area, .. } => *polygon_area,
            AnnotationShape::Marker | AnnotationShape::Label | AnnotationShape::Line { .. } => {
                None
            }
        }
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }

    pub fn set_label_id(&mut self, label_id: Option<String>) {
        self.label_id = label_id;
        self.touch();
    }

    pub fn set_quantity(&mut self, quantity: f64) {
        self.quantity = Some(quantity);
    }

    pub fn clear_quantity(&mut self) {
        self.quantity = None;
    }

    /// Replace line or polygon points
    ///
    /// Invalidates every cached measurement. Has no effect on markers and labels.
    pub fn set_points(&mut self, new_points: Vec<NormalizedPoint>) {
        match &mut self.shape {
            AnnotationShape::Marker | AnnotationShape::Label => return,
            AnnotationShape::Line { points, line_length } => {
                *points = new_points;
                *line_length = None;
            }
            AnnotationShape::Polygon { points, polygon_area } => {
                *points = new_points;
                *polygon_area = None;
            }
        }
        if let Some(first) = self.shape.points().first() {
            self.position = *first;
        }
        self.quantity = None;
        self.touch();
    }

    /// Recompute cached pixel measurements against the page canvas
    pub fn refresh_measurements(&mut self, canvas: CanvasSize) {
        match &mut self.shape {
            AnnotationShape::Marker | AnnotationShape::Label => {}
            AnnotationShape::Line { points, line_length } => {
                let pixels = canvas.denormalize_points(points);
                *line_length = Some(calculate_line_length(&pixels));
            }
            AnnotationShape::Polygon { points, polygon_area } => {
                let pixels = canvas.denormalize_points(points);
                if pixels.len() >= 3 && !is_simple_polygon(&pixels) {
                    log::warn!(
                        "polygon annotation {} self-intersects; area may be inaccurate",
                        self.id
                    );
                }
                *polygon_area = Some(calculate_polygon_area(&pixels));
            }
        }
    }

    /// Update the modified timestamp to now
    pub fn touch(&mut self) {
        self.updated_at = unix_now();
    }
}
