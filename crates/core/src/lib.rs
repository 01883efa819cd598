//! Takeoff Core Library
//!
//! Coordinate and cost engine for construction drawing take-offs: normalized
//! annotation geometry, calibration to real-world units, and cost roll-ups.

pub mod annotation;
pub mod calibration;
pub mod coords;
pub mod cost;
pub mod labels;
pub mod measurement;
pub mod project;

pub use annotation::{Annotation, AnnotationId, AnnotationShape, Color, MeasurementUnit};
pub use calibration::{validate_calibration, CalibrationData, CalibrationError};
pub use coords::{denormalize, normalize, CanvasSize, NormalizedPoint};
pub use cost::{
    aggregate_cost_items, aggregate_cost_items_with, get_cost_by_category,
    get_cost_by_category_with, get_total_cost, round_to, CostItem, EstimateConfig, UNCATEGORIZED,
};
pub use labels::{LabelCatalog, LabelDefinition};
pub use measurement::{
    calculate_line_length, calculate_polygon_area, calculate_quantity, is_simple_polygon,
    label_position,
};
pub use project::{AnnotationQuantity, Project, ProjectError, ProjectResult};
