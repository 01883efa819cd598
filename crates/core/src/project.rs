//! Project aggregate
//!
//! Owns the annotations, label definitions, page canvases and calibration of
//! one estimate. Every engine call receives its inputs from here explicitly.

use crate::annotation::{Annotation, AnnotationId, AnnotationShape, MeasurementUnit};
use crate::calibration::{CalibrationData, CalibrationError};
use crate::coords::{CanvasSize, NormalizedPoint};
use crate::cost::{
    aggregate_cost_items_with, get_cost_by_category_with, get_total_cost, CostItem, EstimateConfig,
};
use crate::labels::LabelDefinition;
use crate::measurement::calculate_quantity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current project document schema version
pub const PROJECT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(
        "unsupported project version {found} (expected {expected})",
        expected = PROJECT_SCHEMA_VERSION
    )]
    UnsupportedVersion { found: u32 },

    #[error("annotation not found: {0}")]
    AnnotationNotFound(AnnotationId),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    #[serde(default)]
    annotations: Vec<Annotation>,
    #[serde(default)]
    labels: Vec<LabelDefinition>,
    #[serde(default)]
    calibration: CalibrationData,
    /// Canvas size per page number
    #[serde(default)]
    pages: BTreeMap<u32, CanvasSize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProjectEnvelope {
    version: u32,
    project: Project,
}

/// Quantity of one annotation, as reported to the UI
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationQuantity {
    pub annotation_id: AnnotationId,
    pub page_number: u32,
    #[serde(rename = "type")]
    pub type_name: &'static str,
    pub label_id: Option<String>,
    pub quantity: f64,
    pub unit: MeasurementUnit,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Parse a versioned project document
    ///
    /// Lines and polygons stored without a pixel measurement are measured
    /// against their page size, when the page is known.
    pub fn from_json_slice(bytes: &[u8]) -> ProjectResult<Self> {
        let envelope: ProjectEnvelope = serde_json::from_slice(bytes)?;
        if envelope.version != PROJECT_SCHEMA_VERSION {
            return Err(ProjectError::UnsupportedVersion { found: envelope.version });
        }
        let mut project = envelope.project;
        project.measure_unmeasured();
        Ok(project)
    }

    fn measure_unmeasured(&mut self) {
        for annotation in &mut self.annotations {
            let unmeasured = matches!(
                annotation.shape(),
                AnnotationShape::Line { line_length: None, .. }
                    | AnnotationShape::Polygon { polygon_area: None, .. }
            );
            if !unmeasured {
                continue;
            }
            match self.pages.get(&annotation.page_number()) {
                Some(canvas) => annotation.refresh_measurements(*canvas),
                None => log::warn!(
                    "annotation {} is on page {} with no known size; it measures 0",
                    annotation.id(),
                    annotation.page_number()
                ),
            }
        }
    }

    pub fn to_json_pretty(&self) -> ProjectResult<String> {
        let envelope = ProjectEnvelope { version: PROJECT_SCHEMA_VERSION, project: self.clone() };
        Ok(serde_json::to_string_pretty(&envelope)?)
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn labels(&self) -> &[LabelDefinition] {
        &self.labels
    }

    pub fn calibration(&self) -> &CalibrationData {
        &self.calibration
    }

    pub fn page_size(&self, page_number: u32) -> Option<CanvasSize> {
        self.pages.get(&page_number).copied()
    }

    /// Record the canvas size of a page and remeasure its annotations
    pub fn set_page_size(&mut self, page_number: u32, canvas: CanvasSize) {
        self.pages.insert(page_number, canvas);
        for annotation in self.annotations.iter_mut().filter(|a| a.page_number() == page_number) {
            annotation.refresh_measurements(canvas);
        }
    }

    /// Add an annotation, measuring it if its page size is known
    pub fn add_annotation(&mut self, mut annotation: Annotation) -> AnnotationId {
        if let Some(canvas) = self.page_size(annotation.page_number()) {
            annotation.refresh_measurements(canvas);
        }
        let id = annotation.id().to_string();
        self.annotations.push(annotation);
        id
    }

    pub fn remove_annotation(&mut self, id: &str) -> Option<Annotation> {
        let index = self.annotations.iter().position(|a| a.id() == id)?;
        Some(self.annotations.remove(index))
    }

    pub fn annotation(&self, id: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id() == id)
    }

    /// Annotations on one page, in drawing order
    pub fn annotations_for_page(&self, page_number: u32) -> Vec<&Annotation> {
        self.annotations.iter().filter(|a| a.page_number() == page_number).collect()
    }

    /// Move the points of a line or polygon and remeasure it
    pub fn update_points(&mut self, id: &str, points: Vec<NormalizedPoint>) -> ProjectResult<()> {
        let canvas = self
            .annotation(id)
            .and_then(|a| self.page_size(a.page_number()));
        let annotation = self
            .annotations
            .iter_mut()
            .find(|a| a.id() == id)
            .ok_or_else(|| ProjectError::AnnotationNotFound(id.to_string()))?;

        annotation.set_points(points);
        if let Some(canvas) = canvas {
            annotation.refresh_measurements(canvas);
        }
        Ok(())
    }

    pub fn assign_label(&mut self, id: &str, label_id: Option<String>) -> ProjectResult<()> {
        let annotation = self
            .annotations
            .iter_mut()
            .find(|a| a.id() == id)
            .ok_or_else(|| ProjectError::AnnotationNotFound(id.to_string()))?;
        annotation.set_label_id(label_id);
        Ok(())
    }

    /// Insert or replace a label definition by id
    pub fn set_label(&mut self, label: LabelDefinition) {
        match self.labels.iter_mut().find(|l| l.id == label.id) {
            Some(existing) => *existing = label,
            None => self.labels.push(label),
        }
    }

    /// Apply a new calibration
    ///
    /// Clears every cached annotation quantity so nothing is priced with the
    /// previous scale. On error the current calibration is kept.
    pub fn calibrate(&mut self, reference_length: f64, pixel_distance: f64) -> ProjectResult<()> {
        let calibration = CalibrationData::calibrate(reference_length, pixel_distance)?;
        self.apply_calibration(calibration);
        Ok(())
    }

    pub fn reset_calibration(&mut self) {
        self.apply_calibration(CalibrationData::uncalibrated());
    }

    fn apply_calibration(&mut self, calibration: CalibrationData) {
        let cleared = self.annotations.iter().filter(|a| a.quantity().is_some()).count();
        for annotation in &mut self.annotations {
            annotation.clear_quantity();
        }
        if cleared > 0 {
            log::debug!("calibration changed; cleared {cleared} cached quantities");
        }
        self.calibration = calibration;
    }

    /// Real-world quantity of every annotation at the current calibration
    pub fn quantities(&self) -> Vec<AnnotationQuantity> {
        let meters_per_pixel = self.calibration.meters_per_pixel();
        self.annotations
            .iter()
            .map(|a| AnnotationQuantity {
                annotation_id: a.id().to_string(),
                page_number: a.page_number(),
                type_name: a.shape().type_name(),
                label_id: a.label_id().map(str::to_string),
                quantity: calculate_quantity(a, meters_per_pixel),
                unit: a.unit(),
            })
            .collect()
    }

    pub fn cost_items(&self, config: &EstimateConfig) -> Vec<CostItem> {
        if !self.calibration.is_calibrated() {
            log::warn!("project {:?} is not calibrated; measured quantities will be 0", self.name);
        }
        aggregate_cost_items_with(
            &self.annotations,
            &self.labels,
            self.calibration.meters_per_pixel(),
            config,
        )
    }

    pub fn total_cost(&self, config: &EstimateConfig) -> f64 {
        get_total_cost(&self.cost_items(config))
    }

    pub fn cost_by_category(&self, config: &EstimateConfig) -> BTreeMap<String, f64> {
        get_cost_by_category_with(&self.cost_items(config), config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> NormalizedPoint {
        NormalizedPoint::new(x, y)
    }

    fn sample_project() -> Project {
        let mut project = Project::new("Ground floor");
        project.set_page_size(1, CanvasSize::new(1000.0, 800.0));
        project.set_label(
            LabelDefinition::new("label-walls", "Walls", MeasurementUnit::LinearMeters)
                .with_cost_per_unit(100.0),
        );
        project.set_label(
            LabelDefinition::new("label-windows", "Windows", MeasurementUnit::Count)
                .with_cost_per_unit(500.0)
                .with_category("Openings"),
        );
        project
    }

    #[test]
    fn test_add_annotation_measures_known_page() {
        let mut project = sample_project();
        let id = project.add_annotation(
            Annotation::line(1, vec![p(0.0, 0.0), p(0.5, 0.0)]).with_label_id("label-walls"),
        );

        let line = project.annotation(&id).unwrap();
        assert!((line.line_length().unwrap() - 500.0).abs() < 1e-9);

        let id2 = project.add_annotation(Annotation::line(9, vec![p(0.0, 0.0), p(0.5, 0.0)]));
        assert_eq!(project.annotation(&id2).unwrap().line_length(), None);
    }

    #[test]
    fn test_cost_items_follow_calibration() {
        let mut project = sample_project();
        project.add_annotation(
            Annotation::line(1, vec![p(0.0, 0.0), p(0.5, 0.0)]).with_label_id("label-walls"),
        );
        project.add_annotation(Annotation::marker(1, p(0.2, 0.2)).with_label_id("label-windows"));

        let config = EstimateConfig::default();
        assert_eq!(project.total_cost(&config), 500.0);

        // 500 px over a 5 m reference of 250 px -> 10 m
        project.calibrate(5.0, 250.0).unwrap();
        let items = project.cost_items(&config);
        assert_eq!(items[0].quantity, 10.0);
        assert_eq!(items[0].total_cost, 1000.0);
        assert_eq!(project.total_cost(&config), 1500.0);
        assert_eq!(project.cost_by_category(&config).get("Openings"), Some(&500.0));
    }

    #[test]
    fn test_calibration_clears_cached_quantities() {
        let mut project = sample_project();
        let id = project.add_annotation(
            Annotation::line(1, vec![p(0.0, 0.0), p(0.5, 0.0)])
                .with_label_id("label-walls")
                .with_quantity(99.0),
        );

        project.calibrate(1.0, 100.0).unwrap();
        assert_eq!(project.annotation(&id).unwrap().quantity(), None);
        assert_eq!(project.quantities()[0].quantity, 5.0);
    }

    #[test]
    fn test_invalid_calibration_keeps_previous() {
        let mut project = sample_project();
        project.calibrate(2.0, 100.0).unwrap();

        let err = project.calibrate(0.0, 100.0).unwrap_err();
        assert!(matches!(
            err,
            ProjectError::Calibration(CalibrationError::InvalidReferenceLength(_))
        ));
        assert!((project.calibration().meters_per_pixel() - 0.02).abs() < 1e-12);

        project.reset_calibration();
        assert!(!project.calibration().is_calibrated());
    }

    #[test]
    fn test_update_points_remeasures() {
        let mut project = sample_project();
        let id = project.add_annotation(Annotation::polygon(
            1,
            vec![p(0.0, 0.0), p(0.1, 0.0), p(0.1, 0.1), p(0.0, 0.1)],
        ));
        assert!((project.annotation(&id).unwrap().polygon_area().unwrap() - 8000.0).abs() < 1e-6);

        project
            .update_points(&id, vec![p(0.0, 0.0), p(0.2, 0.0), p(0.2, 0.1), p(0.0, 0.1)])
            .unwrap();
        assert!((project.annotation(&id).unwrap().polygon_area().unwrap() - 16000.0).abs() < 1e-6);

        assert!(matches!(
            project.update_points("missing", vec![]),
            Err(ProjectError::AnnotationNotFound(_))
        ));
    }

    #[test]
    fn test_pages_and_removal() {
        let mut project = sample_project();
        let a = project.add_annotation(Annotation::marker(1, p(0.1, 0.1)));
        project.add_annotation(Annotation::marker(2, p(0.1, 0.1)));

        assert_eq!(project.annotations_for_page(1).len(), 1);
        assert_eq!(project.annotations_for_page(2).len(), 1);

        assert!(project.remove_annotation(&a).is_some());
        assert!(project.remove_annotation(&a).is_none());
        assert!(project.annotations_for_page(1).is_empty());
    }

    #[test]
    fn test_assign_label() {
        let mut project = sample_project();
        let id = project.add_annotation(Annotation::marker(1, p(0.1, 0.1)));
        let config = EstimateConfig::default();
        assert!(project.cost_items(&config).is_empty());

        project.assign_label(&id, Some("label-windows".to_string())).unwrap();
        assert_eq!(project.total_cost(&config), 500.0);
    }

    #[test]
    fn test_set_label_replaces_by_id() {
        let mut project = sample_project();
        project.set_label(
            LabelDefinition::new("label-windows", "Windows", MeasurementUnit::Count)
                .with_cost_per_unit(650.0),
        );
        assert_eq!(project.labels().len(), 2);
        assert_eq!(project.labels()[1].cost_per_unit, Some(650.0));
    }

    #[test]
    fn test_json_envelope() {
        let mut project = sample_project();
        project.calibrate(3.6, 120.0).unwrap();
        project.add_annotation(Annotation::marker(1, p(0.5, 0.5)).with_id("m-1"));

        let json = project.to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["project"]["calibration"]["isCalibrated"], true);

        let parsed = Project::from_json_slice(json.as_bytes()).unwrap();
        assert_eq!(parsed.name, "Ground floor");
        assert_eq!(parsed.annotations(), project.annotations());
        assert_eq!(parsed.labels(), project.labels());
        assert_eq!(parsed.page_size(1), Some(CanvasSize::new(1000.0, 800.0)));
        assert!((parsed.calibration().meters_per_pixel() - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_load_measures_stored_geometry() {
        let json = br#"{
            "version": 1,
            "project": {
                "name": "Fence",
                "calibration": {
                    "referenceLength": 1.0,
                    "pixelDistance": 100.0,
                    "metersPerPixel": 0.01,
                    "isCalibrated": true
                },
                "pages": { "1": { "width": 1000.0, "height": 1000.0 } },
                "labels": [
                    {
                        "id": "label-fence",
                        "name": "Fence",
                        "unit": "linear_meters",
                        "costPerUnit": 10.0
                    }
                ],
                "annotations": [
                    {
                        "id": "fence-1",
                        "pageNumber": 1,
                        "position": { "x": 0.0, "y": 0.0 },
                        "labelId": "label-fence",
                        "type": "line",
                        "points": [{ "x": 0.0, "y": 0.0 }, { "x": 0.5, "y": 0.0 }]
                    },
                    {
                        "id": "slab-1",
                        "pageNumber": 1,
                        "position": { "x": 0.0, "y": 0.0 },
                        "type": "polygon",
                        "points": [
                            { "x": 0.0, "y": 0.0 },
                            { "x": 0.1, "y": 0.0 },
                            { "x": 0.1, "y": 0.1 },
                            { "x": 0.0, "y": 0.1 }
                        ]
                    },
                    {
                        "id": "orphan-1",
                        "pageNumber": 4,
                        "position": { "x": 0.0, "y": 0.0 },
                        "type": "line",
                        "points": [{ "x": 0.0, "y": 0.0 }, { "x": 0.5, "y": 0.0 }]
                    }
                ]
            }
        }"#;

        let project = Project::from_json_slice(json).unwrap();
        let fence = project.annotation("fence-1").unwrap();
        assert!((fence.line_length().unwrap() - 500.0).abs() < 1e-9);
        let slab = project.annotation("slab-1").unwrap();
        assert!((slab.polygon_area().unwrap() - 10000.0).abs() < 1e-6);
        assert_eq!(project.annotation("orphan-1").unwrap().line_length(), None);

        let items = project.cost_items(&EstimateConfig::default());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 5.0);
        assert_eq!(project.total_cost(&EstimateConfig::default()), 50.0);
    }

    #[test]
    fn test_load_keeps_stored_measurements() {
        let json = br#"{
            "version": 1,
            "project": {
                "name": "Stored",
                "pages": { "1": { "width": 1000.0, "height": 1000.0 } },
                "annotations": [
                    {
                        "id": "wall-1",
                        "pageNumber": 1,
                        "position": { "x": 0.0, "y": 0.0 },
                        "type": "line",
                        "points": [{ "x": 0.0, "y": 0.0 }, { "x": 0.5, "y": 0.0 }],
                        "lineLength": 123.0
                    }
                ]
            }
        }"#;

        let project = Project::from_json_slice(json).unwrap();
        assert_eq!(project.annotation("wall-1").unwrap().line_length(), Some(123.0));
    }

    #[test]
    fn test_load_ignores_scale_of_uncalibrated_document() {
        let json = br#"{
            "version": 1,
            "project": {
                "name": "Draft",
                "calibration": {
                    "referenceLength": -5.0,
                    "pixelDistance": 0.0,
                    "metersPerPixel": 7.0,
                    "isCalibrated": false
                }
            }
        }"#;

        let project = Project::from_json_slice(json).unwrap();
        assert!(!project.calibration().is_calibrated());
        assert_eq!(project.calibration().meters_per_pixel(), 0.0);
    }

    #[test]
    fn test_rejects_future_version() {
        let json = br#"{ "version": 7, "project": { "name": "x" } }"#;
        assert!(matches!(
            Project::from_json_slice(json),
            Err(ProjectError::UnsupportedVersion { found: 7 })
        ));
    }
}
