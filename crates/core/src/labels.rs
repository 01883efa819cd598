//! Label definitions: the cost rates annotations are priced by

use crate::annotation::{Color, MeasurementUnit};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Color,
    pub unit: MeasurementUnit,
    /// Price per unit; unpriced labels cost 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_per_unit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl LabelDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, unit: MeasurementUnit) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: Color::default(),
            unit,
            cost_per_unit: None,
            category: None,
        }
    }

    pub fn with_cost_per_unit(mut self, cost: f64) -> Self {
        self.cost_per_unit = Some(cost);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

/// Id lookup over a borrowed slice of label definitions
///
/// When ids repeat, the last definition wins.
#[derive(Debug)]
pub struct LabelCatalog<'a> {
    by_id: HashMap<&'a str, &'a LabelDefinition>,
}

impl<'a> LabelCatalog<'a> {
    pub fn new(labels: &'a [LabelDefinition]) -> Self {
        Self { by_id: labels.iter().map(|label| (label.id.as_str(), label)).collect() }
    }

    pub fn get(&self, id: &str) -> Option<&'a LabelDefinition> {
        self.by_id.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        let labels = vec![
            LabelDefinition::new("label-windows", "Windows", MeasurementUnit::Count)
                .with_cost_per_unit(500.0),
            LabelDefinition::new("label-walls", "Walls", MeasurementUnit::LinearMeters),
        ];
        let catalog = LabelCatalog::new(&labels);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("label-windows").map(|l| l.name.as_str()), Some("Windows"));
        assert!(catalog.contains("label-walls"));
        assert!(catalog.get("label-doors").is_none());
    }

    #[test]
    fn test_duplicate_ids_last_wins() {
        let labels = vec![
            LabelDefinition::new("dup", "First", MeasurementUnit::Count),
            LabelDefinition::new("dup", "Second", MeasurementUnit::Count),
        ];
        let catalog = LabelCatalog::new(&labels);
        assert_eq!(catalog.get("dup").map(|l| l.name.as_str()), Some("Second"));
    }

    #[test]
    fn test_label_json() {
        let json = r##"{
            "id": "label-floor",
            "name": "Floor tiles",
            "color": "#336699",
            "unit": "square_meters",
            "costPerUnit": 42.5,
            "category": "Finishes"
        }"##;
        let label: LabelDefinition = serde_json::from_str(json).unwrap();

        assert_eq!(label.unit, MeasurementUnit::SquareMeters);
        assert_eq!(label.cost_per_unit, Some(42.5));
        assert_eq!(label.category.as_deref(), Some("Finishes"));
        assert_eq!(label.color, Color::rgb(0x33, 0x66, 0x99));
    }
}
