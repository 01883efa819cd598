//! Cost roll-up from annotations
//!
//! Cost items are a pure projection of annotations, labels and calibration.
//! They are regenerated in full on every change and never edited directly.
//!
//! Only annotations that reference a known label are priced. Annotations
//! with no label id, or whose label id does not resolve, contribute nothing.

use crate::annotation::{Annotation, MeasurementUnit};
use crate::labels::{LabelCatalog, LabelDefinition};
use crate::measurement::calculate_quantity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Category used for cost items without one
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Configuration for cost aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateConfig {
    /// Decimal places quantities and totals are rounded to
    pub decimal_places: u32,

    /// Category name for items whose label has none
    pub uncategorized_label: String,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self { decimal_places: 2, uncategorized_label: UNCATEGORIZED.to_string() }
    }
}

/// One priced line of the estimate, derived per label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostItem {
    /// Derived from the label id, so recomputation replaces the previous item
    pub id: String,
    pub label_id: String,
    pub description: String,
    pub quantity: f64,
    pub unit: MeasurementUnit,
    pub unit_cost: f64,
    pub total_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Number of annotations rolled into this item
    pub annotation_count: usize,
}

impl CostItem {
    pub fn id_for_label(label_id: &str) -> String {
        format!("cost-{label_id}")
    }
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Aggregate annotations into cost items with the default configuration
pub fn aggregate_cost_items(
    annotations: &[Annotation],
    labels: &[LabelDefinition],
    meters_per_pixel: f64,
) -> Vec<CostItem> {
    aggregate_cost_items_with(annotations, labels, meters_per_pixel, &EstimateConfig::default())
}

/// Aggregate annotations into one cost item per referenced label
///
/// Items come out in the order each label is first referenced. Quantities are
/// summed per label, then rounded; the total is `quantity * cost_per_unit`,
/// rounded again.
pub fn aggregate_cost_items_with(
    annotations: &[Annotation],
    labels: &[LabelDefinition],
    meters_per_pixel: f64,
    config: &EstimateConfig,
) -> Vec<CostItem> {
    let catalog = LabelCatalog::new(labels);

    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&Annotation>> = HashMap::new();
    for annotation in annotations {
        let Some(label_id) = annotation.label_id() else {
            continue;
        };
        groups
            .entry(label_id)
            .or_insert_with(|| {
                order.push(label_id);
                Vec::new()
            })
            .push(annotation);
    }

    let mut items = Vec::with_capacity(order.len());
    for label_id in order {
        let group = &groups[label_id];
        let Some(label) = catalog.get(label_id) else {
            log::warn!(
                "{} annotation(s) reference unknown label {label_id:?}; excluded from estimate",
                group.len()
            );
            continue;
        };

        let raw: f64 = group.iter().map(|a| calculate_quantity(a, meters_per_pixel)).sum();
        let quantity = round_to(raw, config.decimal_places);
        let unit_cost = label.cost_per_unit.unwrap_or(0.0);

        items.push(CostItem {
            id: CostItem::id_for_label(label_id),
            label_id: label_id.to_string(),
            description: label.name.clone(),
            quantity,
            unit: label.unit,
            unit_cost,
            total_cost: round_to(quantity * unit_cost, config.decimal_places),
            category: label.category.clone(),
            annotation_count: group.len(),
        });
    }

    log::debug!("aggregated {} annotation(s) into {} cost item(s)", annotations.len(), items.len());
    items
}

/// Sum of every item's total cost
pub fn get_total_cost(items: &[CostItem]) -> f64 {
    items.iter().map(|item| item.total_cost).sum()
}

/// Total cost per category, with missing categories under [`UNCATEGORIZED`]
pub fn get_cost_by_category(items: &[CostItem]) -> BTreeMap<String, f64> {
    get_cost_by_category_with(items, &EstimateConfig::default())
}

pub fn get_cost_by_category_with(
    items: &[CostItem],
    config: &EstimateConfig,
) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for item in items {
        let category = item.category.clone().unwrap_or_else(|| config.uncategorized_label.clone());
        *totals.entry(category).or_insert(0.0) += item.total_cost;
    }
    totals
}
