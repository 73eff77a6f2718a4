//! Template summaries for listings

use super::{LabelShape, Template};
use crate::units::Units;
use serde::{Deserialize, Serialize};

/// Listing entry for a template, with human-readable geometry text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSummary {
    /// Display name ("Brand Part")
    pub name: String,
    /// Brand
    pub brand: String,
    /// Part number
    pub part: String,
    /// Description
    pub description: String,
    /// Paper id
    pub paper_id: String,
    /// Paper display name
    pub paper_name: String,
    /// Labels per sheet
    pub labels_per_sheet: u32,
    /// Layout text, e.g. "3 x 10  (30 per sheet)"
    pub layout_text: String,
    /// Label size text in the requested units
    pub size_text: String,
}

impl TemplateSummary {
    /// Build a summary of a template for display in the given units
    pub fn new(template: &Template, paper_name: &str, units: Units) -> Self {
        Self {
            name: template.name(),
            brand: template.id.brand.clone(),
            part: template.id.part.clone(),
            description: template.description.clone(),
            paper_id: template.paper_id.clone(),
            paper_name: paper_name.to_string(),
            labels_per_sheet: template.label_count(),
            layout_text: layout_text(template),
            size_text: template
                .shape()
                .map(|s| size_text(s, units))
                .unwrap_or_default(),
        }
    }
}

fn layout_text(template: &Template) -> String {
    match template.layouts.as_slice() {
        [single] => format!(
            "{} x {}  ({} per sheet)",
            single.nx,
            single.ny,
            single.label_count()
        ),
        _ => format!("{} per sheet", template.label_count()),
    }
}

fn size_text(shape: &LabelShape, units: Units) -> String {
    match shape {
        LabelShape::Round { radius } | LabelShape::Cd { radius, .. } => {
            format!("{} {} diameter", units.format(2.0 * radius), units)
        }
        _ => format!(
            "{} x {} {}",
            units.format(shape.width()),
            units.format(shape.height()),
            units
        ),
    }
}
