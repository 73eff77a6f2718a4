//! Label templates

use super::{LabelShape, Layout};
use serde::{Deserialize, Serialize};

/// Natural key of a template: a brand and a part number
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateId {
    /// Manufacturer (e.g. "Avery")
    pub brand: String,
    /// Part number (e.g. "5160")
    pub part: String,
}

impl TemplateId {
    /// Create a new template id
    pub fn new(brand: impl Into<String>, part: impl Into<String>) -> Self {
        Self {
            brand: brand.into(),
            part: part.into(),
        }
    }

    /// Display name derived from brand and part
    pub fn name(&self) -> String {
        format!("{} {}", self.brand, self.part)
    }

    /// Canonical registry key
    pub fn key(&self) -> String {
        format!("{}:{}", self.brand, self.part)
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.brand, self.part)
    }
}

/// A label template: one or more label grids bound to a paper size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Brand and part number
    pub id: TemplateId,
    /// Free-form description (e.g. "Address Labels")
    pub description: String,
    /// Id of the paper this template is printed on
    pub paper_id: String,
    /// Page width and height for templates on custom paper
    pub page_size: Option<(f64, f64)>,
    /// Label grids; every template has at least one
    pub layouts: Vec<Layout>,
    /// Inset from the label edge reserved for content
    pub markup_margin: Option<f64>,
    /// Category ids this template is tagged with
    pub categories: Vec<String>,
    /// Alternate brand/part pairs for the same stock
    pub aliases: Vec<TemplateId>,
}

impl Template {
    /// Create a template with no layouts yet
    pub fn new(brand: impl Into<String>, part: impl Into<String>, paper_id: impl Into<String>) -> Self {
        Self {
            id: TemplateId::new(brand, part),
            description: String::new(),
            paper_id: paper_id.into(),
            page_size: None,
            layouts: Vec::new(),
            markup_margin: None,
            categories: Vec::new(),
            aliases: Vec::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the page size, for templates on custom paper
    pub fn with_page_size(mut self, width: f64, height: f64) -> Self {
        self.page_size = Some((width, height));
        self
    }

    /// Add a layout
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layouts.push(layout);
        self
    }

    /// Set the markup margin
    pub fn with_markup_margin(mut self, margin: f64) -> Self {
        self.markup_margin = Some(margin);
        self
    }

    /// Tag with a category; duplicates are ignored
    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        let category_id = category_id.into();
        if !self.categories.contains(&category_id) {
            self.categories.push(category_id);
        }
        self
    }

    /// Add an alias brand/part pair
    pub fn with_alias(mut self, brand: impl Into<String>, part: impl Into<String>) -> Self {
        let alias = TemplateId::new(brand, part);
        if alias != self.id && !self.aliases.contains(&alias) {
            self.aliases.push(alias);
        }
        self
    }

    /// Display name
    pub fn name(&self) -> String {
        self.id.name()
    }

    /// Canonical registry key
    pub fn key(&self) -> String {
        self.id.key()
    }

    /// Names this template answers to: its own name first, then aliases
    pub fn all_names(&self) -> Vec<String> {
        std::iter::once(self.name())
            .chain(self.aliases.iter().map(TemplateId::name))
            .collect()
    }

    /// Whether the template carries the given category tag
    pub fn has_category(&self, category_id: &str) -> bool {
        self.categories.iter().any(|c| c == category_id)
    }

    /// Labels per sheet across all layouts
    pub fn label_count(&self) -> u32 {
        self.layouts.iter().map(Layout::label_count).sum()
    }

    /// Shape of the first layout's labels
    pub fn shape(&self) -> Option<&LabelShape> {
        self.layouts.first().map(|l| &l.shape)
    }

    /// Bounding box of a single label, from the first layout
    pub fn label_size(&self) -> Option<(f64, f64)> {
        self.shape().map(|s| (s.width(), s.height()))
    }

    /// Check the template's geometry against a page of the given size
    pub fn check_geometry(&self, page_width: f64, page_height: f64) -> Result<(), String> {
        if self.id.brand.trim().is_empty() || self.id.part.trim().is_empty() {
            return Err("brand and part must not be empty".to_string());
        }
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(page_width) || !positive(page_height) {
            return Err(format!(
                "{} has an invalid page size {} x {}",
                self.name(),
                page_width,
                page_height
            ));
        }
        if self.layouts.is_empty() {
            return Err(format!("{} has no layouts", self.name()));
        }
        for (i, layout) in self.layouts.iter().enumerate() {
            layout
                .check(page_width, page_height)
                .map_err(|reason| format!("{} layout {}: {}", self.name(), i + 1, reason))?;
        }
        if let Some(margin) = self.markup_margin {
            if !margin.is_finite() || margin < 0.0 {
                return Err(format!("{} has a negative markup margin", self.name()));
            }
        }
        Ok(())
    }
}
