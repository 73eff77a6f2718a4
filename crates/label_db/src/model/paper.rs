//! Paper sizes

use serde::{Deserialize, Serialize};

/// Paper id of templates printed on custom stock. Such templates carry
/// their own page size instead of referring to a known paper.
pub const OTHER_PAPER_ID: &str = "Other";

/// Whether a paper id names custom stock
pub fn is_paper_id_other(id: &str) -> bool {
    id == OTHER_PAPER_ID
}

/// A physical paper size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    /// Canonical identifier (e.g. "US-Letter", "A4")
    pub id: String,
    /// Display name
    pub name: String,
    /// Width in points
    pub width: f64,
    /// Height in points
    pub height: f64,
    /// PWG 5101.1 media name, when known
    pub pwg_size: Option<String>,
}

impl Paper {
    /// Create a new paper size
    pub fn new(id: impl Into<String>, name: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            width,
            height,
            pwg_size: None,
        }
    }

    /// Set the PWG media name
    pub fn with_pwg_size(mut self, pwg_size: impl Into<String>) -> Self {
        self.pwg_size = Some(pwg_size.into());
        self
    }

    /// Both dimensions are finite and strictly positive
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}
