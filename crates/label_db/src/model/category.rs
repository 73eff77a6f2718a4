//! Template categories

use serde::{Deserialize, Serialize};

/// A template category (e.g. "mail", "business-card")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    /// Canonical identifier
    pub id: String,
    /// Display name
    pub name: String,
}

impl Category {
    /// Create a new category
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
