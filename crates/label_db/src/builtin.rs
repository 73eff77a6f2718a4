//! Definitions compiled into the crate

use crate::error::{DbError, DbResult};
use crate::xml::{parse_definitions, Definitions};

/// Built-in definition files, in load order
pub const BUILTIN_FILES: &[(&str, &str)] = &[
    ("paper-sizes.xml", include_str!("../data/paper-sizes.xml")),
    ("categories.xml", include_str!("../data/categories.xml")),
    ("avery-us-templates.xml", include_str!("../data/avery-us-templates.xml")),
    ("avery-iso-templates.xml", include_str!("../data/avery-iso-templates.xml")),
];

/// Parse all built-in definitions
pub fn builtin_definitions() -> DbResult<Definitions> {
    let mut defs = Definitions::default();
    for (name, content) in BUILTIN_FILES {
        let file_defs = parse_definitions(content).map_err(|e| {
            DbError::InvalidDefinition(format!("built-in {}: {}", name, e))
        })?;
        defs.extend(file_defs);
    }
    Ok(defs)
}
