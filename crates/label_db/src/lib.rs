//! Label Template Database
//!
//! This crate knows every paper size, label category, and label template the
//! application can print on.
//!
//! # Features
//!
//! - Built-in paper, category, and template definitions
//! - Extra definition directories and a user template store
//! - Lookup by id, display name, or template alias
//! - Filtered, sorted template listings with display text
//! - Registration of user-defined templates
//!
//! # Example
//!
//! ```rust
//! use label_db::{Registry, TemplateFilter};
//!
//! let registry = Registry::with_builtin().unwrap();
//!
//! // Aliases resolve to the same template
//! let template = registry.get_template("Avery 8160").unwrap();
//! assert_eq!(template.name(), "Avery 5160");
//! assert_eq!(template.label_count(), 30);
//!
//! let paper = registry.get_paper("US Letter").unwrap();
//! assert_eq!(paper.id, "US-Letter");
//!
//! for summary in registry.list_templates(&TemplateFilter::new().paper("A4")) {
//!     println!("{}: {}", summary.name, summary.layout_text);
//! }
//! ```

mod alias;
mod builtin;
mod error;
mod registry;
mod store;
pub mod config;
pub mod model;
pub mod units;
pub mod xml;

// Re-export main types
pub use alias::AliasIndex;
pub use builtin::{builtin_definitions, BUILTIN_FILES};
pub use config::{ConfigManager, DbConfig, TEMPLATE_FILE_EXTENSION};
pub use error::{DbError, DbResult, EntryKind, RegistrationError};
pub use model::{
    is_paper_id_other, Category, LabelShape, Layout, Paper, Template, TemplateId, TemplateSummary,
    OTHER_PAPER_ID,
};
pub use registry::{NameListing, Registry, TemplateFilter};
pub use store::{read_definition_dir, UserStore};
pub use units::{format_points, parse_length, Units};
pub use xml::{parse_definitions, read_definitions_file, write_definitions, write_template, Definitions};
