//! Error types for the label database

use thiserror::Error;

/// Kind of registry entry, used in lookup errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Paper,
    Category,
    Template,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::Paper => write!(f, "paper"),
            EntryKind::Category => write!(f, "category"),
            EntryKind::Template => write!(f, "template"),
        }
    }
}

/// Errors from loading and querying the label database
#[derive(Debug, Error)]
pub enum DbError {
    /// IO error reading definition files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed XML in a definition file
    #[error("XML parsing error: {0}")]
    Xml(String),

    /// Well-formed XML that does not describe a valid entry
    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),

    /// Lookup miss after alias resolution
    #[error("Unknown {kind}: {name}")]
    NotFound { kind: EntryKind, name: String },

    /// Two distinct canonical ids claim the same name
    #[error("Name {name:?} already belongs to {existing}, cannot also name {claimed}")]
    DuplicateAlias {
        name: String,
        existing: String,
        claimed: String,
    },

    /// Configuration file could not be used
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl DbError {
    pub(crate) fn not_found(kind: EntryKind, name: &str) -> Self {
        DbError::NotFound {
            kind,
            name: name.to_string(),
        }
    }
}

impl From<quick_xml::Error> for DbError {
    fn from(err: quick_xml::Error) -> Self {
        DbError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for DbError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        DbError::Xml(format!("Attribute error: {}", err))
    }
}

/// Result type for database operations
pub type DbResult<T> = std::result::Result<T, DbError>;

/// Reasons a template registration is refused or only partly completed
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The template's paper id is not a known paper
    #[error("Unknown paper id: {0}")]
    BadPaperId(String),

    /// A template with this brand and part is already registered
    #[error("Template already exists: {0}")]
    BrandPartExists(String),

    /// One of the template's names already belongs to another template
    #[error("Name {name:?} already belongs to {existing}")]
    DuplicateAlias { name: String, existing: String },

    /// Geometry is empty or does not fit on the paper
    #[error("Invalid template geometry: {0}")]
    InvalidGeometry(String),

    /// Registered in memory, but the user store could not be written.
    /// The template stays available for this session only.
    #[error("Template {name} registered for this session only; saving failed: {source}")]
    FileWriteError {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl RegistrationError {
    /// Whether the registry was left unchanged
    pub fn is_rejected(&self) -> bool {
        !matches!(self, RegistrationError::FileWriteError { .. })
    }
}
