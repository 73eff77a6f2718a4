//! The merge source abstraction and driver selection

use crate::card::{CardOptions, CardSource};
use crate::error::{OpenError, RecordResult, Result};
use crate::record::FieldSchema;
use crate::text::{detect_delimiter, detect_has_header, TextOptions, TextSource};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};

/// How a source learns its field schema
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaMode {
    /// Read the whole source once at open; the schema and record count are
    /// complete before the first record is returned
    #[default]
    Prescan,
    /// Grow the schema as records are read; the record count is unknown
    Incremental,
}

/// Format handled by a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// Delimited text (CSV, TSV and friends)
    Text,
    /// `Key:Value` stanzas (vCard and similar)
    Card,
}

impl SourceFormat {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Text => "text",
            SourceFormat::Card => "card",
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A forward-only stream of records from one external source.
///
/// Iterating yields `Ok(record)` for each good record and `Err(ParseError)`
/// for each record that could not be read; a bad record never ends the
/// stream. The underlying reader is released when the stream ends. To start
/// over, open a new source.
pub trait MergeSource: Iterator<Item = RecordResult> {
    /// Format of this source
    fn format(&self) -> SourceFormat;

    /// Keys in first-seen order. Complete from the start in
    /// [`SchemaMode::Prescan`]; grows while iterating otherwise.
    fn field_schema(&self) -> &FieldSchema;

    /// Number of good records the stream will yield in total, if known
    fn record_count_hint(&self) -> Option<usize>;
}

/// Explicit source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Delimited text file
    Text {
        path: PathBuf,
        #[serde(default)]
        options: TextOptions,
    },
    /// Card file
    Card {
        path: PathBuf,
        #[serde(default)]
        options: CardOptions,
    },
}

impl SourceConfig {
    /// File the source reads
    pub fn path(&self) -> &Path {
        match self {
            SourceConfig::Text { path, .. } | SourceConfig::Card { path, .. } => path,
        }
    }

    /// Format of the source
    pub fn format(&self) -> SourceFormat {
        match self {
            SourceConfig::Text { .. } => SourceFormat::Text,
            SourceConfig::Card { .. } => SourceFormat::Card,
        }
    }
}

/// Open a source from an explicit configuration
pub fn open_source(config: &SourceConfig) -> Result<Box<dyn MergeSource>> {
    tracing::debug!("Opening {} source {}", config.format(), config.path().display());
    match config {
        SourceConfig::Text { path, options } => Ok(Box::new(TextSource::open_path(path, options.clone())?)),
        SourceConfig::Card { path, options } => Ok(Box::new(CardSource::open_path(path, options.clone())?)),
    }
}

/// Open a source, choosing the driver from the file extension.
///
/// `.csv` and `.txt` files have their delimiter and header row sniffed,
/// `.tsv` files are tab separated, `.vcf` and `.vcard` files are cards.
pub fn open_path(path: impl AsRef<Path>) -> Result<Box<dyn MergeSource>> {
    let config = config_for_path(path.as_ref())?;
    open_source(&config)
}

/// Work out the configuration [`open_path`] would use
pub fn config_for_path(path: &Path) -> Result<SourceConfig> {
    if !path.exists() {
        return Err(OpenError::FileNotFound(path.display().to_string()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let config = match extension.as_str() {
        "csv" | "txt" => {
            let sample = read_sample(path)?;
            let delimiter = detect_delimiter(&sample);
            let has_header = detect_has_header(&sample, delimiter);
            SourceConfig::Text {
                path: path.to_path_buf(),
                options: TextOptions::default()
                    .with_delimiter(delimiter)
                    .with_header(has_header),
            }
        }
        "tsv" => {
            let sample = read_sample(path)?;
            SourceConfig::Text {
                path: path.to_path_buf(),
                options: TextOptions::tab().with_header(detect_has_header(&sample, '\t')),
            }
        }
        "vcf" | "vcard" => SourceConfig::Card {
            path: path.to_path_buf(),
            options: CardOptions::default(),
        },
        _ => {
            return Err(OpenError::UnsupportedFormat(format!(
                "Unknown file extension for: {}",
                path.display()
            )))
        }
    };
    Ok(config)
}

/// First few kilobytes of a file, for sniffing
fn read_sample(path: &Path) -> Result<String> {
    const SAMPLE_BYTES: u64 = 8192;

    let mut bytes = Vec::new();
    std::fs::File::open(path)?
        .take(SAMPLE_BYTES)
        .read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
