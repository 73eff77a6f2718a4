//! Mail Merge Sources
//!
//! This crate reads external records (addresses, contacts) for printing one
//! label per record, and streams them to the layout engine through a merge
//! session bound to a label template.
//!
//! # Features
//!
//! - Delimited text with configurable delimiter and optional header row
//! - Card files (`Key:Value` stanzas, vCard envelopes, folded lines)
//! - Field schema in first-seen order, by prescan or incrementally
//! - Per-record parse errors that never stop the stream
//! - `${KEY}` / `${KEY:=default}` substitution
//! - Record selection, copies, and sheet counting
//!
//! # Example
//!
//! ```rust
//! use mail_merge::{expand, MergeSource, TextOptions, TextSource};
//!
//! let data = "name,city\nAlice,Paris\nBob\n";
//! let mut source = TextSource::from_string(data, TextOptions::default()).unwrap();
//!
//! assert_eq!(source.record_count_hint(), Some(2));
//! assert_eq!(source.field_schema().keys(), ["name", "city"]);
//!
//! let alice = source.next().unwrap().unwrap();
//! assert_eq!(expand("${name} (${city})", &alice), "Alice (Paris)");
//!
//! // Short rows simply lack the trailing fields
//! let bob = source.next().unwrap().unwrap();
//! assert_eq!(expand("${name} (${city:=unknown})", &bob), "Bob (unknown)");
//! ```

mod card;
mod error;
mod record;
mod source;
mod text;
pub mod merge_field;
pub mod session;

// Re-export main types
pub use card::{unescape_value, CardOptions, CardSource};
pub use error::{OpenError, ParseError, RecordResult, Result};
pub use merge_field::{expand, MergeField, MergeText, Segment};
pub use record::{FieldSchema, Record, Value};
pub use session::{LabelSlot, MergeSession, MergeSummary, RecordRange, SessionOptions};
pub use source::{config_for_path, open_path, open_source, MergeSource, SchemaMode, SourceConfig, SourceFormat};
pub use text::{detect_delimiter, detect_has_header, TextOptions, TextSource};
