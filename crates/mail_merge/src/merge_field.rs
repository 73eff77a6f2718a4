//! Field substitution in label text
//!
//! Label text refers to record fields as `${KEY}`, or `${KEY:=default}` to
//! supply text for records where the field is missing or empty.

use crate::record::Record;
use serde::{Deserialize, Serialize};

/// A reference to one record field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeField {
    pub field_name: String,
    pub default_value: Option<String>,
}

impl MergeField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            field_name: name.into(),
            default_value: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default_value = Some(default.into());
        self
    }

    /// Text for this field in a record
    pub fn resolve(&self, record: &Record) -> String {
        let raw_value = record.text(&self.field_name).unwrap_or_default();
        if raw_value.is_empty() {
            self.default_value.clone().unwrap_or_default()
        } else {
            raw_value
        }
    }

    /// Parse the inside of a `${...}` placeholder
    fn parse(inner: &str) -> Option<Self> {
        let (name, default) = match inner.split_once(":=") {
            Some((name, default)) => (name, Some(default)),
            None => (inner, None),
        };
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let field = Self::new(name);
        Some(match default {
            Some(default) => field.with_default(default),
            None => field,
        })
    }
}

/// One piece of parsed label text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    Literal { text: String },
    Field(MergeField),
}

/// Label text split into literal runs and field references
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeText {
    segments: Vec<Segment>,
}

impl MergeText {
    /// Parse label text.
    ///
    /// A `${` without a closing brace, or with nothing inside, stays literal.
    pub fn parse(text: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = text;

        while let Some(start) = rest.find("${") {
            let after = &rest[start + 2..];
            let parsed = after
                .find('}')
                .and_then(|end| MergeField::parse(&after[..end]).map(|field| (field, end)));

            match parsed {
                Some((field, end)) => {
                    literal.push_str(&rest[..start]);
                    if !literal.is_empty() {
                        segments.push(Segment::Literal {
                            text: std::mem::take(&mut literal),
                        });
                    }
                    segments.push(Segment::Field(field));
                    rest = &after[end + 1..];
                }
                None => {
                    literal.push_str(&rest[..start + 2]);
                    rest = after;
                }
            }
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal { text: literal });
        }
        Self { segments }
    }

    /// Parsed pieces in order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Field names referenced, in order of first use
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Field(field) = segment {
                if !names.contains(&field.field_name.as_str()) {
                    names.push(&field.field_name);
                }
            }
        }
        names
    }

    /// Substitute a record's values
    pub fn expand(&self, record: &Record) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal { text } => text.clone(),
                Segment::Field(field) => field.resolve(record),
            })
            .collect()
    }
}

/// Parse `text` and substitute a record's values in one step
pub fn expand(text: &str, record: &Record) -> String {
    MergeText::parse(text).expand(record)
}
