//! Record model shared by all merge sources

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One record: an ordered list of named fields, fixed at creation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Build a record from fields in source order.
    ///
    /// If a key repeats, the first value is kept.
    pub fn new(fields: impl IntoIterator<Item = (String, Value)>) -> Self {
        fields.into_iter().collect()
    }

    /// Value of a field, if the record has it
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Field value as display text; absent fields give `None`
    pub fn text(&self, key: &str) -> Option<String> {
        self.field(key).map(Value::to_string_value)
    }

    /// Keys in the order this record carries them
    pub fn field_keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Fields in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut fields: Vec<(String, Value)> = Vec::new();
        for (key, value) in iter {
            if fields.iter().any(|(k, _)| *k == key) {
                tracing::debug!("Ignoring repeated field {}", key);
                continue;
            }
            fields.push((key, value));
        }
        Self { fields }
    }
}

/// Keys published by a source, in the order first observed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    keys: Vec<String>,
}

impl FieldSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key unless already present; returns whether it was added
    pub fn insert(&mut self, key: &str) -> bool {
        if self.contains(key) {
            return false;
        }
        self.keys.push(key.to_string());
        true
    }

    /// Add every key of a record not yet seen
    pub fn observe(&mut self, record: &Record) {
        for key in record.field_keys() {
            self.insert(key);
        }
    }

    /// Keys in order
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Whether a key is known
    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// Column index of a key
    pub fn position(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no keys are known
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// A record's values laid out in schema column order
    pub fn align<'r>(&self, record: &'r Record) -> Vec<Option<&'r Value>> {
        self.keys.iter().map(|k| record.field(k)).collect()
    }
}

impl<S: Into<String>> FromIterator<S> for FieldSchema {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut schema = Self::new();
        for key in iter {
            schema.insert(&key.into());
        }
        schema
    }
}

/// A value in a record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Text/string value
    Text(String),
    /// Numeric value
    Number(f64),
    /// Date value
    Date(NaiveDate),
    /// Boolean value
    Boolean(bool),
    /// Null/missing value
    #[default]
    Null,
}

impl Value {
    /// Convert to string representation
    pub fn to_string_value(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) => {
                // Integers print without a decimal point
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            Value::Null => String::new(),
        }
    }

    /// Parse a string value with automatic type detection
    pub fn parse_auto(s: &str) -> Value {
        let trimmed = s.trim();

        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") || trimmed.eq_ignore_ascii_case("na") {
            return Value::Null;
        }

        if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("yes") {
            return Value::Boolean(true);
        }
        if trimmed.eq_ignore_ascii_case("false") || trimmed.eq_ignore_ascii_case("no") {
            return Value::Boolean(false);
        }

        if let Some(date) = try_parse_date(trimmed) {
            return Value::Date(date);
        }

        // Leading zeros mark identifiers (postal codes, part numbers)
        let is_padded = trimmed.len() > 1 && trimmed.starts_with('0') && !trimmed.starts_with("0.");
        if !is_padded {
            if let Ok(n) = trimmed.parse::<f64>() {
                if n.is_finite() {
                    return Value::Number(n);
                }
            }
        }

        Value::Text(s.to_string())
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_value())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// Try to parse a date from various common formats
fn try_parse_date(s: &str) -> Option<NaiveDate> {
    let formats = [
        "%Y-%m-%d",  // 2024-01-15
        "%Y/%m/%d",  // 2024/01/15
        "%m/%d/%Y",  // 01/15/2024
        "%d.%m.%Y",  // 15.01.2024
        "%B %d, %Y", // January 15, 2024
        "%b %d, %Y", // Jan 15, 2024
        "%d %B %Y",  // 15 January 2024
    ];

    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record::new([
            ("name".to_string(), Value::from("Alice")),
            ("zip".to_string(), Value::from("00501")),
            ("name".to_string(), Value::from("Shadowed")),
        ])
    }

    #[test]
    fn test_record_lookup() {
        let record = sample();
        assert_eq!(record.len(), 2);
        assert_eq!(record.text("name").as_deref(), Some("Alice"));
        assert_eq!(record.field("missing"), None);
        assert_eq!(record.field_keys().collect::<Vec<_>>(), vec!["name", "zip"]);
    }

    #[test]
    fn test_schema_keeps_first_seen_order() {
        let mut schema = FieldSchema::new();
        schema.observe(&Record::new([("b".to_string(), Value::Null)]));
        schema.observe(&sample());
        schema.observe(&Record::new([("b".to_string(), Value::Null)]));

        assert_eq!(schema.keys(), ["b", "name", "zip"]);
        assert_eq!(schema.position("zip"), Some(2));
    }

    #[test]
    fn test_align_leaves_gaps() {
        let schema: FieldSchema = ["zip", "email", "name"].into_iter().collect();
        let record = sample();
        let row = schema.align(&record);

        assert_eq!(row.len(), 3);
        assert_eq!(row[0], Some(&Value::from("00501")));
        assert_eq!(row[1], None);
        assert_eq!(row[2], Some(&Value::from("Alice")));
    }

    #[test]
    fn test_value_parse_auto() {
        assert!(matches!(Value::parse_auto(""), Value::Null));
        assert!(matches!(Value::parse_auto("NA"), Value::Null));
        assert!(matches!(Value::parse_auto("yes"), Value::Boolean(true)));
        assert!(matches!(Value::parse_auto("false"), Value::Boolean(false)));
        assert_eq!(Value::parse_auto("42"), Value::Number(42.0));
        assert_eq!(Value::parse_auto("0.5"), Value::Number(0.5));
        assert_eq!(Value::parse_auto("00501"), Value::Text("00501".to_string()));
        assert_eq!(
            Value::parse_auto("2024-01-15"),
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
        );
        assert_eq!(Value::parse_auto("Hello World"), Value::Text("Hello World".to_string()));
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(Value::Text("hello".to_string()).to_string_value(), "hello");
        assert_eq!(Value::Number(42.0).to_string_value(), "42");
        assert_eq!(Value::Number(3.25).to_string_value(), "3.25");
        assert_eq!(Value::Boolean(true).to_string_value(), "true");
        assert_eq!(Value::Null.to_string_value(), "");
    }
}
