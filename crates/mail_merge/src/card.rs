//! Card driver
//!
//! A card file holds one record per stanza of `Key:Value` lines. Stanzas are
//! separated by blank lines or wrapped in `BEGIN:VCARD` / `END:VCARD`. A line
//! starting with a space or tab continues the previous value; it is joined
//! with a single space.
//!
//! ```text
//! NAME:John
//!   Smith
//! TEL;TYPE=WORK:555-0100
//!
//! NAME:Jane
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Seek, SeekFrom};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{OpenError, ParseError, RecordResult, Result};
use crate::record::{FieldSchema, Record, Value};
use crate::source::{MergeSource, SchemaMode, SourceFormat};

/// Card options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardOptions {
    /// Turn `\n`, `\,`, `\;`, and `\\` in values into the characters they stand for
    pub unescape: bool,
    /// How the field schema is built
    pub schema_mode: SchemaMode,
}

impl Default for CardOptions {
    fn default() -> Self {
        Self {
            unescape: true,
            schema_mode: SchemaMode::Prescan,
        }
    }
}

impl CardOptions {
    /// Set whether values are unescaped
    pub fn with_unescape(mut self, unescape: bool) -> Self {
        self.unescape = unescape;
        self
    }

    /// Set the schema mode
    pub fn with_schema_mode(mut self, mode: SchemaMode) -> Self {
        self.schema_mode = mode;
        self
    }
}

/// Lines of one record, continuations already folded in
#[derive(Debug, Default)]
struct Stanza {
    lines: Vec<(u64, String)>,
    problem: Option<(u64, String)>,
}

impl Stanza {
    fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.problem.is_none()
    }

    fn note(&mut self, line: u64, reason: String) {
        if self.problem.is_none() {
            self.problem = Some((line, reason));
        }
    }
}

/// Splits a reader into stanzas one at a time
struct StanzaReader<R> {
    reader: R,
    line: u64,
    buf: Vec<u8>,
}

impl<R: BufRead> StanzaReader<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: Vec::new(),
        }
    }

    fn next_stanza(&mut self) -> std::io::Result<Option<Stanza>> {
        let mut stanza = Stanza::default();

        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
                return Ok(Some(stanza).filter(|s| !s.is_empty()));
            }
            self.line += 1;

            let text = match std::str::from_utf8(&self.buf) {
                Ok(text) => text.trim_end_matches(['\r', '\n']),
                Err(_) => {
                    stanza.note(self.line, "line is not valid UTF-8".to_string());
                    continue;
                }
            };

            if text.trim().is_empty() || is_marker(text, "END") {
                if stanza.is_empty() {
                    continue;
                }
                return Ok(Some(stanza));
            }
            if is_marker(text, "BEGIN") {
                if stanza.is_empty() {
                    continue;
                }
                // The next call starts the new card; BEGIN carries nothing
                return Ok(Some(stanza));
            }

            if text.starts_with([' ', '\t']) {
                match stanza.lines.last_mut() {
                    Some((_, previous)) => {
                        previous.push(' ');
                        previous.push_str(text.trim_start());
                    }
                    None => stanza.note(self.line, "continuation line with nothing to continue".to_string()),
                }
                continue;
            }

            stanza.lines.push((self.line, text.to_string()));
        }
    }

    fn rewind(&mut self) -> std::io::Result<()>
    where
        R: Seek,
    {
        self.reader.seek(SeekFrom::Start(0))?;
        self.line = 0;
        Ok(())
    }
}

fn is_marker(line: &str, kind: &str) -> bool {
    line.split_once(':').is_some_and(|(key, value)| {
        key.trim().eq_ignore_ascii_case(kind) && value.trim().eq_ignore_ascii_case("VCARD")
    })
}

/// Card source
pub struct CardSource<R> {
    reader: Option<StanzaReader<R>>,
    options: CardOptions,
    schema: FieldSchema,
    hint: Option<usize>,
    record: usize,
}

impl CardSource<BufReader<File>> {
    /// Open a card file
    pub fn open_path(path: impl AsRef<Path>, options: CardOptions) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(OpenError::FileNotFound(path.display().to_string()));
        }

        let file = File::open(path)?;
        tracing::debug!("Reading cards from {}", path.display());
        Self::open(BufReader::new(file), options)
    }
}

impl CardSource<Cursor<Vec<u8>>> {
    /// Read cards held in memory
    pub fn from_string(data: impl Into<String>, options: CardOptions) -> Result<Self> {
        Self::open(Cursor::new(data.into().into_bytes()), options)
    }
}

impl<R: BufRead + Seek> CardSource<R> {
    /// Read cards from any seekable reader.
    ///
    /// The first line of the first stanza identifies the format, so a
    /// first stanza that does not start with a `Key:Value` property fails
    /// the whole source with [`OpenError::WrongFormat`]. The same problem in
    /// any later stanza only yields a [`ParseError`] for that card.
    pub fn open(reader: R, options: CardOptions) -> Result<Self> {
        let mut stanzas = StanzaReader::new(reader);
        check_signature(&mut stanzas)?;
        stanzas.rewind()?;

        let mut source = Self {
            reader: None,
            options,
            schema: FieldSchema::new(),
            hint: None,
            record: 0,
        };

        if source.options.schema_mode == SchemaMode::Prescan {
            let mut count = 0;
            while let Some(stanza) = stanzas.next_stanza()? {
                if let Ok(fields) = parse_stanza(stanza, source.options.unescape) {
                    count += 1;
                    for (key, _) in &fields {
                        source.schema.insert(key);
                    }
                }
            }
            stanzas.rewind()?;
            tracing::debug!("Prescan found {} cards, {} keys", count, source.schema.len());
            source.hint = Some(count);
        }

        source.reader = Some(stanzas);
        Ok(source)
    }

    /// Options this source was opened with
    pub fn options(&self) -> &CardOptions {
        &self.options
    }
}

/// The first meaningful line must be a property
fn check_signature<R: BufRead>(stanzas: &mut StanzaReader<R>) -> Result<()> {
    let first = match stanzas.next_stanza()? {
        Some(stanza) => stanza,
        None => return Ok(()),
    };

    let first_line = first.lines.first().map(|(_, text)| text.as_str());
    match (first_line, first.problem) {
        (Some(text), _) if split_property(text).is_some() => Ok(()),
        (Some(text), _) => Err(OpenError::WrongFormat {
            expected: "card",
            reason: format!("first line is not a Key:Value property: {:?}", truncate(text)),
        }),
        (None, Some((line, reason))) => Err(OpenError::WrongFormat {
            expected: "card",
            reason: format!("line {}: {}", line, reason),
        }),
        (None, None) => Ok(()),
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(40).collect()
}

fn split_property(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

fn parse_stanza(stanza: Stanza, unescape: bool) -> std::result::Result<Vec<(String, Value)>, (u64, String)> {
    if let Some(problem) = stanza.problem {
        return Err(problem);
    }

    stanza
        .lines
        .into_iter()
        .map(|(line, text)| {
            let (key, value) = split_property(&text)
                .ok_or_else(|| (line, format!("expected Key:Value, found {:?}", truncate(&text))))?;
            let value = if unescape {
                unescape_value(value)
            } else {
                value.to_string()
            };
            Ok((key.to_string(), Value::Text(value)))
        })
        .collect()
}

/// Undo vCard value escaping
pub fn unescape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(escaped @ (',' | ';' | ':' | '\\')) => out.push(escaped),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

impl<R: BufRead + Seek> Iterator for CardSource<R> {
    type Item = RecordResult;

    fn next(&mut self) -> Option<RecordResult> {
        let reader = self.reader.as_mut()?;

        match reader.next_stanza() {
            Ok(Some(stanza)) => {
                self.record += 1;
                let start = stanza.lines.first().map(|(line, _)| *line).unwrap_or(reader.line);
                match parse_stanza(stanza, self.options.unescape) {
                    Ok(fields) => {
                        let record = Record::new(fields);
                        if self.options.schema_mode == SchemaMode::Incremental {
                            self.schema.observe(&record);
                        }
                        Some(Ok(record))
                    }
                    Err((line, reason)) => {
                        tracing::debug!("Skipping card starting at line {}: {}", start, reason);
                        Some(Err(ParseError::new(line, self.record, reason)))
                    }
                }
            }
            Ok(None) => {
                tracing::debug!("Cards finished after {} records", self.record);
                self.reader = None;
                None
            }
            Err(e) => {
                let line = reader.line;
                self.reader = None;
                self.record += 1;
                Some(Err(ParseError::new(line, self.record, format!("read error: {}", e))))
            }
        }
    }
}

impl<R: BufRead + Seek> MergeSource for CardSource<R> {
    fn format(&self) -> SourceFormat {
        SourceFormat::Card
    }

    fn field_schema(&self) -> &FieldSchema {
        &self.schema
    }

    fn record_count_hint(&self) -> Option<usize> {
        self.hint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(data: &str) -> Vec<RecordResult> {
        CardSource::from_string(data, CardOptions::default())
            .unwrap()
            .collect()
    }

    #[test]
    fn test_continuation_and_blank_line_boundary() {
        let results = records("NAME:John\n  Smith\n\nNAME:Jane\n");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().text("NAME").as_deref(), Some("John Smith"));
        assert_eq!(results[1].as_ref().unwrap().text("NAME").as_deref(), Some("Jane"));
    }

    #[test]
    fn test_vcard_envelope() {
        let data = "BEGIN:VCARD\r\nVERSION:3.0\r\nFN:Alice Example\r\nTEL;TYPE=WORK:555-0100\r\n\
                    ADR:;;12 Main St\\, Apt 4;Springfield\r\nEND:VCARD\r\n\
                    BEGIN:VCARD\r\nFN:Bob\r\nNOTE:line one\\nline two\r\nEND:VCARD\r\n";
        let source = CardSource::from_string(data, CardOptions::default()).unwrap();
        assert_eq!(source.record_count_hint(), Some(2));
        assert_eq!(
            source.field_schema().keys(),
            ["VERSION", "FN", "TEL;TYPE=WORK", "ADR", "NOTE"]
        );

        let results: Vec<_> = source.collect();
        let alice = results[0].as_ref().unwrap();
        assert_eq!(alice.text("TEL;TYPE=WORK").as_deref(), Some("555-0100"));
        assert_eq!(alice.text("ADR").as_deref(), Some(";;12 Main St, Apt 4;Springfield"));
        let bob = results[1].as_ref().unwrap();
        assert_eq!(bob.text("NOTE").as_deref(), Some("line one\nline two"));
        assert_eq!(bob.field("TEL;TYPE=WORK"), None);
    }

    #[test]
    fn test_back_to_back_begin_without_end() {
        let results = records("BEGIN:VCARD\nFN:A\nBEGIN:VCARD\nFN:B\n");
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].as_ref().unwrap().text("FN").as_deref(), Some("B"));
    }

    #[test]
    fn test_bad_stanza_is_reported_and_skipped() {
        let results = records("NAME:One\n\nNAME:Two\nthis line has no colon\n\nNAME:Three\n");
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());

        let err = results[1].as_ref().unwrap_err();
        assert_eq!(err.line, 4);
        assert_eq!(err.record, 2);
        assert!(err.reason.contains("Key:Value"));

        assert_eq!(results[2].as_ref().unwrap().text("NAME").as_deref(), Some("Three"));
    }

    #[test]
    fn test_hint_counts_only_good_cards() {
        let source = CardSource::from_string("A:1\n\n:missing key\n\nA:2\n", CardOptions::default()).unwrap();
        assert_eq!(source.record_count_hint(), Some(2));
        assert_eq!(source.filter(|r| r.is_ok()).count(), 2);
    }

    #[test]
    fn test_wrong_format() {
        let result = CardSource::from_string("just some prose\nwithout properties\n", CardOptions::default());
        assert!(matches!(result, Err(OpenError::WrongFormat { .. })));
    }

    #[test]
    fn test_signature_checks_only_first_stanza() {
        // A later card opening with a non-property line is one bad record
        let results = records("NAME:One\n\nno colon here\nNAME:Two\n\nNAME:Three\n");
        assert_eq!(results.len(), 3);
        assert_eq!(results[1].as_ref().unwrap_err().line, 3);
        assert!(results[2].is_ok());

        // The same card first makes the source unreadable
        let result = CardSource::from_string("no colon here\nNAME:Two\n\nNAME:One\n", CardOptions::default());
        assert!(matches!(result, Err(OpenError::WrongFormat { .. })));
    }

    #[test]
    fn test_empty_input() {
        let mut source = CardSource::from_string("\n\n", CardOptions::default()).unwrap();
        assert_eq!(source.record_count_hint(), Some(0));
        assert!(source.next().is_none());
    }

    #[test]
    fn test_raw_values_when_unescape_off() {
        let options = CardOptions::default().with_unescape(false);
        let mut source = CardSource::from_string("NOTE:a\\,b\n", options).unwrap();
        assert_eq!(source.next().unwrap().unwrap().text("NOTE").as_deref(), Some("a\\,b"));
    }

    #[test]
    fn test_incremental_schema() {
        let options = CardOptions::default().with_schema_mode(SchemaMode::Incremental);
        let mut source = CardSource::from_string("A:1\n\nB:2\n", options).unwrap();
        assert_eq!(source.record_count_hint(), None);
        source.next();
        assert_eq!(source.field_schema().keys(), ["A"]);
        source.next();
        assert_eq!(source.field_schema().keys(), ["A", "B"]);
    }

    #[test]
    fn test_unescape_value() {
        assert_eq!(unescape_value(r"a\,b\;c\\d\ne"), "a,b;c\\d\ne");
        assert_eq!(unescape_value(r"keep\q"), r"keep\q");
        assert_eq!(unescape_value("trailing\\"), "trailing\\");
    }
}
