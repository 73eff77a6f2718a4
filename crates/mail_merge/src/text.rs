//! Delimited text driver
//!
//! Reads comma, semicolon, tab, and similar delimited files. With a header
//! row, fields are keyed by column name; columns without a name (or files
//! without a header) are keyed by their 1-based column number.

use std::collections::HashSet;
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{OpenError, ParseError, RecordResult, Result};
use crate::record::{FieldSchema, Record, Value};
use crate::source::{MergeSource, SchemaMode, SourceFormat};

const FORMAT_NAME: &str = "delimited text";

/// Delimited text options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextOptions {
    /// Delimiter character
    pub delimiter: char,
    /// Whether the first row contains headers
    pub has_header: bool,
    /// Whether to trim whitespace from values
    pub trim_whitespace: bool,
    /// Whether to turn values into numbers, dates, and booleans
    pub auto_detect_types: bool,
    /// How the field schema is built
    pub schema_mode: SchemaMode,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_header: true,
            trim_whitespace: true,
            auto_detect_types: false,
            schema_mode: SchemaMode::Prescan,
        }
    }
}

impl TextOptions {
    /// Comma separated values
    pub fn comma() -> Self {
        Self::default()
    }

    /// Semicolon separated values
    pub fn semicolon() -> Self {
        Self {
            delimiter: ';',
            ..Default::default()
        }
    }

    /// Tab separated values
    pub fn tab() -> Self {
        Self {
            delimiter: '\t',
            ..Default::default()
        }
    }

    /// Set the delimiter
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set whether the first row is a header
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Set whether to trim whitespace
    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim_whitespace = trim;
        self
    }

    /// Set whether to auto-detect types
    pub fn with_auto_detect(mut self, auto_detect: bool) -> Self {
        self.auto_detect_types = auto_detect;
        self
    }

    /// Set the schema mode
    pub fn with_schema_mode(mut self, mode: SchemaMode) -> Self {
        self.schema_mode = mode;
        self
    }

    fn delimiter_byte(&self) -> Result<u8> {
        let d = self.delimiter;
        if !d.is_ascii() || d.is_ascii_alphanumeric() || matches!(d, '"' | '\r' | '\n' | ' ') {
            return Err(OpenError::InvalidDelimiter(format!("{:?}", d)));
        }
        Ok(d as u8)
    }
}

/// Delimited text source
pub struct TextSource<R> {
    reader: Option<csv::Reader<R>>,
    options: TextOptions,
    /// Delimiter as the tokenizer sees it
    delimiter: u8,
    /// Length of the input in bytes
    len: u64,
    headers: Vec<String>,
    schema: FieldSchema,
    hint: Option<usize>,
    record: usize,
}

impl TextSource<File> {
    /// Open a delimited text file
    pub fn open_path(path: impl AsRef<Path>, options: TextOptions) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(OpenError::FileNotFound(path.display().to_string()));
        }

        let file = File::open(path)?;
        tracing::debug!("Reading delimited text from {}", path.display());
        Self::open(file, options)
    }
}

impl TextSource<Cursor<Vec<u8>>> {
    /// Read delimited text held in memory
    pub fn from_string(data: impl Into<String>, options: TextOptions) -> Result<Self> {
        Self::open(Cursor::new(data.into().into_bytes()), options)
    }
}

impl<R: Read + Seek> TextSource<R> {
    /// Read delimited text from any seekable reader
    pub fn open(mut reader: R, options: TextOptions) -> Result<Self> {
        let delimiter = options.delimiter_byte()?;
        let len = reader.seek(SeekFrom::End(0))?;
        reader.rewind()?;

        // Header handling stays here so a rewind sees the same rows again
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let headers = if options.has_header {
            read_headers(&mut csv_reader, &options)?
        } else {
            Vec::new()
        };

        let mut source = Self {
            reader: None,
            options,
            delimiter,
            len,
            schema: headers.iter().map(String::as_str).collect(),
            headers,
            hint: None,
            record: 0,
        };

        if source.options.schema_mode == SchemaMode::Prescan {
            source.prescan(&mut csv_reader)?;
        }
        source.reader = Some(csv_reader);
        Ok(source)
    }

    /// Count the good rows and collect every column key, then rewind
    fn prescan(&mut self, csv_reader: &mut csv::Reader<R>) -> Result<()> {
        let mut raw = csv::ByteRecord::new();
        let mut count = 0;

        while let Some(row) =
            read_row(csv_reader, self.delimiter, self.len).map_err(|e| OpenError::from_csv(e, FORMAT_NAME))?
        {
            let Row::Fields(fields) = row else {
                continue;
            };
            if let Ok(fields) = decode_row(&fields, &self.headers, &self.options) {
                count += 1;
                for (key, _) in &fields {
                    self.schema.insert(key);
                }
            }
        }

        csv_reader
            .seek(csv::Position::new())
            .map_err(|e| OpenError::from_csv(e, FORMAT_NAME))?;
        if self.options.has_header {
            csv_reader
                .read_byte_record(&mut raw)
                .map_err(|e| OpenError::from_csv(e, FORMAT_NAME))?;
        }

        tracing::debug!("Prescan found {} records, {} columns", count, self.schema.len());
        self.hint = Some(count);
        Ok(())
    }

    /// Header names as read from the file
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Options this source was opened with
    pub fn options(&self) -> &TextOptions {
        &self.options
    }
}

impl<R: Read + Seek> Iterator for TextSource<R> {
    type Item = RecordResult;

    fn next(&mut self) -> Option<RecordResult> {
        let reader = self.reader.as_mut()?;

        match read_row(reader, self.delimiter, self.len) {
            Ok(Some(Row::Unterminated { line })) => {
                self.record += 1;
                tracing::debug!("Skipping row at line {}: unterminated quoted field", line);
                Some(Err(ParseError::new(
                    line,
                    self.record,
                    "quoted field is never closed",
                )))
            }
            Ok(Some(Row::Fields(raw))) => {
                self.record += 1;
                let line = raw.position().map(|p| p.line()).unwrap_or(0);
                match decode_row(&raw, &self.headers, &self.options) {
                    Ok(fields) => {
                        let record = Record::new(fields);
                        if self.options.schema_mode == SchemaMode::Incremental {
                            self.schema.observe(&record);
                        }
                        Some(Ok(record))
                    }
                    Err(reason) => {
                        tracing::debug!("Skipping row at line {}: {}", line, reason);
                        Some(Err(ParseError::new(line, self.record, reason)))
                    }
                }
            }
            Ok(None) => {
                tracing::debug!("Delimited text finished after {} records", self.record);
                self.reader = None;
                None
            }
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                self.reader = None;
                self.record += 1;
                Some(Err(ParseError::new(line, self.record, format!("read error: {}", e))))
            }
        }
    }
}

impl<R: Read + Seek> MergeSource for TextSource<R> {
    fn format(&self) -> SourceFormat {
        SourceFormat::Text
    }

    fn field_schema(&self) -> &FieldSchema {
        &self.schema
    }

    fn record_count_hint(&self) -> Option<usize> {
        self.hint
    }
}

/// One physical row as the tokenizer saw it
enum Row {
    Fields(csv::ByteRecord),
    /// A quoted field opened on this line ran to the end of the input
    Unterminated { line: u64 },
}

/// Read the next row of an input `len` bytes long.
///
/// A quoted field left open swallows the rest of the input into one
/// record. When that happens the row is reported as [`Row::Unterminated`]
/// and reading resumes on the line after the one it started on.
fn read_row<R: Read + Seek>(reader: &mut csv::Reader<R>, delimiter: u8, len: u64) -> csv::Result<Option<Row>> {
    let mut raw = csv::ByteRecord::new();
    if !reader.read_byte_record(&mut raw)? {
        return Ok(None);
    }
    // Only a row that ran into the end of the input can be unterminated
    if reader.position().byte() < len {
        return Ok(Some(Row::Fields(raw)));
    }
    let Some(start) = raw.position().cloned() else {
        return Ok(Some(Row::Fields(raw)));
    };
    let end = reader.position().clone();

    let mut tail = Vec::new();
    let inner = reader.get_mut();
    inner.seek(SeekFrom::Start(start.byte()))?;
    inner.read_to_end(&mut tail)?;

    if !ends_inside_quotes(&tail, delimiter) {
        reader.seek(end)?;
        return Ok(Some(Row::Fields(raw)));
    }

    // Blank lines before the row belong to no record
    let blank = tail.iter().take_while(|&&b| b == b'\n' || b == b'\r').count();
    let line = start.line() + tail[..blank].iter().filter(|&&b| b == b'\n').count() as u64;
    let next = start.byte() + (blank + line_length(&tail[blank..])) as u64;

    let mut resume = csv::Position::new();
    resume
        .set_byte(next)
        .set_line(line + 1)
        .set_record(start.record() + 1);
    reader.seek(resume)?;
    Ok(Some(Row::Unterminated { line }))
}

/// Whether text ends inside a quoted field, following the csv quoting
/// rules: a quote opens a field only at its start, and `""` inside a quoted
/// field is a literal quote
fn ends_inside_quotes(text: &[u8], delimiter: u8) -> bool {
    let mut in_quotes = false;
    let mut field_start = true;
    let mut bytes = text.iter().copied().peekable();

    while let Some(b) = bytes.next() {
        if in_quotes {
            if b == b'"' {
                if bytes.peek() == Some(&b'"') {
                    bytes.next();
                } else {
                    in_quotes = false;
                }
            }
        } else if b == b'"' && field_start {
            in_quotes = true;
            field_start = false;
        } else {
            field_start = b == delimiter || b == b'\n' || b == b'\r';
        }
    }
    in_quotes
}

/// Length of the first line including its terminator
fn line_length(text: &[u8]) -> usize {
    match text.iter().position(|&b| b == b'\n' || b == b'\r') {
        Some(i) if text[i] == b'\r' && text.get(i + 1) == Some(&b'\n') => i + 2,
        Some(i) => i + 1,
        None => text.len(),
    }
}

fn read_headers<R: Read>(csv_reader: &mut csv::Reader<R>, options: &TextOptions) -> Result<Vec<String>> {
    let mut raw = csv::ByteRecord::new();
    if !csv_reader
        .read_byte_record(&mut raw)
        .map_err(|e| OpenError::from_csv(e, FORMAT_NAME))?
    {
        return Ok(Vec::new());
    }

    let mut headers = Vec::with_capacity(raw.len());
    let mut seen = HashSet::new();
    for (i, bytes) in raw.iter().enumerate() {
        let name = std::str::from_utf8(bytes).map_err(|_| OpenError::WrongFormat {
            expected: FORMAT_NAME,
            reason: format!("header column {} is not valid UTF-8", i + 1),
        })?;
        let name = if options.trim_whitespace { name.trim() } else { name };
        let key = if name.is_empty() {
            (i + 1).to_string()
        } else {
            name.to_string()
        };
        if !seen.insert(key.clone()) {
            return Err(OpenError::DuplicateColumn(key));
        }
        headers.push(key);
    }
    Ok(headers)
}

/// Key for a column: its header name, or its 1-based number
fn column_key(headers: &[String], index: usize) -> String {
    headers
        .get(index)
        .cloned()
        .unwrap_or_else(|| (index + 1).to_string())
}

fn decode_row(
    raw: &csv::ByteRecord,
    headers: &[String],
    options: &TextOptions,
) -> std::result::Result<Vec<(String, Value)>, String> {
    raw.iter()
        .enumerate()
        .map(|(i, bytes)| {
            let text = std::str::from_utf8(bytes).map_err(|e| {
                format!(
                    "column {} is not valid UTF-8 (after byte {})",
                    i + 1,
                    e.valid_up_to()
                )
            })?;
            let text = if options.trim_whitespace { text.trim() } else { text };
            let value = if options.auto_detect_types {
                Value::parse_auto(text)
            } else {
                Value::Text(text.to_string())
            };
            Ok((column_key(headers, i), value))
        })
        .collect()
}

/// Detect the delimiter used in delimited text
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let delimiters = [',', ';', '\t', '|', ':'];
    let mut best_delimiter = ',';
    let mut best_count = 0;

    for &delim in &delimiters {
        let count = first_line.matches(delim).count();
        if count > best_count {
            best_count = count;
            best_delimiter = delim;
        }
    }

    best_delimiter
}

/// Detect if the first row is likely a header
pub fn detect_has_header(content: &str, delimiter: char) -> bool {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());

    let first_line = match lines.next() {
        Some(l) => l,
        None => return true,
    };

    let second_line = match lines.next() {
        Some(l) => l,
        None => return true,
    };

    let is_number = |field: &&str| {
        let trimmed = field.trim().trim_matches('"');
        !trimmed.is_empty() && trimmed.parse::<f64>().is_ok()
    };

    let first_all_text = !first_line.split(delimiter).any(|f| is_number(&f));
    let second_has_numbers = second_line.split(delimiter).any(|f| is_number(&f));

    // A text-only first row over a row with numbers reads as a header
    first_all_text && (second_has_numbers || looks_like_names(first_line, delimiter))
}

/// Header-style row: every cell a short identifier without spaces at the ends
fn looks_like_names(line: &str, delimiter: char) -> bool {
    line.split(delimiter).all(|cell| {
        let cell = cell.trim().trim_matches('"');
        !cell.is_empty()
            && cell.len() <= 32
            && cell
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ' ' | '.'))
            && !cell.contains("  ")
    })
}
