//! Merge session
//!
//! Binds one template to one record stream. The layout engine pulls records
//! with [`MergeSession::next_record`] and places each one (times the copy
//! count) on consecutive label positions, starting at the configured first
//! label of the first sheet.

use crate::error::{ParseError, RecordResult};
use crate::record::{FieldSchema, Record};
use crate::source::MergeSource;
use label_db::Template;
use serde::{Deserialize, Serialize};

/// Which good records of the source are merged, by 0-based position
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordRange {
    #[default]
    All,
    /// Inclusive range
    Range { start: usize, end: usize },
    Single(usize),
}

impl RecordRange {
    fn contains(&self, index: usize) -> bool {
        match self {
            RecordRange::All => true,
            RecordRange::Range { start, end } => (*start..=*end).contains(&index),
            RecordRange::Single(i) => *i == index,
        }
    }

    /// Whether no index at or after this one can be selected
    fn is_past(&self, index: usize) -> bool {
        match self {
            RecordRange::All => false,
            RecordRange::Range { end, .. } => index > *end,
            RecordRange::Single(i) => index > *i,
        }
    }

    /// Number of selected records among `total`
    fn count_within(&self, total: usize) -> usize {
        match self {
            RecordRange::All => total,
            RecordRange::Range { start, end } => {
                if start > end {
                    0
                } else {
                    total.min(end + 1).saturating_sub(*start)
                }
            }
            RecordRange::Single(i) => usize::from(*i < total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    pub range: RecordRange,
    /// Labels printed per record
    pub copies: usize,
    /// 1-based label position where the first sheet starts
    pub first_label: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            range: RecordRange::All,
            copies: 1,
            first_label: 1,
        }
    }
}

impl SessionOptions {
    pub fn with_range(mut self, range: RecordRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_copies(mut self, copies: usize) -> Self {
        self.copies = copies;
        self
    }

    pub fn with_first_label(mut self, first_label: usize) -> Self {
        self.first_label = first_label;
        self
    }
}

/// Where one label lands
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelSlot {
    /// 0-based sheet number
    pub sheet: usize,
    /// 0-based position on the sheet, row-major across layouts
    pub index: usize,
    /// Label origin in points from the top-left corner of the page
    pub x: f64,
    pub y: f64,
}

/// Everything a drained session produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeSummary {
    pub records: Vec<Record>,
    pub errors: Vec<ParseError>,
    pub record_count: usize,
    pub error_count: usize,
    pub label_count: usize,
    pub sheet_count: usize,
    pub summary: String,
}

impl MergeSummary {
    pub fn is_clean(&self) -> bool {
        self.error_count == 0
    }
}

pub struct MergeSession {
    template: Template,
    source: Box<dyn MergeSource>,
    options: SessionOptions,
    origins: Vec<(f64, f64)>,
    /// Good records pulled from the source so far
    seen: usize,
    produced: usize,
    diagnostics: Vec<ParseError>,
    finished: bool,
}

impl MergeSession {
    pub fn new(template: Template, source: Box<dyn MergeSource>, options: SessionOptions) -> Self {
        let origins: Vec<(f64, f64)> = template.layouts.iter().flat_map(|l| l.origins()).collect();
        let mut options = options;

        if options.copies == 0 {
            tracing::warn!("Copies must be at least 1, using 1");
            options.copies = 1;
        }
        if options.first_label == 0 || options.first_label > origins.len().max(1) {
            tracing::warn!(
                "First label {} is not on a {}-label sheet, using 1",
                options.first_label,
                origins.len()
            );
            options.first_label = 1;
        }

        tracing::debug!(
            "Merging {} records onto {} ({} labels per sheet)",
            source.format(),
            template.name(),
            origins.len()
        );

        Self {
            template,
            source,
            options,
            origins,
            seen: 0,
            produced: 0,
            diagnostics: Vec::new(),
            finished: false,
        }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Keys of the underlying source
    pub fn field_schema(&self) -> &FieldSchema {
        self.source.field_schema()
    }

    pub fn labels_per_sheet(&self) -> usize {
        self.origins.len()
    }

    /// Number of records [`next_record`](Self::next_record) will produce in
    /// total, if the source knows its size
    pub fn record_count_hint(&self) -> Option<usize> {
        self.source
            .record_count_hint()
            .map(|total| self.options.range.count_within(total))
    }

    /// Sheets needed for the given number of records. Saturates at
    /// `usize::MAX` labels.
    pub fn sheets_needed(&self, records: usize) -> usize {
        let per_sheet = self.labels_per_sheet();
        if per_sheet == 0 || records == 0 {
            return 0;
        }
        let labels = records
            .saturating_mul(self.options.copies)
            .saturating_add(self.options.first_label - 1);
        labels.div_ceil(per_sheet)
    }

    pub fn sheet_count_hint(&self) -> Option<usize> {
        self.record_count_hint().map(|n| self.sheets_needed(n))
    }

    /// Position of the n-th label (0-based, counting copies), or `None`
    /// past the last addressable position
    pub fn label_slot(&self, label: usize) -> Option<LabelSlot> {
        let per_sheet = self.labels_per_sheet();
        if per_sheet == 0 {
            return None;
        }
        let position = label.checked_add(self.options.first_label - 1)?;
        let index = position % per_sheet;
        let (x, y) = self.origins[index];
        Some(LabelSlot {
            sheet: position / per_sheet,
            index,
            x,
            y,
        })
    }

    /// Next selected record, or the next bad record's error.
    ///
    /// Errors are passed through as they occur until the end of the selected
    /// range is reached; the caller decides whether to carry on.
    pub fn next_record(&mut self) -> Option<RecordResult> {
        while !self.finished {
            if self.options.range.is_past(self.seen) {
                self.finished = true;
                break;
            }
            match self.source.next() {
                None => self.finished = true,
                Some(Err(e)) => {
                    self.diagnostics.push(e.clone());
                    return Some(Err(e));
                }
                Some(Ok(record)) => {
                    let index = self.seen;
                    self.seen += 1;
                    if self.options.range.contains(index) {
                        self.produced += 1;
                        return Some(Ok(record));
                    }
                }
            }
        }
        None
    }

    /// Errors seen so far
    pub fn diagnostics(&self) -> &[ParseError] {
        &self.diagnostics
    }

    /// Records produced so far
    pub fn produced(&self) -> usize {
        self.produced
    }

    /// Pull every remaining record
    pub fn drain(mut self) -> MergeSummary {
        let mut records = Vec::new();
        while let Some(result) = self.next_record() {
            if let Ok(record) = result {
                records.push(record);
            }
        }

        let record_count = self.produced;
        let error_count = self.diagnostics.len();
        let sheet_count = self.sheets_needed(record_count);
        let summary = format!(
            "Merged {} records onto {} sheets of {} ({} errors)",
            record_count,
            sheet_count,
            self.template.name(),
            error_count
        );
        tracing::info!("{}", summary);

        MergeSummary {
            records,
            errors: self.diagnostics,
            record_count,
            error_count,
            label_count: record_count.saturating_mul(self.options.copies),
            sheet_count,
            summary,
        }
    }
}

impl Iterator for MergeSession {
    type Item = RecordResult;

    fn next(&mut self) -> Option<RecordResult> {
        self.next_record()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{TextOptions, TextSource};
    use label_db::{LabelShape, Layout};

    /// 2 x 3 grid on letter paper
    fn template() -> Template {
        Template::new("Acme", "6", "US-Letter").with_layout(Layout::new(
            LabelShape::rectangle(200.0, 100.0),
            2,
            3,
            50.0,
            60.0,
            250.0,
            120.0,
        ))
    }

    fn source(rows: usize) -> Box<dyn MergeSource> {
        let mut data = String::from("name\n");
        for i in 0..rows {
            data.push_str(&format!("person {}\n", i));
        }
        Box::new(TextSource::from_string(data, TextOptions::default()).unwrap())
    }

    #[test]
    fn test_merge_all_records() {
        let session = MergeSession::new(template(), source(7), SessionOptions::default());
        assert_eq!(session.record_count_hint(), Some(7));
        assert_eq!(session.sheet_count_hint(), Some(2));

        let summary = session.drain();
        assert_eq!(summary.record_count, 7);
        assert_eq!(summary.sheet_count, 2);
        assert!(summary.is_clean());
        assert_eq!(summary.records[0].text("name").as_deref(), Some("person 0"));
    }

    #[test]
    fn test_merge_with_range() {
        let options = SessionOptions::default().with_range(RecordRange::Range { start: 2, end: 4 });
        let session = MergeSession::new(template(), source(10), options);
        assert_eq!(session.record_count_hint(), Some(3));

        let names: Vec<_> = session
            .map(|r| r.unwrap().text("name").unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["person 2", "person 3", "person 4"]);
    }

    #[test]
    fn test_merge_single_record() {
        let options = SessionOptions::default().with_range(RecordRange::Single(1));
        let mut session = MergeSession::new(template(), source(3), options);
        assert_eq!(session.record_count_hint(), Some(1));
        assert_eq!(
            session.next_record().unwrap().unwrap().text("name").as_deref(),
            Some("person 1")
        );
        assert!(session.next_record().is_none());
    }

    #[test]
    fn test_range_beyond_source() {
        let options = SessionOptions::default().with_range(RecordRange::Range { start: 5, end: 9 });
        let session = MergeSession::new(template(), source(3), options);
        assert_eq!(session.record_count_hint(), Some(0));
        assert_eq!(session.drain().record_count, 0);
    }

    #[test]
    fn test_copies_and_first_label() {
        let options = SessionOptions::default().with_copies(2).with_first_label(5);
        let session = MergeSession::new(template(), source(4), options);

        // 4 unused + 8 labels over 6-label sheets
        assert_eq!(session.sheet_count_hint(), Some(2));
        assert_eq!(session.sheets_needed(0), 0);

        let first = session.label_slot(0).unwrap();
        assert_eq!((first.sheet, first.index), (0, 4));
        assert_eq!((first.x, first.y), (50.0, 300.0));

        let wrapped = session.label_slot(2).unwrap();
        assert_eq!((wrapped.sheet, wrapped.index), (1, 0));

        assert_eq!(session.drain().label_count, 8);
    }

    #[test]
    fn test_out_of_range_options_are_clamped() {
        let options = SessionOptions::default().with_copies(0).with_first_label(99);
        let session = MergeSession::new(template(), source(1), options);
        assert_eq!(session.options().copies, 1);
        assert_eq!(session.options().first_label, 1);
    }

    #[test]
    fn test_huge_copy_count_saturates() {
        let options = SessionOptions::default().with_copies(usize::MAX).with_first_label(3);
        let session = MergeSession::new(template(), source(2), options);

        assert_eq!(session.sheet_count_hint(), Some(usize::MAX.div_ceil(6)));
        assert_eq!(session.sheets_needed(usize::MAX), usize::MAX.div_ceil(6));
        assert!(session.label_slot(usize::MAX).is_none());
        assert_eq!(session.label_slot(usize::MAX - 2).map(|s| s.index), Some(usize::MAX % 6));
        assert_eq!(session.drain().label_count, usize::MAX);
    }

    #[test]
    fn test_errors_pass_through() {
        let mut data = b"name\nAlice\n".to_vec();
        data.extend_from_slice(&[0xff, b'\n']);
        data.extend_from_slice(b"Bob\n");
        let source = TextSource::open(std::io::Cursor::new(data), TextOptions::default()).unwrap();

        let mut session = MergeSession::new(template(), Box::new(source), SessionOptions::default());
        assert!(session.next_record().unwrap().is_ok());
        assert!(session.next_record().unwrap().is_err());
        assert!(session.next_record().unwrap().is_ok());
        assert!(session.next_record().is_none());
        assert_eq!(session.diagnostics().len(), 1);
        assert_eq!(session.produced(), 2);
    }
}
