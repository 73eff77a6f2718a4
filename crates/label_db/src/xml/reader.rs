//! Definition file parsing

use super::ROOT_ELEMENT;
use crate::error::{DbError, DbResult};
use crate::model::{Category, LabelShape, Layout, Paper, Template, TemplateId};
use crate::units::parse_length;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;

/// Everything read from one or more definition files
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    /// Paper sizes in file order
    pub papers: Vec<Paper>,
    /// Categories in file order
    pub categories: Vec<Category>,
    /// Templates in file order
    pub templates: Vec<Template>,
    /// Entries dropped because their attributes were unusable
    pub skipped: Vec<String>,
}

impl Definitions {
    /// Whether nothing at all was read
    pub fn is_empty(&self) -> bool {
        self.papers.is_empty() && self.categories.is_empty() && self.templates.is_empty()
    }

    /// Append another set of definitions after this one
    pub fn extend(&mut self, other: Definitions) {
        self.papers.extend(other.papers);
        self.categories.extend(other.categories);
        self.templates.extend(other.templates);
        self.skipped.extend(other.skipped);
    }
}

/// XML reader utilities for definition files
pub struct XmlParser;

impl XmlParser {
    /// Create a new XML reader from a string
    pub fn from_string(content: &str) -> Reader<&[u8]> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);
        reader
    }

    /// Get an unescaped attribute value from an element
    pub fn get_attribute(event: &BytesStart, name: &[u8]) -> Option<String> {
        event
            .attributes()
            .filter_map(|a| a.ok())
            .find(|a| a.key.as_ref() == name)
            .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
    }

    /// Check if an element name matches, ignoring any namespace prefix
    pub fn matches_element(name: &[u8], expected: &str) -> bool {
        let name_str = std::str::from_utf8(name).unwrap_or("");
        name_str == expected || name_str.ends_with(&format!(":{}", expected))
    }

    fn required(event: &BytesStart, name: &str) -> Result<String, String> {
        Self::get_attribute(event, name.as_bytes())
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| format!("missing {} attribute", name))
    }

    fn length(event: &BytesStart, name: &str) -> Result<f64, String> {
        let raw = Self::required(event, name)?;
        parse_length(&raw).ok_or_else(|| format!("bad length {}={:?}", name, raw))
    }

    fn optional_length(event: &BytesStart, name: &str) -> Result<Option<f64>, String> {
        match Self::get_attribute(event, name.as_bytes()) {
            Some(raw) => parse_length(&raw)
                .map(Some)
                .ok_or_else(|| format!("bad length {}={:?}", name, raw)),
            None => Ok(None),
        }
    }

    fn count(event: &BytesStart, name: &str) -> Result<u32, String> {
        let raw = Self::required(event, name)?;
        raw.trim()
            .parse()
            .map_err(|_| format!("bad count {}={:?}", name, raw))
    }
}

/// A template whose element has been opened but not yet closed
struct PendingTemplate {
    template: Template,
    shape: Option<LabelShape>,
    error: Option<String>,
}

impl PendingTemplate {
    fn fail(&mut self, reason: String) {
        self.error.get_or_insert(reason);
    }
}

/// Parse definitions from XML text
pub fn parse_definitions(content: &str) -> DbResult<Definitions> {
    let mut reader = XmlParser::from_string(content);
    let mut buf = Vec::new();
    let mut defs = Definitions::default();
    let mut pending: Option<PendingTemplate> = None;
    let mut saw_root = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                check_root(e, &mut saw_root)?;
                open_element(e, false, &mut defs, &mut pending);
            }
            Event::Empty(ref e) => {
                check_root(e, &mut saw_root)?;
                open_element(e, true, &mut defs, &mut pending);
            }
            Event::End(ref e) => {
                let name = e.name();
                if XmlParser::matches_element(name.as_ref(), "Template") {
                    finish_template(&mut defs, pending.take());
                } else if is_label_element(name.as_ref()) {
                    if let Some(p) = pending.as_mut() {
                        p.shape = None;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if pending.is_some() {
        return Err(DbError::Xml("unclosed Template element".to_string()));
    }

    Ok(defs)
}

/// Read and parse a definition file
pub fn read_definitions_file(path: impl AsRef<Path>) -> DbResult<Definitions> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    parse_definitions(&content).map_err(|e| match e {
        DbError::Xml(msg) => DbError::Xml(format!("{}: {}", path.display(), msg)),
        DbError::InvalidDefinition(msg) => {
            DbError::InvalidDefinition(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })
}

fn check_root(e: &BytesStart, saw_root: &mut bool) -> DbResult<()> {
    if *saw_root {
        return Ok(());
    }
    *saw_root = true;
    if XmlParser::matches_element(e.name().as_ref(), ROOT_ELEMENT) {
        Ok(())
    } else {
        Err(DbError::InvalidDefinition(format!(
            "expected <{}> root element, found <{}>",
            ROOT_ELEMENT,
            String::from_utf8_lossy(e.name().as_ref())
        )))
    }
}

fn is_label_element(name: &[u8]) -> bool {
    ["Label-rectangle", "Label-round", "Label-ellipse", "Label-cd"]
        .iter()
        .any(|label| XmlParser::matches_element(name, label))
}

fn open_element(
    e: &BytesStart,
    is_empty: bool,
    defs: &mut Definitions,
    pending: &mut Option<PendingTemplate>,
) {
    let qname = e.name();
    let name = qname.as_ref();

    if XmlParser::matches_element(name, "Paper") {
        match parse_paper(e) {
            Ok(paper) => defs.papers.push(paper),
            Err(reason) => defs.skipped.push(format!("Paper: {}", reason)),
        }
        return;
    }
    if XmlParser::matches_element(name, "Category") {
        match parse_category(e) {
            Ok(category) => defs.categories.push(category),
            Err(reason) => defs.skipped.push(format!("Category: {}", reason)),
        }
        return;
    }
    if XmlParser::matches_element(name, "Template") {
        if let Some(unfinished) = pending.take() {
            finish_template(defs, Some(unfinished));
        }
        let started = start_template(e);
        if is_empty {
            finish_template(defs, Some(started));
        } else {
            *pending = Some(started);
        }
        return;
    }

    let Some(p) = pending.as_mut() else {
        return;
    };

    if is_label_element(name) {
        match parse_shape(e) {
            Ok(shape) => p.shape = Some(shape),
            Err(reason) => p.fail(reason),
        }
        if is_empty {
            p.shape = None;
        }
    } else if XmlParser::matches_element(name, "Layout") {
        match parse_layout(e, p.shape.clone()) {
            Ok(layout) => p.template.layouts.push(layout),
            Err(reason) => p.fail(reason),
        }
    } else if XmlParser::matches_element(name, "Meta") {
        if let Some(category) = XmlParser::get_attribute(e, b"category") {
            if !p.template.has_category(&category) {
                p.template.categories.push(category);
            }
        }
    } else if XmlParser::matches_element(name, "Markup-margin") {
        match XmlParser::length(e, "size") {
            Ok(size) => {
                p.template.markup_margin.get_or_insert(size);
            }
            Err(reason) => p.fail(reason),
        }
    } else if XmlParser::matches_element(name, "Alias") {
        match (XmlParser::required(e, "brand"), XmlParser::required(e, "part")) {
            (Ok(brand), Ok(part)) => {
                let alias = TemplateId::new(brand, part);
                if alias != p.template.id && !p.template.aliases.contains(&alias) {
                    p.template.aliases.push(alias);
                }
            }
            (Err(reason), _) | (_, Err(reason)) => p.fail(format!("Alias: {}", reason)),
        }
    }
}

fn parse_paper(e: &BytesStart) -> Result<Paper, String> {
    let id = XmlParser::required(e, "id")?;
    let name = XmlParser::get_attribute(e, b"name").unwrap_or_else(|| id.clone());
    let width = XmlParser::length(e, "width").map_err(|r| format!("{}: {}", id, r))?;
    let height = XmlParser::length(e, "height").map_err(|r| format!("{}: {}", id, r))?;

    let mut paper = Paper::new(id, name, width, height);
    if let Some(pwg) = XmlParser::get_attribute(e, b"pwg_size") {
        paper = paper.with_pwg_size(pwg);
    }
    if !paper.is_valid() {
        return Err(format!("{}: width and height must be positive", paper.id));
    }
    Ok(paper)
}

fn parse_category(e: &BytesStart) -> Result<Category, String> {
    let id = XmlParser::required(e, "id")?;
    let name = XmlParser::get_attribute(e, b"name").unwrap_or_else(|| id.clone());
    Ok(Category::new(id, name))
}

fn start_template(e: &BytesStart) -> PendingTemplate {
    let brand = XmlParser::required(e, "brand");
    let part = XmlParser::required(e, "part");
    let size = XmlParser::required(e, "size");

    match (brand, part, size) {
        (Ok(brand), Ok(part), Ok(size)) => {
            let description = XmlParser::get_attribute(e, b"description").unwrap_or_default();
            let mut pending = PendingTemplate {
                template: Template::new(brand, part, size).with_description(description),
                shape: None,
                error: None,
            };
            match page_size(e) {
                Ok(size) => pending.template.page_size = size,
                Err(reason) => pending.fail(reason),
            }
            pending
        }
        (brand, part, size) => {
            let reason = [&brand, &part, &size]
                .into_iter()
                .find_map(|r| r.as_ref().err().cloned())
                .unwrap_or_default();
            PendingTemplate {
                template: Template::new(
                    brand.unwrap_or_else(|_| "?".to_string()),
                    part.unwrap_or_else(|_| "?".to_string()),
                    String::new(),
                ),
                shape: None,
                error: Some(reason),
            }
        }
    }
}

/// Page size carried by templates on custom paper
fn page_size(e: &BytesStart) -> Result<Option<(f64, f64)>, String> {
    match (
        XmlParser::optional_length(e, "width")?,
        XmlParser::optional_length(e, "height")?,
    ) {
        (Some(width), Some(height)) => Ok(Some((width, height))),
        (None, None) => Ok(None),
        _ => Err("page width and height must be given together".to_string()),
    }
}

fn finish_template(defs: &mut Definitions, pending: Option<PendingTemplate>) {
    let Some(p) = pending else {
        return;
    };
    match p.error {
        Some(reason) => defs
            .skipped
            .push(format!("Template {}: {}", p.template.name(), reason)),
        None => defs.templates.push(p.template),
    }
}

fn parse_shape(e: &BytesStart) -> Result<LabelShape, String> {
    let qname = e.name();
    let name = qname.as_ref();

    if XmlParser::matches_element(name, "Label-rectangle") {
        Ok(LabelShape::Rectangle {
            width: XmlParser::length(e, "width")?,
            height: XmlParser::length(e, "height")?,
            corner_radius: XmlParser::optional_length(e, "round")?,
        })
    } else if XmlParser::matches_element(name, "Label-round") {
        Ok(LabelShape::Round {
            radius: XmlParser::length(e, "radius")?,
        })
    } else if XmlParser::matches_element(name, "Label-ellipse") {
        Ok(LabelShape::Ellipse {
            width: XmlParser::length(e, "width")?,
            height: XmlParser::length(e, "height")?,
        })
    } else {
        Ok(LabelShape::Cd {
            radius: XmlParser::length(e, "radius")?,
            hole: XmlParser::length(e, "hole")?,
            width: XmlParser::optional_length(e, "width")?,
            height: XmlParser::optional_length(e, "height")?,
        })
    }
}

fn parse_layout(e: &BytesStart, shape: Option<LabelShape>) -> Result<Layout, String> {
    let shape = shape.ok_or_else(|| "Layout outside a Label element".to_string())?;
    Ok(Layout {
        nx: XmlParser::count(e, "nx")?,
        ny: XmlParser::count(e, "ny")?,
        x0: XmlParser::length(e, "x0")?,
        y0: XmlParser::length(e, "y0")?,
        dx: XmlParser::optional_length(e, "dx")?.unwrap_or(0.0),
        dy: XmlParser::optional_length(e, "dy")?.unwrap_or(0.0),
        shape,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<Glabels-templates>
  <Paper id="US-Letter" name="US Letter" width="8.5in" height="11in" pwg_size="na_letter_8.5x11in"/>
  <Paper id="broken" name="Broken" width="wide" height="11in"/>
  <Category id="mail" name="Mailing labels"/>
  <Template brand="Avery" part="5160" size="US-Letter" description="Address Labels">
    <Meta category="mail"/>
    <Label-rectangle id="0" width="2.625in" height="1in" round="0.0625in">
      <Markup-margin size="0.0625in"/>
      <Layout nx="3" ny="10" x0="0.1875in" y0="0.5in" dx="2.75in" dy="1in"/>
    </Label-rectangle>
    <Alias brand="Avery" part="8160"/>
  </Template>
  <Template brand="Acme" part="1" size="US-Letter">
    <Layout nx="1" ny="1" x0="0" y0="0"/>
  </Template>
  <Template brand="Acme" part="CD" size="US-Letter" description="CD &amp; DVD">
    <Label-cd radius="2.3125in" hole="0.8125in">
      <Layout nx="1" ny="2" x0="1.9375in" y0="0.6875in" dy="5in"/>
    </Label-cd>
  </Template>
</Glabels-templates>
"#;

    #[test]
    fn test_parse_sample() {
        let defs = parse_definitions(SAMPLE).unwrap();

        assert_eq!(defs.papers.len(), 1);
        assert_eq!(defs.papers[0].width, 612.0);
        assert_eq!(defs.papers[0].pwg_size.as_deref(), Some("na_letter_8.5x11in"));
        assert_eq!(defs.categories.len(), 1);
        assert_eq!(defs.templates.len(), 2);
        assert_eq!(defs.skipped.len(), 2);

        let avery = &defs.templates[0];
        assert_eq!(avery.name(), "Avery 5160");
        assert_eq!(avery.categories, vec!["mail"]);
        assert_eq!(avery.aliases, vec![TemplateId::new("Avery", "8160")]);
        assert_eq!(avery.markup_margin, Some(4.5));
        assert_eq!(avery.layouts[0].nx, 3);
        assert_eq!(avery.layouts[0].dx, 198.0);
        assert_eq!(avery.layouts[0].shape, LabelShape::rounded(189.0, 72.0, 4.5));

        let cd = &defs.templates[1];
        assert_eq!(cd.description, "CD & DVD");
        assert_eq!(cd.layouts[0].dx, 0.0);
        assert!(matches!(cd.layouts[0].shape, LabelShape::Cd { width: None, .. }));
    }

    #[test]
    fn test_zero_corner_radius_is_kept() {
        let defs = parse_definitions(
            r#"<Glabels-templates>
  <Template brand="Acme" part="Z" size="A4">
    <Label-rectangle width="100pt" height="50pt" round="0pt">
      <Layout nx="1" ny="1" x0="0" y0="0"/>
    </Label-rectangle>
  </Template>
</Glabels-templates>"#,
        )
        .unwrap();
        assert_eq!(defs.templates[0].layouts[0].shape, LabelShape::rounded(100.0, 50.0, 0.0));
    }

    #[test]
    fn test_custom_page_size() {
        let defs = parse_definitions(
            r#"<Glabels-templates>
  <Template brand="Acme" part="P" size="Other" width="4in" height="6in">
    <Label-rectangle width="3in" height="5in">
      <Layout nx="1" ny="1" x0="0.5in" y0="0.5in"/>
    </Label-rectangle>
  </Template>
  <Template brand="Acme" part="Q" size="Other" width="4in">
    <Label-rectangle width="3in" height="5in">
      <Layout nx="1" ny="1" x0="0.5in" y0="0.5in"/>
    </Label-rectangle>
  </Template>
</Glabels-templates>"#,
        )
        .unwrap();
        assert_eq!(defs.templates.len(), 1);
        assert_eq!(defs.templates[0].page_size, Some((288.0, 432.0)));
        assert!(defs.skipped[0].starts_with("Template Acme Q"));
    }

    #[test]
    fn test_skipped_entries_are_named() {
        let defs = parse_definitions(SAMPLE).unwrap();
        assert!(defs.skipped.iter().any(|s| s.starts_with("Paper: broken")));
        assert!(defs.skipped.iter().any(|s| s.starts_with("Template Acme 1")));
    }

    #[test]
    fn test_wrong_root_rejected() {
        let result = parse_definitions("<Recipes><Paper id=\"A4\"/></Recipes>");
        assert!(matches!(result, Err(DbError::InvalidDefinition(_))));
    }

    #[test]
    fn test_mismatched_tags_rejected() {
        let result = parse_definitions("<Glabels-templates><Template brand=\"a\"></Paper></Glabels-templates>");
        assert!(matches!(result, Err(DbError::Xml(_))));
    }

    #[test]
    fn test_matches_element() {
        assert!(XmlParser::matches_element(b"Paper", "Paper"));
        assert!(XmlParser::matches_element(b"glabels:Paper", "Paper"));
        assert!(!XmlParser::matches_element(b"Papers", "Paper"));
    }
}
