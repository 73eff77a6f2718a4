//! Definition file generation

use super::ROOT_ELEMENT;
use crate::model::{Category, LabelShape, Layout, Paper, Template};
use crate::units::format_points;

/// Generate a complete definition document
pub fn write_definitions(papers: &[Paper], categories: &[Category], templates: &[Template]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!("<{}>\n", ROOT_ELEMENT));

    for paper in papers {
        write_paper(&mut xml, paper);
    }
    for category in categories {
        xml.push_str(&format!(
            "  <Category id=\"{}\" name=\"{}\"/>\n",
            escape_xml(&category.id),
            escape_xml(&category.name)
        ));
    }
    for template in templates {
        write_template_element(&mut xml, template);
    }

    xml.push_str(&format!("</{}>\n", ROOT_ELEMENT));
    xml
}

/// Generate a definition document holding a single template
pub fn write_template(template: &Template) -> String {
    write_definitions(&[], &[], std::slice::from_ref(template))
}

fn write_paper(xml: &mut String, paper: &Paper) {
    xml.push_str(&format!(
        "  <Paper id=\"{}\" name=\"{}\" width=\"{}\" height=\"{}\"",
        escape_xml(&paper.id),
        escape_xml(&paper.name),
        format_points(paper.width),
        format_points(paper.height)
    ));
    if let Some(ref pwg) = paper.pwg_size {
        xml.push_str(&format!(" pwg_size=\"{}\"", escape_xml(pwg)));
    }
    xml.push_str("/>\n");
}

fn write_template_element(xml: &mut String, template: &Template) {
    xml.push_str(&format!(
        "  <Template brand=\"{}\" part=\"{}\" size=\"{}\"",
        escape_xml(&template.id.brand),
        escape_xml(&template.id.part),
        escape_xml(&template.paper_id)
    ));
    if let Some((width, height)) = template.page_size {
        xml.push_str(&format!(
            " width=\"{}\" height=\"{}\"",
            format_points(width),
            format_points(height)
        ));
    }
    xml.push_str(&format!(" description=\"{}\">\n", escape_xml(&template.description)));

    for category in &template.categories {
        xml.push_str(&format!("    <Meta category=\"{}\"/>\n", escape_xml(category)));
    }

    // Consecutive layouts sharing a shape go under one label element
    let mut margin_written = false;
    let mut start = 0;
    while start < template.layouts.len() {
        let shape = &template.layouts[start].shape;
        let end = template.layouts[start..]
            .iter()
            .position(|l| &l.shape != shape)
            .map(|offset| start + offset)
            .unwrap_or(template.layouts.len());

        let (open, close) = shape_tags(shape);
        xml.push_str(&format!("    {}\n", open));
        if !margin_written {
            if let Some(margin) = template.markup_margin {
                xml.push_str(&format!(
                    "      <Markup-margin size=\"{}\"/>\n",
                    format_points(margin)
                ));
            }
            margin_written = true;
        }
        for layout in &template.layouts[start..end] {
            write_layout(xml, layout);
        }
        xml.push_str(&format!("    {}\n", close));

        start = end;
    }

    for alias in &template.aliases {
        xml.push_str(&format!(
            "    <Alias brand=\"{}\" part=\"{}\"/>\n",
            escape_xml(&alias.brand),
            escape_xml(&alias.part)
        ));
    }

    xml.push_str("  </Template>\n");
}

fn shape_tags(shape: &LabelShape) -> (String, &'static str) {
    match shape {
        LabelShape::Rectangle {
            width,
            height,
            corner_radius,
        } => {
            let round = corner_radius
                .map(|r| format!(" round=\"{}\"", format_points(r)))
                .unwrap_or_default();
            (
                format!(
                    "<Label-rectangle width=\"{}\" height=\"{}\"{}>",
                    format_points(*width),
                    format_points(*height),
                    round
                ),
                "</Label-rectangle>",
            )
        }
        LabelShape::Round { radius } => (
            format!("<Label-round radius=\"{}\">", format_points(*radius)),
            "</Label-round>",
        ),
        LabelShape::Ellipse { width, height } => (
            format!(
                "<Label-ellipse width=\"{}\" height=\"{}\">",
                format_points(*width),
                format_points(*height)
            ),
            "</Label-ellipse>",
        ),
        LabelShape::Cd {
            radius,
            hole,
            width,
            height,
        } => {
            let mut open = format!(
                "<Label-cd radius=\"{}\" hole=\"{}\"",
                format_points(*radius),
                format_points(*hole)
            );
            if let Some(w) = width {
                open.push_str(&format!(" width=\"{}\"", format_points(*w)));
            }
            if let Some(h) = height {
                open.push_str(&format!(" height=\"{}\"", format_points(*h)));
            }
            open.push('>');
            (open, "</Label-cd>")
        }
    }
}

fn write_layout(xml: &mut String, layout: &Layout) {
    xml.push_str(&format!(
        "      <Layout nx=\"{}\" ny=\"{}\" x0=\"{}\" y0=\"{}\" dx=\"{}\" dy=\"{}\"/>\n",
        layout.nx,
        layout.ny,
        format_points(layout.x0),
        format_points(layout.y0),
        format_points(layout.dx),
        format_points(layout.dy)
    ));
}

/// Escape special characters for XML attribute values
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
