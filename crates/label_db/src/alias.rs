//! Name to canonical id resolution
//!
//! Papers, categories, and templates each get their own namespace. Lookups
//! are exact and case-sensitive. A name may only ever point at one canonical
//! id; a second claimant is refused with [`DbError::DuplicateAlias`].

use crate::error::{DbError, DbResult};
use crate::model::{Category, Paper, Template, TemplateId};
use std::collections::HashMap;

/// Bidirectional name/id lookup for the registry's entries
#[derive(Debug, Clone, Default)]
pub struct AliasIndex {
    papers: HashMap<String, String>,
    categories: HashMap<String, String>,
    templates: HashMap<String, TemplateId>,
}

impl AliasIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index over a complete set of entries
    pub fn build<'a>(
        papers: impl IntoIterator<Item = &'a Paper>,
        categories: impl IntoIterator<Item = &'a Category>,
        templates: impl IntoIterator<Item = &'a Template>,
    ) -> DbResult<Self> {
        let mut index = Self::new();
        for paper in papers {
            index.insert_paper(paper)?;
        }
        for category in categories {
            index.insert_category(category)?;
        }
        for template in templates {
            index.insert_template(template)?;
        }
        Ok(index)
    }

    /// Index a paper by its display name
    pub fn insert_paper(&mut self, paper: &Paper) -> DbResult<()> {
        claim(&mut self.papers, &paper.name, &paper.id)
    }

    /// Index a category by its display name
    pub fn insert_category(&mut self, category: &Category) -> DbResult<()> {
        claim(&mut self.categories, &category.name, &category.id)
    }

    /// Check that none of a template's names are taken by another template
    pub fn check_template(&self, template: &Template) -> DbResult<()> {
        for name in template.all_names() {
            if let Some(existing) = self.templates.get(&name) {
                if *existing != template.id {
                    return Err(DbError::DuplicateAlias {
                        name,
                        existing: existing.key(),
                        claimed: template.key(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Index a template by its name and every alias name.
    ///
    /// Either all names are added or none are.
    pub fn insert_template(&mut self, template: &Template) -> DbResult<()> {
        self.check_template(template)?;
        for name in template.all_names() {
            self.templates.insert(name, template.id.clone());
        }
        Ok(())
    }

    /// Resolve a paper name to its id
    pub fn paper_id(&self, name: &str) -> Option<&str> {
        self.papers.get(name).map(String::as_str)
    }

    /// Resolve a category name to its id
    pub fn category_id(&self, name: &str) -> Option<&str> {
        self.categories.get(name).map(String::as_str)
    }

    /// Resolve a template name or alias name to its brand and part
    pub fn template_id(&self, name: &str) -> Option<&TemplateId> {
        self.templates.get(name)
    }

    /// Every name that resolves to the given template, sorted
    pub fn template_names_for(&self, id: &TemplateId) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .templates
            .iter()
            .filter(|(_, target)| *target == id)
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Number of template names (canonical and alias) indexed
    pub fn template_name_count(&self) -> usize {
        self.templates.len()
    }
}

fn claim(map: &mut HashMap<String, String>, name: &str, id: &str) -> DbResult<()> {
    match map.get(name) {
        Some(existing) if existing != id => Err(DbError::DuplicateAlias {
            name: name.to_string(),
            existing: existing.clone(),
            claimed: id.to_string(),
        }),
        Some(_) => Ok(()),
        None => {
            map.insert(name.to_string(), id.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LabelShape, Layout};
    use proptest::prelude::*;

    const NO_CATEGORIES: &[Category] = &[];
    const NO_TEMPLATES: &[Template] = &[];

    fn template(brand: &str, part: &str) -> Template {
        Template::new(brand, part, "US-Letter")
            .with_layout(Layout::new(LabelShape::rectangle(72.0, 72.0), 1, 1, 0.0, 0.0, 0.0, 0.0))
    }

    #[test]
    fn test_paper_lookup_is_exact() {
        let papers = vec![Paper::new("US-Letter", "US Letter", 612.0, 792.0)];
        let index = AliasIndex::build(&papers, NO_CATEGORIES, NO_TEMPLATES).unwrap();

        assert_eq!(index.paper_id("US Letter"), Some("US-Letter"));
        assert_eq!(index.paper_id("us letter"), None);
        assert_eq!(index.paper_id("US-Letter"), None);
    }

    #[test]
    fn test_duplicate_paper_name_rejected() {
        let papers = vec![
            Paper::new("A4", "A4", 595.0, 842.0),
            Paper::new("A4-alt", "A4", 595.0, 842.0),
        ];
        let result = AliasIndex::build(&papers, NO_CATEGORIES, NO_TEMPLATES);
        assert!(matches!(result, Err(DbError::DuplicateAlias { .. })));
    }

    #[test]
    fn test_template_aliases_resolve_to_one_key() {
        let t = template("Avery", "5160").with_alias("Avery", "8160");
        let mut index = AliasIndex::new();
        index.insert_template(&t).unwrap();

        assert_eq!(index.template_id("Avery 5160"), Some(&t.id));
        assert_eq!(index.template_id("Avery 8160"), Some(&t.id));
        assert_eq!(index.template_names_for(&t.id), vec!["Avery 5160", "Avery 8160"]);
    }

    #[test]
    fn test_conflicting_template_leaves_index_untouched() {
        let mut index = AliasIndex::new();
        index.insert_template(&template("Avery", "5160")).unwrap();

        // New name first, conflicting alias second
        let clash = template("Acme", "1").with_alias("Avery", "5160");
        let err = index.insert_template(&clash).unwrap_err();

        match err {
            DbError::DuplicateAlias { name, existing, claimed } => {
                assert_eq!(name, "Avery 5160");
                assert_eq!(existing, "Avery:5160");
                assert_eq!(claimed, "Acme:1");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(index.template_id("Acme 1"), None);
        assert_eq!(index.template_name_count(), 1);
    }

    #[test]
    fn test_derived_name_collision() {
        // "A B" + "C" and "A" + "B C" both display as "A B C"
        let mut index = AliasIndex::new();
        index.insert_template(&template("A B", "C")).unwrap();
        assert!(index.insert_template(&template("A", "B C")).is_err());
    }

    #[test]
    fn test_separator_in_brand_or_part() {
        // Both pairs flatten to the key "A:B:C" but are distinct templates
        let mut index = AliasIndex::new();
        let first = template("A:B", "C");
        let second = template("A", "B:C");
        index.insert_template(&first).unwrap();
        index.insert_template(&second).unwrap();

        assert_eq!(index.template_id("A:B C"), Some(&first.id));
        assert_eq!(index.template_id("A B:C"), Some(&second.id));
    }

    proptest! {
        #[test]
        fn every_alias_resolves_to_its_template(
            parts in proptest::collection::btree_set("[0-9]{3,5}", 1..8)
        ) {
            let parts: Vec<String> = parts.into_iter().collect();
            let mut t = template("Brand", &parts[0]);
            for alias in &parts[1..] {
                t = t.with_alias("Other", alias.clone());
            }

            let mut index = AliasIndex::new();
            index.insert_template(&t).unwrap();

            for name in t.all_names() {
                prop_assert_eq!(index.template_id(&name), Some(&t.id));
            }
        }
    }
}
