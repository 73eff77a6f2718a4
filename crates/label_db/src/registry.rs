//! Template registry
//!
//! Owns the known papers, categories, and templates. Built once at startup
//! from the built-in definitions, any extra system directories, and the user
//! store; afterwards it only changes through [`Registry::register_template`].
//!
//! Lookups take `&self` and registration takes `&mut self`, so sharing a
//! registry between threads means wrapping it in a lock that gives one writer
//! or many readers.

use crate::alias::AliasIndex;
use crate::builtin::builtin_definitions;
use crate::config::DbConfig;
use crate::error::{DbError, DbResult, EntryKind, RegistrationError};
use crate::model::{is_paper_id_other, Category, Paper, Template, TemplateId, TemplateSummary, OTHER_PAPER_ID};
use crate::store::{read_definition_dir, UserStore};
use crate::units::Units;
use crate::xml::Definitions;
use std::collections::{BTreeMap, BTreeSet};

/// Slack allowed between a template's own page size and its paper
const PAGE_TOLERANCE: f64 = 0.5;

/// Criteria for template listings; every set field must match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateFilter {
    /// Paper id or paper name
    pub paper: Option<String>,
    /// Category id or category name
    pub category: Option<String>,
    /// Brand of the template or of one of its aliases
    pub brand: Option<String>,
}

impl TemplateFilter {
    /// A filter that matches everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a paper
    pub fn paper(mut self, paper: impl Into<String>) -> Self {
        self.paper = Some(paper.into());
        self
    }

    /// Restrict to a category
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Restrict to a brand
    pub fn brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }
}

/// Filter with paper and category already resolved to ids
struct ResolvedFilter<'a> {
    paper_id: Option<&'a str>,
    category_id: Option<&'a str>,
    brand: Option<&'a str>,
}

impl ResolvedFilter<'_> {
    fn matches_media(&self, template: &Template) -> bool {
        self.paper_id.map_or(true, |p| template.paper_id == p)
            && self.category_id.map_or(true, |c| template.has_category(c))
    }

    fn matches_brand(&self, id: &TemplateId) -> bool {
        self.brand.map_or(true, |b| id.brand == b)
    }

    fn matches(&self, template: &Template) -> bool {
        self.matches_media(template)
            && (self.matches_brand(&template.id) || template.aliases.iter().any(|a| self.matches_brand(a)))
    }
}

/// Which names a template name listing includes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameListing {
    /// One canonical name per template
    Unique,
    /// Canonical names and alias names
    All,
}

/// The label database
#[derive(Debug, Clone, Default)]
pub struct Registry {
    papers: Vec<Paper>,
    categories: Vec<Category>,
    templates: BTreeMap<TemplateId, Template>,
    index: AliasIndex,
    user_store: Option<UserStore>,
    units: Units,
    generation: u64,
}

impl Registry {
    /// Create an empty registry with no user store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the configured sources
    pub fn init(config: &DbConfig) -> DbResult<Self> {
        let mut defs = if config.load_builtin {
            builtin_definitions()?
        } else {
            Definitions::default()
        };

        for dir in &config.system_dirs {
            defs.extend(read_definition_dir(dir, true)?);
        }

        let user_store = config.user_dir.as_ref().map(UserStore::new);
        if let Some(store) = &user_store {
            defs.extend(store.load()?);
        }

        let mut registry = Self::from_definitions(defs);
        registry.user_store = user_store;
        registry.units = config.display_units;
        registry.generation = 0;

        tracing::info!(
            "Label database ready: {} papers, {} categories, {} templates",
            registry.papers.len(),
            registry.categories.len(),
            registry.templates.len()
        );
        Ok(registry)
    }

    /// Build a registry from the built-in definitions only
    pub fn with_builtin() -> DbResult<Self> {
        Self::init(&DbConfig::default())
    }

    /// Build a registry from already parsed definitions.
    ///
    /// Entries that are invalid or conflict with earlier ones are skipped
    /// with a warning.
    pub fn from_definitions(defs: Definitions) -> Self {
        let mut registry = Self::new();

        for reason in &defs.skipped {
            tracing::warn!("Skipped definition: {}", reason);
        }

        for paper in defs.papers {
            if let Err(reason) = registry.add_paper(paper) {
                tracing::warn!("Skipped paper: {}", reason);
            }
        }
        for category in defs.categories {
            if let Err(reason) = registry.add_category(category) {
                tracing::warn!("Skipped category: {}", reason);
            }
        }
        for template in defs.templates {
            let name = template.name();
            match registry.validate(&template) {
                Ok(()) => registry.commit(template),
                Err(e) => tracing::warn!("Skipped template {}: {}", name, e),
            }
        }

        // Loading is not a registration
        registry.generation = 0;
        registry
    }

    fn add_paper(&mut self, paper: Paper) -> Result<(), String> {
        if is_paper_id_other(&paper.id) {
            return Err(format!("paper id {} is reserved for custom paper", OTHER_PAPER_ID));
        }
        if !paper.is_valid() {
            return Err(format!("{} has a non-positive size", paper.id));
        }
        if self.is_paper_id_known(&paper.id) {
            return Err(format!("duplicate paper id {}", paper.id));
        }
        self.index.insert_paper(&paper).map_err(|e| e.to_string())?;
        self.papers.push(paper);
        Ok(())
    }

    fn add_category(&mut self, category: Category) -> Result<(), String> {
        if self.is_category_id_known(&category.id) {
            return Err(format!("duplicate category id {}", category.id));
        }
        self.index.insert_category(&category).map_err(|e| e.to_string())?;
        self.categories.push(category);
        Ok(())
    }

    /// Attach a user store; later registrations are saved to it
    pub fn set_user_store(&mut self, store: UserStore) {
        self.user_store = Some(store);
    }

    /// The user store, if persistence is enabled
    pub fn user_store(&self) -> Option<&UserStore> {
        self.user_store.as_ref()
    }

    /// Units used for summary text
    pub fn units(&self) -> Units {
        self.units
    }

    /// Change the units used for summary text
    pub fn set_units(&mut self, units: Units) {
        self.units = units;
    }

    /// Counter bumped by every successful registration
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ---- Papers ----

    /// Look up a paper by name or id
    pub fn get_paper(&self, id_or_name: &str) -> DbResult<&Paper> {
        let id = self.index.paper_id(id_or_name).unwrap_or(id_or_name);
        self.papers
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| DbError::not_found(EntryKind::Paper, id_or_name))
    }

    /// All papers in load order
    pub fn papers(&self) -> &[Paper] {
        &self.papers
    }

    /// Paper ids in load order
    pub fn paper_ids(&self) -> Vec<&str> {
        self.papers.iter().map(|p| p.id.as_str()).collect()
    }

    /// Paper names in load order
    pub fn paper_names(&self) -> Vec<&str> {
        self.papers.iter().map(|p| p.name.as_str()).collect()
    }

    /// Resolve a paper name to its id
    pub fn paper_id_from_name(&self, name: &str) -> Option<&str> {
        self.index.paper_id(name)
    }

    /// Resolve a paper id to its name
    pub fn paper_name_from_id(&self, id: &str) -> Option<&str> {
        self.papers.iter().find(|p| p.id == id).map(|p| p.name.as_str())
    }

    /// Whether a paper with this id exists
    pub fn is_paper_id_known(&self, id: &str) -> bool {
        self.papers.iter().any(|p| p.id == id)
    }

    /// Whether a paper id names custom stock, whose templates carry their
    /// own page size
    pub fn is_paper_id_other(&self, id: &str) -> bool {
        is_paper_id_other(id)
    }

    // ---- Categories ----

    /// Look up a category by name or id
    pub fn get_category(&self, id_or_name: &str) -> DbResult<&Category> {
        let id = self.index.category_id(id_or_name).unwrap_or(id_or_name);
        self.categories
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| DbError::not_found(EntryKind::Category, id_or_name))
    }

    /// All categories in load order
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Category ids in load order
    pub fn category_ids(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.id.as_str()).collect()
    }

    /// Category names in load order
    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    /// Resolve a category name to its id
    pub fn category_id_from_name(&self, name: &str) -> Option<&str> {
        self.index.category_id(name)
    }

    /// Resolve a category id to its name
    pub fn category_name_from_id(&self, id: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
    }

    /// Whether a category with this id exists
    pub fn is_category_id_known(&self, id: &str) -> bool {
        self.categories.iter().any(|c| c.id == id)
    }

    // ---- Templates ----

    /// Look up a template by name or alias name, then by canonical key
    /// (`"brand:part"`)
    pub fn get_template(&self, name: &str) -> DbResult<&Template> {
        let found = match self.index.template_id(name) {
            Some(id) => self.templates.get(id),
            None => self.templates.values().find(|t| t.key() == name),
        };
        found.ok_or_else(|| DbError::not_found(EntryKind::Template, name))
    }

    /// Number of registered templates
    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    /// All templates, ordered by brand then part
    pub fn templates(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    /// Summaries of the templates matching a filter, ordered by display name
    pub fn list_templates(&self, filter: &TemplateFilter) -> impl Iterator<Item = TemplateSummary> + '_ {
        let mut matches = self.matching(filter);
        matches.sort_by_cached_key(|t| t.name());
        matches.into_iter().map(move |t| self.summarize(t))
    }

    /// Summary of one template in the registry's display units
    pub fn summarize(&self, template: &Template) -> TemplateSummary {
        let paper_name = self
            .paper_name_from_id(&template.paper_id)
            .unwrap_or(&template.paper_id);
        TemplateSummary::new(template, paper_name, self.units)
    }

    /// Sorted template names matching a filter
    pub fn template_names(&self, filter: &TemplateFilter, listing: NameListing) -> Vec<String> {
        let resolved = self.resolve(filter);
        let mut names: Vec<String> = Vec::new();

        for template in self.matching(filter) {
            match listing {
                NameListing::Unique => names.push(template.name()),
                NameListing::All => names.extend(
                    std::iter::once(&template.id)
                        .chain(template.aliases.iter())
                        .filter(|id| resolved.matches_brand(id))
                        .map(TemplateId::name),
                ),
            }
        }

        names.sort();
        names.dedup();
        names
    }

    /// Sorted unique brands, including alias brands, of templates on the
    /// given paper and in the given category
    pub fn brands(&self, paper: Option<&str>, category: Option<&str>) -> Vec<String> {
        let filter = TemplateFilter {
            paper: paper.map(str::to_string),
            category: category.map(str::to_string),
            brand: None,
        };
        let brands: BTreeSet<&str> = self
            .matching(&filter)
            .into_iter()
            .flat_map(|t| std::iter::once(&t.id).chain(t.aliases.iter()))
            .map(|id| id.brand.as_str())
            .collect();
        brands.into_iter().map(str::to_string).collect()
    }

    /// Whether a brand/part pair is taken, as a template or as an alias
    pub fn template_exists(&self, brand: &str, part: &str) -> bool {
        let id = TemplateId::new(brand, part);
        self.templates.contains_key(&id) || self.templates.values().any(|t| t.aliases.contains(&id))
    }

    /// Whether a template name or alias name is known
    pub fn template_name_exists(&self, name: &str) -> bool {
        self.index.template_id(name).is_some()
    }

    /// Validate and add a user-defined template.
    ///
    /// Validation failures leave the registry untouched. A failure to save
    /// to the user store is reported as
    /// [`RegistrationError::FileWriteError`], but the template stays
    /// registered for the rest of the session.
    pub fn register_template(&mut self, template: Template) -> Result<(), RegistrationError> {
        self.validate(&template)?;

        let id = template.id.clone();
        let name = template.name();
        self.commit(template);
        tracing::info!("Registered template {}", name);

        let (Some(store), Some(template)) = (self.user_store.as_ref(), self.templates.get(&id)) else {
            return Ok(());
        };
        match store.save(template) {
            Ok(_) => Ok(()),
            Err(source) => {
                tracing::warn!("Template {} registered but not saved: {}", name, source);
                Err(RegistrationError::FileWriteError { name, source })
            }
        }
    }

    fn validate(&self, template: &Template) -> Result<(), RegistrationError> {
        let paper = if is_paper_id_other(&template.paper_id) {
            None
        } else {
            let paper = self
                .papers
                .iter()
                .find(|p| p.id == template.paper_id)
                .ok_or_else(|| RegistrationError::BadPaperId(template.paper_id.clone()))?;
            Some(paper)
        };

        if self.template_exists(&template.id.brand, &template.id.part) {
            return Err(RegistrationError::BrandPartExists(template.name()));
        }

        let (page_width, page_height) = page_size(template, paper).map_err(RegistrationError::InvalidGeometry)?;
        template
            .check_geometry(page_width, page_height)
            .map_err(RegistrationError::InvalidGeometry)?;

        if let Err(DbError::DuplicateAlias { name, existing, .. }) = self.index.check_template(template) {
            return Err(RegistrationError::DuplicateAlias { name, existing });
        }

        for category in &template.categories {
            if !self.is_category_id_known(category) {
                tracing::debug!("Template {} uses unknown category {}", template.name(), category);
            }
        }
        Ok(())
    }

    fn commit(&mut self, template: Template) {
        if let Err(e) = self.index.insert_template(&template) {
            // validate() ran check_template against this same index
            tracing::warn!("Alias index refused {}: {}", template.name(), e);
            return;
        }
        self.templates.insert(template.id.clone(), template);
        self.generation += 1;
    }

    fn resolve<'a>(&'a self, filter: &'a TemplateFilter) -> ResolvedFilter<'a> {
        ResolvedFilter {
            paper_id: filter
                .paper
                .as_deref()
                .map(|p| self.index.paper_id(p).unwrap_or(p)),
            category_id: filter
                .category
                .as_deref()
                .map(|c| self.index.category_id(c).unwrap_or(c)),
            brand: filter.brand.as_deref(),
        }
    }

    fn matching(&self, filter: &TemplateFilter) -> Vec<&Template> {
        let resolved = self.resolve(filter);
        self.templates.values().filter(|t| resolved.matches(t)).collect()
    }

    // ---- Debugging ----

    /// Log every known paper at debug level
    pub fn dump_papers(&self) {
        for paper in &self.papers {
            tracing::debug!(
                "paper id={} name={} width={}pt height={}pt",
                paper.id,
                paper.name,
                paper.width,
                paper.height
            );
        }
    }

    /// Log every known category at debug level
    pub fn dump_categories(&self) {
        for category in &self.categories {
            tracing::debug!("category id={} name={}", category.id, category.name);
        }
    }

    /// Log every known template at debug level
    pub fn dump_templates(&self) {
        for template in self.templates.values() {
            tracing::debug!(
                "template brand={} part={} description={:?} paper={} labels={}",
                template.id.brand,
                template.id.part,
                template.description,
                template.paper_id,
                template.label_count()
            );
        }
    }

    /// Log the names that resolve to a template at debug level
    pub fn dump_aliases(&self, template: &Template) {
        for name in self.index.template_names_for(&template.id) {
            tracing::debug!("alias {} -> {}", name, template.key());
        }
    }
}

/// Page a template is laid out on: its paper, or its own size on custom paper
fn page_size(template: &Template, paper: Option<&Paper>) -> Result<(f64, f64), String> {
    match (paper, template.page_size) {
        (None, Some(size)) => Ok(size),
        (None, None) => Err(format!("{} is on custom paper but has no page size", template.name())),
        (Some(paper), None) => Ok((paper.width, paper.height)),
        (Some(paper), Some((width, height))) => {
            let matches = |own: f64, paper: f64| (own - paper).abs() <= PAGE_TOLERANCE;
            if !matches(width, paper.width) || !matches(height, paper.height) {
                Err(format!(
                    "{} page size {} x {} does not match paper {}",
                    template.name(),
                    width,
                    height,
                    paper.id
                ))
            } else {
                Ok((paper.width, paper.height))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LabelShape, Layout};

    fn registry() -> Registry {
        Registry::with_builtin().unwrap()
    }

    fn custom(brand: &str, part: &str, paper: &str) -> Template {
        Template::new(brand, part, paper)
            .with_description("Custom")
            .with_layout(Layout::new(LabelShape::rectangle(144.0, 72.0), 2, 3, 36.0, 36.0, 180.0, 90.0))
            .with_category("label")
    }

    #[test]
    fn test_builtin_load() {
        let reg = registry();
        assert!(reg.template_count() >= 10);
        assert_eq!(reg.paper_ids()[0], "US-Letter");
        assert!(reg.category_ids().contains(&"mail"));
        assert_eq!(reg.generation(), 0);
    }

    #[test]
    fn test_paper_lookup_by_id_and_name() {
        let reg = registry();
        assert_eq!(reg.get_paper("US-Letter").unwrap().width, 612.0);
        assert_eq!(reg.get_paper("US Letter").unwrap().id, "US-Letter");
        assert!(matches!(
            reg.get_paper("Tabloid"),
            Err(DbError::NotFound { kind: EntryKind::Paper, .. })
        ));
        assert_eq!(reg.paper_id_from_name("US Legal"), Some("US-Legal"));
        assert_eq!(reg.paper_name_from_id("A4"), Some("A4"));
    }

    #[test]
    fn test_category_lookup() {
        let reg = registry();
        assert_eq!(reg.get_category("Mailing labels").unwrap().id, "mail");
        assert_eq!(reg.get_category("mail").unwrap().name, "Mailing labels");
        assert!(reg.get_category("nope").is_err());
        assert!(reg.is_category_id_known("media"));
    }

    #[test]
    fn test_template_lookup_by_alias_and_key() {
        let reg = registry();
        let by_name = reg.get_template("Avery 5160").unwrap();
        let by_alias = reg.get_template("Avery 8160").unwrap();
        let by_key = reg.get_template("Avery:5160").unwrap();
        assert_eq!(by_name.id, by_alias.id);
        assert_eq!(by_name.id, by_key.id);
        assert!(matches!(
            reg.get_template("Avery 0000"),
            Err(DbError::NotFound { kind: EntryKind::Template, .. })
        ));
    }

    #[test]
    fn test_list_filters_and_order() {
        let reg = registry();
        let a4: Vec<_> = reg.list_templates(&TemplateFilter::new().paper("A4")).collect();
        assert!(!a4.is_empty());
        assert!(a4.iter().all(|s| s.paper_id == "A4"));

        let names: Vec<_> = a4.iter().map(|s| s.name.clone()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        // Paper given by name resolves the same way
        let by_id = reg.list_templates(&TemplateFilter::new().paper("US-Letter")).count();
        let by_name = reg.list_templates(&TemplateFilter::new().paper("US Letter")).count();
        assert_eq!(by_id, by_name);
        assert!(by_id > 0);

        let round: Vec<_> = reg
            .list_templates(&TemplateFilter::new().category("round-label"))
            .collect();
        assert_eq!(round.len(), 1);
        assert_eq!(round[0].name, "Avery 5294");
    }

    #[test]
    fn test_filters_combine() {
        let reg = registry();
        let filter = TemplateFilter::new()
            .paper("US Letter")
            .category("mail")
            .brand("Avery");
        let all: Vec<_> = reg.list_templates(&filter).collect();
        assert_eq!(all.len(), 4);

        let none: Vec<_> = reg
            .list_templates(&TemplateFilter::new().paper("A4").brand("Nobody"))
            .collect();
        assert!(none.is_empty());
    }

    #[test]
    fn test_template_names_unique_vs_all() {
        let reg = registry();
        let filter = TemplateFilter::new().paper("US-Letter").category("business-card");
        assert_eq!(reg.template_names(&filter, NameListing::Unique), vec!["Avery 8371"]);
        assert_eq!(
            reg.template_names(&filter, NameListing::All),
            vec!["Avery 5371", "Avery 5911", "Avery 8371"]
        );
    }

    #[test]
    fn test_brands() {
        let reg = registry();
        assert_eq!(reg.brands(Some("A4"), None), vec!["Avery", "Zweckform"]);
        assert_eq!(reg.brands(Some("US-Letter"), Some("media")), vec!["Avery"]);
        assert!(reg.brands(Some("A3"), None).is_empty());
    }

    #[test]
    fn test_register_bad_paper() {
        let mut reg = registry();
        let before = reg.template_count();
        let err = reg.register_template(custom("Acme", "1", "Tabloid")).unwrap_err();
        assert!(matches!(err, RegistrationError::BadPaperId(ref id) if id == "Tabloid"));
        assert!(err.is_rejected());
        assert_eq!(reg.template_count(), before);
        assert!(!reg.template_name_exists("Acme 1"));
        assert_eq!(reg.generation(), 0);
    }

    #[test]
    fn test_register_existing_brand_part() {
        let mut reg = registry();
        reg.register_template(custom("Acme", "1", "US-Letter")).unwrap();
        let err = reg.register_template(custom("Acme", "1", "A4")).unwrap_err();
        assert!(matches!(err, RegistrationError::BrandPartExists(_)));
        assert_eq!(reg.get_template("Acme 1").unwrap().paper_id, "US-Letter");

        // An alias brand/part is taken too
        let err = reg.register_template(custom("Avery", "8160", "US-Letter")).unwrap_err();
        assert!(matches!(err, RegistrationError::BrandPartExists(_)));
    }

    #[test]
    fn test_register_alias_clash() {
        let mut reg = registry();
        let clash = custom("Acme", "2", "US-Letter").with_alias("Avery", "5160");
        let err = reg.register_template(clash).unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateAlias { .. }));
        assert!(!reg.template_name_exists("Acme 2"));
    }

    #[test]
    fn test_register_geometry_checked() {
        let mut reg = registry();
        let too_wide = Template::new("Acme", "3", "A6")
            .with_layout(Layout::new(LabelShape::rectangle(200.0, 100.0), 2, 1, 0.0, 0.0, 200.0, 0.0));
        assert!(matches!(
            reg.register_template(too_wide),
            Err(RegistrationError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_register_without_store_is_memory_only() {
        let mut reg = registry();
        reg.register_template(custom("Acme", "4", "US-Letter").with_alias("Acme", "4b"))
            .unwrap();
        assert_eq!(reg.generation(), 1);
        assert_eq!(reg.get_template("Acme 4b").unwrap().id.part, "4");
        assert!(reg.template_exists("Acme", "4b"));
    }

    #[test]
    fn test_brand_and_part_may_contain_separator() {
        let mut reg = registry();
        reg.register_template(custom("A:B", "C", "US-Letter")).unwrap();
        reg.register_template(custom("A", "B:C", "US-Letter")).unwrap();

        assert_eq!(reg.get_template("A:B C").unwrap().id, TemplateId::new("A:B", "C"));
        assert_eq!(reg.get_template("A B:C").unwrap().id, TemplateId::new("A", "B:C"));
        assert!(reg.template_exists("A:B", "C"));
        assert!(reg.template_exists("A", "B:C"));
        assert_eq!(reg.generation(), 2);
    }

    #[test]
    fn test_register_on_custom_paper() {
        let mut reg = registry();
        assert!(reg.is_paper_id_other(OTHER_PAPER_ID));
        assert!(!reg.is_paper_id_other("A4"));

        // Fits a 4 x 6 in card but not the nominal layout of `custom`
        let postcard = Template::new("Acme", "Card", OTHER_PAPER_ID)
            .with_page_size(288.0, 432.0)
            .with_layout(Layout::new(LabelShape::rectangle(216.0, 360.0), 1, 1, 36.0, 36.0, 0.0, 0.0));
        reg.register_template(postcard).unwrap();
        assert_eq!(reg.get_template("Acme Card").unwrap().page_size, Some((288.0, 432.0)));

        let listed: Vec<_> = reg
            .list_templates(&TemplateFilter::new().paper(OTHER_PAPER_ID))
            .collect();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].paper_name, OTHER_PAPER_ID);

        let no_size = custom("Acme", "NoSize", OTHER_PAPER_ID);
        assert!(matches!(
            reg.register_template(no_size),
            Err(RegistrationError::InvalidGeometry(_))
        ));

        let too_small = custom("Acme", "Small", OTHER_PAPER_ID).with_page_size(100.0, 100.0);
        assert!(matches!(
            reg.register_template(too_small),
            Err(RegistrationError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_page_size_must_match_known_paper() {
        let mut reg = registry();
        let same = custom("Acme", "Same", "US-Letter").with_page_size(612.0, 792.0);
        reg.register_template(same).unwrap();

        let other = custom("Acme", "Mismatch", "US-Letter").with_page_size(595.0, 842.0);
        assert!(matches!(
            reg.register_template(other),
            Err(RegistrationError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_other_is_not_a_definable_paper() {
        let mut defs = builtin_definitions().unwrap();
        defs.papers.push(Paper::new(OTHER_PAPER_ID, "Custom", 100.0, 100.0));
        let reg = Registry::from_definitions(defs);
        assert!(!reg.is_paper_id_known(OTHER_PAPER_ID));
    }

    #[test]
    fn test_from_definitions_starts_at_generation_zero() {
        let reg = Registry::from_definitions(builtin_definitions().unwrap());
        assert!(reg.template_count() > 0);
        assert_eq!(reg.generation(), 0);
    }

    #[test]
    fn test_non_finite_geometry_rejected() {
        let mut reg = registry();
        let nan = Template::new("Acme", "NaN", "US-Letter").with_layout(Layout::new(
            LabelShape::rectangle(72.0, 72.0),
            2,
            2,
            f64::NAN,
            0.0,
            f64::NAN,
            80.0,
        ));
        assert!(matches!(
            reg.register_template(nan),
            Err(RegistrationError::InvalidGeometry(_))
        ));

        let leftward = Template::new("Acme", "Left", "US-Letter").with_layout(Layout::new(
            LabelShape::rectangle(72.0, 72.0),
            3,
            1,
            10.0,
            10.0,
            -100.0,
            0.0,
        ));
        assert!(matches!(
            reg.register_template(leftward),
            Err(RegistrationError::InvalidGeometry(_))
        ));
        assert_eq!(reg.generation(), 0);
    }

    #[test]
    fn test_conflicting_definitions_skipped() {
        let mut defs = builtin_definitions().unwrap();
        defs.papers.push(Paper::new("A4", "Duplicate A4", 1.0, 1.0));
        defs.papers.push(Paper::new("Letter-2", "US Letter", 612.0, 792.0));
        defs.templates.push(custom("Ghost", "1", "Nowhere"));

        let reg = Registry::from_definitions(defs);
        assert_eq!(reg.get_paper("A4").unwrap().name, "A4");
        assert!(!reg.is_paper_id_known("Letter-2"));
        assert!(!reg.template_name_exists("Ghost 1"));
    }

    #[test]
    fn test_summary_uses_registry_units() {
        let mut reg = registry();
        reg.set_units(Units::Inch);
        let summary = reg
            .list_templates(&TemplateFilter::new().brand("Avery"))
            .find(|s| s.name == "Avery 5160")
            .unwrap();
        assert_eq!(summary.paper_name, "US Letter");
        assert_eq!(summary.size_text, "2 5/8 x 1 in");
        assert_eq!(summary.layout_text, "3 x 10  (30 per sheet)");
    }
}
