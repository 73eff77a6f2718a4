//! Definition directories and the user template store
//!
//! The user store is a directory holding one `.template` file per
//! registered template. Registration adds a new file and never rewrites
//! existing ones.

use crate::config::TEMPLATE_FILE_EXTENSION;
use crate::error::DbResult;
use crate::model::{Template, TemplateId};
use crate::xml::{read_definitions_file, write_template, Definitions};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Read every definition file in a directory, in file name order.
///
/// With `strict`, an unreadable or ill-formed file is an error; otherwise it
/// is logged and recorded in [`Definitions::skipped`].
pub fn read_definition_dir(dir: &Path, strict: bool) -> DbResult<Definitions> {
    let mut defs = Definitions::default();
    if !dir.is_dir() {
        tracing::debug!("Definition directory {} does not exist", dir.display());
        return Ok(defs);
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_definition_file(path))
        .collect();
    paths.sort();

    for path in paths {
        match read_definitions_file(&path) {
            Ok(file_defs) => defs.extend(file_defs),
            Err(e) if !strict => {
                tracing::warn!("Skipping definition file {}: {}", path.display(), e);
                defs.skipped.push(format!("{}: {}", path.display(), e));
            }
            Err(e) => return Err(e),
        }
    }

    Ok(defs)
}

fn is_definition_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == TEMPLATE_FILE_EXTENSION || e == "xml")
            .unwrap_or(false)
}

/// User-writable template directory
#[derive(Debug, Clone)]
pub struct UserStore {
    dir: PathBuf,
}

impl UserStore {
    /// Create a store rooted at the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read every template saved in the store
    pub fn load(&self) -> DbResult<Definitions> {
        read_definition_dir(&self.dir, false)
    }

    /// Save a template as a new file and return its path.
    ///
    /// Never overwrites: if the natural file name is taken, a numeric
    /// suffix is added.
    pub fn save(&self, template: &Template) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let stem = file_stem(&template.id);
        let content = write_template(template);

        for attempt in 1u32.. {
            let name = if attempt == 1 {
                format!("{}.{}", stem, TEMPLATE_FILE_EXTENSION)
            } else {
                format!("{}-{}.{}", stem, attempt, TEMPLATE_FILE_EXTENSION)
            };
            let path = self.dir.join(name);

            match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let bytes = content.as_bytes();
                    write_or_remove(&path, move || {
                        file.write_all(bytes)?;
                        file.sync_all()
                    })?;
                    tracing::info!("Saved template {} to {}", template.name(), path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(io::ErrorKind::Other, "no free template file name"))
    }
}

/// Run `write` against a freshly created file; on failure the file is removed
fn write_or_remove(path: &Path, write: impl FnOnce() -> io::Result<()>) -> io::Result<()> {
    write().map_err(|e| {
        if let Err(cleanup) = fs::remove_file(path) {
            tracing::warn!("Could not remove partial file {}: {}", path.display(), cleanup);
        }
        e
    })
}

/// File-system safe stem for a template id
fn file_stem(id: &TemplateId) -> String {
    format!("{}_{}", id.brand, id.part)
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
