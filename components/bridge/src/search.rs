//! Script resolution.
//!
//! Each search path entry is either a template containing `?` (replaced by
//! the script name, as in the interpreter's `package.path`) or a directory
//! in which `<name>.<ext>` is looked up. The extended-syntax extension is
//! tried before the base one.

use core_types::Syntax;
use log::trace;
use mlua::{Lua, Table};
use std::path::{Path, PathBuf};

/// Resolves a script name to a file.
pub trait ScriptLocator {
    /// Path of the script called `name`, if one exists.
    fn locate(&self, name: &str) -> Option<PathBuf>;
}

/// Locator over an ordered list of search path entries.
///
/// # Example
///
/// ```
/// use bridge::{ScriptLocator, SearchPathLocator};
///
/// let dir = tempfile::tempdir().unwrap();
/// std::fs::write(dir.path().join("Shape.lua"), "return {}").unwrap();
/// std::fs::write(dir.path().join("Shape.mlua"), "return {}").unwrap();
///
/// let locator = SearchPathLocator::new([dir.path().to_string_lossy().into_owned()]);
/// assert_eq!(locator.locate("Shape"), Some(dir.path().join("Shape.mlua")));
/// assert_eq!(locator.locate("Circle"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SearchPathLocator {
    entries: Vec<String>,
}

impl SearchPathLocator {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// Candidate files for `name` with the given syntax, in search order.
    pub fn candidates(&self, name: &str, syntax: Syntax) -> Vec<PathBuf> {
        self.entries
            .iter()
            .filter(|entry| !entry.is_empty())
            .map(|entry| candidate(entry, name, syntax))
            .collect()
    }
}

fn candidate(entry: &str, name: &str, syntax: Syntax) -> PathBuf {
    if entry.contains('?') {
        let path = PathBuf::from(entry.replace('?', name));
        match path.extension() {
            Some(_) => path.with_extension(syntax.extension()),
            None => path,
        }
    } else {
        Path::new(entry).join(format!("{}.{}", name, syntax.extension()))
    }
}

impl ScriptLocator for SearchPathLocator {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        Syntax::search_order().into_iter().find_map(|syntax| {
            self.candidates(name, syntax).into_iter().find(|path| {
                trace!("trying {}", path.display());
                path.is_file()
            })
        })
    }
}

/// Templates from the interpreter's `package.path`.
pub(crate) fn package_path_templates(lua: &Lua) -> Vec<String> {
    let path = lua
        .globals()
        .get::<Table>("package")
        .and_then(|package| package.get::<String>("path"));
    match path {
        Ok(path) => path.split(';').map(str::to_string).collect(),
        Err(_) => Vec::new(),
    }
}
