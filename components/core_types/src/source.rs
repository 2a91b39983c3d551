//! Script dialects and script origins.

use std::path::{Path, PathBuf};

/// File extension of base-syntax scripts.
pub const BASE_EXTENSION: &str = "lua";

/// File extension of extended-syntax scripts.
pub const EXTENDED_EXTENSION: &str = "mlua";

/// The two dialects a context can compile.
///
/// Both dialects share one execution context; the extended dialect is a
/// superset of the base language compiled by an interpreter-side compiler
/// module.
///
/// # Examples
///
/// ```
/// use core_types::Syntax;
/// use std::path::Path;
///
/// assert_eq!(Syntax::from_path(Path::new("Shape.mlua")), Some(Syntax::Extended));
/// assert_eq!(Syntax::from_path(Path::new("Shape.lua")), Some(Syntax::Base));
/// assert_eq!(Syntax::from_path(Path::new("Shape.txt")), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Syntax {
    /// Plain Lua
    #[default]
    Base,
    /// Extended dialect
    Extended,
}

impl Syntax {
    /// Extension used for files of this dialect.
    pub fn extension(self) -> &'static str {
        match self {
            Syntax::Base => BASE_EXTENSION,
            Syntax::Extended => EXTENDED_EXTENSION,
        }
    }

    /// Dialect implied by a file extension.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            BASE_EXTENSION => Some(Syntax::Base),
            EXTENDED_EXTENSION => Some(Syntax::Extended),
            _ => None,
        }
    }

    /// Dialect implied by a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Lookup order for class implementation files.
    pub fn search_order() -> [Syntax; 2] {
        [Syntax::Extended, Syntax::Base]
    }
}

/// Where a script comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    /// Source text held in memory
    Text {
        /// The script itself
        source: String,
        /// Dialect of `source`
        syntax: Syntax,
        /// Name reported in compiler and runtime messages
        chunk_name: String,
    },
    /// A script file; the dialect follows its extension
    File(PathBuf),
}

impl ScriptSource {
    /// Base-syntax source text with a generic chunk name.
    pub fn text(source: impl Into<String>) -> Self {
        ScriptSource::Text {
            source: source.into(),
            syntax: Syntax::Base,
            chunk_name: "=(text)".to_string(),
        }
    }

    /// Source text in the given dialect with an explicit chunk name.
    pub fn named(source: impl Into<String>, syntax: Syntax, chunk_name: impl Into<String>) -> Self {
        ScriptSource::Text {
            source: source.into(),
            syntax,
            chunk_name: chunk_name.into(),
        }
    }

    /// A script file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        ScriptSource::File(path.into())
    }
}
