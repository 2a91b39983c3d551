//! Bridge configuration.
//!
//! Contexts are configured from a [`BridgeConfig`]. Explicit contexts take one
//! as an argument; per-class contexts use the process-wide default, which
//! starts from [`BridgeConfig::default`] plus the `MOONLIT_PATH` environment
//! variable and can be replaced or extended at runtime.

use core_types::{BridgeError, BridgeResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding extra `;`-separated search paths.
pub const SEARCH_PATH_ENV: &str = "MOONLIT_PATH";

/// Default stack limit, matching the interpreter's own `LUAI_MAXSTACK`.
pub const DEFAULT_MAX_STACK_DEPTH: usize = 1_000_000;

/// Module that compiles extended-syntax chunks.
pub const DEFAULT_EXTENDED_COMPILER: &str = "metalua.compiler";

static DEFAULT_CONFIG: RwLock<Option<BridgeConfig>> = parking_lot::const_rwlock(None);

/// Settings for an execution context.
///
/// # Examples
///
/// ```
/// use bridge::BridgeConfig;
///
/// let config = BridgeConfig::from_json_str(r#"{ "search_paths": ["scripts"] }"#).unwrap();
/// assert_eq!(config.search_paths.len(), 1);
/// assert_eq!(config.max_stack_depth, bridge::DEFAULT_MAX_STACK_DEPTH);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Extra script search paths; entries may contain a `?` placeholder
    pub search_paths: Vec<PathBuf>,
    /// Hard limit on the bridge stack depth
    pub max_stack_depth: usize,
    /// Module exposing `loadstring` for the extended syntax
    pub extended_compiler: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
            extended_compiler: DEFAULT_EXTENDED_COMPILER.to_string(),
        }
    }
}

impl BridgeConfig {
    /// Parses a JSON configuration document. Missing fields keep their defaults.
    pub fn from_json_str(text: &str) -> BridgeResult<Self> {
        serde_json::from_str(text).map_err(|e| BridgeError::Config(e.to_string()))
    }

    /// Reads a JSON configuration file.
    pub fn from_file(path: &Path) -> BridgeResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| BridgeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Appends the search paths listed in `MOONLIT_PATH`, if set.
    pub fn with_env(mut self) -> Self {
        if let Ok(value) = std::env::var(SEARCH_PATH_ENV) {
            self.search_paths.extend(split_search_paths(&value));
        }
        self
    }

    /// Appends one search path.
    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// The process-wide default used for contexts created without a config.
    pub fn current() -> Self {
        DEFAULT_CONFIG
            .read()
            .clone()
            .unwrap_or_else(|| BridgeConfig::default().with_env())
    }
}

/// Replaces the process-wide default configuration.
///
/// Contexts that already exist keep the configuration they were built with.
pub fn set_default_config(config: BridgeConfig) {
    log::debug!("default bridge config replaced: {:?}", config);
    *DEFAULT_CONFIG.write() = Some(config);
}

/// Registers an additional search path in the process-wide default.
pub fn add_search_path(path: impl Into<PathBuf>) {
    let path = path.into();
    log::debug!("search path registered: {}", path.display());
    DEFAULT_CONFIG
        .write()
        .get_or_insert_with(|| BridgeConfig::default().with_env())
        .search_paths
        .push(path);
}

fn split_search_paths(value: &str) -> impl Iterator<Item = PathBuf> + '_ {
    value
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(PathBuf::from)
}
