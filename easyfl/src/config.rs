use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    library::DEFAULT_MAX_CALL_DEPTH,
};

/// How to build a [`Library`](crate::Library).
///
/// ```toml
/// max_call_depth = 256
/// include_base = true
/// extensions = ["locks.easyfl", "timelocks.easyfl"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LibraryConfig {
    pub max_call_depth: usize,
    /// Register the bundled base definitions after the native primitives.
    pub include_base: bool,
    /// Definition sources compiled into the library in order.
    pub extensions: Vec<PathBuf>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            include_base: true,
            extensions: Vec::new(),
        }
    }
}

impl LibraryConfig {
    pub fn from_toml_str(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load a configuration file. Relative extension paths are taken from the file's directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            file: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text).map_err(|source| Error::Config {
            file: path.display().to_string(),
            source,
        })?;

        if let Some(base) = path.parent() {
            for extension in &mut config.extensions {
                if extension.is_relative() {
                    *extension = base.join(&*extension);
                }
            }
        }
        Ok(config)
    }
}
