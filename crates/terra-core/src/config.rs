//! Front end configuration, optionally loaded from `terra.toml`.
//!
//! ```toml
//! [frontend]
//! error_limit = 50
//! intern_buckets = 1024
//! scope_buckets = 32
//! arena_page_size = 1024
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FrontendError, FrontendResult};

/// Name of the configuration file looked up by [`FrontendConfig::from_dir`].
pub const CONFIG_FILE_NAME: &str = "terra.toml";

/// Capacities and limits for one compilation.
///
/// Every capacity is fixed for the lifetime of the compilation; the tables
/// never rehash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrontendConfig {
    /// Maximum number of Error diagnostics stored (all are still counted).
    pub error_limit: Option<usize>,
    /// Bucket count of the string interner.
    pub intern_buckets: usize,
    /// Bucket count of every scope.
    pub scope_buckets: usize,
    /// Node records per arena page.
    pub arena_page_size: usize,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            error_limit: None,
            intern_buckets: crate::intern::DEFAULT_BUCKETS,
            scope_buckets: crate::scope::DEFAULT_BUCKETS,
            arena_page_size: crate::arena::DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    frontend: FrontendConfig,
}

impl FrontendConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(content: &str, path: &Path) -> FrontendResult<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|source| {
            FrontendError::ConfigParse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        file.frontend.validate()?;
        Ok(file.frontend)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> FrontendResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|source| FrontendError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml_str(&content, path)
    }

    /// Load `terra.toml` from `dir`, falling back to defaults when absent.
    pub fn from_dir(dir: &Path) -> FrontendResult<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        tracing::debug!(path = %path.display(), "loading configuration");
        Self::load(&path)
    }

    fn validate(&self) -> FrontendResult<()> {
        let capacities = [
            ("intern_buckets", self.intern_buckets),
            ("scope_buckets", self.scope_buckets),
            ("arena_page_size", self.arena_page_size),
        ];
        for (key, value) in capacities {
            if value == 0 {
                return Err(FrontendError::InvalidConfig(format!(
                    "`{key}` must be greater than zero"
                )));
            }
        }
        Ok(())
    }
}
