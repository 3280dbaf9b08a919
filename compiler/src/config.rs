//! Lowering configuration from the `[lowering]` section of `tessera.toml`.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// `[lowering]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoweringConfig {
    /// Synthesize stubs for inherited members not redeclared in a class
    pub fake_overrides: bool,
    /// Lower annotations of files and declarations
    pub annotations: bool,
    /// Log the dump of every lowered file at debug level
    pub dump: bool,
    /// Check ownership invariants after every lowered file
    pub validate: bool,
}

impl Default for LoweringConfig {
    fn default() -> Self {
        Self {
            fake_overrides: true,
            annotations: true,
            dump: false,
            validate: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse lowering configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// The raw TOML structure; every other section belongs to someone else.
#[derive(Debug, Default, Deserialize)]
struct RawManifest {
    #[serde(default)]
    lowering: LoweringConfig,
}

impl LoweringConfig {
    /// Parse a manifest string. A missing `[lowering]` section yields the
    /// defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawManifest = toml::from_str(content)?;
        Ok(raw.lowering)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}
