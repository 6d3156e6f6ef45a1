//! Fixer configuration loaded from TOML.
//!
//! ```toml
//! # Actions whose missing metadata is an accepted limitation.
//! known_issues = ["octo-org/private-action", "./.github/actions/setup"]
//! ```
//!
//! The configuration is read once at startup and never mutated afterwards.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use warden_contracts::error::{WardenError, WardenResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixerConfig {
    /// Action keys (`owner/repo[/path]`, local paths, or `docker://` images)
    /// whose unresolved metadata is reported as `KnownIssue`. Stored lower-case.
    #[serde(default)]
    pub known_issues: BTreeSet<String>,
}

impl FixerConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `WardenError::ConfigError` if the TOML is malformed or does not
    /// match the expected schema.
    pub fn from_toml_str(s: &str) -> WardenResult<Self> {
        let config: FixerConfig = toml::from_str(s).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to parse warden config TOML: {}", e),
        })?;
        Ok(config.normalized())
    }

    /// Read the file at `path` and parse it as TOML configuration.
    pub fn from_file(path: &Path) -> WardenResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn with_known_issues<I, S>(known_issues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known_issues: known_issues.into_iter().map(Into::into).collect(),
        }
        .normalized()
    }

    /// True when `key` is allow-listed. Comparison is case-insensitive.
    pub fn is_known_issue(&self, key: &str) -> bool {
        self.known_issues.contains(&key.to_lowercase())
    }

    fn normalized(self) -> Self {
        Self {
            known_issues: self
                .known_issues
                .into_iter()
                .map(|k| k.trim().to_lowercase())
                .collect(),
        }
    }
}
