//! File-backed knowledge base implementation.
//!
//! `KnowledgeBase` loads `action-security.yml` entries from a directory tree
//! (or from strings, for tests and embedding) and implements the
//! `PermissionResolver` trait from warden-core.
//!
//! Resolution algorithm:
//!
//! 1. Look up the action's lower-cased `owner/repo[/path]` key. The ref is
//!    ignored; every version of an action shares one entry.
//! 2. No entry → `ActionNotFound`. The caller records it as a missing action.
//! 3. Entry found → convert its scopes to a typed `PermissionSet`; a scope or
//!    level outside the vocabulary is an error, never dropped silently.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use warden_contracts::{
    action::ActionReference,
    error::{WardenError, WardenResult},
    metadata::ActionMetadata,
    permission::PermissionSet,
};
use warden_core::traits::PermissionResolver;

use crate::layout;

/// Parse one `action-security.yml` document.
///
/// `origin` names the source in the error (usually the file path).
pub fn parse_metadata(s: &str, origin: &str) -> WardenResult<ActionMetadata> {
    serde_yaml::from_str(s).map_err(|e| WardenError::KnowledgeBase {
        path: origin.to_string(),
        reason: format!("failed to parse action metadata: {}", e),
    })
}

/// Action metadata keyed by lower-cased `owner/repo[/path]`.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    entries: BTreeMap<String, ActionMetadata>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the entry for `key`.
    pub fn insert(&mut self, key: &str, metadata: ActionMetadata) {
        self.entries.insert(key.to_lowercase(), metadata);
    }

    /// Parse `s` as an entry and store it under `key`.
    pub fn insert_yaml(&mut self, key: &str, s: &str) -> WardenResult<()> {
        let metadata = parse_metadata(s, key)?;
        self.insert(key, metadata);
        Ok(())
    }

    /// Load every `action-security.yml` below `root`.
    ///
    /// Returns `WardenError::Io` if `root` cannot be read. Individual entries
    /// that cannot be read or parsed are skipped with a warning; the linter in
    /// `warden-lint` is the place where such files are reported.
    pub fn from_dir(root: &Path) -> WardenResult<Self> {
        std::fs::metadata(root).map_err(|e| WardenError::Io {
            path: root.display().to_string(),
            source: e,
        })?;

        let mut kb = Self::new();
        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable knowledge-base entry");
                    None
                }
            })
        {
            let path = entry.path();
            if !entry.file_type().is_file() || !layout::is_metadata_file(path) {
                continue;
            }
            let Some(key) = layout::action_key(root, path) else {
                warn!(path = %path.display(), "metadata file is not below owner/repo, skipping");
                continue;
            };
            let loaded = std::fs::read_to_string(path)
                .map_err(|e| WardenError::Io {
                    path: path.display().to_string(),
                    source: e,
                })
                .and_then(|s| parse_metadata(&s, &path.display().to_string()));
            match loaded {
                Ok(metadata) => {
                    debug!(key = %key, name = %metadata.name, "loaded action metadata");
                    kb.insert(&key, metadata);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable metadata"),
            }
        }

        info!(root = %root.display(), entries = kb.len(), "knowledge base loaded");
        Ok(kb)
    }

    pub fn get(&self, key: &str) -> Option<&ActionMetadata> {
        self.entries.get(&key.to_lowercase())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PermissionResolver for KnowledgeBase {
    fn resolve(&self, action: &ActionReference) -> WardenResult<PermissionSet> {
        let key = action.key();
        let metadata = self
            .entries
            .get(&key)
            .ok_or_else(|| WardenError::ActionNotFound {
                action: action.to_string(),
            })?;
        metadata
            .required_permissions()
            .map_err(|e| WardenError::KnowledgeBase {
                path: key,
                reason: e.to_string(),
            })
    }
}
