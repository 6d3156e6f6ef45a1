//! Knowledge-base entry schema.
//!
//! One `action-security.yml` document describes one third-party action: the
//! network endpoints it contacts and the token scopes it needs. Scope names
//! and levels are kept as raw strings here so the validator can report every
//! bad value; `required_permissions()` is the typed view used for resolution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::WardenResult;
use crate::permission::{Level, PermissionSet, Scope};

/// The only accepted file name for a knowledge-base entry.
pub const METADATA_FILE_NAME: &str = "action-security.yml";

/// A deserialized `action-security.yml` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ActionMetadata {
    /// Human-readable action name. Must be non-empty.
    #[serde(default)]
    pub name: String,

    /// Network endpoints the action is expected to contact.
    #[serde(default)]
    pub allowed_endpoints: Vec<AllowedEndpoint>,

    /// The action runtime, e.g. `node16` or `docker`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs: Option<Runs>,

    /// Token permissions the action requires. Absent means none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<TokenPermissions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Runs {
    #[serde(default)]
    pub using: String,
}

/// An outbound network destination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllowedEndpoint {
    #[serde(default)]
    pub fqdn: String,
    #[serde(default)]
    pub port: u32,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenPermissions {
    #[serde(default)]
    pub scopes: BTreeMap<String, ScopeRequirement>,
}

/// One scope requirement as written in the knowledge base.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeRequirement {
    #[serde(default)]
    pub permission: String,
    #[serde(default)]
    pub reason: String,
}

impl ActionMetadata {
    /// The typed permission set this action needs.
    ///
    /// Fails on the first scope or level outside the fixed vocabulary.
    pub fn required_permissions(&self) -> WardenResult<PermissionSet> {
        let mut set = PermissionSet::new();
        if let Some(perms) = &self.permissions {
            for (scope, req) in &perms.scopes {
                let scope: Scope = scope.parse()?;
                let level: Level = req.permission.parse()?;
                set.grant(scope, level);
            }
        }
        Ok(set)
    }
}
