//! Token permission scopes, levels, and permission sets.
//!
//! The scope vocabulary is closed: anything outside `Scope::ALL` is rejected
//! when parsed. A `PermissionSet` is ordered by scope, so rendering it always
//! produces the same line order regardless of how it was assembled.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{WardenError, WardenResult};

/// A named category of token access.
///
/// Variant order is the alphabetical order of the scope names; `Ord` on this
/// enum is the rendering order of a `PermissionSet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    Actions,
    Checks,
    Contents,
    Deployments,
    IdToken,
    Issues,
    Packages,
    PullRequests,
    RepositoryProjects,
    SecurityEvents,
    Statuses,
}

impl Scope {
    /// Every valid scope, in rendering order.
    pub const ALL: [Scope; 11] = [
        Scope::Actions,
        Scope::Checks,
        Scope::Contents,
        Scope::Deployments,
        Scope::IdToken,
        Scope::Issues,
        Scope::Packages,
        Scope::PullRequests,
        Scope::RepositoryProjects,
        Scope::SecurityEvents,
        Scope::Statuses,
    ];

    /// The scope name as written in workflow YAML.
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Actions => "actions",
            Scope::Checks => "checks",
            Scope::Contents => "contents",
            Scope::Deployments => "deployments",
            Scope::IdToken => "id-token",
            Scope::Issues => "issues",
            Scope::Packages => "packages",
            Scope::PullRequests => "pull-requests",
            Scope::RepositoryProjects => "repository-projects",
            Scope::SecurityEvents => "security-events",
            Scope::Statuses => "statuses",
        }
    }

    /// Comma-separated list of the vocabulary, used in diagnostics.
    pub fn vocabulary() -> String {
        Scope::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = WardenError;

    fn from_str(s: &str) -> WardenResult<Self> {
        Scope::ALL
            .iter()
            .copied()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| WardenError::InvalidScope {
                scope: s.to_string(),
            })
    }
}

/// Access level within a scope. `Write` implies `Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Read,
    Write,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Read => "read",
            Level::Write => "write",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = WardenError;

    fn from_str(s: &str) -> WardenResult<Self> {
        match s {
            "read" => Ok(Level::Read),
            "write" => Ok(Level::Write),
            other => Err(WardenError::InvalidLevel {
                level: other.to_string(),
            }),
        }
    }
}

/// A minimal set of scope grants, at most one level per scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    grants: BTreeMap<Scope, Level>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a requirement, widening an existing `read` to `write` when needed.
    ///
    /// A scope already at `write` never narrows back to `read`.
    pub fn grant(&mut self, scope: Scope, level: Level) {
        self.grants
            .entry(scope)
            .and_modify(|current| *current = (*current).max(level))
            .or_insert(level);
    }

    /// Merge every grant of `other` into `self` under the widening rule.
    pub fn merge(&mut self, other: &PermissionSet) {
        for (scope, level) in other.iter() {
            self.grant(scope, level);
        }
    }

    pub fn level(&self, scope: Scope) -> Option<Level> {
        self.grants.get(&scope).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    /// Grants in scope order.
    pub fn iter(&self) -> impl Iterator<Item = (Scope, Level)> + '_ {
        self.grants.iter().map(|(s, l)| (*s, *l))
    }

    /// Render each grant as a `scope: level` YAML line body, in scope order.
    pub fn to_lines(&self) -> Vec<String> {
        self.iter()
            .map(|(scope, level)| format!("{scope}: {level}"))
            .collect()
    }
}

impl FromIterator<(Scope, Level)> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = (Scope, Level)>>(iter: I) -> Self {
        let mut set = PermissionSet::new();
        for (scope, level) in iter {
            set.grant(scope, level);
        }
        set
    }
}
