//! Action references as written in a step's `uses:` field.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{WardenError, WardenResult};

/// A parsed `owner/repo[/path]@ref` action reference.
///
/// Two references to the same action at different refs share a `key()`;
/// the ref is kept only for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionReference {
    pub owner: String,
    pub repo: String,
    /// Sub-directory inside the repository, e.g. `init` for `github/codeql-action/init`.
    pub path: Option<String>,
    /// Tag, branch, or commit SHA.
    pub git_ref: String,
}

impl ActionReference {
    /// Parse a `uses:` value.
    ///
    /// Fails when there is no `@ref` suffix or when the part before it does
    /// not contain a non-empty `owner/repo` pair.
    pub fn parse(reference: &str) -> WardenResult<Self> {
        let err = |reason: &str| WardenError::ActionParse {
            reference: reference.to_string(),
            reason: reason.to_string(),
        };

        let (target, git_ref) = reference
            .trim()
            .rsplit_once('@')
            .ok_or_else(|| err("missing '@ref'"))?;
        if git_ref.is_empty() {
            return Err(err("empty ref after '@'"));
        }

        let mut parts = target.splitn(3, '/');
        let owner = parts.next().unwrap_or_default();
        let repo = parts
            .next()
            .ok_or_else(|| err("expected 'owner/repo' before '@'"))?;
        if owner.is_empty() || repo.is_empty() {
            return Err(err("owner and repo must not be empty"));
        }
        let path = parts
            .next()
            .map(|p| p.trim_end_matches('/'))
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            path,
            git_ref: git_ref.to_string(),
        })
    }

    /// Lookup key: lower-cased `owner/repo[/path]`, without the ref.
    pub fn key(&self) -> String {
        let key = match &self.path {
            Some(path) => format!("{}/{}/{}", self.owner, self.repo, path),
            None => format!("{}/{}", self.owner, self.repo),
        };
        key.to_lowercase()
    }
}

impl fmt::Display for ActionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}/{}/{}@{}", self.owner, self.repo, path, self.git_ref),
            None => write!(f, "{}/{}@{}", self.owner, self.repo, self.git_ref),
        }
    }
}

impl FromStr for ActionReference {
    type Err = WardenError;

    fn from_str(s: &str) -> WardenResult<Self> {
        Self::parse(s)
    }
}
