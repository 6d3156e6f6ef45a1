//! Trait seams to the collaborators the engine does not implement itself.
//!
//! - `PermissionResolver` maps an action to the scopes it needs (backed by
//!   the knowledge base in `warden-kb`, or an in-memory table in tests).
//! - `RepositoryProbe` answers whether an action's repository exists on the
//!   hosting service. Only the interface lives here; network access is the
//!   caller's business.

use warden_contracts::{action::ActionReference, error::WardenResult, permission::PermissionSet};

/// Looks up the token permissions an action requires.
///
/// Implementations must be deterministic and must not perform network I/O;
/// lookups happen once per step of every job.
pub trait PermissionResolver: Send + Sync {
    /// Return the permissions `action` needs.
    ///
    /// Returns `WardenError::ActionNotFound` when there is no entry for the
    /// action's key. Other errors mean an entry exists but is unusable.
    fn resolve(&self, action: &ActionReference) -> WardenResult<PermissionSet>;
}

/// Checks that an `owner/repo` exists on the source-code host.
pub trait RepositoryProbe: Send + Sync {
    fn repository_exists(&self, owner: &str, repo: &str) -> WardenResult<bool>;
}
