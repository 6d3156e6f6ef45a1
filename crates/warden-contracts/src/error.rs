//! Error types shared by every warden crate.
//!
//! All fallible operations return `WardenResult<T>`. Outcomes that are part of
//! normal operation (a job that already declares permissions, an action with
//! no knowledge-base entry) are reported through `FixResult` and only become a
//! `WardenError` at the boundary of a single lookup or rewrite.

use thiserror::Error;

/// The unified error type for warden.
#[derive(Debug, Error)]
pub enum WardenError {
    /// A `uses:` string is not of the form `owner/repo[/path]@ref`.
    #[error("invalid action reference '{reference}': {reason}")]
    ActionParse { reference: String, reason: String },

    /// No knowledge-base entry exists for the referenced action.
    #[error("no knowledge-base entry for action '{action}'")]
    ActionNotFound { action: String },

    /// A scope name outside the fixed token-permission vocabulary.
    #[error("unknown permission scope '{scope}'")]
    InvalidScope { scope: String },

    /// A permission level other than `read` or `write`.
    #[error("permission level must be read or write, got '{level}'")]
    InvalidLevel { level: String },

    /// The workflow text cannot be read as a mapping with a `jobs` section.
    #[error("incorrect workflow yaml: {reason}")]
    IncorrectYaml { reason: String },

    /// The named job could not be located in the workflow text.
    #[error("job '{job}' not found in the workflow")]
    JobNotFound { job: String },

    /// Workflow-level permissions cannot be computed while actions are unresolved.
    #[error("unable to compute workflow permissions, unresolved actions: {}", actions.join(", "))]
    UnresolvedActions { actions: Vec<String> },

    /// A knowledge-base entry could not be loaded or is malformed.
    #[error("knowledge base error at {path}: {reason}")]
    KnowledgeBase { path: String, reason: String },

    /// The corpus audit could not record or export a result.
    #[error("corpus audit failed: {reason}")]
    AuditFailed { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A filesystem read or write failed in a collaborator.
    #[error("i/o error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the warden crates.
pub type WardenResult<T> = Result<T, WardenError>;
