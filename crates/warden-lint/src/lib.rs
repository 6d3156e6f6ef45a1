//! # warden-lint
//!
//! Validation of knowledge-base entries.
//!
//! This crate provides [`engine::KbLinter`], which checks `action-security.yml`
//! files for:
//!
//! 1. **Placement**: the fixed file name and an `owner/repo` location,
//!    optionally confirmed through a `RepositoryProbe`.
//! 2. **Content**: a non-empty name, well-formed allowed endpoints, and token
//!    scopes drawn from the fixed vocabulary.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use warden_lint::engine::KbLinter;
//!
//! let report = KbLinter::new().lint_tree(Path::new("knowledge-base"));
//! for message in report.messages() {
//!     eprintln!("{message}");
//! }
//! ```

pub mod engine;
pub mod report;

pub use engine::KbLinter;
pub use report::{LintIssue, LintReport};
