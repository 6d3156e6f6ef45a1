//! # warden-core
//!
//! Least-privilege permission computation and surgical rewriting of CI
//! workflow files.
//!
//! This crate provides:
//! - The `PermissionResolver` and `RepositoryProbe` trait seams
//! - A forgiving typed `Workflow` model and a line-level `Outline` of the text
//! - The `PermissionAggregator` that folds step requirements into one set
//! - The `Fixer` with job-level and workflow-level injection
//!
//! ## Usage
//!
//! ```rust,ignore
//! use warden_core::{Fixer, FixerConfig};
//!
//! let fixer = Fixer::new(Box::new(knowledge_base), FixerConfig::default());
//! let result = fixer.add_job_level_permissions(&workflow_text);
//! if !result.has_errors {
//!     std::fs::write(path, &result.final_output)?;
//! }
//! ```

pub mod aggregate;
pub mod config;
pub mod fixer;
pub mod outline;
pub mod rewrite;
pub mod traits;
pub mod workflow;

pub use aggregate::{PermissionAggregator, PermissionAudit, Unresolved};
pub use config::FixerConfig;
pub use fixer::{add_permissions, Fixer};
pub use workflow::{DeclaredPermissions, Job, Step, Workflow};
