//! # warden-kb
//!
//! The knowledge base of third-party action metadata.
//!
//! ## Overview
//!
//! This crate provides [`KnowledgeBase`], which implements the
//! [`PermissionResolver`](warden_core::traits::PermissionResolver) trait.
//! Entries are YAML documents named `action-security.yml`, one per action,
//! stored under `<root>/<owner>/<repo>[/<path>]/`.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use warden_kb::KnowledgeBase;
//!
//! let kb = KnowledgeBase::from_dir(Path::new("knowledge-base"))?;
//! // Pass `kb` to `warden_core::Fixer::new(...)`.
//! ```

pub mod layout;
pub mod store;

pub use store::{parse_metadata, KnowledgeBase};

// ── Tests ─────────────────────────────────────────────────────────────────────
