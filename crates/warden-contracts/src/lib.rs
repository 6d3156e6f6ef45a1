//! # warden-contracts
//!
//! Shared types, schemas, and contracts for warden.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate beyond parsing and the permission merge rule; only data
//! definitions and error types.

pub mod action;
pub mod error;
pub mod fix;
pub mod metadata;
pub mod permission;
