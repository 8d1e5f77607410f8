//! Serialized session-state types.
//!
//! This crate contains the serde types that make up a cached session on disk:
//! browser cookies, per-origin `localStorage`, and the [`SessionArtifact`]
//! document that binds them to one identity.
//!
//! Types in this crate are:
//! - **Pure data**: No behavior beyond serialization and simple accessors
//! - **Stable**: Field names only change together with [`ARTIFACT_SCHEMA_VERSION`]

pub mod artifact;
pub mod cookie;

pub use artifact::*;
pub use cookie::*;
