//! The on-disk session artifact document.

use serde::{Deserialize, Serialize};

use crate::cookie::StorageState;

/// Current on-disk schema version for session artifacts.
pub const ARTIFACT_SCHEMA_VERSION: u32 = 1;

fn artifact_schema_version() -> u32 {
	ARTIFACT_SCHEMA_VERSION
}

/// Serialized session state for one authenticated identity.
///
/// An artifact is written once and then only read; a fresh login replaces
/// the whole file rather than editing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionArtifact {
	#[serde(default = "artifact_schema_version")]
	pub schema_version: u32,
	/// Login principal the payload was captured for.
	pub identity: String,
	/// Unix epoch seconds when the login completed.
	pub created_at: u64,
	/// Cookies and localStorage captured after login.
	pub payload: StorageState,
}

impl SessionArtifact {
	/// Creates an artifact stamped with the current schema version.
	pub fn new(identity: impl Into<String>, payload: StorageState, created_at: u64) -> Self {
		Self {
			schema_version: ARTIFACT_SCHEMA_VERSION,
			identity: identity.into(),
			created_at,
			payload,
		}
	}

	/// Returns true when this artifact was created for `identity`.
	pub fn belongs_to(&self, identity: &str) -> bool {
		self.identity == identity
	}

	/// Seconds elapsed between creation and `now`.
	pub fn age_secs(&self, now: u64) -> u64 {
		now.saturating_sub(self.created_at)
	}
}
