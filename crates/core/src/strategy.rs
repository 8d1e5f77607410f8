//! Pure acquisition planning.

use std::fmt;

use authcache_protocol::SessionArtifact;

use crate::store::{CacheLookup, InvalidArtifact};

/// States an acquisition passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireState {
	Start,
	CacheHitValid,
	CacheHitInvalid,
	CacheMiss,
	LoggingIn,
	Ready,
	Failed,
}

impl AcquireState {
	pub fn as_str(self) -> &'static str {
		match self {
			AcquireState::Start => "START",
			AcquireState::CacheHitValid => "CACHE_HIT_VALID",
			AcquireState::CacheHitInvalid => "CACHE_HIT_INVALID",
			AcquireState::CacheMiss => "CACHE_MISS",
			AcquireState::LoggingIn => "LOGGING_IN",
			AcquireState::Ready => "READY",
			AcquireState::Failed => "FAILED",
		}
	}
}

impl fmt::Display for AcquireState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Why an acquisition had to go through the login surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginReason {
	ForcedRefresh,
	CacheMiss,
	CorruptArtifact,
	UnsupportedSchema,
	/// The artifact on disk belongs to a different identity.
	IdentityMismatch,
	/// Loading the protected resource bounced to the login entry point.
	RejectedByTarget,
}

impl LoginReason {
	pub fn as_str(self) -> &'static str {
		match self {
			LoginReason::ForcedRefresh => "forcedRefresh",
			LoginReason::CacheMiss => "cacheMiss",
			LoginReason::CorruptArtifact => "corruptArtifact",
			LoginReason::UnsupportedSchema => "unsupportedSchema",
			LoginReason::IdentityMismatch => "identityMismatch",
			LoginReason::RejectedByTarget => "rejectedByTarget",
		}
	}

	/// State the acquisition is in right before `LOGGING_IN`.
	pub fn state(self) -> AcquireState {
		match self {
			LoginReason::ForcedRefresh | LoginReason::CacheMiss => AcquireState::CacheMiss,
			_ => AcquireState::CacheHitInvalid,
		}
	}
}

impl fmt::Display for LoginReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// What an acquisition should try first.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquirePlan {
	/// Build a session from this artifact, then validate it.
	Rehydrate(SessionArtifact),
	Login(LoginReason),
}

/// Chooses between rehydrating the cached artifact and logging in.
pub fn plan_acquisition(lookup: CacheLookup, identity: &str) -> AcquirePlan {
	match lookup {
		CacheLookup::Miss => AcquirePlan::Login(LoginReason::CacheMiss),
		CacheLookup::Invalid(InvalidArtifact::UnsupportedSchema(_)) => AcquirePlan::Login(LoginReason::UnsupportedSchema),
		CacheLookup::Invalid(_) => AcquirePlan::Login(LoginReason::CorruptArtifact),
		CacheLookup::Hit(artifact) if !artifact.belongs_to(identity) => AcquirePlan::Login(LoginReason::IdentityMismatch),
		CacheLookup::Hit(artifact) => AcquirePlan::Rehydrate(artifact),
	}
}

#[cfg(test)]
mod tests {
	use authcache_protocol::StorageState;

	use super::*;

	fn hit(identity: &str) -> CacheLookup {
		CacheLookup::Hit(SessionArtifact::new(identity, StorageState::new(), 0))
	}

	#[test]
	fn miss_logs_in() {
		assert_eq!(plan_acquisition(CacheLookup::Miss, "a@example.com"), AcquirePlan::Login(LoginReason::CacheMiss));
	}

	#[test]
	fn matching_hit_rehydrates() {
		let plan = plan_acquisition(hit("a@example.com"), "a@example.com");
		assert!(matches!(plan, AcquirePlan::Rehydrate(a) if a.identity == "a@example.com"));
	}

	#[test]
	fn foreign_identity_is_never_reused() {
		assert_eq!(plan_acquisition(hit("a@example.com"), "b@example.com"), AcquirePlan::Login(LoginReason::IdentityMismatch));
	}

	#[test]
	fn invalid_artifacts_log_in() {
		let corrupt = CacheLookup::Invalid(InvalidArtifact::Malformed("EOF while parsing".into()));
		assert_eq!(plan_acquisition(corrupt, "a@example.com"), AcquirePlan::Login(LoginReason::CorruptArtifact));

		let future = CacheLookup::Invalid(InvalidArtifact::UnsupportedSchema(7));
		assert_eq!(plan_acquisition(future, "a@example.com"), AcquirePlan::Login(LoginReason::UnsupportedSchema));
	}

	#[test]
	fn reasons_map_onto_state_machine() {
		assert_eq!(LoginReason::CacheMiss.state(), AcquireState::CacheMiss);
		assert_eq!(LoginReason::ForcedRefresh.state(), AcquireState::CacheMiss);
		assert_eq!(LoginReason::RejectedByTarget.state(), AcquireState::CacheHitInvalid);
		assert_eq!(LoginReason::IdentityMismatch.to_string(), "identityMismatch");
	}
}
