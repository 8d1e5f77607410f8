//! Login credentials and their resolution order.

use std::fmt;

use crate::error::{Error, Result};

/// Environment variable holding the login identity.
pub const IDENTITY_ENV: &str = "ADMIN_EMAIL";
/// Environment variable holding the login secret.
pub const SECRET_ENV: &str = "ADMIN_PASSWORD";

/// Identity used when demo credentials are enabled and nothing else is set.
/// Only meant for local demo environments.
pub const DEMO_IDENTITY: &str = "admin@example.com";
/// Secret paired with [`DEMO_IDENTITY`].
pub const DEMO_SECRET: &str = "CorrectPass1!";

/// A login secret that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the plaintext, for handing to the login form only.
	pub fn expose(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for Secret {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Secret(***)")
	}
}

/// An identity/secret pair for the target login surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
	pub identity: String,
	pub secret: Secret,
}

impl Credentials {
	pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
		Self {
			identity: identity.into(),
			secret: Secret::new(secret),
		}
	}

	/// The documented demo pair.
	pub fn demo() -> Self {
		Self::new(DEMO_IDENTITY, DEMO_SECRET)
	}

	/// Resolves credentials from `lookup` (an environment-style getter).
	///
	/// Each half falls back independently to the demo pair when
	/// `allow_demo` is set. Blank values count as missing.
	pub fn resolve<F>(lookup: F, allow_demo: bool) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

		let identity = match (read(IDENTITY_ENV), allow_demo) {
			(Some(v), _) => v.trim().to_string(),
			(None, true) => DEMO_IDENTITY.to_string(),
			(None, false) => return Err(Error::Configuration(format!("no login identity: set {IDENTITY_ENV}"))),
		};
		let secret = match (read(SECRET_ENV), allow_demo) {
			(Some(v), _) => v,
			(None, true) => DEMO_SECRET.to_string(),
			(None, false) => return Err(Error::Configuration(format!("no login secret: set {SECRET_ENV}"))),
		};

		Ok(Self::new(identity, secret))
	}

	/// Resolves credentials from the process environment.
	pub fn from_env(allow_demo: bool) -> Result<Self> {
		Self::resolve(|key| std::env::var(key).ok(), allow_demo)
	}

	/// Rejects blank identities or secrets passed in directly by callers.
	pub fn validate(&self) -> Result<()> {
		if self.identity.trim().is_empty() {
			return Err(Error::Configuration("login identity is empty".into()));
		}
		if self.secret.expose().is_empty() {
			return Err(Error::Configuration(format!("login secret for {} is empty", self.identity)));
		}
		Ok(())
	}
}
