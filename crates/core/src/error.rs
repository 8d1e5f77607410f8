use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	/// Credentials or configuration could not be resolved from any source.
	#[error("configuration error: {0}")]
	Configuration(String),

	/// The login surface explicitly rejected the submitted credentials.
	#[error("invalid credentials for {identity}: {message}")]
	InvalidCredentials { identity: String, message: String },

	#[error("login timed out after {ms}ms waiting for: {condition}")]
	LoginTimeout { ms: u64, condition: String },

	/// Neither the cached artifact nor a fresh login produced a ready session.
	#[error("could not authenticate as {identity}: {source}")]
	Authentication {
		identity: String,
		#[source]
		source: Box<Error>,
	},

	#[error("artifact storage failed at {}: {source}", path.display())]
	Storage {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// Browser or transport failure reported by the driver.
	#[error("browser driver error: {0}")]
	Driver(String),

	#[error("failed to encode session artifact: {0}")]
	Serialize(#[from] serde_json::Error),
}

/// Coarse error category used to pick a caller's retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
	Configuration,
	/// Actionable by the caller; retrying with the same inputs never helps.
	Credentials,
	/// Timeouts; the caller may retry.
	Transient,
	Storage,
	Driver,
}

impl ErrorClass {
	pub fn as_str(self) -> &'static str {
		match self {
			ErrorClass::Configuration => "configuration",
			ErrorClass::Credentials => "credentials",
			ErrorClass::Transient => "transient",
			ErrorClass::Storage => "storage",
			ErrorClass::Driver => "driver",
		}
	}
}

impl Error {
	pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		Error::Storage { path: path.into(), source }
	}

	pub(crate) fn authentication(identity: &str, source: Error) -> Self {
		Error::Authentication {
			identity: identity.to_string(),
			source: Box::new(source),
		}
	}

	/// Root cause, looking through [`Error::Authentication`] wrappers.
	pub fn root(&self) -> &Error {
		match self {
			Error::Authentication { source, .. } => source.root(),
			other => other,
		}
	}

	pub fn class(&self) -> ErrorClass {
		match self {
			Error::Configuration(_) => ErrorClass::Configuration,
			Error::InvalidCredentials { .. } => ErrorClass::Credentials,
			Error::LoginTimeout { .. } => ErrorClass::Transient,
			Error::Storage { .. } | Error::Serialize(_) => ErrorClass::Storage,
			Error::Driver(_) => ErrorClass::Driver,
			Error::Authentication { source, .. } => source.class(),
		}
	}

	/// True for failures a caller may retry without changing inputs.
	pub fn is_retryable(&self) -> bool {
		self.class() == ErrorClass::Transient
	}

	/// True when the target system rejected the credentials themselves.
	pub fn is_credential_problem(&self) -> bool {
		self.class() == ErrorClass::Credentials
	}
}
