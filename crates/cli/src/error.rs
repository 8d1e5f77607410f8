use std::path::PathBuf;

use authcache::ErrorClass;
use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error(transparent)]
	Cache(#[from] authcache::Error),

	#[error("no session artifact at {}", .0.display())]
	NoArtifact(PathBuf),

	#[error("session artifact at {} is unusable: {reason}", path.display())]
	InvalidArtifact { path: PathBuf, reason: String },

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl CliError {
	pub fn code(&self) -> ErrorCode {
		match self {
			CliError::Cache(err) => match err.class() {
				ErrorClass::Configuration => ErrorCode::ConfigError,
				ErrorClass::Credentials => ErrorCode::InvalidCredentials,
				ErrorClass::Transient => ErrorCode::Timeout,
				ErrorClass::Storage => ErrorCode::IoError,
				ErrorClass::Driver => ErrorCode::BrowserError,
			},
			CliError::NoArtifact(_) | CliError::InvalidArtifact { .. } => ErrorCode::ArtifactUnavailable,
			CliError::Json(_) => ErrorCode::InternalError,
		}
	}

	pub fn exit_code(&self) -> i32 {
		self.code().exit_code()
	}

	pub fn to_command_error(&self) -> CommandError {
		CommandError {
			code: self.code(),
			message: self.to_string(),
		}
	}
}
