//! Result envelopes printed on stdout.
//!
//! Every command prints one [`CommandResult`]. Failures are also echoed to
//! stderr as `error[CODE]: message` so humans see them with `--format json`.


use std::io::{self, Write};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Envelope schema version, bumped on incompatible field changes.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// Pretty-printed JSON
	#[default]
	Json,
	/// Single-line JSON
	Ndjson,
	/// Human-readable text
	Text,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	pub schema_version: u32,

	pub ok: bool,

	/// Command name (e.g. "acquire", "show")
	pub command: String,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
}

impl<T: Serialize> CommandResult<T> {
	pub fn success(command: impl Into<String>, data: T) -> Self {
		Self {
			schema_version: SCHEMA_VERSION,
			ok: true,
			command: command.into(),
			data: Some(data),
			error: None,
		}
	}

	pub fn failure(command: impl Into<String>, error: CommandError) -> Self {
		Self {
			schema_version: SCHEMA_VERSION,
			ok: false,
			command: command.into(),
			data: None,
			error: Some(error),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
}

/// Standardized error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// Missing credentials, bad config file, unusable URLs
	ConfigError,
	/// The login surface rejected the credentials
	InvalidCredentials,
	/// A bounded wait expired; retrying may help
	Timeout,
	/// Reading or writing the artifact failed
	IoError,
	/// No usable artifact to inspect
	ArtifactUnavailable,
	/// Browser launch or protocol failure
	BrowserError,
	InternalError,
}

impl ErrorCode {
	/// Process exit status for this code.
	pub fn exit_code(self) -> i32 {
		match self {
			ErrorCode::ConfigError => 2,
			ErrorCode::InvalidCredentials => 3,
			ErrorCode::Timeout => 4,
			ErrorCode::IoError | ErrorCode::ArtifactUnavailable | ErrorCode::BrowserError | ErrorCode::InternalError => 1,
		}
	}
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorCode::ConfigError => write!(f, "CONFIG_ERROR"),
			ErrorCode::InvalidCredentials => write!(f, "INVALID_CREDENTIALS"),
			ErrorCode::Timeout => write!(f, "TIMEOUT"),
			ErrorCode::IoError => write!(f, "IO_ERROR"),
			ErrorCode::ArtifactUnavailable => write!(f, "ARTIFACT_UNAVAILABLE"),
			ErrorCode::BrowserError => write!(f, "BROWSER_ERROR"),
			ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
		}
	}
}

pub fn print_result<T: Serialize>(result: &CommandResult<T>, format: OutputFormat) {
	match format {
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				println!("{json}");
			}
		}
		OutputFormat::Ndjson => {
			if let Ok(json) = serde_json::to_string(result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => print_result_text(result),
	}
}

fn print_result_text<T: Serialize>(result: &CommandResult<T>) {
	let mut stdout = io::stdout().lock();
	if let Some(data) = &result.data {
		if let Ok(value) = serde_json::to_value(data) {
			let _ = write!(stdout, "{}", render_text(&value, 0));
		}
	}
}

/// Renders a JSON value as indented `key: value` lines.
pub(crate) fn render_text(value: &serde_json::Value, depth: usize) -> String {
	use serde_json::Value;

	let pad = "  ".repeat(depth);
	let mut out = String::new();
	match value {
		Value::Object(map) => {
			for (key, v) in map {
				match v {
					Value::Object(_) | Value::Array(_) => {
						out.push_str(&format!("{pad}{key}:\n"));
						out.push_str(&render_text(v, depth + 1));
					}
					scalar => out.push_str(&format!("{pad}{key}: {}\n", scalar_text(scalar))),
				}
			}
		}
		Value::Array(items) => {
			for item in items {
				match item {
					Value::Object(_) | Value::Array(_) => {
						out.push_str(&format!("{pad}-\n"));
						out.push_str(&render_text(item, depth + 1));
					}
					scalar => out.push_str(&format!("{pad}- {}\n", scalar_text(scalar))),
				}
			}
		}
		scalar => out.push_str(&format!("{pad}{}\n", scalar_text(scalar))),
	}
	out
}

fn scalar_text(value: &serde_json::Value) -> String {
	match value {
		serde_json::Value::String(s) => s.clone(),
		serde_json::Value::Null => "-".into(),
		other => other.to_string(),
	}
}

pub fn print_error_stderr(error: &CommandError) {
	eprintln!("error[{}]: {}", error.code, error.message);
}
