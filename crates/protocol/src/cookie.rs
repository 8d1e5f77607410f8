//! Cookie and storage state types.
//!
//! The JSON shape matches what browser automation tools write for a context's
//! storage state, so files produced elsewhere can be loaded as payloads.

use serde::{Deserialize, Serialize};

/// SameSite cookie attribute, serialized as `"None"`, `"Lax"`, or `"Strict"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SameSite {
	None,
	#[default]
	Lax,
	Strict,
}

/// A browser cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
	pub name: String,
	pub value: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub domain: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
	/// Unix timestamp in seconds (-1 means session cookie).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub http_only: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub secure: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub same_site: Option<SameSite>,
}

impl Cookie {
	/// Creates a cookie scoped to `domain`.
	pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			domain: Some(domain.into()),
			path: Some("/".into()),
			expires: None,
			http_only: None,
			secure: None,
			same_site: None,
		}
	}

	/// Sets the expiration timestamp.
	pub fn expires(mut self, expires: f64) -> Self {
		self.expires = Some(expires);
		self
	}

	/// Returns true when the cookie has no expiry and lives only as long as the browser.
	pub fn is_session(&self) -> bool {
		self.expires.is_none_or(|ts| ts < 0.0)
	}

	/// Returns true when the cookie expired before `now` (Unix seconds).
	pub fn is_expired_at(&self, now: u64) -> bool {
		match self.expires {
			Some(ts) if ts >= 0.0 => (ts as u64) < now,
			_ => false,
		}
	}
}

/// A localStorage entry within an origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalStorageEntry {
	pub name: String,
	pub value: String,
}

/// Storage state for a single origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginState {
	/// Origin URL, e.g. `http://localhost:8080`.
	pub origin: String,
	#[serde(default)]
	pub local_storage: Vec<LocalStorageEntry>,
}

/// Cookies and localStorage captured from one browser context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageState {
	#[serde(default)]
	pub cookies: Vec<Cookie>,
	#[serde(default)]
	pub origins: Vec<OriginState>,
}

impl StorageState {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns true when neither cookies nor origin storage were captured.
	pub fn is_empty(&self) -> bool {
		self.cookies.is_empty() && self.origins.iter().all(|o| o.local_storage.is_empty())
	}
}
