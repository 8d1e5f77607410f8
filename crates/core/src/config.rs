//! Manager configuration: file, environment overrides, validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::surface::LoginSurface;

/// Overrides [`CacheConfig::artifact_path`].
pub const ARTIFACT_PATH_ENV: &str = "AUTHCACHE_ARTIFACT_PATH";
/// Overrides [`LoginSurface::login_url`].
pub const LOGIN_URL_ENV: &str = "AUTHCACHE_LOGIN_URL";
/// Overrides [`LoginSurface::protected_url`].
pub const PROTECTED_URL_ENV: &str = "AUTHCACHE_PROTECTED_URL";
/// Overrides [`CacheConfig::allow_demo_credentials`] (`1`/`true`/`yes`).
pub const ALLOW_DEMO_ENV: &str = "AUTHCACHE_ALLOW_DEMO_CREDENTIALS";

/// Upper bounds for every network-dependent wait, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timeouts {
	/// Single navigation or page interaction.
	pub navigation_ms: u64,
	/// From form submission to the success signal.
	pub login_ms: u64,
	/// Verifying a rehydrated session against the protected resource.
	pub verify_ms: u64,
	/// How long a URL or hidden-element signal must hold before a rehydrated
	/// session counts as accepted. Client-side guards redirect within it.
	pub settle_ms: u64,
	/// How often signals are re-checked while waiting.
	pub poll_interval_ms: u64,
}

impl Default for Timeouts {
	fn default() -> Self {
		Self {
			navigation_ms: 30_000,
			login_ms: 15_000,
			verify_ms: 10_000,
			settle_ms: 750,
			poll_interval_ms: 100,
		}
	}
}

impl Timeouts {
	pub fn navigation(&self) -> Duration {
		Duration::from_millis(self.navigation_ms)
	}

	pub fn login(&self) -> Duration {
		Duration::from_millis(self.login_ms)
	}

	pub fn verify(&self) -> Duration {
		Duration::from_millis(self.verify_ms)
	}

	pub fn settle(&self) -> Duration {
		Duration::from_millis(self.settle_ms)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}
}

/// Full configuration for a [`crate::SessionCacheManager`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
	/// Where the session artifact lives.
	#[serde(default = "default_artifact_path")]
	pub artifact_path: PathBuf,
	#[serde(default)]
	pub surface: LoginSurface,
	#[serde(default)]
	pub timeouts: Timeouts,
	#[serde(default = "default_headless")]
	pub headless: bool,
	/// Fall back to the documented demo credentials when none are configured.
	#[serde(default)]
	pub allow_demo_credentials: bool,
}

fn default_headless() -> bool {
	true
}

/// `<cache dir>/authcache/storage-state.json`, or a relative path when no
/// cache directory is known.
pub fn default_artifact_path() -> PathBuf {
	dirs::cache_dir()
		.unwrap_or_else(|| PathBuf::from("."))
		.join("authcache")
		.join("storage-state.json")
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			artifact_path: default_artifact_path(),
			surface: LoginSurface::default(),
			timeouts: Timeouts::default(),
			headless: true,
			allow_demo_credentials: false,
		}
	}
}

impl CacheConfig {
	/// Config for `surface` storing its artifact at `artifact_path`.
	pub fn new(artifact_path: impl Into<PathBuf>, surface: LoginSurface) -> Self {
		Self {
			artifact_path: artifact_path.into(),
			surface,
			..Default::default()
		}
	}

	/// Reads a JSON config file. A missing file yields defaults.
	pub fn from_file(path: &Path) -> Result<Self> {
		let content = match fs::read_to_string(path) {
			Ok(c) => c,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
			Err(err) => return Err(Error::storage(path, err)),
		};
		serde_json::from_str(&content).map_err(|e| Error::Configuration(format!("invalid config file {}: {e}", path.display())))
	}

	/// Applies environment-style overrides from `lookup`.
	pub fn apply_overrides<F>(&mut self, lookup: F)
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

		if let Some(path) = read(ARTIFACT_PATH_ENV) {
			self.artifact_path = PathBuf::from(path);
		}
		if let Some(url) = read(LOGIN_URL_ENV) {
			self.surface.login_url = url;
		}
		if let Some(url) = read(PROTECTED_URL_ENV) {
			self.surface.protected_url = url;
		}
		if let Some(flag) = read(ALLOW_DEMO_ENV) {
			self.allow_demo_credentials = matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
		}
	}

	/// Loads the optional file, applies process environment overrides, and validates.
	pub fn load(path: Option<&Path>) -> Result<Self> {
		let mut config = match path {
			Some(p) => Self::from_file(p)?,
			None => Self::default(),
		};
		config.apply_overrides(|key| std::env::var(key).ok());
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		if self.artifact_path.as_os_str().is_empty() {
			return Err(Error::Configuration("artifact path is empty".into()));
		}
		let t = &self.timeouts;
		if t.navigation_ms == 0 || t.login_ms == 0 || t.verify_ms == 0 || t.settle_ms == 0 || t.poll_interval_ms == 0 {
			return Err(Error::Configuration("timeouts must be greater than zero".into()));
		}
		if t.settle_ms >= t.verify_ms {
			return Err(Error::Configuration(format!(
				"settleMs ({}) must be shorter than verifyMs ({})",
				t.settle_ms, t.verify_ms
			)));
		}
		self.surface.validate()
	}

	/// Resolves default credentials from the process environment.
	pub fn credentials(&self) -> Result<Credentials> {
		Credentials::from_env(self.allow_demo_credentials)
	}
}
