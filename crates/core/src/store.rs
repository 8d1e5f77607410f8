//! Durable storage for session artifacts.
//!
//! Writers never modify the artifact in place: they write a sibling temp file
//! and rename it over the destination, so concurrent readers observe either
//! the previous complete artifact or the new one.
//!
//! [`ArtifactStore::lookup`] and [`ArtifactStore::save`] block on the
//! filesystem (`save` fsyncs). Async callers go through
//! [`ArtifactStore::lookup_async`] and [`ArtifactStore::save_async`], which
//! run them on tokio's blocking pool.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use authcache_protocol::{ARTIFACT_SCHEMA_VERSION, SessionArtifact};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Why an artifact file on disk cannot be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidArtifact {
	Empty,
	/// Truncated, not JSON, or missing required fields.
	Malformed(String),
	UnsupportedSchema(u32),
}

impl std::fmt::Display for InvalidArtifact {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			InvalidArtifact::Empty => f.write_str("artifact file is empty"),
			InvalidArtifact::Malformed(reason) => write!(f, "artifact file is malformed: {reason}"),
			InvalidArtifact::UnsupportedSchema(v) => {
				write!(f, "unsupported artifact schemaVersion {v} (expected {ARTIFACT_SCHEMA_VERSION})")
			}
		}
	}
}

/// Result of reading the artifact location.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
	Miss,
	Invalid(InvalidArtifact),
	Hit(SessionArtifact),
}

/// Artifact store bound to one explicit file location.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
	path: PathBuf,
}

impl ArtifactStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Reads the artifact. Absence and unparsable content are lookups, not errors.
	pub fn lookup(&self) -> Result<CacheLookup> {
		let bytes = match fs::read(&self.path) {
			Ok(b) => b,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(CacheLookup::Miss),
			Err(err) => return Err(Error::storage(&self.path, err)),
		};

		let lookup = match parse_artifact(&bytes) {
			Ok(artifact) => CacheLookup::Hit(artifact),
			Err(invalid) => {
				warn!(target = "authcache.store", path = %self.path.display(), reason = %invalid, "ignoring unusable session artifact");
				CacheLookup::Invalid(invalid)
			}
		};
		Ok(lookup)
	}

	/// Atomically replaces the artifact, creating parent directories.
	pub fn save(&self, artifact: &SessionArtifact) -> Result<()> {
		let mut normalized = artifact.clone();
		normalized.schema_version = ARTIFACT_SCHEMA_VERSION;
		let content = serde_json::to_vec_pretty(&normalized)?;

		let dir = match self.path.parent() {
			Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
			_ => PathBuf::from("."),
		};
		fs::create_dir_all(&dir).map_err(|e| Error::storage(&dir, e))?;

		let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| Error::storage(&dir, e))?;
		tmp.write_all(&content).map_err(|e| Error::storage(tmp.path(), e))?;
		tmp.as_file().sync_all().map_err(|e| Error::storage(tmp.path(), e))?;
		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o600)).map_err(|e| Error::storage(tmp.path(), e))?;
		}
		tmp.persist(&self.path).map_err(|e| Error::storage(&self.path, e.error))?;

		debug!(
			target = "authcache.store",
			path = %self.path.display(),
			identity = %normalized.identity,
			cookies = normalized.payload.cookies.len(),
			"saved session artifact"
		);
		Ok(())
	}

	pub async fn lookup_async(&self) -> Result<CacheLookup> {
		let store = self.clone();
		self.off_runtime(move || store.lookup()).await
	}

	pub async fn save_async(&self, artifact: SessionArtifact) -> Result<()> {
		let store = self.clone();
		self.off_runtime(move || store.save(&artifact)).await
	}

	async fn off_runtime<T, F>(&self, work: F) -> Result<T>
	where
		T: Send + 'static,
		F: FnOnce() -> Result<T> + Send + 'static,
	{
		tokio::task::spawn_blocking(work)
			.await
			.map_err(|join| Error::storage(&self.path, std::io::Error::other(join)))?
	}

	/// Removes the artifact. Returns `false` when there was nothing to remove.
	pub fn clear(&self) -> Result<bool> {
		match fs::remove_file(&self.path) {
			Ok(()) => Ok(true),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
			Err(err) => Err(Error::storage(&self.path, err)),
		}
	}
}

/// Current Unix timestamp in seconds.
pub fn now_ts() -> u64 {
	std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_secs()
}

fn parse_artifact(bytes: &[u8]) -> std::result::Result<SessionArtifact, InvalidArtifact> {
	if bytes.iter().all(u8::is_ascii_whitespace) {
		return Err(InvalidArtifact::Empty);
	}

	let value: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| InvalidArtifact::Malformed(e.to_string()))?;
	if let Some(version) = value.get("schemaVersion").and_then(|v| v.as_u64()) {
		if version != ARTIFACT_SCHEMA_VERSION as u64 {
			return Err(InvalidArtifact::UnsupportedSchema(version as u32));
		}
	}

	serde_json::from_value(value).map_err(|e| InvalidArtifact::Malformed(e.to_string()))
}
