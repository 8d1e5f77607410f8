//! Live authenticated session handles.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use authcache_protocol::SessionArtifact;
use serde::Serialize;
use tracing::{debug, warn};

use crate::driver::PageContext;
use crate::error::Result;

/// Where a [`Session`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionSource {
	/// Rehydrated from the on-disk artifact and validated.
	Cached,
	/// Produced by submitting the login form.
	FreshLogin,
}

impl SessionSource {
	pub fn as_str(self) -> &'static str {
		match self {
			SessionSource::Cached => "cached",
			SessionSource::FreshLogin => "freshLogin",
		}
	}
}

/// Owns a browser context and closes it exactly once.
///
/// Dropping an unreleased guard (abandoned future, early return, panic)
/// schedules the close on the current Tokio runtime.
pub(crate) struct ContextGuard {
	ctx: Arc<dyn PageContext>,
	released: bool,
}

impl ContextGuard {
	pub(crate) fn new(ctx: Box<dyn PageContext>) -> Self {
		Self {
			ctx: Arc::from(ctx),
			released: false,
		}
	}

	pub(crate) fn page(&self) -> &dyn PageContext {
		self.ctx.as_ref()
	}

	pub(crate) async fn release(mut self) -> Result<()> {
		self.released = true;
		self.ctx.close().await
	}
}

impl Drop for ContextGuard {
	fn drop(&mut self) {
		if self.released {
			return;
		}
		let ctx = Arc::clone(&self.ctx);
		match tokio::runtime::Handle::try_current() {
			Ok(handle) => {
				debug!(target = "authcache.session", "closing abandoned browser context");
				handle.spawn(async move {
					if let Err(err) = ctx.close().await {
						warn!(target = "authcache.session", error = %err, "failed to close abandoned browser context");
					}
				});
			}
			Err(_) => warn!(target = "authcache.session", "no runtime available; browser context left open"),
		}
	}
}

/// A browser context authenticated as one identity.
pub struct Session {
	pub(crate) identity: String,
	pub(crate) source: SessionSource,
	pub(crate) artifact: SessionArtifact,
	pub(crate) artifact_path: Option<PathBuf>,
	pub(crate) context: ContextGuard,
}

impl std::fmt::Debug for Session {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Session")
			.field("identity", &self.identity)
			.field("source", &self.source)
			.field("artifact_path", &self.artifact_path)
			.finish_non_exhaustive()
	}
}

impl Session {
	pub fn identity(&self) -> &str {
		&self.identity
	}

	pub fn source(&self) -> SessionSource {
		self.source
	}

	/// Artifact this session was built from or captured into.
	pub fn artifact(&self) -> &SessionArtifact {
		&self.artifact
	}

	/// Location the artifact is persisted at; `None` for a bare login.
	pub fn artifact_path(&self) -> Option<&Path> {
		self.artifact_path.as_deref()
	}

	/// The authenticated page.
	pub fn page(&self) -> &dyn PageContext {
		self.context.page()
	}

	/// Closes the browser context.
	pub async fn release(self) -> Result<()> {
		debug!(target = "authcache.session", identity = %self.identity, "releasing session");
		self.context.release().await
	}
}
