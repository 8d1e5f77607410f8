//! `acquire` and `login`: drive a real browser through the session cache.

use std::path::PathBuf;
use std::sync::Arc;

use authcache::chromium::ChromiumDriver;
use authcache::credentials::IDENTITY_ENV;
use authcache::{CacheConfig, Credentials, Session, SessionCacheManager, SessionSource};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
	pub identity: String,
	pub source: SessionSource,
	pub path: Option<PathBuf>,
	pub cookies: usize,
	pub origins: usize,
}

impl From<&Session> for SessionData {
	fn from(session: &Session) -> Self {
		let payload = &session.artifact().payload;
		Self {
			identity: session.identity().to_string(),
			source: session.source(),
			path: session.artifact_path().map(|p| p.to_path_buf()),
			cookies: payload.cookies.len(),
			origins: payload.origins.len(),
		}
	}
}

/// Acquires a session, reports it, and releases it before the browser exits.
pub async fn acquire(config: CacheConfig, identity: Option<&str>, force_refresh: bool) -> Result<SessionData> {
	let credentials = credentials_for(identity, |key| std::env::var(key).ok(), config.allow_demo_credentials)?;

	let driver = Arc::new(ChromiumDriver::launch(config.headless).await?);
	let manager = SessionCacheManager::new(driver.clone(), config);

	let outcome = run(&manager, &credentials, force_refresh).await;

	drop(manager);
	match Arc::try_unwrap(driver) {
		Ok(driver) => driver.shutdown().await,
		Err(_) => debug!(target = "authcache.chromium", "driver still shared; skipping shutdown"),
	}
	outcome
}

async fn run(manager: &SessionCacheManager, credentials: &Credentials, force_refresh: bool) -> Result<SessionData> {
	let session = manager.acquire_session(Some(credentials), force_refresh).await?;
	let data = SessionData::from(&session);
	info!(target = "authcache.session", identity = %data.identity, source = data.source.as_str(), "session ready");
	manager.release_session(session).await?;
	Ok(data)
}

/// `--identity` replaces `ADMIN_EMAIL`; the secret still comes from the environment.
fn credentials_for<F>(identity: Option<&str>, lookup: F, allow_demo: bool) -> Result<Credentials>
where
	F: Fn(&str) -> Option<String>,
{
	let credentials = match identity {
		Some(id) => Credentials::resolve(
			|key| {
				if key == IDENTITY_ENV { Some(id.to_string()) } else { lookup(key) }
			},
			allow_demo,
		)?,
		None => Credentials::resolve(lookup, allow_demo)?,
	};
	Ok(credentials)
}
