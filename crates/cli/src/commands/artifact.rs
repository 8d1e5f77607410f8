//! Read-only and maintenance commands over the artifact file.

use std::path::PathBuf;

use authcache::{ArtifactStore, CacheLookup, Cookie, SessionArtifact, now_ts};
use serde::Serialize;
use tracing::info;

use crate::error::{CliError, Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieSummary {
	pub name: String,
	pub domain: Option<String>,
	pub expires: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginSummary {
	pub origin: String,
	pub keys: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowData {
	pub path: PathBuf,
	pub identity: String,
	pub created_at: u64,
	pub age: String,
	pub cookie_count: usize,
	pub cookies: Vec<CookieSummary>,
	pub origin_count: usize,
	pub origins: Vec<OriginSummary>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactState {
	Present,
	Absent,
	Invalid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusData {
	pub path: PathBuf,
	pub state: ArtifactState,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub identity: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub age_secs: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearData {
	pub path: PathBuf,
	pub removed: bool,
}

pub fn show(store: &ArtifactStore) -> Result<ShowData> {
	let path = store.path().to_path_buf();
	match store.lookup()? {
		CacheLookup::Hit(artifact) => Ok(summarize(&artifact, path, now_ts())),
		CacheLookup::Miss => Err(CliError::NoArtifact(path)),
		CacheLookup::Invalid(reason) => Err(CliError::InvalidArtifact {
			path,
			reason: reason.to_string(),
		}),
	}
}

pub fn status(store: &ArtifactStore) -> Result<StatusData> {
	let path = store.path().to_path_buf();
	let data = match store.lookup()? {
		CacheLookup::Hit(artifact) => StatusData {
			path,
			state: ArtifactState::Present,
			age_secs: Some(artifact.age_secs(now_ts())),
			identity: Some(artifact.identity),
			reason: None,
		},
		CacheLookup::Miss => StatusData {
			path,
			state: ArtifactState::Absent,
			identity: None,
			age_secs: None,
			reason: None,
		},
		CacheLookup::Invalid(reason) => StatusData {
			path,
			state: ArtifactState::Invalid,
			identity: None,
			age_secs: None,
			reason: Some(reason.to_string()),
		},
	};
	Ok(data)
}

pub fn clear(store: &ArtifactStore) -> Result<ClearData> {
	let removed = store.clear()?;
	info!(target = "authcache.store", path = %store.path().display(), removed, "cleared session artifact");
	Ok(ClearData {
		path: store.path().to_path_buf(),
		removed,
	})
}

fn summarize(artifact: &SessionArtifact, path: PathBuf, now: u64) -> ShowData {
	let state = &artifact.payload;
	let cookies = state
		.cookies
		.iter()
		.map(|cookie| CookieSummary {
			name: cookie.name.clone(),
			domain: cookie.domain.clone(),
			expires: format_expiry(cookie, now),
		})
		.collect();
	let origins = state
		.origins
		.iter()
		.map(|origin| OriginSummary {
			origin: origin.origin.clone(),
			keys: origin.local_storage.iter().map(|e| e.name.clone()).collect(),
		})
		.collect();

	ShowData {
		path,
		identity: artifact.identity.clone(),
		created_at: artifact.created_at,
		age: format_age(artifact.age_secs(now)),
		cookie_count: state.cookies.len(),
		cookies,
		origin_count: state.origins.len(),
		origins,
	}
}

/// Remaining lifetime of a cookie: `session`, `expired`, or `Nm`/`Nh`/`Nd`.
fn format_expiry(cookie: &Cookie, now: u64) -> String {
	if cookie.is_session() {
		return "session".into();
	}
	if cookie.is_expired_at(now) {
		return "expired".into();
	}
	let ts = cookie.expires.unwrap_or_default() as u64;
	format_span(ts.saturating_sub(now))
}

fn format_age(secs: u64) -> String {
	format!("{} ago", format_span(secs))
}

fn format_span(secs: u64) -> String {
	match secs {
		d if d < 3600 => format!("{}m", d / 60),
		d if d < 86400 => format!("{}h", d / 3600),
		d => format!("{}d", d / 86400),
	}
}
