//! Session acquisition: cached artifact first, fresh login as the fallback.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use authcache_protocol::{SessionArtifact, StorageState};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::credentials::Credentials;
use crate::driver::{BrowserDriver, PageContext};
use crate::error::{Error, Result};
use crate::session::{ContextGuard, Session, SessionSource};
use crate::store::{ArtifactStore, now_ts};
use crate::strategy::{AcquirePlan, AcquireState, LoginReason, plan_acquisition};
use crate::surface::SuccessSignal;

/// Produces authenticated sessions, reusing the on-disk artifact when the
/// target still accepts it.
///
/// Cloning is cheap; clones share the driver and point at the same store.
#[derive(Clone)]
pub struct SessionCacheManager {
	driver: Arc<dyn BrowserDriver>,
	config: Arc<CacheConfig>,
	store: ArtifactStore,
}

enum LoginSignal {
	Success,
	Rejected(String),
}

impl SessionCacheManager {
	pub fn new(driver: Arc<dyn BrowserDriver>, config: CacheConfig) -> Self {
		let store = ArtifactStore::new(config.artifact_path.clone());
		Self {
			driver,
			config: Arc::new(config),
			store,
		}
	}

	pub fn config(&self) -> &CacheConfig {
		&self.config
	}

	pub fn store(&self) -> &ArtifactStore {
		&self.store
	}

	/// Returns a session authenticated as `credentials.identity`.
	///
	/// `None` resolves credentials from the environment. With
	/// `force_refresh` the cached artifact is ignored and overwritten.
	pub async fn acquire_session(&self, credentials: Option<&Credentials>, force_refresh: bool) -> Result<Session> {
		let credentials = match credentials {
			Some(c) => {
				c.validate()?;
				c.clone()
			}
			None => self.config.credentials()?,
		};
		let identity = credentials.identity.as_str();
		transition(identity, AcquireState::Start);

		let reason = if force_refresh {
			LoginReason::ForcedRefresh
		} else {
			match plan_acquisition(self.store.lookup_async().await?, identity) {
				AcquirePlan::Rehydrate(artifact) => match self.rehydrate(artifact).await {
					Ok(Some(session)) => {
						transition(identity, AcquireState::CacheHitValid);
						info!(target = "authcache.session", identity, path = %self.store.path().display(), "reusing cached session");
						transition(identity, AcquireState::Ready);
						return Ok(session);
					}
					Ok(None) => LoginReason::RejectedByTarget,
					Err(err) => {
						warn!(target = "authcache.session", identity, error = %err, "cached session could not be validated");
						LoginReason::RejectedByTarget
					}
				},
				AcquirePlan::Login(reason) => reason,
			}
		};

		transition(identity, reason.state());
		info!(target = "authcache.session", identity, reason = %reason, "performing fresh login");
		transition(identity, AcquireState::LoggingIn);

		let mut session = match self.login(&credentials).await {
			Ok(session) => session,
			Err(err) => {
				transition(identity, AcquireState::Failed);
				return Err(Error::authentication(identity, err));
			}
		};

		if let Err(err) = self.store.save_async(session.artifact.clone()).await {
			transition(identity, AcquireState::Failed);
			discard(session.context).await;
			return Err(err);
		}
		session.artifact_path = Some(self.store.path().to_path_buf());

		transition(identity, AcquireState::Ready);
		Ok(session)
	}

	/// Submits the login form and captures the resulting session state.
	///
	/// Nothing is persisted; [`Self::acquire_session`] owns the artifact.
	pub async fn login(&self, credentials: &Credentials) -> Result<Session> {
		credentials.validate()?;
		let surface = &self.config.surface;
		debug!(target = "authcache.login", identity = %credentials.identity, url = %surface.login_url, "opening login surface");

		let ctx = bounded(self.config.timeouts.navigation(), "a new browser context", self.driver.new_context(None)).await?;
		let guard = ContextGuard::new(ctx);

		let payload = match self.drive_login(guard.page(), credentials).await {
			Ok(payload) => payload,
			Err(err) => {
				discard(guard).await;
				return Err(err);
			}
		};

		if payload.is_empty() {
			warn!(target = "authcache.login", identity = %credentials.identity, "login succeeded but captured no cookies or storage");
		}
		info!(
			target = "authcache.login",
			identity = %credentials.identity,
			cookies = payload.cookies.len(),
			origins = payload.origins.len(),
			"login succeeded"
		);

		Ok(Session {
			identity: credentials.identity.clone(),
			source: SessionSource::FreshLogin,
			artifact: SessionArtifact::new(credentials.identity.clone(), payload, now_ts()),
			artifact_path: None,
			context: guard,
		})
	}

	/// Closes every resource held by `session`.
	pub async fn release_session(&self, session: Session) -> Result<()> {
		session.release().await
	}

	/// Acquires a session, runs `body`, and releases the session on every
	/// exit path. A panic in `body` is resumed after release.
	pub async fn with_session<T, F>(&self, credentials: Option<&Credentials>, force_refresh: bool, body: F) -> Result<T>
	where
		F: for<'s> FnOnce(&'s Session) -> BoxFuture<'s, Result<T>>,
	{
		let session = self.acquire_session(credentials, force_refresh).await?;
		let outcome = AssertUnwindSafe(body(&session)).catch_unwind().await;
		let released = self.release_session(session).await;

		match outcome {
			Err(panic) => {
				if let Err(err) = released {
					warn!(target = "authcache.session", error = %err, "release failed while unwinding");
				}
				std::panic::resume_unwind(panic)
			}
			Ok(Err(err)) => {
				if let Err(release_err) = released {
					warn!(target = "authcache.session", error = %release_err, "release failed after body error");
				}
				Err(err)
			}
			Ok(Ok(value)) => released.map(|()| value),
		}
	}

	/// Builds a session from `artifact` and checks that the target accepts it.
	/// `Ok(None)` means the artifact was rejected.
	async fn rehydrate(&self, artifact: SessionArtifact) -> Result<Option<Session>> {
		let identity = artifact.identity.clone();
		let ctx = bounded(
			self.config.timeouts.navigation(),
			"a seeded browser context",
			self.driver.new_context(Some(&artifact.payload)),
		)
		.await?;
		let guard = ContextGuard::new(ctx);

		let condition = format!("{} to accept the cached session", self.config.surface.protected_url);
		match bounded(self.config.timeouts.verify(), &condition, self.verify_seeded(guard.page())).await {
			Ok(true) => Ok(Some(Session {
				identity,
				source: SessionSource::Cached,
				artifact,
				artifact_path: Some(self.store.path().to_path_buf()),
				context: guard,
			})),
			Ok(false) => {
				warn!(target = "authcache.session", identity = %identity, "cached session rejected by target");
				discard(guard).await;
				Ok(None)
			}
			Err(err) => {
				discard(guard).await;
				Err(err)
			}
		}
	}

	/// Loads the protected resource and decides whether the target accepted
	/// the seeded session.
	///
	/// Landing back on the unauthenticated entry point rejects at once. A
	/// positive marker accepts as soon as it renders. Without one, the success
	/// signal has to hold for the whole settle window, which gives client-side
	/// route guards time to redirect away.
	async fn verify_seeded(&self, page: &dyn PageContext) -> Result<bool> {
		let surface = &self.config.surface;
		let settle = self.config.timeouts.settle();
		page.goto(&surface.protected_url).await?;

		let mut ticker = poll_ticker(self.config.timeouts.poll_interval());
		let mut holding_since: Option<Instant> = None;
		loop {
			ticker.tick().await;
			let Some(url) = lenient(page.current_url().await)? else {
				holding_since = None;
				continue;
			};
			if surface.is_unauthenticated(&url) {
				return Ok(false);
			}

			if let Some(marker) = surface.positive_marker() {
				if lenient(page.is_visible(marker).await)? == Some(true) {
					return Ok(true);
				}
				continue;
			}

			if lenient(self.signal_holds(page, &url).await)? != Some(true) {
				holding_since = None;
				continue;
			}
			let since = *holding_since.get_or_insert_with(Instant::now);
			if since.elapsed() >= settle {
				return Ok(true);
			}
		}
	}

	async fn drive_login(&self, page: &dyn PageContext, credentials: &Credentials) -> Result<StorageState> {
		let surface = &self.config.surface;
		let form = &surface.form;
		let nav = self.config.timeouts.navigation();

		bounded(nav, &format!("navigation to {}", surface.login_url), page.goto(&surface.login_url)).await?;
		bounded(nav, &format!("login field {}", form.identity_field), self.wait_visible(page, &form.identity_field)).await?;
		bounded(nav, "filling the identity field", page.fill(&form.identity_field, &credentials.identity)).await?;
		bounded(nav, "filling the secret field", page.fill(&form.secret_field, credentials.secret.expose())).await?;
		bounded(nav, "submitting the login form", page.click(&form.submit)).await?;

		match bounded(self.config.timeouts.login(), &surface.success.describe(), self.await_login_signal(page)).await? {
			LoginSignal::Success => {}
			LoginSignal::Rejected(message) => {
				warn!(target = "authcache.login", identity = %credentials.identity, %message, "login rejected");
				return Err(Error::InvalidCredentials {
					identity: credentials.identity.clone(),
					message,
				});
			}
		}

		bounded(nav, "capturing storage state", page.storage_state()).await
	}

	async fn wait_visible(&self, page: &dyn PageContext, selector: &str) -> Result<()> {
		let mut ticker = poll_ticker(self.config.timeouts.poll_interval());
		loop {
			ticker.tick().await;
			if lenient(page.is_visible(selector).await)? == Some(true) {
				return Ok(());
			}
		}
	}

	async fn signal_holds(&self, page: &dyn PageContext, url: &str) -> Result<bool> {
		Ok(match &self.config.surface.success {
			SuccessSignal::UrlMatches(pattern) => pattern.matches(url),
			SuccessSignal::ElementVisible(selector) => page.is_visible(selector).await?,
			SuccessSignal::ElementHidden(selector) => !page.is_visible(selector).await?,
		})
	}

	/// Polls until the success signal holds or the rejection marker shows text.
	async fn await_login_signal(&self, page: &dyn PageContext) -> Result<LoginSignal> {
		let surface = &self.config.surface;
		let mut ticker = poll_ticker(self.config.timeouts.poll_interval());
		loop {
			ticker.tick().await;
			let Some(url) = lenient(page.current_url().await)? else {
				continue;
			};
			if lenient(self.signal_holds(page, &url).await)? == Some(true) {
				return Ok(LoginSignal::Success);
			}

			if lenient(page.is_visible(&surface.form.rejection).await)? == Some(true) {
				let text = lenient(page.text_content(&surface.form.rejection).await)?.flatten();
				if let Some(message) = text.map(|m| m.trim().to_string()).filter(|m| !m.is_empty()) {
					return Ok(LoginSignal::Rejected(message));
				}
			}
		}
	}
}

fn transition(identity: &str, state: AcquireState) {
	debug!(target = "authcache.session", identity, state = %state, "acquisition state");
}

/// Page reads fail while a navigation swaps out the document. Inside a
/// bounded wait a driver error means "not yet"; anything else still fails.
fn lenient<T>(read: Result<T>) -> Result<Option<T>> {
	match read {
		Ok(value) => Ok(Some(value)),
		Err(Error::Driver(message)) => {
			debug!(target = "authcache.session", error = %message, "page read failed mid-navigation; polling again");
			Ok(None)
		}
		Err(err) => Err(err),
	}
}

fn poll_ticker(interval: Duration) -> tokio::time::Interval {
	let mut ticker = tokio::time::interval(interval);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
	ticker
}

/// Runs `fut` under `limit`; exceeding it is a [`Error::LoginTimeout`].
async fn bounded<T>(limit: Duration, condition: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
	match tokio::time::timeout(limit, fut).await {
		Ok(result) => result,
		Err(_) => Err(Error::LoginTimeout {
			ms: limit.as_millis() as u64,
			condition: condition.to_string(),
		}),
	}
}

async fn discard(guard: ContextGuard) {
	if let Err(err) = guard.release().await {
		warn!(target = "authcache.session", error = %err, "failed to close browser context");
	}
}
