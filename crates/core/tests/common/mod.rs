//! In-memory target site used by the integration tests.
//!
//! The site has a login page, a protected dashboard that redirects to the
//! login page without a valid `session` cookie, and counters for everything
//! the tests assert on.
//!
//! By default the redirect happens inside `goto`. With
//! [`FakeSite::with_client_side_redirect`] the dashboard renders first and a
//! route guard sends the page to the login URL shortly afterwards, like an SPA
//! that checks permissions after mount.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::Instant;

use async_trait::async_trait;
use authcache::{
	BrowserDriver, CacheConfig, Cookie, Error, LocalStorageEntry, LoginSurface, OriginState, PageContext, Result, SessionCacheManager,
	StorageState, SuccessSignal, Timeouts, UrlPattern,
};
use parking_lot::Mutex;

pub const ORIGIN: &str = "http://app.test";
pub const LOGIN_URL: &str = "http://app.test/login";
pub const DASHBOARD_URL: &str = "http://app.test/dashboard";
pub const ADMIN: &str = "admin@example.com";
pub const ADMIN_SECRET: &str = "CorrectPass1!";
pub const TESTER: &str = "test@example.com";
pub const TESTER_SECRET: &str = "Tester123!";

/// How the login page reacts to a bad submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionMode {
	/// Shows "Invalid credentials" in the alert element.
	Message,
	/// Stays on the login page without any marker.
	Silent,
}

#[derive(Debug, Default)]
pub struct Counters {
	pub login_page_loads: usize,
	pub submissions: usize,
	pub contexts_opened: usize,
	pub contexts_closed: usize,
}

struct SiteState {
	accounts: HashMap<String, String>,
	valid_tokens: HashMap<String, String>,
	next_token: u64,
	counters: Counters,
	rejection: RejectionMode,
	hang_on_submit: bool,
	login_form_missing: bool,
	latency: Duration,
	client_redirect_after: Option<Duration>,
	read_failures_per_navigation: usize,
}

#[derive(Clone)]
pub struct FakeSite {
	state: Arc<Mutex<SiteState>>,
}

impl FakeSite {
	pub fn new() -> Self {
		let accounts = HashMap::from([
			(ADMIN.to_string(), ADMIN_SECRET.to_string()),
			(TESTER.to_string(), TESTER_SECRET.to_string()),
		]);
		Self {
			state: Arc::new(Mutex::new(SiteState {
				accounts,
				valid_tokens: HashMap::new(),
				next_token: 0,
				counters: Counters::default(),
				rejection: RejectionMode::Message,
				hang_on_submit: false,
				login_form_missing: false,
				latency: Duration::ZERO,
				client_redirect_after: None,
				read_failures_per_navigation: 0,
			})),
		}
	}

	pub fn with_rejection(self, mode: RejectionMode) -> Self {
		self.state.lock().rejection = mode;
		self
	}

	pub fn with_latency(self, latency: Duration) -> Self {
		self.state.lock().latency = latency;
		self
	}

	/// Unauthorized dashboard loads land on the dashboard and are bounced to
	/// the login page by a guard that fires `CLIENT_REDIRECT_DELAY` later.
	pub fn with_client_side_redirect(self) -> Self {
		self.state.lock().client_redirect_after = Some(CLIENT_REDIRECT_DELAY);
		self
	}

	/// After every navigation the next `n` DOM reads fail the way a destroyed
	/// execution context does.
	pub fn with_read_failures_after_navigation(self, n: usize) -> Self {
		self.state.lock().read_failures_per_navigation = n;
		self
	}

	pub fn hang_on_submit(&self) {
		self.state.lock().hang_on_submit = true;
	}

	pub fn remove_login_form(&self) {
		self.state.lock().login_form_missing = true;
	}

	/// Invalidates every session cookie issued so far.
	pub fn revoke_all(&self) {
		self.state.lock().valid_tokens.clear();
	}

	pub fn login_page_loads(&self) -> usize {
		self.state.lock().counters.login_page_loads
	}

	pub fn submissions(&self) -> usize {
		self.state.lock().counters.submissions
	}

	pub fn open_contexts(&self) -> usize {
		let s = self.state.lock();
		s.counters.contexts_opened - s.counters.contexts_closed
	}

	pub fn contexts_opened(&self) -> usize {
		self.state.lock().counters.contexts_opened
	}

	fn latency(&self) -> Duration {
		self.state.lock().latency
	}

	fn read_failures(&self) -> usize {
		self.state.lock().read_failures_per_navigation
	}
}

#[async_trait]
impl BrowserDriver for FakeSite {
	async fn new_context(&self, state: Option<&StorageState>) -> Result<Box<dyn PageContext>> {
		self.state.lock().counters.contexts_opened += 1;
		let cookies = state.map(|s| s.cookies.clone()).unwrap_or_default();
		Ok(Box::new(FakeContext {
			site: self.clone(),
			page: Mutex::new(PageState {
				url: "about:blank".into(),
				fields: HashMap::new(),
				cookies,
				error: None,
				guard_redirect_at: None,
				failing_reads: 0,
			}),
			closed: AtomicBool::new(false),
		}))
	}
}

struct PageState {
	url: String,
	fields: HashMap<String, String>,
	cookies: Vec<Cookie>,
	error: Option<String>,
	/// When the client-side guard bounces the current dashboard view.
	guard_redirect_at: Option<Instant>,
	failing_reads: usize,
}

impl PageState {
	fn session_token(&self) -> Option<String> {
		self.cookies.iter().find(|c| c.name == "session").map(|c| c.value.clone())
	}

	fn on_login_page(&self) -> bool {
		self.url.starts_with(LOGIN_URL)
	}
}

pub struct FakeContext {
	site: FakeSite,
	page: Mutex<PageState>,
	closed: AtomicBool,
}

const IDENTITY_FIELD: &str = r#"input[name="email"]"#;
const SECRET_FIELD: &str = r#"input[name="password"]"#;
const SUBMIT: &str = r#"button[type="submit"]"#;
const REJECTION: &str = r#"[role="alert"], .error"#;
/// Renders on the dashboard once the guard has accepted the session.
pub const DASHBOARD_MARKER: &str = "#dashboard";
/// Wraps the login form; hidden everywhere but the login page.
pub const LOGIN_FORM_MARKER: &str = "form#login";
pub const CLIENT_REDIRECT_DELAY: Duration = Duration::from_millis(40);

impl FakeContext {
	async fn settle(&self) {
		let latency = self.site.latency();
		if !latency.is_zero() {
			tokio::time::sleep(latency).await;
		}
	}

	fn ensure_open(&self) -> Result<()> {
		if self.closed.load(Ordering::SeqCst) {
			return Err(Error::Driver("context is closed".into()));
		}
		Ok(())
	}

	fn arrive_at_login(&self, page: &mut PageState, url: &str) {
		self.site.state.lock().counters.login_page_loads += 1;
		page.url = url.to_string();
		page.fields.clear();
		page.error = None;
		page.guard_redirect_at = None;
	}

	fn navigated(&self, page: &mut PageState) {
		page.failing_reads = self.site.read_failures();
	}

	/// Runs the client-side guard if its delay has passed.
	fn run_guard(&self, page: &mut PageState) {
		if page.guard_redirect_at.is_some_and(|at| Instant::now() >= at) {
			self.arrive_at_login(page, &format!("{LOGIN_URL}?next=%2Fdashboard"));
		}
	}

	fn dom_read(&self, page: &mut PageState) -> Result<()> {
		if page.failing_reads > 0 {
			page.failing_reads -= 1;
			return Err(Error::Driver("Execution context was destroyed".into()));
		}
		Ok(())
	}
}

#[async_trait]
impl PageContext for FakeContext {
	async fn goto(&self, url: &str) -> Result<()> {
		self.ensure_open()?;
		self.settle().await;
		let mut page = self.page.lock();
		if url.starts_with(LOGIN_URL) {
			self.arrive_at_login(&mut page, url);
		} else if url.starts_with(DASHBOARD_URL) {
			let authorized = page
				.session_token()
				.is_some_and(|token| self.site.state.lock().valid_tokens.contains_key(&token));
			let client_redirect = self.site.state.lock().client_redirect_after;
			match (authorized, client_redirect) {
				(true, _) => {
					page.url = url.to_string();
					page.guard_redirect_at = None;
				}
				(false, Some(delay)) => {
					page.url = url.to_string();
					page.guard_redirect_at = Some(Instant::now() + delay);
				}
				(false, None) => self.arrive_at_login(&mut page, &format!("{LOGIN_URL}?next=%2Fdashboard")),
			}
		} else {
			page.url = url.to_string();
		}
		self.navigated(&mut page);
		Ok(())
	}

	async fn current_url(&self) -> Result<String> {
		self.ensure_open()?;
		let mut page = self.page.lock();
		self.run_guard(&mut page);
		Ok(page.url.clone())
	}

	async fn is_visible(&self, selector: &str) -> Result<bool> {
		self.ensure_open()?;
		let mut page = self.page.lock();
		self.run_guard(&mut page);
		self.dom_read(&mut page)?;
		let form_present = page.on_login_page() && !self.site.state.lock().login_form_missing;
		Ok(match selector {
			IDENTITY_FIELD | SECRET_FIELD | SUBMIT | LOGIN_FORM_MARKER => form_present,
			REJECTION => page.on_login_page() && page.error.is_some(),
			DASHBOARD_MARKER => page.url.starts_with(DASHBOARD_URL) && page.guard_redirect_at.is_none(),
			_ => false,
		})
	}

	async fn text_content(&self, selector: &str) -> Result<Option<String>> {
		self.ensure_open()?;
		let mut page = self.page.lock();
		self.dom_read(&mut page)?;
		Ok(match selector {
			REJECTION => page.error.clone(),
			_ => None,
		})
	}

	async fn fill(&self, selector: &str, value: &str) -> Result<()> {
		self.ensure_open()?;
		self.settle().await;
		let mut page = self.page.lock();
		if !page.on_login_page() {
			return Err(Error::Driver(format!("no element matches {selector}")));
		}
		page.fields.insert(selector.to_string(), value.to_string());
		Ok(())
	}

	async fn click(&self, selector: &str) -> Result<()> {
		self.ensure_open()?;
		self.settle().await;
		if selector != SUBMIT {
			return Err(Error::Driver(format!("no element matches {selector}")));
		}

		let hang = {
			let mut site = self.site.state.lock();
			site.counters.submissions += 1;
			site.hang_on_submit
		};
		if hang {
			std::future::pending::<()>().await;
		}

		let mut page = self.page.lock();
		let identity = page.fields.get(IDENTITY_FIELD).cloned().unwrap_or_default();
		let secret = page.fields.get(SECRET_FIELD).cloned().unwrap_or_default();

		let mut site = self.site.state.lock();
		if site.accounts.get(&identity) == Some(&secret) {
			site.next_token += 1;
			let token = format!("tok-{}", site.next_token);
			site.valid_tokens.insert(token.clone(), identity);
			page.cookies.retain(|c| c.name != "session");
			page.cookies.push(Cookie::new("session", token, "app.test"));
			page.url = DASHBOARD_URL.to_string();
		} else if site.rejection == RejectionMode::Message {
			page.error = Some("Invalid credentials".into());
		}
		page.failing_reads = site.read_failures_per_navigation;
		Ok(())
	}

	async fn storage_state(&self) -> Result<StorageState> {
		self.ensure_open()?;
		let page = self.page.lock();
		let identity = page
			.session_token()
			.and_then(|token| self.site.state.lock().valid_tokens.get(&token).cloned())
			.unwrap_or_default();
		Ok(StorageState {
			cookies: page.cookies.clone(),
			origins: vec![OriginState {
				origin: ORIGIN.into(),
				local_storage: vec![LocalStorageEntry {
					name: "auth-identity".into(),
					value: identity,
				}],
			}],
		})
	}

	async fn close(&self) -> Result<()> {
		if !self.closed.swap(true, Ordering::SeqCst) {
			self.site.state.lock().counters.contexts_closed += 1;
		}
		Ok(())
	}
}

pub fn surface() -> LoginSurface {
	LoginSurface {
		login_url: LOGIN_URL.into(),
		protected_url: DASHBOARD_URL.into(),
		success: SuccessSignal::UrlMatches(UrlPattern::Contains("/dashboard".into())),
		..Default::default()
	}
}

pub fn config(artifact_path: &Path) -> CacheConfig {
	CacheConfig {
		timeouts: Timeouts {
			navigation_ms: 2_000,
			login_ms: 1_000,
			verify_ms: 1_000,
			settle_ms: 100,
			poll_interval_ms: 10,
		},
		..CacheConfig::new(artifact_path, surface())
	}
}

/// Routes manager logs through the test harness so failures show the state trail.
pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_max_level(tracing::Level::DEBUG)
		.with_test_writer()
		.try_init();
}

pub fn manager(site: &FakeSite, artifact_path: &Path) -> SessionCacheManager {
	manager_with(site, config(artifact_path))
}

pub fn manager_with(site: &FakeSite, config: CacheConfig) -> SessionCacheManager {
	init_tracing();
	SessionCacheManager::new(Arc::new(site.clone()), config)
}

/// Config whose login and reuse both key off `success`.
pub fn config_with_signal(artifact_path: &Path, success: SuccessSignal) -> CacheConfig {
	let mut config = config(artifact_path);
	config.surface.success = success;
	config
}

pub fn session_cookie(state: &StorageState) -> Option<String> {
	state.cookies.iter().find(|c| c.name == "session").map(|c| c.value.clone())
}

/// Tokens still accepted by the site, for asserting which login an artifact came from.
pub fn tokens(site: &FakeSite) -> HashSet<String> {
	site.state.lock().valid_tokens.keys().cloned().collect()
}
