//! Chromium backend over the Chrome DevTools Protocol.
//!
//! Every [`PageContext`] is a separate CDP browser context, so sessions for
//! different identities never share a cookie jar. localStorage is captured
//! for the origin of the current page and restored origin by origin.

use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use authcache_protocol::{Cookie, LocalStorageEntry, OriginState, SameSite, StorageState};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::network::{self, CookieParam, CookieSameSite, TimeSinceEpoch};
use chromiumoxide::cdp::browser_protocol::storage::{GetCookiesParams, SetCookiesParams};
use chromiumoxide::cdp::browser_protocol::target::{CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams};
use chromiumoxide::page::Page;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::driver::{BrowserDriver, PageContext};
use crate::error::{Error, Result};

/// Empties an input before typing so `fill` replaces autofilled values.
const CLEAR_VALUE_FN: &str =
	"function() { this.value = ''; this.dispatchEvent(new Event('input', { bubbles: true })); }";

fn cdp(err: impl Display) -> Error {
	Error::Driver(err.to_string())
}

/// A launched Chromium process.
pub struct ChromiumDriver {
	browser: Arc<Browser>,
	handler: JoinHandle<()>,
}

impl ChromiumDriver {
	pub async fn launch(headless: bool) -> Result<Self> {
		info!(target = "authcache.chromium", headless, "launching chromium");

		let mut builder = BrowserConfig::builder().arg("--disable-dev-shm-usage").window_size(1280, 720);
		if !headless {
			builder = builder.with_head();
		}
		let config = builder.build().map_err(cdp)?;

		let (browser, mut handler) = Browser::launch(config).await.map_err(cdp)?;
		let handler = tokio::spawn(async move {
			while let Some(event) = handler.next().await {
				if event.is_err() {
					debug!(target = "authcache.chromium", "cdp handler loop ended");
					break;
				}
			}
		});

		Ok(Self {
			browser: Arc::new(browser),
			handler,
		})
	}

	/// Closes the browser once every context handed out has been dropped.
	pub async fn shutdown(self) {
		match Arc::try_unwrap(self.browser) {
			Ok(mut browser) => {
				if let Err(err) = browser.close().await {
					warn!(target = "authcache.chromium", error = %err, "failed to close chromium");
				}
				let _ = browser.wait().await;
			}
			Err(_) => warn!(target = "authcache.chromium", "contexts still open; leaving chromium to exit on drop"),
		}
		self.handler.abort();
	}
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
	async fn new_context(&self, state: Option<&StorageState>) -> Result<Box<dyn PageContext>> {
		let context_id = self
			.browser
			.execute(CreateBrowserContextParams::default())
			.await
			.map_err(cdp)?
			.result
			.browser_context_id;

		let target = CreateTargetParams::builder()
			.url("about:blank")
			.browser_context_id(context_id.clone())
			.build()
			.map_err(cdp)?;
		let page = self.browser.new_page(target).await.map_err(cdp)?;

		let ctx = ChromiumContext {
			browser: Arc::clone(&self.browser),
			context_id,
			page,
			closed: AtomicBool::new(false),
		};
		if let Some(state) = state {
			if let Err(err) = ctx.restore(state).await {
				let _ = ctx.close().await;
				return Err(err);
			}
		}
		Ok(Box::new(ctx))
	}
}

struct ChromiumContext {
	browser: Arc<Browser>,
	context_id: BrowserContextId,
	page: Page,
	closed: AtomicBool,
}

#[derive(Deserialize)]
struct CapturedOrigin {
	origin: String,
	entries: Vec<LocalStorageEntry>,
}

impl ChromiumContext {
	async fn restore(&self, state: &StorageState) -> Result<()> {
		let cookies = state.cookies.iter().map(to_cookie_param).collect::<Result<Vec<_>>>()?;
		if !cookies.is_empty() {
			self.browser
				.execute(SetCookiesParams {
					cookies,
					browser_context_id: Some(self.context_id.clone()),
				})
				.await
				.map_err(cdp)?;
		}

		for origin in state.origins.iter().filter(|o| !o.local_storage.is_empty()) {
			self.page.goto(origin.origin.as_str()).await.map_err(cdp)?;
			let entries = serde_json::to_string(&origin.local_storage)?;
			self.page
				.evaluate(format!("(() => {{ for (const e of {entries}) localStorage.setItem(e.name, e.value); }})()"))
				.await
				.map_err(cdp)?;
		}
		Ok(())
	}

	async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> Result<T> {
		self.page.evaluate(script).await.map_err(cdp)?.into_value::<T>().map_err(cdp)
	}
}

#[async_trait]
impl PageContext for ChromiumContext {
	async fn goto(&self, url: &str) -> Result<()> {
		self.page.goto(url).await.map_err(cdp)?;
		Ok(())
	}

	async fn current_url(&self) -> Result<String> {
		Ok(self.page.url().await.map_err(cdp)?.unwrap_or_default())
	}

	async fn is_visible(&self, selector: &str) -> Result<bool> {
		let selector = serde_json::to_string(selector)?;
		self.eval(format!(
			"(() => {{ const el = document.querySelector({selector}); if (!el) return false; \
			 const r = el.getBoundingClientRect(); const s = getComputedStyle(el); \
			 return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; }})()"
		))
		.await
	}

	async fn text_content(&self, selector: &str) -> Result<Option<String>> {
		let selector = serde_json::to_string(selector)?;
		self.eval(format!(
			"(() => {{ const el = document.querySelector({selector}); return el ? (el.textContent || '').trim() : null; }})()"
		))
		.await
	}

	async fn fill(&self, selector: &str, value: &str) -> Result<()> {
		let element = self.page.find_element(selector).await.map_err(cdp)?;
		element.call_js_fn(CLEAR_VALUE_FN, false).await.map_err(cdp)?;
		element.click().await.map_err(cdp)?;
		element.type_str(value).await.map_err(cdp)?;
		Ok(())
	}

	async fn click(&self, selector: &str) -> Result<()> {
		self.page.find_element(selector).await.map_err(cdp)?.click().await.map_err(cdp)?;
		Ok(())
	}

	async fn storage_state(&self) -> Result<StorageState> {
		let cookies = self
			.browser
			.execute(GetCookiesParams {
				browser_context_id: Some(self.context_id.clone()),
			})
			.await
			.map_err(cdp)?
			.result
			.cookies
			.iter()
			.map(from_cdp_cookie)
			.collect();

		let captured: CapturedOrigin = self
			.eval(
				"(() => ({ origin: location.origin, entries: Object.keys(localStorage).map(k => ({ name: k, value: localStorage.getItem(k) })) }))()"
					.to_string(),
			)
			.await?;
		let origins = if captured.entries.is_empty() {
			Vec::new()
		} else {
			vec![OriginState {
				origin: captured.origin,
				local_storage: captured.entries,
			}]
		};

		Ok(StorageState { cookies, origins })
	}

	async fn close(&self) -> Result<()> {
		if self.closed.swap(true, Ordering::SeqCst) {
			return Ok(());
		}
		if let Err(err) = self.page.clone().close().await {
			debug!(target = "authcache.chromium", error = %err, "page already gone");
		}
		self.browser
			.execute(DisposeBrowserContextParams::new(self.context_id.clone()))
			.await
			.map_err(cdp)?;
		Ok(())
	}
}

fn to_cookie_param(cookie: &Cookie) -> Result<CookieParam> {
	let mut builder = CookieParam::builder().name(cookie.name.clone()).value(cookie.value.clone());
	if let Some(domain) = &cookie.domain {
		builder = builder.domain(domain.clone());
	}
	if let Some(path) = &cookie.path {
		builder = builder.path(path.clone());
	}
	if let Some(secure) = cookie.secure {
		builder = builder.secure(secure);
	}
	if let Some(http_only) = cookie.http_only {
		builder = builder.http_only(http_only);
	}
	if let Some(same_site) = cookie.same_site {
		builder = builder.same_site(match same_site {
			SameSite::None => CookieSameSite::None,
			SameSite::Lax => CookieSameSite::Lax,
			SameSite::Strict => CookieSameSite::Strict,
		});
	}
	if !cookie.is_session() {
		if let Some(expires) = cookie.expires {
			builder = builder.expires(TimeSinceEpoch::new(expires));
		}
	}
	builder.build().map_err(cdp)
}

fn from_cdp_cookie(cookie: &network::Cookie) -> Cookie {
	Cookie {
		name: cookie.name.clone(),
		value: cookie.value.clone(),
		domain: Some(cookie.domain.clone()),
		path: Some(cookie.path.clone()),
		expires: Some(if cookie.session { -1.0 } else { cookie.expires }),
		http_only: Some(cookie.http_only),
		secure: Some(cookie.secure),
		same_site: cookie.same_site.as_ref().map(|s| match s {
			CookieSameSite::None => SameSite::None,
			CookieSameSite::Lax => SameSite::Lax,
			CookieSameSite::Strict => SameSite::Strict,
		}),
	}
}
