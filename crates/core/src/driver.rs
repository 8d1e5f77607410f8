//! Browser driver adapter.
//!
//! The manager talks to a browser only through these traits. A backend opens
//! isolated contexts (one cookie jar each) and exposes the handful of page
//! operations the login and validation flows need. Callers bound every
//! operation with a timeout, so implementations may block for as long as
//! the underlying protocol does.

use async_trait::async_trait;
use authcache_protocol::StorageState;

use crate::error::Result;

/// Opens browser contexts.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
	/// Opens a fresh isolated context, seeded with `state` when given.
	async fn new_context(&self, state: Option<&StorageState>) -> Result<Box<dyn PageContext>>;
}

/// A browser context with one active page.
#[async_trait]
pub trait PageContext: Send + Sync {
	/// Navigates and waits for the load to finish.
	async fn goto(&self, url: &str) -> Result<()>;

	async fn current_url(&self) -> Result<String>;

	/// True when `selector` matches a rendered, visible element.
	async fn is_visible(&self, selector: &str) -> Result<bool>;

	/// Trimmed text of the first element matching `selector`.
	async fn text_content(&self, selector: &str) -> Result<Option<String>>;

	/// Replaces the field's current value with `value`.
	async fn fill(&self, selector: &str, value: &str) -> Result<()>;

	async fn click(&self, selector: &str) -> Result<()>;

	/// Captures cookies and localStorage for the context.
	async fn storage_state(&self) -> Result<StorageState>;

	/// Closes the page and disposes the context. Must tolerate being
	/// called more than once.
	async fn close(&self) -> Result<()>;
}
