//! Authenticated browser-session cache for end-to-end test runs.
//!
//! Logging in through a web UI is the slowest part of most browser test
//! suites. [`SessionCacheManager`] performs the login once, saves the
//! resulting cookies and localStorage as a [`SessionArtifact`], and rebuilds
//! sessions from that artifact for later, independent runs. A rehydrated
//! session is validated against a protected resource before it is handed
//! out; when validation fails the manager logs in again and replaces the
//! artifact.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use authcache::{CacheConfig, Credentials, SessionCacheManager};
//! use authcache::chromium::ChromiumDriver;
//!
//! let config = CacheConfig::load(None)?;
//! let driver = Arc::new(ChromiumDriver::launch(config.headless).await?);
//! let manager = SessionCacheManager::new(driver, config);
//!
//! let creds = Credentials::new("admin@example.com", "CorrectPass1!");
//! let session = manager.acquire_session(Some(&creds), false).await?;
//! session.page().goto("http://localhost:8080/leads").await?;
//! manager.release_session(session).await?;
//! ```
//!
//! The browser is reached only through [`BrowserDriver`] and [`PageContext`],
//! and all target-specific addressing lives in [`LoginSurface`].

#[cfg(feature = "chromium")]
pub mod chromium;
pub mod config;
pub mod credentials;
pub mod driver;
pub mod error;
pub mod manager;
pub mod session;
pub mod store;
pub mod strategy;
pub mod surface;

pub use authcache_protocol::{Cookie, LocalStorageEntry, OriginState, SameSite, SessionArtifact, StorageState};
pub use config::{CacheConfig, Timeouts};
pub use credentials::{Credentials, Secret};
pub use driver::{BrowserDriver, PageContext};
pub use error::{Error, ErrorClass, Result};
pub use manager::SessionCacheManager;
pub use session::{Session, SessionSource};
pub use store::{ArtifactStore, CacheLookup, InvalidArtifact, now_ts};
pub use strategy::{AcquirePlan, AcquireState, LoginReason, plan_acquisition};
pub use surface::{LoginForm, LoginSurface, SuccessSignal, UrlPattern};
