//! Addressing for the target system's login surface.
//!
//! Everything that breaks when the target UI changes (URLs, selectors, the
//! success marker) lives in [`LoginSurface`] so the acquisition logic stays
//! fixed.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// A URL matcher.
///
/// Glob patterns use `*` for any run of characters (including `/`), so
/// `*/dashboard*` matches `http://host/dashboard?tab=1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum UrlPattern {
	Contains(String),
	Glob(String),
	Regex(String),
}

impl UrlPattern {
	pub fn matches(&self, url: &str) -> bool {
		match self {
			UrlPattern::Contains(needle) => url.contains(needle.as_str()),
			UrlPattern::Glob(pattern) => glob::Pattern::new(pattern).is_ok_and(|p| p.matches(url)),
			UrlPattern::Regex(pattern) => regex::Regex::new(pattern).is_ok_and(|re| re.is_match(url)),
		}
	}

	fn validate(&self) -> Result<()> {
		match self {
			UrlPattern::Contains(needle) if needle.is_empty() => Err(Error::Configuration("url pattern is empty".into())),
			UrlPattern::Contains(_) => Ok(()),
			UrlPattern::Glob(pattern) => glob::Pattern::new(pattern)
				.map(|_| ())
				.map_err(|e| Error::Configuration(format!("invalid glob {pattern:?}: {e}"))),
			UrlPattern::Regex(pattern) => regex::Regex::new(pattern)
				.map(|_| ())
				.map_err(|e| Error::Configuration(format!("invalid regex {pattern:?}: {e}"))),
		}
	}

	fn describe(&self) -> String {
		match self {
			UrlPattern::Contains(needle) => format!("url containing {needle}"),
			UrlPattern::Glob(pattern) => format!("url matching glob {pattern}"),
			UrlPattern::Regex(pattern) => format!("url matching /{pattern}/"),
		}
	}
}

/// Observable marker that a login attempt succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum SuccessSignal {
	/// The page navigated to an authenticated landing location.
	UrlMatches(UrlPattern),
	/// A marker that only renders for signed-in users became visible.
	ElementVisible(String),
	/// The login form (or another marker) went away.
	ElementHidden(String),
}

impl SuccessSignal {
	/// Human-readable condition used in timeout errors.
	pub fn describe(&self) -> String {
		match self {
			SuccessSignal::UrlMatches(pattern) => pattern.describe(),
			SuccessSignal::ElementVisible(selector) => format!("element {selector} to appear"),
			SuccessSignal::ElementHidden(selector) => format!("element {selector} to disappear"),
		}
	}

	fn validate(&self) -> Result<()> {
		match self {
			SuccessSignal::UrlMatches(pattern) => pattern.validate(),
			SuccessSignal::ElementVisible(selector) | SuccessSignal::ElementHidden(selector) => non_empty("success selector", selector),
		}
	}
}

/// Form-field addressing on the login page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginForm {
	pub identity_field: String,
	pub secret_field: String,
	pub submit: String,
	/// Element that carries the rejection message, e.g. "Invalid credentials".
	pub rejection: String,
}

impl Default for LoginForm {
	fn default() -> Self {
		Self {
			identity_field: r#"input[name="email"]"#.into(),
			secret_field: r#"input[name="password"]"#.into(),
			submit: r#"button[type="submit"]"#.into(),
			rejection: r#"[role="alert"], .error"#.into(),
		}
	}
}

/// Stable contract with the target system's authentication UI.
///
/// Omitted fields take the local demo target's values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginSurface {
	pub login_url: String,
	/// Resource that redirects to the login surface when unauthenticated.
	pub protected_url: String,
	pub form: LoginForm,
	pub success: SuccessSignal,
	/// Marks a redirect to the unauthenticated entry point. Defaults to the
	/// login URL's path.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub unauthenticated: Option<UrlPattern>,
	/// Element that renders on the protected resource only once the target
	/// has accepted the session. A rehydrated session is accepted as soon as
	/// it is visible.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub authenticated_marker: Option<String>,
}

impl Default for LoginSurface {
	fn default() -> Self {
		Self {
			login_url: "http://localhost:8080/login".into(),
			protected_url: "http://localhost:8080/dashboard".into(),
			form: LoginForm::default(),
			success: SuccessSignal::UrlMatches(UrlPattern::Contains("/dashboard".into())),
			unauthenticated: None,
			authenticated_marker: None,
		}
	}
}

impl LoginSurface {
	/// Pattern that identifies the unauthenticated entry point.
	pub fn unauthenticated_pattern(&self) -> UrlPattern {
		if let Some(pattern) = &self.unauthenticated {
			return pattern.clone();
		}
		let path = Url::parse(&self.login_url)
			.map(|u| u.path().to_string())
			.unwrap_or_else(|_| self.login_url.clone());
		UrlPattern::Contains(path)
	}

	/// True when `url` is the unauthenticated entry point.
	pub fn is_unauthenticated(&self, url: &str) -> bool {
		self.unauthenticated_pattern().matches(url)
	}

	/// Selector whose visibility alone proves a rehydrated session was
	/// accepted: the configured marker, else an element-visible success signal.
	///
	/// `None` means acceptance has to be inferred from a signal that holds
	/// for the settle window.
	pub fn positive_marker(&self) -> Option<&str> {
		match (&self.authenticated_marker, &self.success) {
			(Some(marker), _) => Some(marker.as_str()),
			(None, SuccessSignal::ElementVisible(selector)) => Some(selector.as_str()),
			(None, _) => None,
		}
	}

	pub fn validate(&self) -> Result<()> {
		parse_url("login url", &self.login_url)?;
		parse_url("protected url", &self.protected_url)?;
		non_empty("identity field selector", &self.form.identity_field)?;
		non_empty("secret field selector", &self.form.secret_field)?;
		non_empty("submit selector", &self.form.submit)?;
		non_empty("rejection selector", &self.form.rejection)?;
		self.success.validate()?;
		if let Some(pattern) = &self.unauthenticated {
			pattern.validate()?;
		}
		if let Some(marker) = &self.authenticated_marker {
			non_empty("authenticated marker", marker)?;
		}
		Ok(())
	}
}

fn parse_url(what: &str, value: &str) -> Result<Url> {
	Url::parse(value).map_err(|e| Error::Configuration(format!("{what} {value:?} is not a valid URL: {e}")))
}

fn non_empty(what: &str, value: &str) -> Result<()> {
	if value.trim().is_empty() {
		return Err(Error::Configuration(format!("{what} is empty")));
	}
	Ok(())
}
