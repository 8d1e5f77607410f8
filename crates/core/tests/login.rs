mod common;

use std::time::{Duration, Instant};

use authcache::{Credentials, Error, ErrorClass, SessionSource, SuccessSignal};
use common::{ADMIN, ADMIN_SECRET, FakeSite, RejectionMode};
use tempfile::TempDir;

#[tokio::test]
async fn wrong_secret_is_reported_as_invalid_credentials_without_waiting() {
	let tmp = TempDir::new().unwrap();
	let site = FakeSite::new();
	let manager = common::manager(&site, &tmp.path().join("state.json"));

	let started = Instant::now();
	let err = manager
		.acquire_session(Some(&Credentials::new("test@example.com", "wrong")), false)
		.await
		.unwrap_err();

	assert!(started.elapsed() < manager.config().timeouts.login(), "rejection must not wait out the login timeout");
	assert!(matches!(err, Error::Authentication { .. }), "{err:?}");
	match err.root() {
		Error::InvalidCredentials { identity, message } => {
			assert_eq!(identity, "test@example.com");
			assert_eq!(message, "Invalid credentials");
		}
		other => panic!("expected InvalidCredentials, got {other:?}"),
	}
	assert!(err.is_credential_problem());
	assert!(!err.is_retryable());
	assert_eq!(site.open_contexts(), 0);
	assert!(!tmp.path().join("state.json").exists(), "failed logins never write an artifact");
}

#[tokio::test]
async fn demo_admin_credentials_log_in() {
	let tmp = TempDir::new().unwrap();
	let site = FakeSite::new();
	let manager = common::manager(&site, &tmp.path().join("state.json"));

	let session = manager.login(&Credentials::new(ADMIN, ADMIN_SECRET)).await.unwrap();
	assert_eq!(session.source(), SessionSource::FreshLogin);
	assert_eq!(session.page().current_url().await.unwrap(), common::DASHBOARD_URL);
	assert!(session.artifact().payload.cookies.iter().any(|c| c.name == "session"));
	assert_eq!(session.artifact_path(), None);
	manager.release_session(session).await.unwrap();

	assert!(!tmp.path().join("state.json").exists(), "login alone does not persist");
	assert_eq!(site.open_contexts(), 0);
}

#[tokio::test]
async fn silent_login_page_times_out() {
	let tmp = TempDir::new().unwrap();
	let site = FakeSite::new().with_rejection(RejectionMode::Silent);
	let manager = common::manager(&site, &tmp.path().join("state.json"));

	let err = manager
		.acquire_session(Some(&Credentials::new(ADMIN, "not-the-password")), false)
		.await
		.unwrap_err();

	match err.root() {
		Error::LoginTimeout { ms, condition } => {
			assert_eq!(*ms, 1_000);
			assert!(condition.contains("/dashboard"), "{condition}");
		}
		other => panic!("expected LoginTimeout, got {other:?}"),
	}
	assert_eq!(err.class(), ErrorClass::Transient);
	assert!(err.is_retryable());
	assert_eq!(site.open_contexts(), 0);
}

#[tokio::test]
async fn missing_login_form_is_bounded_by_navigation_timeout() {
	let tmp = TempDir::new().unwrap();
	let site = FakeSite::new();
	site.remove_login_form();
	let manager = common::manager(&site, &tmp.path().join("state.json"));

	let started = Instant::now();
	let err = manager.login(&Credentials::new(ADMIN, ADMIN_SECRET)).await.unwrap_err();
	assert!(matches!(err, Error::LoginTimeout { ms: 2_000, .. }), "{err:?}");
	assert!(started.elapsed() < Duration::from_secs(5));
	assert_eq!(site.submissions(), 0);
	assert_eq!(site.open_contexts(), 0);
}

#[tokio::test]
async fn hung_submission_is_bounded() {
	let tmp = TempDir::new().unwrap();
	let site = FakeSite::new();
	site.hang_on_submit();
	let manager = common::manager(&site, &tmp.path().join("state.json"));

	let err = manager.login(&Credentials::new(ADMIN, ADMIN_SECRET)).await.unwrap_err();
	assert!(matches!(err, Error::LoginTimeout { .. }), "{err:?}");
	assert_eq!(site.submissions(), 1);
	assert_eq!(site.open_contexts(), 0);
}

#[tokio::test]
async fn page_reads_failing_mid_navigation_keep_polling() {
	let tmp = TempDir::new().unwrap();
	let path = tmp.path().join("state.json");
	let site = FakeSite::new().with_read_failures_after_navigation(3);
	let config = common::config_with_signal(&path, SuccessSignal::ElementVisible(common::DASHBOARD_MARKER.into()));
	let manager = common::manager_with(&site, config);

	let first = manager.acquire_session(Some(&Credentials::new(ADMIN, ADMIN_SECRET)), false).await.unwrap();
	assert_eq!(first.source(), SessionSource::FreshLogin);
	manager.release_session(first).await.unwrap();

	let second = manager.acquire_session(Some(&Credentials::new(ADMIN, ADMIN_SECRET)), false).await.unwrap();
	assert_eq!(second.source(), SessionSource::Cached);
	assert_eq!(site.submissions(), 1);
	manager.release_session(second).await.unwrap();
}

#[tokio::test]
async fn rejection_is_still_read_after_failed_dom_reads() {
	let tmp = TempDir::new().unwrap();
	let site = FakeSite::new().with_read_failures_after_navigation(2);
	let manager = common::manager(&site, &tmp.path().join("state.json"));

	let err = manager.login(&Credentials::new(ADMIN, "wrong")).await.unwrap_err();
	assert!(matches!(err, Error::InvalidCredentials { .. }), "{err:?}");
	assert_eq!(site.open_contexts(), 0);
}
