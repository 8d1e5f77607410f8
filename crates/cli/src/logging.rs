use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Filter directive for a `-v` count. `RUST_LOG` takes precedence.
pub(crate) fn default_filter(verbosity: u8) -> &'static str {
	// 0 = only warnings from the cache (rejected artifacts, failed closes)
	// 1 (-v) = cache hits and logins
	// 2+ (-vv) = state transitions and chromium traffic
	match verbosity {
		0 => "error,authcache=warn,chromiumoxide=off",
		1 => "warn,authcache=info,chromiumoxide=warn",
		_ => "debug",
	}
}

pub fn init_logging(verbosity: u8) {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}
