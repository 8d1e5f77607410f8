
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

/// Root CLI for authcache.
#[derive(Parser, Debug)]
#[command(name = "authcache")]
#[command(about = "Cache authenticated browser sessions across test runs")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format
	#[arg(short = 'f', long, global = true, value_enum, default_value = "json")]
	pub format: OutputFormat,

	/// JSON config file (missing file means defaults)
	#[arg(long, global = true, value_name = "FILE", env = "AUTHCACHE_CONFIG")]
	pub config: Option<PathBuf>,

	/// Artifact location, overriding config and AUTHCACHE_ARTIFACT_PATH
	#[arg(long, global = true, value_name = "PATH")]
	pub artifact: Option<PathBuf>,

	/// Show the browser window
	#[arg(long, global = true)]
	pub headful: bool,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Reuse the cached session, logging in only when it is unusable.
	Acquire(AcquireArgs),
	/// Log in and replace the cached session.
	Login(LoginArgs),
	/// Summarize the cached artifact (cookies, expiry, origins).
	Show,
	/// Report whether the artifact is present, absent, or invalid.
	Status,
	/// Delete the cached artifact.
	Clear,
}

impl Commands {
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Acquire(_) => "acquire",
			Commands::Login(_) => "login",
			Commands::Show => "show",
			Commands::Status => "status",
			Commands::Clear => "clear",
		}
	}
}

#[derive(Args, Debug, Clone, Default)]
pub struct AcquireArgs {
	/// Ignore the cached artifact and log in again
	#[arg(long)]
	pub force_refresh: bool,

	/// Login identity; the secret is read from ADMIN_PASSWORD
	#[arg(long, value_name = "ID")]
	pub identity: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct LoginArgs {
	/// Login identity; the secret is read from ADMIN_PASSWORD
	#[arg(long, value_name = "ID")]
	pub identity: Option<String>,
}
