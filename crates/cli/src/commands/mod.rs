pub mod artifact;
pub mod session;

use authcache::{ArtifactStore, CacheConfig};
use serde::Serialize;

use crate::cli::{Cli, Commands};
use crate::error::Result;
use crate::output::{self, CommandResult, OutputFormat};

/// Loads configuration and applies global flags on top of it.
pub fn resolve_config(cli: &Cli) -> Result<CacheConfig> {
	let mut config = CacheConfig::load(cli.config.as_deref())?;
	if let Some(path) = &cli.artifact {
		config.artifact_path = path.clone();
	}
	if cli.headful {
		config.headless = false;
	}
	Ok(config)
}

pub async fn dispatch(cli: Cli) -> Result<()> {
	let format = cli.format;
	let config = resolve_config(&cli)?;
	let command = cli.command.name();

	match cli.command {
		Commands::Acquire(args) => {
			let data = session::acquire(config, args.identity.as_deref(), args.force_refresh).await?;
			emit(command, data, format)
		}
		Commands::Login(args) => {
			let data = session::acquire(config, args.identity.as_deref(), true).await?;
			emit(command, data, format)
		}
		Commands::Show => emit(command, artifact::show(&ArtifactStore::new(config.artifact_path))?, format),
		Commands::Status => emit(command, artifact::status(&ArtifactStore::new(config.artifact_path))?, format),
		Commands::Clear => emit(command, artifact::clear(&ArtifactStore::new(config.artifact_path))?, format),
	}
	Ok(())
}

fn emit<T: Serialize>(command: &str, data: T, format: OutputFormat) {
	output::print_result(&CommandResult::success(command, data), format);
}
