use authcache_cli::cli::Cli;
use authcache_cli::error::CliError;
use authcache_cli::output::{self, CommandResult, OutputFormat};
use authcache_cli::{commands, logging};
use clap::Parser;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let format = cli.format;
	let command = cli.command.name();

	if let Err(err) = commands::dispatch(cli).await {
		handle_error(command, &err, format);
		std::process::exit(err.exit_code());
	}
}

fn handle_error(command: &str, err: &CliError, format: OutputFormat) {
	let cmd_error = err.to_command_error();

	// Always print to stderr for humans
	output::print_error_stderr(&cmd_error);

	// Also emit the envelope with ok=false for scripts
	if format != OutputFormat::Text {
		let result: CommandResult<()> = CommandResult::failure(command, cmd_error);
		output::print_result(&result, format);
	}
}
