use std::process::ExitCode;

use clap::Parser;
use kubectl_neat_diff::{
	cli::{self, Cli},
	diff::TROUBLE_EXIT_CODE,
	telemetry,
};

fn main() -> ExitCode {
	let cli = Cli::parse();

	telemetry::init(cli.log_level);

	// kubectl treats 1 as "differences found", so failures must not use it.
	match cli::run(cli, std::io::stdout().lock()) {
		Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(TROUBLE_EXIT_CODE)),
		Err(e) => {
			eprintln!("Error: {e:#}");
			ExitCode::from(TROUBLE_EXIT_CODE)
		}
	}
}
