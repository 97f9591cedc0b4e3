//! Command line interface and the top-level neat-then-diff flow.

use std::{io::Write, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use kubectl_neat::OutputFormat;
use tracing::{debug, Level};

use crate::{
	diff::{diff_dirs, DiffOpts, DiffTool},
	neatify::neatify_dir,
};

const LONG_ABOUT: &str = "\
De-clutter your kubectl diff output using kubectl-neat (looking at you, managedFields)

To use, set it as your KUBECTL_EXTERNAL_DIFF tool:

    # append to ~/.bashrc or similar:
    export KUBECTL_EXTERNAL_DIFF=kubectl-neat-diff

kubectl passes no options to an external diff, so every option can also be
set through its environment variable.";

#[derive(Debug, Parser)]
#[command(name = "kubectl-neat-diff", version)]
#[command(about = "Remove fields from kubectl diff that carry low / no information")]
#[command(long_about = LONG_ABOUT)]
pub struct Cli {
	/// Directory with the live objects
	pub from: PathBuf,

	/// Directory with the merged objects
	pub to: PathBuf,

	/// Ignore changes whose lines all match RegExp
	#[arg(short = 'I', long, value_name = "RE", value_delimiter = ',')]
	pub ignore_matching_lines: Vec<String>,

	/// Diff implementation to use
	#[arg(long, value_enum, env = "KUBECTL_NEAT_DIFF_TOOL", default_value_t = DiffTool::External)]
	pub diff_tool: DiffTool,

	/// Program run by the external diff tool
	#[arg(long, env = "KUBECTL_NEAT_DIFF_PROGRAM", default_value = "diff")]
	pub diff_program: String,

	/// Encoding of the neated files, must be "same", "json" or "yaml"
	#[arg(long, env = "KUBECTL_NEAT_DIFF_OUTPUT", default_value = "same")]
	pub output: OutputFormat,

	/// Log level (possible values: error, warn, info, debug, trace)
	#[arg(long, env = "KUBECTL_NEAT_DIFF_LOG_LEVEL")]
	pub log_level: Option<Level>,
}

/// Neat both directories, then diff them.
///
/// Returns the exit code of the diff: 0 without differences, 1 with.
pub fn run<W: Write>(cli: Cli, writer: W) -> Result<i32> {
	for dir in [&cli.from, &cli.to] {
		let summary = neatify_dir(dir, cli.output)
			.with_context(|| format!("neating {}", dir.display()))?;
		debug!(dir = %dir.display(), ?summary, "directory ready");
	}

	let opts = DiffOpts {
		tool: cli.diff_tool,
		program: cli.diff_program,
		ignore_matching_lines: cli.ignore_matching_lines,
	};
	diff_dirs(&cli.from, &cli.to, &opts, writer).context("diffing neated directories")
}
