//! Diffing two neated directories.
//!
//! By default the system `diff` is run as `diff -uN <left> <right>`, exactly
//! like kubectl would have. The builtin tool produces the same kind of
//! unified output with `similar`, for hosts without a diff binary.

use std::{
	collections::BTreeSet,
	ffi::OsString,
	fs,
	io::{self, ErrorKind, Write},
	path::{Path, PathBuf},
	process::{Command, ExitStatus},
};

use clap::ValueEnum;
use regex::Regex;
use similar::{ChangeTag, TextDiff};
use thiserror::Error;
use tracing::{debug, instrument};
use walkdir::WalkDir;

/// Exit code `diff` uses when it could not compare its inputs.
pub const TROUBLE_EXIT_CODE: u8 = 2;

/// Lines of context around each hunk, as `diff -u` prints.
const CONTEXT_LINES: usize = 3;

/// Errors that can occur while diffing.
#[derive(Debug, Error)]
pub enum DiffError {
	#[error("running {program}")]
	Spawn {
		program: String,
		#[source]
		source: io::Error,
	},

	#[error("invalid ignore pattern")]
	InvalidPattern(#[from] regex::Error),

	#[error("listing directory {}", path.display())]
	ReadDir {
		path: PathBuf,
		#[source]
		source: walkdir::Error,
	},

	#[error("reading {}", path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("writing diff output")]
	Write(#[source] io::Error),
}

/// Which implementation computes the diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DiffTool {
	/// Run an external diff program with `-uN`.
	#[default]
	External,
	/// Compute a unified diff in-process.
	Builtin,
}

#[derive(Debug, Clone)]
pub struct DiffOpts {
	pub tool: DiffTool,
	/// External program, only used by [`DiffTool::External`].
	pub program: String,
	/// Changes whose lines all match one of these are not reported.
	pub ignore_matching_lines: Vec<String>,
}

impl Default for DiffOpts {
	fn default() -> Self {
		Self {
			tool: DiffTool::default(),
			program: "diff".to_string(),
			ignore_matching_lines: Vec::new(),
		}
	}
}

/// Diff `left` against `right` and return the exit code to report.
///
/// The external tool writes straight to the inherited stdout and stderr;
/// `writer` only receives builtin output.
pub fn diff_dirs<W: Write>(
	left: &Path,
	right: &Path,
	opts: &DiffOpts,
	writer: W,
) -> Result<i32, DiffError> {
	match opts.tool {
		DiffTool::External => run_external(left, right, opts),
		DiffTool::Builtin => run_builtin(left, right, &opts.ignore_matching_lines, writer),
	}
}

/// Arguments passed to the external program.
pub fn external_args(left: &Path, right: &Path, ignore_matching_lines: &[String]) -> Vec<OsString> {
	let mut args = vec![OsString::from("-uN")];
	for pattern in ignore_matching_lines {
		args.push("-I".into());
		args.push(pattern.into());
	}
	args.push(left.into());
	args.push(right.into());
	args
}

#[instrument(skip_all, fields(program = %opts.program))]
fn run_external(left: &Path, right: &Path, opts: &DiffOpts) -> Result<i32, DiffError> {
	let args = external_args(left, right, &opts.ignore_matching_lines);
	debug!(?args, "running external diff");

	let status = Command::new(&opts.program)
		.args(&args)
		.status()
		.map_err(|source| DiffError::Spawn {
			program: opts.program.clone(),
			source,
		})?;

	let code = exit_code(status);
	debug!(code, "external diff finished");
	Ok(code)
}

/// Exit code of a finished process, shell style for signals.
pub fn exit_code(status: ExitStatus) -> i32 {
	if let Some(code) = status.code() {
		return code;
	}
	#[cfg(unix)]
	{
		use std::os::unix::process::ExitStatusExt;
		if let Some(signal) = status.signal() {
			return 128 + signal;
		}
	}
	i32::from(TROUBLE_EXIT_CODE)
}

#[instrument(skip_all, fields(left = %left.display(), right = %right.display()))]
fn run_builtin<W: Write>(
	left: &Path,
	right: &Path,
	ignore_matching_lines: &[String],
	mut writer: W,
) -> Result<i32, DiffError> {
	let ignore = ignore_matching_lines
		.iter()
		.map(|pattern| Regex::new(pattern))
		.collect::<Result<Vec<_>, _>>()?;

	let mut names = file_names(left)?;
	names.append(&mut file_names(right)?);

	let mut changed = 0usize;
	for name in names {
		let left_path = left.join(&name);
		let right_path = right.join(&name);
		let old = read_or_empty(&left_path)?;
		let new = read_or_empty(&right_path)?;

		if let Some(patch) = unified_file_diff(&left_path, &right_path, &old, &new, &ignore) {
			writer.write_all(patch.as_bytes()).map_err(DiffError::Write)?;
			changed += 1;
		}
	}
	writer.flush().map_err(DiffError::Write)?;

	debug!(changed, "builtin diff finished");
	Ok(i32::from(changed > 0))
}

/// Names of the regular files directly inside `dir`.
fn file_names(dir: &Path) -> Result<BTreeSet<OsString>, DiffError> {
	let mut names = BTreeSet::new();
	for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
		let entry = entry.map_err(|source| DiffError::ReadDir {
			path: dir.to_path_buf(),
			source,
		})?;
		if entry.file_type().is_file() {
			names.insert(entry.file_name().to_owned());
		}
	}
	Ok(names)
}

/// A file absent on one side compares as empty, like `diff -N`. So does a
/// directory standing in for a file of the same name.
fn read_or_empty(path: &Path) -> Result<String, DiffError> {
	if path.is_dir() {
		debug!(path = %path.display(), "directory compared as missing file");
		return Ok(String::new());
	}
	match fs::read(path) {
		Ok(data) => Ok(String::from_utf8_lossy(&data).into_owned()),
		Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
		Err(source) => Err(DiffError::Read {
			path: path.to_path_buf(),
			source,
		}),
	}
}

/// Unified diff of one file pair, or `None` when nothing is left to report.
///
/// A hunk is dropped when every line it adds or removes matches one of the
/// `ignore` patterns.
pub fn unified_file_diff(
	left: &Path,
	right: &Path,
	old: &str,
	new: &str,
	ignore: &[Regex],
) -> Option<String> {
	if old == new {
		return None;
	}

	let diff = TextDiff::from_lines(old, new);
	let mut unified = diff.unified_diff();
	unified.context_radius(CONTEXT_LINES);

	let hunks: Vec<String> = unified
		.iter_hunks()
		.filter(|hunk| {
			let mut changes = hunk
				.iter_changes()
				.filter(|change| change.tag() != ChangeTag::Equal)
				.peekable();
			let has_changes = changes.peek().is_some();
			!(has_changes
				&& !ignore.is_empty()
				&& changes.all(|change| {
					let line = change.value().trim_end_matches('\n');
					ignore.iter().any(|re| re.is_match(line))
				}))
		})
		.map(|hunk| hunk.to_string())
		.collect();

	if hunks.is_empty() {
		return None;
	}

	let (left, right) = (left.display(), right.display());
	let mut out = format!("diff -uN {left} {right}\n--- {left}\n+++ {right}\n");
	for hunk in hunks {
		out.push_str(&hunk);
	}
	Some(out)
}
