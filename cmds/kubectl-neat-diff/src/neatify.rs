//! In-place neating of the directories kubectl hands to its external diff.

use std::{
	fs, io,
	path::{Path, PathBuf},
};

use kubectl_neat::{neat_yaml_or_json, NeatError, OutputFormat};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, instrument, trace};
use walkdir::WalkDir;

/// Errors that can occur while neating a directory.
#[derive(Debug, Error)]
pub enum NeatifyError {
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

	#[error("neating {}", path.display())]
	Neat {
		path: PathBuf,
		#[source]
		source: NeatError,
	},

	#[error("writing {}", path.display())]
	Write {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
}

/// What happened to a directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeatifySummary {
	/// Regular files seen.
	pub files: usize,
	/// Files whose content changed and was written back.
	pub rewritten: usize,
	/// Subdirectories, which are left alone.
	pub skipped_dirs: usize,
}

/// Regular files directly inside `dir`, sorted by name.
///
/// Symlinks are followed. Subdirectories are counted but not descended into,
/// sockets and pipes are skipped.
pub fn list_files(dir: &Path) -> Result<(Vec<PathBuf>, usize), walkdir::Error> {
	let mut files = Vec::new();
	let mut dirs = 0;

	let walker = WalkDir::new(dir)
		.min_depth(1)
		.max_depth(1)
		.follow_links(true)
		.sort_by_file_name();
	for entry in walker {
		let entry = entry?;
		if entry.file_type().is_dir() {
			debug!(path = %entry.path().display(), "skipping directory");
			dirs += 1;
			continue;
		}
		if !entry.file_type().is_file() {
			debug!(path = %entry.path().display(), "skipping special file");
			continue;
		}
		files.push(entry.into_path());
	}

	Ok((files, dirs))
}

/// Neat every manifest in `dir`, overwriting the files in place.
///
/// Files are processed in parallel; the first failure aborts the run.
#[instrument(skip_all, fields(dir = %dir.display(), %output))]
pub fn neatify_dir(dir: &Path, output: OutputFormat) -> Result<NeatifySummary, NeatifyError> {
	let (files, skipped_dirs) = list_files(dir).map_err(|source| NeatifyError::ReadDir {
		path: dir.to_path_buf(),
		source,
	})?;

	let rewritten = files
		.par_iter()
		.map(|path| neatify_file(path, output))
		.collect::<Result<Vec<bool>, _>>()?
		.into_iter()
		.filter(|rewritten| *rewritten)
		.count();

	let summary = NeatifySummary {
		files: files.len(),
		rewritten,
		skipped_dirs,
	};
	info!(
		files = summary.files,
		rewritten = summary.rewritten,
		skipped_dirs = summary.skipped_dirs,
		"neatified directory"
	);
	Ok(summary)
}

/// Neat one file. Returns whether the file was written.
///
/// The file is truncated and rewritten rather than replaced, so its
/// permissions stay as they were.
fn neatify_file(path: &Path, output: OutputFormat) -> Result<bool, NeatifyError> {
	let data = fs::read(path).map_err(|source| NeatifyError::Read {
		path: path.to_path_buf(),
		source,
	})?;

	let neat = neat_yaml_or_json(&data, output).map_err(|source| NeatifyError::Neat {
		path: path.to_path_buf(),
		source,
	})?;

	if neat.as_bytes() == data.as_slice() {
		trace!(path = %path.display(), "already neat");
		return Ok(false);
	}

	fs::write(path, &neat).map_err(|source| NeatifyError::Write {
		path: path.to_path_buf(),
		source,
	})?;
	debug!(
		path = %path.display(),
		before = data.len(),
		after = neat.len(),
		"neated file"
	);
	Ok(true)
}
