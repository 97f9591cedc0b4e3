//! Logging setup.
//!
//! kubectl forwards our stdout as the diff itself, so logs only ever go to
//! stderr and stay quiet unless asked for.

use std::io::IsTerminal;

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter for the requested level.
///
/// An explicit level (from --log-level or `KUBECTL_NEAT_DIFF_LOG_LEVEL`)
/// wins over `RUST_LOG`; with neither, only warnings and errors pass.
pub fn env_filter(log_level: Option<Level>) -> EnvFilter {
	match log_level {
		Some(level) => EnvFilter::new(level.as_str()),
		None => EnvFilter::builder()
			.with_default_directive(Level::WARN.into())
			.from_env_lossy(),
	}
}

/// Install the global subscriber, writing to stderr.
///
/// A person watching the terminal gets pretty output; when stderr is
/// captured (CI, kubectl wrappers) every event is a JSON line.
pub fn init(log_level: Option<Level>) {
	let stderr_layer = tracing_subscriber::fmt::layer()
		.with_writer(std::io::stderr)
		.with_target(false);
	let stderr_layer = if std::io::stderr().is_terminal() {
		stderr_layer.pretty().boxed()
	} else {
		stderr_layer.json().boxed()
	};

	tracing_subscriber::registry()
		.with(stderr_layer.with_filter(env_filter(log_level)))
		.init();
}
