use thiserror::Error;

/// Errors that can occur while neating a manifest.
#[derive(Debug, Error)]
pub enum NeatError {
	#[error("manifest is not valid UTF-8")]
	InvalidUtf8(#[source] std::str::Utf8Error),

	#[error("parsing manifest as JSON")]
	ParseJson(#[source] serde_json::Error),

	#[error("parsing manifest as YAML")]
	ParseYaml(#[source] serde_yaml::Error),

	#[error("serializing manifest to JSON")]
	SerializeJson(#[source] serde_json::Error),

	#[error("serializing manifest to YAML")]
	SerializeYaml(#[source] serde_yaml::Error),

	#[error("{path}: number {value} cannot be represented in JSON")]
	UnrepresentableNumber { path: String, value: String },

	#[error("{path}: mapping keys must be scalars")]
	UnsupportedKey { path: String },

	#[error("unknown output format '{0}', must be \"same\", \"json\" or \"yaml\"")]
	UnknownOutputFormat(String),
}
