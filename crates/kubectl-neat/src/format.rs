//! Detection, decoding and encoding of manifest documents.

use std::{fmt, str::FromStr};

use serde::Deserialize;
use serde_json::Value;

use crate::NeatError;

/// Encoding of a manifest document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
	Json,
	Yaml,
}

impl Encoding {
	/// Anything that does not open with `{` is treated as YAML, which is
	/// also what kubectl writes into the diff directories.
	pub fn detect(text: &str) -> Self {
		if text.trim_start().starts_with('{') {
			Self::Json
		} else {
			Self::Yaml
		}
	}
}

/// Requested encoding of neated output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
	/// Keep the encoding the input was written in.
	#[default]
	Same,
	Json,
	Yaml,
}

impl OutputFormat {
	pub fn resolve(self, detected: Encoding) -> Encoding {
		match self {
			Self::Same => detected,
			Self::Json => Encoding::Json,
			Self::Yaml => Encoding::Yaml,
		}
	}
}

impl FromStr for OutputFormat {
	type Err = NeatError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"same" => Ok(Self::Same),
			"json" => Ok(Self::Json),
			"yaml" => Ok(Self::Yaml),
			_ => Err(NeatError::UnknownOutputFormat(s.to_string())),
		}
	}
}

impl fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Same => write!(f, "same"),
			Self::Json => write!(f, "json"),
			Self::Yaml => write!(f, "yaml"),
		}
	}
}

/// Decode every document contained in `text`.
///
/// JSON input holds exactly one document. YAML input may be a stream of
/// `---` separated documents; empty documents are dropped.
pub fn decode(text: &str, encoding: Encoding) -> Result<Vec<Value>, NeatError> {
	match encoding {
		Encoding::Json => {
			let value = serde_json::from_str(text).map_err(NeatError::ParseJson)?;
			Ok(vec![value])
		}
		Encoding::Yaml => {
			let mut documents = Vec::new();
			for document in serde_yaml::Deserializer::from_str(text) {
				let yaml = serde_yaml::Value::deserialize(document).map_err(NeatError::ParseYaml)?;
				let value = yaml_to_json(yaml, &mut Vec::new())?;
				if !value.is_null() {
					documents.push(value);
				}
			}
			Ok(documents)
		}
	}
}

/// Convert a YAML value to JSON. Numbers JSON cannot hold (`.inf`, `.nan`)
/// and collection keys are errors naming their `path`.
fn yaml_to_json(value: serde_yaml::Value, path: &mut Vec<String>) -> Result<Value, NeatError> {
	use serde_yaml::Value as Yaml;

	Ok(match value {
		Yaml::Null => Value::Null,
		Yaml::Bool(b) => Value::Bool(b),
		Yaml::String(s) => Value::String(s),
		Yaml::Number(n) => {
			if let Some(i) = n.as_i64() {
				Value::from(i)
			} else if let Some(u) = n.as_u64() {
				Value::from(u)
			} else {
				n.as_f64()
					.and_then(serde_json::Number::from_f64)
					.map(Value::Number)
					.ok_or_else(|| NeatError::UnrepresentableNumber {
						path: path.join("."),
						value: n.to_string(),
					})?
			}
		}
		Yaml::Sequence(items) => {
			let mut out = Vec::with_capacity(items.len());
			for (i, item) in items.into_iter().enumerate() {
				path.push(i.to_string());
				out.push(yaml_to_json(item, path)?);
				path.pop();
			}
			Value::Array(out)
		}
		Yaml::Mapping(mapping) => {
			let mut out = serde_json::Map::with_capacity(mapping.len());
			for (key, value) in mapping {
				let key = match key {
					Yaml::String(s) => s,
					Yaml::Number(n) => n.to_string(),
					Yaml::Bool(b) => b.to_string(),
					Yaml::Null => "null".to_string(),
					_ => {
						return Err(NeatError::UnsupportedKey {
							path: path.join("."),
						})
					}
				};
				path.push(key.clone());
				let value = yaml_to_json(value, path)?;
				path.pop();
				out.insert(key, value);
			}
			Value::Object(out)
		}
		Yaml::Tagged(tagged) => yaml_to_json(tagged.value, path)?,
	})
}

/// Encode documents with sorted keys.
///
/// A single document is written as-is; several JSON documents become a JSON
/// array, several YAML documents a `---` separated stream.
pub fn encode(documents: Vec<Value>, encoding: Encoding) -> Result<String, NeatError> {
	let mut documents: Vec<Value> = documents.into_iter().map(sort_keys).collect();

	match encoding {
		Encoding::Json => {
			let mut out = if documents.len() == 1 {
				serde_json::to_string_pretty(&documents.remove(0))
			} else {
				serde_json::to_string_pretty(&documents)
			}
			.map_err(NeatError::SerializeJson)?;
			out.push('\n');
			Ok(out)
		}
		Encoding::Yaml => {
			let mut out = String::new();
			for (i, document) in documents.iter().enumerate() {
				if i > 0 {
					out.push_str("---\n");
				}
				let yaml = serde_yaml::to_string(document).map_err(NeatError::SerializeYaml)?;
				out.push_str(&yaml);
			}
			Ok(out)
		}
	}
}

/// Sort object keys recursively, byte-wise.
///
/// Both sides of a diff go through here, so field order never shows up as a
/// change.
pub fn sort_keys(value: Value) -> Value {
	match value {
		Value::Object(map) => {
			let mut entries: Vec<(String, Value)> = map.into_iter().collect();
			entries.sort_by(|(a, _), (b, _)| a.cmp(b));

			let sorted: serde_json::Map<String, Value> = entries
				.into_iter()
				.map(|(k, v)| (k, sort_keys(v)))
				.collect();
			Value::Object(sorted)
		}
		Value::Array(arr) => Value::Array(arr.into_iter().map(sort_keys).collect()),
		other => other,
	}
}
