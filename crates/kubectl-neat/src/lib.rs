//! Strip fields that carry little or no information from Kubernetes
//! manifests: server-populated metadata (`managedFields`, `uid`,
//! `resourceVersion`, ...), `status`, scheduler and service account
//! injections, and values equal to their API defaults.
//!
//! ```
//! use kubectl_neat::{neat_yaml_or_json, OutputFormat};
//!
//! let live = "kind: ConfigMap\nmetadata:\n  name: app\n  uid: 0b5c\ndata:\n  key: value\n";
//! let neat = neat_yaml_or_json(live.as_bytes(), OutputFormat::Same).unwrap();
//! assert!(!neat.contains("uid"));
//! ```

mod defaults;
mod empty;
mod error;
pub mod format;
mod metadata;
mod pod;

use serde_json::{Map, Value};
use tracing::{instrument, trace};

pub use error::NeatError;
pub use format::{Encoding, OutputFormat};

fn is_list(object: &Map<String, Value>) -> bool {
	match object.get("kind").and_then(Value::as_str) {
		Some("List") => true,
		Some(kind) => kind.ends_with("List") && matches!(object.get("items"), Some(Value::Array(_))),
		None => false,
	}
}

/// Neat a single decoded object.
///
/// Values that are not objects are returned unchanged. Lists have each of
/// their items neated, plus their own metadata.
pub fn neat(value: Value) -> Value {
	let mut object = match value {
		Value::Object(object) => object,
		other => return other,
	};

	if is_list(&object) {
		if let Some(Value::Array(items)) = object.get_mut("items") {
			for item in items.iter_mut() {
				*item = neat(std::mem::take(item));
			}
		}
		metadata::neat_metadata(&mut object);
		return Value::Object(object);
	}

	defaults::neat_defaults(&mut object);
	pod::neat_scheduler(&mut object);
	if object.get("kind").and_then(Value::as_str) == Some("Pod") {
		pod::neat_service_account(&mut object);
	}
	metadata::neat_metadata(&mut object);
	object.remove("status");

	let mut value = Value::Object(object);
	empty::neat_empty(&mut value);
	value
}

/// Neat a YAML or JSON manifest, keeping or converting its encoding.
///
/// Input without any document (blank, or only comments and empty `---`
/// sections) is passed through untouched.
#[instrument(skip_all, fields(len = data.len(), %output))]
pub fn neat_yaml_or_json(data: &[u8], output: OutputFormat) -> Result<String, NeatError> {
	let text = std::str::from_utf8(data).map_err(NeatError::InvalidUtf8)?;
	if text.trim().is_empty() {
		return Ok(text.to_string());
	}

	let detected = Encoding::detect(text);
	let documents = format::decode(text, detected)?;
	trace!(?detected, documents = documents.len(), "decoded manifest");
	if documents.is_empty() {
		return Ok(text.to_string());
	}

	let neated = documents.into_iter().map(neat).collect();
	format::encode(neated, output.resolve(detected))
}
