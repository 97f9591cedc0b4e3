use serde_json::{Map, Value};

/// Annotations maintained by kubectl and controllers, never by the user.
const NOISY_ANNOTATIONS: &[&str] = &[
	"kubectl.kubernetes.io/last-applied-configuration",
	"deployment.kubernetes.io/revision",
];

/// Metadata fields that survive neating.
const KEPT_FIELDS: &[&str] = &["name", "namespace", "labels", "annotations"];

/// Reduce `metadata` to the fields a user actually writes.
///
/// Everything the server attaches (managedFields, uid, resourceVersion,
/// creationTimestamp, generation, ownerReferences, ...) is dropped.
pub fn neat_metadata(object: &mut Map<String, Value>) {
	let Some(Value::Object(metadata)) = object.get_mut("metadata") else {
		return;
	};

	if let Some(Value::Object(annotations)) = metadata.get_mut("annotations") {
		for annotation in NOISY_ANNOTATIONS {
			annotations.remove(*annotation);
		}
	}

	let mut kept = Map::new();
	for field in KEPT_FIELDS {
		if let Some(value) = metadata.remove(*field) {
			kept.insert((*field).to_string(), value);
		}
	}
	*metadata = kept;
}
