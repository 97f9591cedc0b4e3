//! Fields the scheduler and the service account admission controller
//! inject into pods.

use serde_json::{Map, Value};

/// Prefixes of the token volumes mounted into every pod.
const TOKEN_VOLUME_PREFIXES: &[&str] = &["default-token-", "kube-api-access-"];

/// Remove the node a pod was scheduled onto.
pub fn neat_scheduler(object: &mut Map<String, Value>) {
	if let Some(Value::Object(spec)) = object.get_mut("spec") {
		spec.remove("nodeName");
	}
}

/// Remove the default service account and its automatically mounted token.
pub fn neat_service_account(object: &mut Map<String, Value>) {
	let Some(Value::Object(spec)) = object.get_mut("spec") else {
		return;
	};

	for field in ["serviceAccount", "serviceAccountName"] {
		if spec.get(field).and_then(Value::as_str) == Some("default") {
			spec.remove(field);
		}
	}

	let mut token_volumes = Vec::new();
	if let Some(Value::Array(volumes)) = spec.get_mut("volumes") {
		volumes.retain(|volume| match volume_name(volume) {
			Some(name) if is_token_volume(name) => {
				token_volumes.push(name.to_string());
				false
			}
			_ => true,
		});
	}
	if token_volumes.is_empty() {
		return;
	}

	for list in ["containers", "initContainers"] {
		let Some(Value::Array(containers)) = spec.get_mut(list) else {
			continue;
		};
		for container in containers {
			if let Some(Value::Array(mounts)) = container.get_mut("volumeMounts") {
				mounts.retain(|mount| {
					volume_name(mount).map_or(true, |name| !token_volumes.iter().any(|t| t == name))
				});
			}
		}
	}
}

fn volume_name(value: &Value) -> Option<&str> {
	value.get("name").and_then(Value::as_str)
}

fn is_token_volume(name: &str) -> bool {
	TOKEN_VOLUME_PREFIXES
		.iter()
		.any(|prefix| name.starts_with(prefix))
}
