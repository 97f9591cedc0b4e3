use serde_json::Value;

/// Whether a value carries no information once cleaned.
fn is_empty(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::String(s) => s.is_empty(),
		Value::Array(arr) => arr.is_empty(),
		Value::Object(map) => map.is_empty(),
		Value::Bool(_) | Value::Number(_) => false,
	}
}

/// Recursively remove nulls, empty strings, empty arrays and empty objects.
///
/// Children are cleaned before their parent is checked, so an object whose
/// only field was `creationTimestamp: null` disappears as a whole. The root
/// value is never removed, only emptied.
pub fn neat_empty(value: &mut Value) {
	match value {
		Value::Object(map) => {
			for child in map.values_mut() {
				neat_empty(child);
			}
			map.retain(|_, child| !is_empty(child));
		}
		Value::Array(arr) => {
			for child in arr.iter_mut() {
				neat_empty(child);
			}
			arr.retain(|child| !is_empty(child));
		}
		_ => {}
	}
}
