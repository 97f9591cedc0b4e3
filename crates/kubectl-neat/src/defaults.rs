//! Removal of fields the API server fills in with default values.
//!
//! Without the Kubernetes type registry at hand, defaults are described by
//! a table of partial documents: every leaf in a table entry that compares
//! equal to the manifest value is removed. Arrays (containers, ports,
//! volumes) are walked explicitly.

use std::sync::OnceLock;

use serde_json::{json, Map, Value};

static WORKLOAD_DEFAULTS: OnceLock<Value> = OnceLock::new();
static POD_SPEC_DEFAULTS: OnceLock<Value> = OnceLock::new();
static CONTAINER_DEFAULTS: OnceLock<Value> = OnceLock::new();
static PROBE_DEFAULTS: OnceLock<Value> = OnceLock::new();
static PORT_DEFAULTS: OnceLock<Value> = OnceLock::new();
static VOLUME_DEFAULTS: OnceLock<Value> = OnceLock::new();

const PROBES: &[&str] = &["livenessProbe", "readinessProbe", "startupProbe"];
const CONTAINER_LISTS: &[&str] = &["containers", "initContainers"];

/// Spec-level defaults, keyed by kind.
fn workload_defaults() -> &'static Value {
	WORKLOAD_DEFAULTS.get_or_init(|| {
		json!({
			"Deployment": {
				"progressDeadlineSeconds": 600,
				"revisionHistoryLimit": 10,
				"strategy": {
					"type": "RollingUpdate",
					"rollingUpdate": {"maxSurge": "25%", "maxUnavailable": "25%"}
				}
			},
			"StatefulSet": {
				"podManagementPolicy": "OrderedReady",
				"revisionHistoryLimit": 10,
				"updateStrategy": {
					"type": "RollingUpdate",
					"rollingUpdate": {"partition": 0}
				},
				"persistentVolumeClaimRetentionPolicy": {
					"whenDeleted": "Retain",
					"whenScaled": "Retain"
				}
			},
			"DaemonSet": {
				"revisionHistoryLimit": 10,
				"updateStrategy": {
					"type": "RollingUpdate",
					"rollingUpdate": {"maxSurge": 0, "maxUnavailable": 1}
				}
			},
			"Job": {
				"backoffLimit": 6,
				"completionMode": "NonIndexed",
				"completions": 1,
				"parallelism": 1,
				"suspend": false
			},
			"CronJob": {
				"concurrencyPolicy": "Allow",
				"failedJobsHistoryLimit": 1,
				"successfulJobsHistoryLimit": 3,
				"suspend": false
			},
			"Service": {
				"internalTrafficPolicy": "Cluster",
				"ipFamilyPolicy": "SingleStack",
				"sessionAffinity": "None",
				"type": "ClusterIP"
			}
		})
	})
}

fn pod_spec_defaults() -> &'static Value {
	POD_SPEC_DEFAULTS.get_or_init(|| {
		json!({
			"dnsPolicy": "ClusterFirst",
			"enableServiceLinks": true,
			"preemptionPolicy": "PreemptLowerPriority",
			"priority": 0,
			"restartPolicy": "Always",
			"schedulerName": "default-scheduler",
			"terminationGracePeriodSeconds": 30
		})
	})
}

fn container_defaults() -> &'static Value {
	CONTAINER_DEFAULTS.get_or_init(|| {
		json!({
			"terminationMessagePath": "/dev/termination-log",
			"terminationMessagePolicy": "File"
		})
	})
}

fn probe_defaults() -> &'static Value {
	PROBE_DEFAULTS.get_or_init(|| {
		json!({
			"failureThreshold": 3,
			"periodSeconds": 10,
			"successThreshold": 1,
			"timeoutSeconds": 1,
			"httpGet": {"scheme": "HTTP"}
		})
	})
}

fn port_defaults() -> &'static Value {
	PORT_DEFAULTS.get_or_init(|| json!({"protocol": "TCP"}))
}

fn volume_defaults() -> &'static Value {
	VOLUME_DEFAULTS.get_or_init(|| {
		json!({
			"configMap": {"defaultMode": 420},
			"downwardAPI": {"defaultMode": 420},
			"projected": {"defaultMode": 420},
			"secret": {"defaultMode": 420}
		})
	})
}

const POD_SPEC: &[&str] = &["spec"];
const TEMPLATE_POD_SPEC: &[&str] = &["spec", "template", "spec"];
const JOB_TEMPLATE_POD_SPEC: &[&str] = &["spec", "jobTemplate", "spec", "template", "spec"];

/// Path from the object root to the pod spec for kinds that embed one.
fn pod_spec_path(kind: &str) -> Option<&'static [&'static str]> {
	match kind {
		"Pod" => Some(POD_SPEC),
		"Deployment" | "StatefulSet" | "DaemonSet" | "ReplicaSet" | "ReplicationController"
		| "Job" => Some(TEMPLATE_POD_SPEC),
		"CronJob" => Some(JOB_TEMPLATE_POD_SPEC),
		_ => None,
	}
}

/// Remove every field of `object` that equals its documented default.
pub fn neat_defaults(object: &mut Map<String, Value>) {
	let Some(kind) = object.get("kind").and_then(Value::as_str).map(str::to_owned) else {
		return;
	};

	if let Some(spec) = descend(object, &["spec"]) {
		prune(spec, workload_defaults().get(kind.as_str()));
		if kind == "Service" {
			prune_each(spec, "ports", port_defaults());
		}
	}

	if kind == "CronJob" {
		if let Some(job_spec) = descend(object, &["spec", "jobTemplate", "spec"]) {
			prune(job_spec, workload_defaults().get("Job"));
		}
	}

	if let Some(path) = pod_spec_path(&kind) {
		if let Some(pod_spec) = descend(object, path) {
			neat_pod_spec(pod_spec);
		}
	}
}

fn neat_pod_spec(spec: &mut Map<String, Value>) {
	prune(spec, Some(pod_spec_defaults()));

	for list in CONTAINER_LISTS {
		if let Some(Value::Array(containers)) = spec.get_mut(*list) {
			for container in containers.iter_mut().filter_map(Value::as_object_mut) {
				neat_container(container);
			}
		}
	}

	prune_each(spec, "volumes", volume_defaults());
}

fn neat_container(container: &mut Map<String, Value>) {
	prune(container, Some(container_defaults()));
	prune_each(container, "ports", port_defaults());

	for name in PROBES {
		if let Some(Value::Object(probe)) = container.get_mut(*name) {
			prune(probe, Some(probe_defaults()));
		}
	}

	let default_policy = container
		.get("image")
		.and_then(Value::as_str)
		.map(default_pull_policy);
	if default_policy.is_some()
		&& container.get("imagePullPolicy").and_then(Value::as_str) == default_policy
	{
		container.remove("imagePullPolicy");
	}
}

/// The pull policy the API server picks when none is given.
pub fn default_pull_policy(image: &str) -> &'static str {
	if image.contains('@') {
		return "IfNotPresent";
	}
	// A registry port (`host:5000/app`) is not a tag.
	let name = image.rsplit('/').next().unwrap_or(image);
	match name.rsplit_once(':') {
		None | Some((_, "latest")) => "Always",
		Some(_) => "IfNotPresent",
	}
}

fn descend<'a>(
	object: &'a mut Map<String, Value>,
	path: &[&str],
) -> Option<&'a mut Map<String, Value>> {
	path.iter()
		.try_fold(object, |current, key| current.get_mut(*key)?.as_object_mut())
}

/// Apply `defaults` to every object element of the array at `field`.
fn prune_each(object: &mut Map<String, Value>, field: &str, defaults: &Value) {
	if let Some(Value::Array(items)) = object.get_mut(field) {
		for item in items.iter_mut().filter_map(Value::as_object_mut) {
			prune(item, Some(defaults));
		}
	}
}

fn prune(object: &mut Map<String, Value>, defaults: Option<&Value>) {
	let Some(Value::Object(defaults)) = defaults else {
		return;
	};

	for (key, default) in defaults {
		let matches = match (object.get_mut(key), default) {
			(Some(Value::Object(child)), Value::Object(_)) => {
				prune(child, Some(default));
				false
			}
			(Some(current), _) => *current == *default,
			(None, _) => false,
		};
		if matches {
			object.remove(key);
		}
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	fn neated(value: Value) -> Value {
		let Value::Object(mut object) = value else {
			panic!("expected object");
		};
		neat_defaults(&mut object);
		Value::Object(object)
	}

	#[rstest]
	#[case::untagged("nginx", "Always")]
	#[case::latest("nginx:latest", "Always")]
	#[case::tagged("nginx:1.25", "IfNotPresent")]
	#[case::registry_port_untagged("registry.local:5000/team/app", "Always")]
	#[case::registry_port_tagged("registry.local:5000/team/app:v2", "IfNotPresent")]
	#[case::digest("nginx@sha256:0123abcd", "IfNotPresent")]
	fn test_default_pull_policy(#[case] image: &str, #[case] expected: &str) {
		assert_eq!(default_pull_policy(image), expected);
	}

	#[test]
	fn test_deployment_defaults() {
		let value = json!({
			"kind": "Deployment",
			"spec": {
				"replicas": 1,
				"progressDeadlineSeconds": 600,
				"revisionHistoryLimit": 5,
				"strategy": {
					"type": "RollingUpdate",
					"rollingUpdate": {"maxSurge": 1, "maxUnavailable": "25%"}
				},
				"template": {
					"spec": {
						"dnsPolicy": "ClusterFirst",
						"restartPolicy": "Always",
						"schedulerName": "default-scheduler",
						"terminationGracePeriodSeconds": 60,
						"containers": [{
							"name": "app",
							"image": "nginx:1.25",
							"imagePullPolicy": "IfNotPresent",
							"terminationMessagePath": "/dev/termination-log",
							"terminationMessagePolicy": "File",
							"ports": [{"containerPort": 80, "protocol": "TCP"}],
							"readinessProbe": {
								"httpGet": {"path": "/healthz", "port": 80, "scheme": "HTTP"},
								"periodSeconds": 10,
								"timeoutSeconds": 5
							}
						}],
						"volumes": [{"name": "config", "configMap": {"name": "app", "defaultMode": 420}}]
					}
				}
			}
		});

		let expected = json!({
			"kind": "Deployment",
			"spec": {
				"replicas": 1,
				"revisionHistoryLimit": 5,
				"strategy": {
					"rollingUpdate": {"maxSurge": 1}
				},
				"template": {
					"spec": {
						"terminationGracePeriodSeconds": 60,
						"containers": [{
							"name": "app",
							"image": "nginx:1.25",
							"ports": [{"containerPort": 80}],
							"readinessProbe": {
								"httpGet": {"path": "/healthz", "port": 80},
								"timeoutSeconds": 5
							}
						}],
						"volumes": [{"name": "config", "configMap": {"name": "app"}}]
					}
				}
			}
		});

		assert_eq!(neated(value), expected);
	}

	#[test]
	fn test_keeps_non_default_pull_policy() {
		let value = json!({
			"kind": "Pod",
			"spec": {
				"containers": [{"name": "app", "image": "nginx:1.25", "imagePullPolicy": "Always"}]
			}
		});

		assert_eq!(neated(value.clone()), value);
	}

	#[test]
	fn test_cronjob_defaults() {
		let value = json!({
			"kind": "CronJob",
			"spec": {
				"schedule": "*/5 * * * *",
				"concurrencyPolicy": "Allow",
				"suspend": false,
				"jobTemplate": {
					"spec": {
						"backoffLimit": 6,
						"template": {
							"spec": {
								"restartPolicy": "OnFailure",
								"containers": [{"name": "job", "image": "busybox", "imagePullPolicy": "Always"}]
							}
						}
					}
				}
			}
		});

		let expected = json!({
			"kind": "CronJob",
			"spec": {
				"schedule": "*/5 * * * *",
				"jobTemplate": {
					"spec": {
						"template": {
							"spec": {
								"restartPolicy": "OnFailure",
								"containers": [{"name": "job", "image": "busybox"}]
							}
						}
					}
				}
			}
		});

		assert_eq!(neated(value), expected);
	}

	#[test]
	fn test_service_defaults() {
		let value = json!({
			"kind": "Service",
			"spec": {
				"type": "ClusterIP",
				"sessionAffinity": "None",
				"ports": [{"port": 53, "protocol": "UDP"}, {"port": 80, "protocol": "TCP"}]
			}
		});

		let expected = json!({
			"kind": "Service",
			"spec": {
				"ports": [{"port": 53, "protocol": "UDP"}, {"port": 80}]
			}
		});

		assert_eq!(neated(value), expected);
	}

	#[rstest]
	#[case::statefulset(
		"StatefulSet",
		json!({
			"serviceName": "db",
			"podManagementPolicy": "OrderedReady",
			"revisionHistoryLimit": 10,
			"updateStrategy": {"type": "RollingUpdate", "rollingUpdate": {"partition": 0}},
			"persistentVolumeClaimRetentionPolicy": {"whenDeleted": "Retain", "whenScaled": "Retain"}
		}),
		json!({
			"serviceName": "db",
			"updateStrategy": {"rollingUpdate": {}},
			"persistentVolumeClaimRetentionPolicy": {}
		})
	)]
	#[case::statefulset_parallel(
		"StatefulSet",
		json!({"podManagementPolicy": "Parallel", "updateStrategy": {"type": "OnDelete"}}),
		json!({"podManagementPolicy": "Parallel", "updateStrategy": {"type": "OnDelete"}})
	)]
	#[case::daemonset(
		"DaemonSet",
		json!({
			"revisionHistoryLimit": 10,
			"updateStrategy": {"type": "RollingUpdate", "rollingUpdate": {"maxSurge": 0, "maxUnavailable": 1}}
		}),
		json!({"updateStrategy": {"rollingUpdate": {}}})
	)]
	#[case::daemonset_surge(
		"DaemonSet",
		json!({"updateStrategy": {"rollingUpdate": {"maxSurge": 1, "maxUnavailable": 0}}}),
		json!({"updateStrategy": {"rollingUpdate": {"maxSurge": 1, "maxUnavailable": 0}}})
	)]
	#[case::job(
		"Job",
		json!({
			"backoffLimit": 6,
			"completionMode": "NonIndexed",
			"completions": 1,
			"parallelism": 1,
			"suspend": false,
			"ttlSecondsAfterFinished": 100
		}),
		json!({"ttlSecondsAfterFinished": 100})
	)]
	#[case::job_indexed(
		"Job",
		json!({"backoffLimit": 2, "completionMode": "Indexed", "completions": 5, "suspend": true}),
		json!({"backoffLimit": 2, "completionMode": "Indexed", "completions": 5, "suspend": true})
	)]
	fn test_workload_spec_defaults(#[case] kind: &str, #[case] spec: Value, #[case] expected: Value) {
		let value = json!({"kind": kind, "spec": spec});
		assert_eq!(neated(value), json!({"kind": kind, "spec": expected}));
	}

	#[rstest]
	#[case::replicaset("ReplicaSet")]
	#[case::replication_controller("ReplicationController")]
	#[case::statefulset("StatefulSet")]
	#[case::daemonset("DaemonSet")]
	#[case::job("Job")]
	fn test_pod_template_defaults(#[case] kind: &str) {
		let value = json!({
			"kind": kind,
			"spec": {
				"template": {
					"spec": {
						"dnsPolicy": "ClusterFirst",
						"enableServiceLinks": true,
						"priority": 0,
						"restartPolicy": "Never",
						"containers": [{
							"name": "app",
							"image": "app:latest",
							"imagePullPolicy": "Always",
							"terminationMessagePolicy": "FallbackToLogsOnError"
						}]
					}
				}
			}
		});

		let expected = json!({
			"kind": kind,
			"spec": {
				"template": {
					"spec": {
						"restartPolicy": "Never",
						"containers": [{
							"name": "app",
							"image": "app:latest",
							"terminationMessagePolicy": "FallbackToLogsOnError"
						}]
					}
				}
			}
		});

		assert_eq!(neated(value), expected);
	}

	#[test]
	fn test_volume_default_mode() {
		let value = json!({
			"kind": "Pod",
			"spec": {
				"volumes": [
					{"name": "cm", "configMap": {"name": "app", "defaultMode": 420}},
					{"name": "secret", "secret": {"secretName": "tls", "defaultMode": 420}},
					{"name": "private", "secret": {"secretName": "key", "defaultMode": 256}},
					{"name": "projected", "projected": {"sources": [], "defaultMode": 420}},
					{"name": "info", "downwardAPI": {"items": [], "defaultMode": 420}},
					{"name": "scratch", "emptyDir": {}}
				]
			}
		});

		let expected = json!({
			"kind": "Pod",
			"spec": {
				"volumes": [
					{"name": "cm", "configMap": {"name": "app"}},
					{"name": "secret", "secret": {"secretName": "tls"}},
					{"name": "private", "secret": {"secretName": "key", "defaultMode": 256}},
					{"name": "projected", "projected": {"sources": []}},
					{"name": "info", "downwardAPI": {"items": []}},
					{"name": "scratch", "emptyDir": {}}
				]
			}
		});

		assert_eq!(neated(value), expected);
	}

	#[rstest]
	#[case::liveness("livenessProbe")]
	#[case::readiness("readinessProbe")]
	#[case::startup("startupProbe")]
	fn test_probe_defaults(#[case] probe: &str) {
		let value = json!({
			"kind": "Pod",
			"spec": {
				"containers": [{
					"name": "app",
					(probe): {
						"tcpSocket": {"port": 8080},
						"failureThreshold": 3,
						"periodSeconds": 10,
						"successThreshold": 1,
						"timeoutSeconds": 1,
						"initialDelaySeconds": 15
					}
				}]
			}
		});

		let expected = json!({
			"kind": "Pod",
			"spec": {
				"containers": [{
					"name": "app",
					(probe): {
						"tcpSocket": {"port": 8080},
						"initialDelaySeconds": 15
					}
				}]
			}
		});

		assert_eq!(neated(value), expected);
	}

	#[test]
	fn test_unknown_kind_is_untouched() {
		let value = json!({"kind": "ConfigMap", "spec": {"restartPolicy": "Always"}});
		assert_eq!(neated(value.clone()), value);
	}
}
