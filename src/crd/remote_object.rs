//! RemoteObject Custom Resource Definition

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::condition::{find_condition, Condition};

/// Condition type set once the object was pushed to the remote cluster.
pub const REMOTE_OBJECT_SYNCED: &str = "fleetsync.dev/Synced";

/// Condition type carrying the availability probe result.
pub const REMOTE_OBJECT_AVAILABLE: &str = "fleetsync.dev/Available";

/// Probe type that watches a named status condition of the remote object.
pub const PROBE_TYPE_CONDITION: &str = "Condition";

/// RemoteObject declares a single object to mirror into the cluster owning its namespace
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "fleetsync.dev",
    version = "v1alpha1",
    kind = "RemoteObject",
    plural = "remoteobjects",
    singular = "remoteobject",
    shortname = "ro",
    namespaced,
    status = "RemoteObjectStatus",
    printcolumn = r#"{"name": "Phase", "type": "string", "jsonPath": ".status.phase"}"#,
    printcolumn = r#"{"name": "Kind", "type": "string", "jsonPath": ".spec.object.kind"}"#,
    printcolumn = r#"{"name": "Heartbeat", "type": "date", "jsonPath": ".status.lastHeartbeatTime"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObjectSpec {
    /// Complete manifest of the object to create in the remote cluster
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub object: serde_json::Value,

    /// How availability of the remote object is determined
    pub availability_probe: AvailabilityProbe,

    /// RemoteObjectPriorityClass controlling the resync interval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_class_name: Option<String>,
}

fn preserve_unknown_fields(_: &mut SchemaGenerator) -> Schema {
    let mut schema = SchemaObject {
        instance_type: Some(InstanceType::Object.into()),
        ..Default::default()
    };
    schema.extensions.insert(
        "x-kubernetes-preserve-unknown-fields".to_string(),
        serde_json::Value::Bool(true),
    );
    schema.extensions.insert(
        "x-kubernetes-embedded-resource".to_string(),
        serde_json::Value::Bool(true),
    );
    Schema::Object(schema)
}

/// Availability probe configuration
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityProbe {
    /// Probe type. Only `Condition` is evaluated.
    #[serde(rename = "type")]
    pub type_: String,

    /// Settings for the `Condition` probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionProbe>,
}

/// Watches a status condition of the remote object
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConditionProbe {
    /// Condition type to watch
    #[serde(rename = "type")]
    pub type_: String,
}

/// RemoteObject status
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObjectStatus {
    /// Generation the remote status is known to reflect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Own conditions plus conditions mirrored from the remote object
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Phase derived from the Available condition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<RemoteObjectPhase>,

    /// Last successful sync
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_heartbeat_time: Option<DateTime<Utc>>,
}

impl RemoteObjectStatus {
    pub fn update_phase(&mut self) {
        self.phase = Some(RemoteObjectPhase::from_conditions(&self.conditions));
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum RemoteObjectPhase {
    Pending,
    Available,
    Unavailable,
}

impl RemoteObjectPhase {
    pub fn from_conditions(conditions: &[Condition]) -> Self {
        match find_condition(conditions, REMOTE_OBJECT_AVAILABLE) {
            Some(c) if c.is_true() => RemoteObjectPhase::Available,
            Some(c) if c.is_false() => RemoteObjectPhase::Unavailable,
            _ => RemoteObjectPhase::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteObjectPhase::Pending => "Pending",
            RemoteObjectPhase::Available => "Available",
            RemoteObjectPhase::Unavailable => "Unavailable",
        }
    }
}
