//! RemoteCluster Custom Resource Definition

use std::time::Duration;

use chrono::{DateTime, Utc};
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::condition::{find_condition, Condition};
use super::duration::parse_duration;

/// Condition type reporting whether the remote API server answers.
pub const REMOTE_CLUSTER_REACHABLE: &str = "Reachable";

/// Secret type a kubeconfig secret must declare.
pub const SECRET_TYPE_KUBECONFIG: &str = "fleetsync.dev/kubeconfig";

/// Data key holding the kubeconfig document.
pub const SECRET_KUBECONFIG_KEY: &str = "kubeconfig";

/// Prefix of the local namespace created for every cluster.
pub const CLUSTER_NAMESPACE_PREFIX: &str = "cluster-";

pub const DEFAULT_CLUSTER_RESYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// RemoteCluster registers a cluster reachable through a kubeconfig secret
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "fleetsync.dev",
    version = "v1alpha1",
    kind = "RemoteCluster",
    plural = "remoteclusters",
    singular = "remotecluster",
    shortname = "rc",
    status = "RemoteClusterStatus",
    printcolumn = r#"{"name": "Phase", "type": "string", "jsonPath": ".status.phase"}"#,
    printcolumn = r#"{"name": "API Server", "type": "string", "jsonPath": ".status.remoteClusterState.apiServer"}"#,
    printcolumn = r#"{"name": "Version", "type": "string", "jsonPath": ".status.remoteClusterState.version"}"#,
    printcolumn = r#"{"name": "Namespace", "type": "string", "jsonPath": ".status.localNamespace"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RemoteClusterSpec {
    /// Secret holding the kubeconfig used to reach the cluster
    pub kubeconfig_secret: KubeconfigSecretRef,

    /// How often the connection is health-checked
    #[serde(default = "default_resync_interval")]
    pub resync_interval: String,
}

fn default_resync_interval() -> String {
    "5m".to_string()
}

impl RemoteClusterSpec {
    pub fn resync_interval(&self) -> Duration {
        parse_duration(&self.resync_interval)
            .filter(|interval| !interval.is_zero())
            .unwrap_or_else(|| {
                warn!(
                    interval = %self.resync_interval,
                    "Unparsable or zero resyncInterval, using default"
                );
                DEFAULT_CLUSTER_RESYNC_INTERVAL
            })
    }
}

/// Location of the kubeconfig secret
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubeconfigSecretRef {
    /// Secret name
    pub name: String,
    /// Secret namespace
    pub namespace: String,
}

impl RemoteCluster {
    /// Name of the local namespace holding this cluster's RemoteObjects.
    pub fn local_namespace_name(&self) -> String {
        format!("{}{}", CLUSTER_NAMESPACE_PREFIX, self.name_any())
    }
}

/// RemoteCluster status
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteClusterStatus {
    /// Generation last processed by the controller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Status conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Phase derived from the Reachable condition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<RemoteClusterPhase>,

    /// What is known about the remote API server
    #[serde(default)]
    pub remote_cluster_state: RemoteClusterState,

    /// Namespace created for this cluster's RemoteObjects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_namespace: Option<String>,

    /// Last health check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_heartbeat_time: Option<DateTime<Utc>>,
}

impl RemoteClusterStatus {
    pub fn update_phase(&mut self) {
        self.phase = Some(RemoteClusterPhase::from_conditions(&self.conditions));
    }
}

/// Remote API server facts
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteClusterState {
    /// API server URL taken from the kubeconfig
    #[serde(default)]
    pub api_server: String,

    /// Version reported by the API server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum RemoteClusterPhase {
    Pending,
    Reachable,
    Unreachable,
    Unknown,
}

impl RemoteClusterPhase {
    pub fn from_conditions(conditions: &[Condition]) -> Self {
        match find_condition(conditions, REMOTE_CLUSTER_REACHABLE) {
            None => RemoteClusterPhase::Pending,
            Some(c) if c.is_true() => RemoteClusterPhase::Reachable,
            Some(c) if c.is_false() => RemoteClusterPhase::Unreachable,
            Some(_) => RemoteClusterPhase::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteClusterPhase::Pending => "Pending",
            RemoteClusterPhase::Reachable => "Reachable",
            RemoteClusterPhase::Unreachable => "Unreachable",
            RemoteClusterPhase::Unknown => "Unknown",
        }
    }
}
