//! RemoteObjectPriorityClass Custom Resource Definition

use std::time::Duration;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::duration::parse_duration;

/// Resync interval used when a RemoteObject names no priority class.
pub const DEFAULT_OBJECT_RESYNC_INTERVAL: Duration = Duration::from_secs(60);

/// RemoteObjectPriorityClass is a named resync interval for RemoteObjects
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "fleetsync.dev",
    version = "v1alpha1",
    kind = "RemoteObjectPriorityClass",
    plural = "remoteobjectpriorityclasses",
    singular = "remoteobjectpriorityclass",
    shortname = "ropc",
    printcolumn = r#"{"name": "Resync", "type": "string", "jsonPath": ".spec.resyncInterval"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObjectPriorityClassSpec {
    /// How often RemoteObjects of this class are synced
    pub resync_interval: String,
}

impl RemoteObjectPriorityClassSpec {
    pub fn resync_interval(&self) -> Duration {
        parse_duration(&self.resync_interval)
            .filter(|interval| !interval.is_zero())
            .unwrap_or_else(|| {
                warn!(
                    interval = %self.resync_interval,
                    "Unparsable or zero priority class resyncInterval, using default"
                );
                DEFAULT_OBJECT_RESYNC_INTERVAL
            })
    }
}
