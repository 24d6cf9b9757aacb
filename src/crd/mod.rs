//! Custom Resource Definitions for the Fleet Sync Operator

mod condition;
mod duration;
mod priority_class;
mod remote_cluster;
mod remote_object;

pub use condition::*;
pub use duration::{format_duration, parse_duration};
pub use priority_class::*;
pub use remote_cluster::*;
pub use remote_object::*;

use kube::CustomResourceExt;

/// Finalizer guarding cleanup of cached clients and remote objects.
pub const FINALIZER: &str = "fleetsync.dev/cleanup";

/// Generate CRD YAML manifests for all custom resources
pub fn generate_crds() -> Result<Vec<String>, serde_yaml::Error> {
    Ok(vec![
        serde_yaml::to_string(&RemoteCluster::crd())?,
        serde_yaml::to_string(&RemoteObject::crd())?,
        serde_yaml::to_string(&RemoteObjectPriorityClass::crd())?,
    ])
}
