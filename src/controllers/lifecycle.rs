//! Finalizer state check run at the top of every reconcile

use kube::{Resource, ResourceExt};

/// Deletion and finalizer facts of a record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lifecycle {
    pub marked_for_deletion: bool,
    pub has_finalizer: bool,
}

impl Lifecycle {
    pub fn of<K: Resource>(obj: &K, finalizer: &str) -> Self {
        Self {
            marked_for_deletion: obj.meta().deletion_timestamp.is_some(),
            has_finalizer: obj.finalizers().iter().any(|f| f == finalizer),
        }
    }
}

/// Replacement finalizer list, pinned to the resourceVersion it was computed from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalizerUpdate {
    pub finalizers: Vec<String>,
    /// A write against a newer version is rejected with a conflict
    pub resource_version: Option<String>,
}

impl FinalizerUpdate {
    fn from_obj<K: Resource>(obj: &K, finalizers: Vec<String>) -> Self {
        Self {
            finalizers,
            resource_version: obj.resource_version(),
        }
    }
}

/// Finalizer list with `finalizer` appended if missing
pub fn with_finalizer<K: Resource>(obj: &K, finalizer: &str) -> FinalizerUpdate {
    let mut finalizers = obj.finalizers().to_vec();
    if !finalizers.iter().any(|f| f == finalizer) {
        finalizers.push(finalizer.to_string());
    }
    FinalizerUpdate::from_obj(obj, finalizers)
}

/// Finalizer list with every occurrence of `finalizer` removed
pub fn without_finalizer<K: Resource>(obj: &K, finalizer: &str) -> FinalizerUpdate {
    let finalizers = obj
        .finalizers()
        .iter()
        .filter(|f| f.as_str() != finalizer)
        .cloned()
        .collect();
    FinalizerUpdate::from_obj(obj, finalizers)
}
