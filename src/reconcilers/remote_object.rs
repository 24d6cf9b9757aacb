//! Sync logic for RemoteObject resources

use chrono::{DateTime, Utc};
use kube::api::DynamicObject;
use serde_json::Value;
use tracing::{debug, info};

use crate::client::RemoteClient;
use crate::crd::{
    find_condition, set_condition, AvailabilityProbe, Condition, RemoteObjectStatus,
    CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE, CONDITION_STATUS_UNKNOWN,
    PROBE_TYPE_CONDITION, REMOTE_OBJECT_AVAILABLE,
};
use crate::{Error, Result};

/// What pushing the desired manifest did to the remote cluster
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncAction {
    Created,
    Patched,
    Unchanged,
}

/// Parse an embedded manifest into a dynamic object.
///
/// `apiVersion`, `kind` and `metadata.name` must be present.
pub fn parse_manifest(manifest: &Value) -> Result<DynamicObject> {
    let obj: DynamicObject = serde_json::from_value(manifest.clone())
        .map_err(|e| Error::ManifestError(format!("converting object into DynamicObject: {}", e)))?;

    match &obj.types {
        Some(t) if !t.api_version.is_empty() && !t.kind.is_empty() => {}
        _ => {
            return Err(Error::ManifestError(
                "object must set apiVersion and kind".to_string(),
            ))
        }
    }
    if obj.metadata.name.as_deref().unwrap_or_default().is_empty() {
        return Err(Error::ManifestError(
            "object must set metadata.name".to_string(),
        ));
    }

    Ok(obj)
}

/// True if every field set in `desired` has the same value in `actual`.
///
/// Fields only present in `actual` are ignored. A null, an empty string, an
/// empty array or an empty object in `desired` counts as unset. A desired
/// array matches when it is an element-wise prefix of the actual one, so
/// entries appended on the remote side are not drift.
pub fn is_derivative(desired: &Value, actual: &Value) -> bool {
    match (desired, actual) {
        (Value::Null, _) => true,
        (Value::String(d), _) if d.is_empty() => true,
        (Value::Array(d), _) if d.is_empty() => true,
        (Value::Object(d), _) if d.is_empty() => true,
        (Value::Object(d), Value::Object(a)) => d.iter().all(|(key, d_value)| {
            is_derivative(d_value, a.get(key).unwrap_or(&Value::Null))
        }),
        (Value::Array(d), Value::Array(a)) => {
            d.len() <= a.len() && d.iter().zip(a).all(|(d, a)| is_derivative(d, a))
        }
        (Value::Number(d), Value::Number(a)) => d == a || d.as_f64() == a.as_f64(),
        (d, a) => d == a,
    }
}

/// Bring the remote copy of `desired` in line and return the remote object.
///
/// A missing object is created. A drifted object is merge-patched with the
/// desired manifest, so fields only the remote side set survive. A matching
/// object is returned as-is.
pub async fn sync_remote(
    remote: &dyn RemoteClient,
    desired: &DynamicObject,
) -> Result<(DynamicObject, SyncAction)> {
    let name = desired.metadata.name.clone().unwrap_or_default();

    let Some(current) = remote.get(desired).await? else {
        let created = remote.create(desired).await?;
        return Ok((created, SyncAction::Created));
    };

    if is_derivative(&serde_json::to_value(desired)?, &serde_json::to_value(&current)?) {
        debug!(object = %name, "Remote object up to date");
        return Ok((current, SyncAction::Unchanged));
    }

    info!(object = %name, "Patching remote object");
    let patched = remote.patch(desired).await?;
    Ok((patched, SyncAction::Patched))
}

/// Conditions found under `status.conditions` of a remote object
pub fn remote_conditions(obj: &DynamicObject) -> Vec<Condition> {
    let Some(items) = obj
        .data
        .pointer("/status/conditions")
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .map(|cond| {
            let text = |key: &str| {
                cond.get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            Condition {
                type_: text("type"),
                status: text("status"),
                reason: text("reason"),
                message: text("message"),
                observed_generation: cond.get("observedGeneration").and_then(Value::as_i64),
                last_transition_time: cond
                    .get("lastTransitionTime")
                    .and_then(Value::as_str)
                    .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                    .map(|t| t.with_timezone(&Utc))
                    .unwrap_or_else(Utc::now),
            }
        })
        .filter(|c| !c.type_.is_empty())
        .collect()
}

/// Mirror remote status into the local status.
///
/// A remote `observedGeneration` equal to the remote object's current
/// generation is fresh and gets rewritten to `local_generation`. Stale or
/// unset values are copied as they are and never relabeled.
pub fn mirror_status(
    remote: &DynamicObject,
    local_generation: Option<i64>,
    status: &mut RemoteObjectStatus,
) {
    let remote_generation = remote.metadata.generation;
    let is_fresh =
        |observed: Option<i64>| observed.is_some_and(|g| g != 0 && Some(g) == remote_generation);

    for mut condition in remote_conditions(remote) {
        if is_fresh(condition.observed_generation) {
            condition.observed_generation = local_generation;
        }
        set_condition(&mut status.conditions, condition);
    }

    let observed = remote
        .data
        .pointer("/status/observedGeneration")
        .and_then(Value::as_i64);
    if is_fresh(observed) {
        status.observed_generation = local_generation;
    }
}

/// Evaluate the availability probe against the (mirrored) local conditions
/// and record the result as the Available condition.
pub fn evaluate_probe(
    probe: &AvailabilityProbe,
    local_generation: Option<i64>,
    status: &mut RemoteObjectStatus,
) {
    if probe.type_ != PROBE_TYPE_CONDITION {
        return;
    }
    let Some(probe) = probe.condition.as_ref() else {
        return;
    };

    let available = match find_condition(&status.conditions, &probe.type_) {
        None => Condition::new(
            REMOTE_OBJECT_AVAILABLE,
            CONDITION_STATUS_UNKNOWN,
            "MissingCondition",
            format!("Missing {} condition.", probe.type_),
        ),
        Some(c) if c.is_true() => Condition::new(
            REMOTE_OBJECT_AVAILABLE,
            CONDITION_STATUS_TRUE,
            "ProbeSuccess",
            format!("Probed condition {} is True.", probe.type_),
        ),
        Some(c) if c.is_false() => Condition::new(
            REMOTE_OBJECT_AVAILABLE,
            CONDITION_STATUS_FALSE,
            "ProbeFailure",
            format!("Probed condition {} is False.", probe.type_),
        ),
        Some(_) => return,
    };

    set_condition(
        &mut status.conditions,
        available.with_observed_generation(local_generation),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockRemoteClient;
    use serde_json::json;

    fn configmap(data: Value) -> DynamicObject {
        let mut manifest = json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": { "name": "settings", "namespace": "apps" },
        });
        if let (Some(m), Value::Object(extra)) = (manifest.as_object_mut(), data) {
            m.extend(extra);
        }
        parse_manifest(&manifest).unwrap()
    }

    #[tokio::test]
    async fn creates_absent_object() {
        let desired = configmap(json!({ "data": { "a": "1" } }));
        let mut remote = MockRemoteClient::new();
        remote.expect_get().returning(|_| Ok(None));
        remote
            .expect_create()
            .times(1)
            .returning(|obj| Ok(obj.clone()));
        remote.expect_patch().never();

        let (_, action) = sync_remote(&remote, &desired).await.unwrap();
        assert_eq!(action, SyncAction::Created);
    }

    #[tokio::test]
    async fn adopts_matching_remote_without_writing() {
        let desired = configmap(json!({ "data": { "a": "1" } }));
        let mut current = desired.clone();
        current.metadata.generation = Some(3);
        current.metadata.labels = Some([("remote".to_string(), "yes".to_string())].into());
        let returned = current.clone();

        let mut remote = MockRemoteClient::new();
        remote
            .expect_get()
            .returning(move |_| Ok(Some(returned.clone())));
        remote.expect_create().never();
        remote.expect_patch().never();

        let (adopted, action) = sync_remote(&remote, &desired).await.unwrap();
        assert_eq!(action, SyncAction::Unchanged);
        assert_eq!(adopted.metadata.generation, Some(3));
        assert!(adopted.metadata.labels.unwrap().contains_key("remote"));
    }

    #[tokio::test]
    async fn patches_drifted_object() {
        let desired = configmap(json!({ "data": { "a": "2" } }));
        let current = configmap(json!({ "data": { "a": "1" } }));

        let mut remote = MockRemoteClient::new();
        remote
            .expect_get()
            .returning(move |_| Ok(Some(current.clone())));
        remote
            .expect_patch()
            .times(1)
            .returning(|obj| Ok(obj.clone()));

        let (_, action) = sync_remote(&remote, &desired).await.unwrap();
        assert_eq!(action, SyncAction::Patched);
    }

    #[tokio::test]
    async fn remote_errors_propagate() {
        let desired = configmap(json!({}));
        let mut remote = MockRemoteClient::new();
        remote
            .expect_get()
            .returning(|_| Err(Error::ManifestError("no such kind".to_string())));
        remote.expect_create().never();

        assert!(sync_remote(&remote, &desired).await.is_err());
    }
}
