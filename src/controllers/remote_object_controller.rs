//! Controller for RemoteObject resources
//!
//! A RemoteObject is synced into the cluster whose local namespace it lives
//! in. The connection comes from the cache the RemoteCluster controller
//! fills; without a cached connection nothing is pushed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use kube::runtime::controller::{Action, Config as ControllerConfig, Controller};
use kube::runtime::events::EventType;
use kube::{Api, Client, Resource, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

use crate::controllers::lifecycle::{with_finalizer, without_finalizer, Lifecycle};
use crate::controllers::{error_policy, instrumented, spec_triggers, Context, RecordKind};
use crate::crd::{
    format_duration, set_condition, Condition, RemoteObject, RemoteObjectPhase,
    CONDITION_STATUS_TRUE, DEFAULT_OBJECT_RESYNC_INTERVAL, FINALIZER, REMOTE_OBJECT_SYNCED,
};
use crate::events::reasons;
use crate::metrics::prometheus::REMOTE_OBJECT_AVAILABLE as AVAILABLE_GAUGE;
use crate::reconcilers::remote_object::{evaluate_probe, mirror_status, parse_manifest, sync_remote};
use crate::Result;

pub const CONTROLLER_NAME: &str = "remote-object-controller";

/// Run the RemoteObject controller
pub async fn run(client: Client, ctx: Arc<Context>, concurrency: u16) {
    let objects: Api<RemoteObject> = Api::all(client);

    info!("Starting RemoteObject controller");

    let (store, triggers) = spec_triggers(objects);
    Controller::for_stream(triggers, store)
        .with_config(ControllerConfig::default().concurrency(concurrency))
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok(o) => debug!("Reconciled {:?}", o),
                Err(e) => error!("Reconcile failed: {:?}", e),
            }
        })
        .await;

    info!("RemoteObject controller stopped");
}

/// Reconcile a RemoteObject resource
#[instrument(skip(object, ctx), fields(name = %object.name_any(), namespace = object.namespace().unwrap_or_default()))]
pub async fn reconcile(object: Arc<RemoteObject>, ctx: Arc<Context>) -> Result<Action> {
    instrumented(
        RecordKind::RemoteObject,
        ctx.reconcile_timeout,
        reconcile_object(&object, &ctx),
    )
    .await
}

async fn reconcile_object(object: &RemoteObject, ctx: &Context) -> Result<Action> {
    let namespace = object.namespace().unwrap_or_default();
    let name = object.name_any();

    let Some(resync_interval) = resync_interval(object, ctx).await? else {
        return Ok(Action::requeue(DEFAULT_OBJECT_RESYNC_INTERVAL));
    };

    let Some(connection) = ctx.cache.get(&namespace) else {
        debug!(namespace = %namespace, object = %name, "No cached clients for namespace");
        ctx.object_events
            .publish(
                &object.object_ref(&()),
                EventType::Normal,
                reasons::WAITING_FOR_CLIENT,
                Some("Waiting for RemoteCluster clients to become available".to_string()),
            )
            .await;
        return Ok(Action::requeue(resync_interval));
    };

    let desired = parse_manifest(&object.spec.object)?;
    let lifecycle = Lifecycle::of(object, FINALIZER);

    if lifecycle.marked_for_deletion {
        match connection.client.delete(&desired).await {
            Ok(()) => info!(namespace = %namespace, object = %name, "Deleted remote object"),
            Err(e) if e.is_not_found() => {
                debug!(namespace = %namespace, object = %name, "Remote object already gone")
            }
            Err(e) => return Err(e),
        }
        if lifecycle.has_finalizer {
            ctx.local
                .set_object_finalizers(&namespace, &name, without_finalizer(object, FINALIZER))
                .await?;
        }
        let _ = AVAILABLE_GAUGE.remove_label_values(&[namespace.as_str(), name.as_str()]);
        return Ok(Action::await_change());
    }

    if !lifecycle.has_finalizer {
        ctx.local
            .set_object_finalizers(&namespace, &name, with_finalizer(object, FINALIZER))
            .await?;
    }

    let (remote, action) = sync_remote(connection.client.as_ref(), &desired).await?;
    debug!(namespace = %namespace, object = %name, ?action, "Synced remote object");

    let generation = object.metadata.generation;
    let mut status = object.status.clone().unwrap_or_default();
    mirror_status(&remote, generation, &mut status);
    evaluate_probe(&object.spec.availability_probe, generation, &mut status);
    set_condition(
        &mut status.conditions,
        Condition::new(
            REMOTE_OBJECT_SYNCED,
            CONDITION_STATUS_TRUE,
            "ObjectSynced",
            "Object was synced with the RemoteCluster.",
        )
        .with_observed_generation(generation),
    );
    status.update_phase();
    status.last_heartbeat_time = Some(Utc::now());

    ctx.local
        .patch_object_status(&namespace, &name, &status)
        .await?;
    debug!(
        namespace = %namespace,
        object = %name,
        phase = status.phase.as_ref().map(RemoteObjectPhase::as_str),
        "Updated RemoteObject status"
    );

    AVAILABLE_GAUGE
        .with_label_values(&[namespace.as_str(), name.as_str()])
        .set(if status.phase == Some(RemoteObjectPhase::Available) {
            1.0
        } else {
            0.0
        });

    Ok(Action::requeue(resync_interval))
}

/// Resync interval from the referenced priority class.
///
/// `Ok(None)` means the priority class is missing; a warning event has been
/// published and the object must not be synced this cycle.
async fn resync_interval(object: &RemoteObject, ctx: &Context) -> Result<Option<Duration>> {
    let Some(class_name) = object
        .spec
        .priority_class_name
        .as_deref()
        .filter(|n| !n.is_empty())
    else {
        return Ok(Some(DEFAULT_OBJECT_RESYNC_INTERVAL));
    };

    match ctx.local.get_priority_class(class_name).await? {
        Some(class) => Ok(Some(class.spec.resync_interval())),
        None => {
            warn!(
                priority_class = class_name,
                retry_in = %format_duration(DEFAULT_OBJECT_RESYNC_INTERVAL),
                "RemoteObjectPriorityClass not found"
            );
            ctx.object_events
                .publish(
                    &object.object_ref(&()),
                    EventType::Warning,
                    reasons::MISSING_PRIORITY_CLASS,
                    Some(format!(
                        "RemoteObjectPriorityClass {:?} not found",
                        class_name
                    )),
                )
                .await;
            Ok(None)
        }
    }
}
