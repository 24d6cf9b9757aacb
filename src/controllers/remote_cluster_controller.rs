//! Controller for RemoteCluster resources
//!
//! Builds a connection from the cluster's kubeconfig secret, publishes it to
//! the connection cache, and health-checks the remote API server on every
//! resync. The cache entry lives exactly as long as the RemoteCluster.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::runtime::controller::{Action, Config as ControllerConfig, Controller};
use kube::runtime::events::EventType;
use kube::runtime::watcher::Config;
use kube::{Api, Client, Resource, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::secrets;
use crate::client::RemoteConnection;
use crate::controllers::lifecycle::{with_finalizer, without_finalizer, Lifecycle};
use crate::controllers::{error_policy, instrumented, spec_triggers, Context, RecordKind};
use crate::crd::{
    set_condition, Condition, RemoteCluster, RemoteClusterPhase, RemoteClusterStatus,
    CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE, FINALIZER, REMOTE_CLUSTER_REACHABLE,
};
use crate::events::reasons;
use crate::metrics::prometheus::REMOTE_CLUSTER_REACHABLE as REACHABLE_GAUGE;
use crate::reconcilers::namespace::ensure_namespace;
use crate::Result;

pub const CONTROLLER_NAME: &str = "remote-cluster-controller";

/// Label linking a cluster namespace back to its RemoteCluster
pub const REMOTE_CLUSTER_LABEL: &str = "fleetsync.dev/remote-cluster";

/// Run the RemoteCluster controller
pub async fn run(client: Client, ctx: Arc<Context>, concurrency: u16) {
    let clusters: Api<RemoteCluster> = Api::all(client.clone());
    let namespaces: Api<Namespace> = Api::all(client);

    info!("Starting RemoteCluster controller");

    let (store, triggers) = spec_triggers(clusters);
    Controller::for_stream(triggers, store)
        .owns(namespaces, Config::default())
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

    info!("RemoteCluster controller stopped");
}

/// Reconcile a RemoteCluster resource
#[instrument(skip(cluster, ctx), fields(name = %cluster.name_any()))]
pub async fn reconcile(cluster: Arc<RemoteCluster>, ctx: Arc<Context>) -> Result<Action> {
    instrumented(
        RecordKind::RemoteCluster,
        ctx.reconcile_timeout,
        reconcile_cluster(&cluster, &ctx),
    )
    .await
}

async fn reconcile_cluster(cluster: &RemoteCluster, ctx: &Context) -> Result<Action> {
    let name = cluster.name_any();
    let lifecycle = Lifecycle::of(cluster, FINALIZER);
    let mut status = cluster.status.clone().unwrap_or_default();

    // Once recorded the namespace name is kept, even if the naming scheme changes.
    let local_namespace = status
        .local_namespace
        .clone()
        .unwrap_or_else(|| cluster.local_namespace_name());

    if lifecycle.marked_for_deletion {
        info!(cluster = %name, namespace = %local_namespace, "Evicting cached clients");
        ctx.cache.free(&local_namespace);
        let _ = REACHABLE_GAUGE.remove_label_values(&[name.as_str()]);

        if lifecycle.has_finalizer {
            ctx.local
                .set_cluster_finalizers(&name, without_finalizer(cluster, FINALIZER))
                .await?;
        }
        return Ok(Action::await_change());
    }

    if !lifecycle.has_finalizer {
        ctx.local
            .set_cluster_finalizers(&name, with_finalizer(cluster, FINALIZER))
            .await?;
    }

    let resync_interval = cluster.spec.resync_interval();

    let namespace = ensure_namespace(
        ctx.local.as_ref(),
        &desired_namespace(cluster, &local_namespace),
    )
    .await?;
    status.local_namespace = Some(namespace.name_any());

    let connection = match ctx.cache.get(&local_namespace) {
        Some(connection) => connection,
        None => match build_connection(cluster, ctx).await? {
            Some(connection) => {
                info!(cluster = %name, host = %connection.host, "Caching remote clients");
                ctx.cache.set(
                    &local_namespace,
                    connection.host.clone(),
                    connection.client.clone(),
                    connection.discovery.clone(),
                );
                connection
            }
            None => return Ok(Action::requeue(resync_interval)),
        },
    };
    status.remote_cluster_state.api_server = connection.host.clone();

    check_remote_version(&mut status, cluster, &connection).await;
    ctx.local.patch_cluster_status(&name, &status).await?;
    debug!(
        cluster = %name,
        phase = status.phase.as_ref().map(RemoteClusterPhase::as_str),
        "Updated RemoteCluster status"
    );

    Ok(Action::requeue(resync_interval))
}

fn desired_namespace(cluster: &RemoteCluster, name: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(BTreeMap::from([(
                REMOTE_CLUSTER_LABEL.to_string(),
                cluster.name_any(),
            )])),
            owner_references: cluster.controller_owner_ref(&()).map(|o| vec![o]),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Build clients from the kubeconfig secret.
///
/// Returns `Ok(None)` when the secret or its content is unusable; a warning
/// event has been published in that case.
async fn build_connection(
    cluster: &RemoteCluster,
    ctx: &Context,
) -> Result<Option<RemoteConnection>> {
    let secret_ref = &cluster.spec.kubeconfig_secret;
    let Some(secret) = ctx
        .local
        .get_secret(&secret_ref.namespace, &secret_ref.name)
        .await?
    else {
        report_invalid_config(
            cluster,
            ctx,
            format!(
                "missing kubeconfig secret \"{}/{}\"",
                secret_ref.namespace, secret_ref.name
            ),
        )
        .await;
        return Ok(None);
    };

    let connection = match secrets::kubeconfig_from_secret(&secret) {
        Ok(kubeconfig) => ctx.connector.connect(&kubeconfig).await,
        Err(e) => Err(e),
    };

    match connection {
        Ok(connection) => Ok(Some(connection)),
        Err(e) if e.is_misconfiguration() => {
            report_invalid_config(cluster, ctx, e.to_string()).await;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

async fn report_invalid_config(cluster: &RemoteCluster, ctx: &Context, message: String) {
    warn!(cluster = %cluster.name_any(), %message, "RemoteCluster is misconfigured");
    ctx.cluster_events
        .publish(
            &cluster.object_ref(&()),
            EventType::Warning,
            reasons::INVALID_CONFIG,
            Some(message),
        )
        .await;
}

/// Ask the remote API server for its version and record reachability.
async fn check_remote_version(
    status: &mut RemoteClusterStatus,
    cluster: &RemoteCluster,
    connection: &RemoteConnection,
) {
    let name = cluster.name_any();
    let generation = cluster.metadata.generation;
    status.last_heartbeat_time = Some(Utc::now());
    status.observed_generation = generation;

    let reachable = match connection.discovery.server_version().await {
        Ok(version) => {
            debug!(cluster = %name, %version, "Remote cluster API is responding");
            status.remote_cluster_state.version = Some(version);
            Condition::new(
                REMOTE_CLUSTER_REACHABLE,
                CONDITION_STATUS_TRUE,
                "APIResponding",
                "Remote cluster API is responding.",
            )
        }
        Err(e) => {
            warn!(cluster = %name, error = %e, "Remote cluster API is not responding");
            Condition::new(
                REMOTE_CLUSTER_REACHABLE,
                CONDITION_STATUS_FALSE,
                "APIError",
                "Remote cluster API is not responding.",
            )
        }
    };
    REACHABLE_GAUGE
        .with_label_values(&[name.as_str()])
        .set(if reachable.is_true() { 1.0 } else { 0.0 });

    set_condition(
        &mut status.conditions,
        reachable.with_observed_generation(generation),
    );
    status.update_phase();
}
