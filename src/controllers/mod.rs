//! Controller implementations for watching and reconciling fleet records

pub mod lifecycle;
pub mod remote_cluster_controller;
pub mod remote_object_controller;

use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::Stream;
use kube::runtime::controller::Action;
use kube::runtime::reflector::{self, Store};
use kube::runtime::{predicates, watcher, WatchStreamExt};
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use tracing::error;

use crate::adapters::{KubeLocalClient, KubeconfigConnector};
use crate::cache::{ConnectionCache, InMemoryConnectionCache};
use crate::client::{LocalClient, RemoteConnector};
use crate::events::{EventPublisher, KubeEventPublisher};
use crate::metrics::prometheus::{RECONCILE_DURATION, RECONCILIATIONS, RECONCILIATION_ERRORS};
use crate::{Error, Result};

/// Record kinds reconciled by this operator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    RemoteCluster,
    RemoteObject,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::RemoteCluster => "RemoteCluster",
            RecordKind::RemoteObject => "RemoteObject",
        }
    }
}

/// Shared context for controllers
pub struct Context {
    /// Fleet cluster API
    pub local: Arc<dyn LocalClient>,
    /// Remote connections, written by the RemoteCluster controller only
    pub cache: Arc<dyn ConnectionCache>,
    pub connector: Arc<dyn RemoteConnector>,
    pub cluster_events: Arc<dyn EventPublisher>,
    pub object_events: Arc<dyn EventPublisher>,
    /// Deadline for a single reconcile, aborting outstanding API calls
    pub reconcile_timeout: Duration,
}

impl Context {
    /// Create a context backed by the given fleet cluster client
    pub fn new(client: Client, reconcile_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            local: Arc::new(KubeLocalClient::new(client.clone())),
            cache: InMemoryConnectionCache::new(),
            connector: Arc::new(KubeconfigConnector),
            cluster_events: Arc::new(KubeEventPublisher::new(
                client.clone(),
                remote_cluster_controller::CONTROLLER_NAME,
            )),
            object_events: Arc::new(KubeEventPublisher::new(
                client,
                remote_object_controller::CONTROLLER_NAME,
            )),
            reconcile_timeout,
        })
    }
}

/// Drop watch events that leave `metadata.generation` unchanged.
///
/// Status and finalizer writes do not bump the generation, so a reconcile
/// never re-triggers itself through its own status patch.
pub(crate) fn generation_changes<K, S>(events: S) -> impl Stream<Item = watcher::Result<K>>
where
    K: Resource + 'static,
    K::DynamicType: Default + Eq + Hash + Clone,
    S: Stream<Item = watcher::Result<K>>,
{
    events.predicate_filter(predicates::generation)
}

/// Reflector store plus a trigger stream of spec changes for `api`
pub(crate) fn spec_triggers<K>(
    api: Api<K>,
) -> (Store<K>, impl Stream<Item = watcher::Result<K>> + Send + 'static)
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    K::DynamicType: Default + Eq + Hash + Clone + Send + Sync,
{
    let (reader, writer) = reflector::store();
    let triggers = generation_changes(
        watcher(api, watcher::Config::default().any_semantic())
            .default_backoff()
            .reflect(writer)
            .applied_objects(),
    );
    (reader, triggers)
}

/// Run one reconcile under the context deadline and record metrics for it.
pub(crate) async fn instrumented<F>(kind: RecordKind, timeout: Duration, reconcile: F) -> Result<Action>
where
    F: Future<Output = Result<Action>>,
{
    let start = Instant::now();
    RECONCILIATIONS.with_label_values(&[kind.as_str()]).inc();

    let result = tokio::time::timeout(timeout, reconcile)
        .await
        .unwrap_or(Err(Error::Timeout(timeout)));

    RECONCILE_DURATION
        .with_label_values(&[kind.as_str()])
        .observe(start.elapsed().as_secs_f64());
    if result.is_err() {
        RECONCILIATION_ERRORS
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    result
}

/// Error policy for both controllers
pub fn error_policy<K: Resource>(obj: Arc<K>, err: &Error, _ctx: Arc<Context>) -> Action {
    error!(
        name = %obj.name_any(),
        namespace = obj.namespace().unwrap_or_default(),
        "Reconciliation error: {:?}",
        err
    );

    match err {
        Error::ManifestError(_) => Action::requeue(Duration::from_secs(60)),
        _ => Action::requeue(Duration::from_secs(30)),
    }
}


#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::client::MockLocalClient;
    use crate::client::MockRemoteConnector;
    use crate::events::MockEventPublisher;

    pub struct Mocks {
        pub local: MockLocalClient,
        pub connector: MockRemoteConnector,
        pub cluster_events: MockEventPublisher,
        pub object_events: MockEventPublisher,
    }

    impl Mocks {
        pub fn new() -> Self {
            Self {
                local: MockLocalClient::new(),
                connector: MockRemoteConnector::new(),
                cluster_events: MockEventPublisher::new(),
                object_events: MockEventPublisher::new(),
            }
        }

        pub fn into_context(self, cache: Arc<InMemoryConnectionCache>) -> Arc<Context> {
            Arc::new(Context {
                local: Arc::new(self.local),
                cache,
                connector: Arc::new(self.connector),
                cluster_events: Arc::new(self.cluster_events),
                object_events: Arc::new(self.object_events),
                reconcile_timeout: Duration::from_secs(5),
            })
        }
    }
}
