use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::runtime::controller::Action;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::{controller, watcher, Controller};
use kube::{Api, Resource};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, span, trace, Level};

use crate::controllers::ReconcileError;
use crate::error_codes::{
    is_404_not_found_error, is_409_conflict_error, is_410_expired_error, is_transient_error,
};
use crate::stop_signal::StopSignal;
use crate::{instrumented, try_some};

pub(crate) const DEFAULT_RECONCILE_DURATION: Duration = Duration::from_secs(3600);
pub(crate) const NOT_PROVISIONED_RECONCILE_DURATION: Duration = Duration::from_secs(30);
const DEFAULT_ERROR_RECONCILE: Duration = Duration::from_secs(5);
const DEFAULT_TRANSIENT_ERROR_RECONCILE: Duration = Duration::from_secs(5);
const INVALID_OBJECT_RECONCILE: Duration = Duration::from_secs(300);

/// Drive a kube-runtime controller until `stop` is signaled.
///
/// In-flight reconciliations run to completion before this returns.
pub(crate) async fn run_controller<K, Ctx, ReconcilerFut>(
    api: Api<K>,
    workers: u16,
    reconciler: impl FnMut(Arc<K>, Arc<Ctx>) -> ReconcilerFut,
    context: Arc<Ctx>,
    stop: &StopSignal,
) where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    K::DynamicType: Default + Eq + Hash + Clone + Debug + Unpin,
    ReconcilerFut: Future<Output = Result<Action, ReconcileError>> + Send + 'static,
    Ctx: Send + Sync + 'static,
{
    let kind = K::kind(&K::DynamicType::default()).into_owned();
    debug!(%kind, workers, "Starting reconciler");

    Controller::new(api, watcher::Config::default())
        .with_config(controller::Config::default().concurrency(workers))
        .graceful_shutdown_on(stop.stopped())
        .run(reconciler, error_policy, context)
        .for_each(log_reconcile_result)
        .await;

    debug!(%kind, "Reconciler stopped");
}

fn error_policy<K, Ctx>(object: Arc<K>, err: &ReconcileError, _context: Arc<Ctx>) -> Action
where
    K: Resource,
    K::DynamicType: Default,
{
    let span = span!(Level::ERROR, "reconciler::error_policy");
    let _guard = span.enter();
    match err {
        ReconcileError::KubeError(err) => {
            if is_409_conflict_error(err) {
                return Action::requeue(Duration::from_secs(1));
            }

            if is_transient_error(err) {
                let object_ref = ObjectRef::from_obj(object.as_ref());
                info!(%object_ref, ?err, "retry transient error");
                return Action::requeue(DEFAULT_TRANSIENT_ERROR_RECONCILE);
            }
        }
        ReconcileError::InvalidObject(_) => {
            // Nothing changes until the object is edited, which triggers a reconcile anyway.
            return Action::requeue(INVALID_OBJECT_RECONCILE);
        }
    }

    Action::requeue(DEFAULT_ERROR_RECONCILE)
}

async fn log_reconcile_result<K>(
    result: Result<(ObjectRef<K>, Action), controller::Error<ReconcileError, watcher::Error>>,
) where
    K: Resource,
    K::DynamicType: Debug,
{
    let span = span!(Level::ERROR, "reconciler");
    instrumented!(span, async move {
        match result {
            Ok((object_ref, action)) => {
                trace!(%object_ref, ?action, "success");
            }
            Err(controller::Error::ReconcilerFailed(err, object_ref)) => match err {
                ReconcileError::KubeError(err) if is_409_conflict_error(&err) => {
                    debug!(%object_ref, ?err, "conflict");
                }
                ReconcileError::KubeError(err)
                    if is_404_not_found_error(&err) || is_410_expired_error(&err) =>
                {
                    // reconciler is late
                    debug!(%object_ref, ?err, "gone");
                }
                _ => error!(%object_ref, ?err, "error"),
            },
            Err(controller::Error::ObjectNotFound(object_ref)) => {
                // reconciler is late
                debug!(%object_ref, "gone");
            }
            Err(err) => {
                error!(?err, "error");
            }
        }
    })
    .await
}

/// Objects fronted by an AWS load balancer.
pub(crate) trait LoadBalanced: Resource<DynamicType = ()> {
    fn load_balancer_hostnames(&self) -> Vec<String>;
}

impl LoadBalanced for Service {
    fn load_balancer_hostnames(&self) -> Vec<String> {
        let is_load_balancer = try_some!(self.spec?.type_?).map(String::as_str);
        if is_load_balancer != Some("LoadBalancer") {
            return Vec::new();
        }

        try_some!(self.status?.load_balancer?.ingress?)
            .into_iter()
            .flatten()
            .filter_map(|ingress| ingress.hostname.clone())
            .collect()
    }
}

impl LoadBalanced for Ingress {
    fn load_balancer_hostnames(&self) -> Vec<String> {
        try_some!(self.status?.load_balancer?.ingress?)
            .into_iter()
            .flatten()
            .filter_map(|ingress| ingress.hostname.clone())
            .collect()
    }
}
