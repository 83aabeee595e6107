use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Context, Result};
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::runtime::controller::Action;
use kube::runtime::reflector::ObjectRef;
use kube::{Api, Client, ResourceExt};
use tracing::{debug, span, Level};

use crate::consts::{GLOBAL_ACCELERATOR_MANAGED_ANNOTATION_KEY, OWNER_CLUSTER_TAG_KEY};
use crate::controller_config::GlobalAcceleratorConfig;
use crate::controllers::utils::{
    run_controller, LoadBalanced, DEFAULT_RECONCILE_DURATION, NOT_PROVISIONED_RECONCILE_DURATION,
};
use crate::controllers::{ReconcileError, ReconciliationController};
use crate::instrumented;
use crate::stop_signal::StopSignal;

/// Keeps one accelerator per annotated load-balanced Service or Ingress.
pub struct GlobalAcceleratorController {
    config: GlobalAcceleratorConfig,
}

impl GlobalAcceleratorController {
    pub fn new(config: GlobalAcceleratorConfig) -> Self {
        Self { config }
    }
}

struct ReconcilerContext {
    config: GlobalAcceleratorConfig,
}

// Only consumed by the debug log.
#[allow(dead_code)]
#[derive(Debug, PartialEq, Eq)]
struct DesiredAccelerator {
    name: String,
    tags: Vec<(String, String)>,
    endpoint_hostnames: Vec<String>,
}

#[async_trait]
impl ReconciliationController<kube::Config> for GlobalAcceleratorController {
    async fn run(self: Box<Self>, client_config: kube::Config, stop: StopSignal) -> Result<()> {
        let client = Client::try_from(client_config).context("failed to build kube client")?;
        let workers = self.config.workers;
        let context = Arc::new(ReconcilerContext {
            config: self.config,
        });

        let services: Api<Service> = Api::all(client.clone());
        let ingresses: Api<Ingress> = Api::all(client);
        futures::join!(
            run_controller(services, workers, reconcile::<Service>, context.clone(), &stop),
            run_controller(ingresses, workers, reconcile::<Ingress>, context, &stop)
        );

        Ok(())
    }
}

fn is_managed<K: ResourceExt>(object: &K) -> bool {
    object
        .annotations()
        .get(GLOBAL_ACCELERATOR_MANAGED_ANNOTATION_KEY)
        .is_some_and(|value| value == "true")
}

fn desired_accelerator<K>(
    object: &K,
    config: &GlobalAcceleratorConfig,
) -> Option<DesiredAccelerator>
where
    K: LoadBalanced,
{
    let endpoint_hostnames = object.load_balancer_hostnames();
    if endpoint_hostnames.is_empty() {
        return None;
    }

    let kind = K::kind(&()).to_lowercase();
    let namespace = object.namespace().unwrap_or_default();
    let name = object.name_any();
    Some(DesiredAccelerator {
        name: format!("{}-{kind}-{namespace}-{name}", config.cluster_name),
        tags: vec![
            (OWNER_CLUSTER_TAG_KEY.to_owned(), config.cluster_name.clone()),
            ("target-hostname".to_owned(), endpoint_hostnames.join(",")),
            ("resource".to_owned(), format!("{kind}/{namespace}/{name}")),
        ],
        endpoint_hostnames,
    })
}

async fn reconcile<K>(
    object: Arc<K>,
    context: Arc<ReconcilerContext>,
) -> Result<Action, ReconcileError>
where
    K: LoadBalanced,
{
    let span = span!(Level::ERROR, "reconciler", controller = "global-accelerator");
    instrumented!(span, async move {
        if object.meta().deletion_timestamp.is_some() || !is_managed(object.as_ref()) {
            return Ok(Action::await_change());
        }

        let object_ref = ObjectRef::from_obj(object.as_ref());
        let Some(desired) = desired_accelerator(object.as_ref(), &context.config) else {
            debug!(%object_ref, "load balancer is not provisioned yet");
            return Ok(Action::requeue(NOT_PROVISIONED_RECONCILE_DURATION));
        };

        debug!(%object_ref, ?desired, "accelerator desired state");
        Ok(Action::requeue(DEFAULT_RECONCILE_DURATION))
    })
    .await
}
