use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Context, Result};
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::runtime::controller::Action;
use kube::runtime::reflector::ObjectRef;
use kube::{Api, Client, ResourceExt};
use tracing::{debug, span, Level};

use crate::controller_config::EndpointGroupBindingConfig;
use crate::controllers::apis::{EndpointGroupBinding, EndpointGroupBindingSpec};
use crate::controllers::utils::{
    run_controller, LoadBalanced, DEFAULT_RECONCILE_DURATION, NOT_PROVISIONED_RECONCILE_DURATION,
};
use crate::controllers::{ReconcileError, ReconciliationController};
use crate::instrumented;
use crate::stop_signal::StopSignal;

pub struct EndpointGroupBindingController {
    config: EndpointGroupBindingConfig,
}

impl EndpointGroupBindingController {
    pub fn new(config: EndpointGroupBindingConfig) -> Self {
        Self { config }
    }
}

struct ReconcilerContext {
    client: Client,
}

#[derive(Debug, PartialEq, Eq)]
enum BindingTarget<'a> {
    Service(&'a str),
    Ingress(&'a str),
}

// Only consumed by the debug log.
#[allow(dead_code)]
#[derive(Debug)]
struct DesiredEndpoints {
    endpoint_group_arn: String,
    client_ip_preservation: bool,
    weight: Option<i32>,
    load_balancer_hostnames: Vec<String>,
}

#[async_trait]
impl ReconciliationController<kube::Config> for EndpointGroupBindingController {
    async fn run(self: Box<Self>, client_config: kube::Config, stop: StopSignal) -> Result<()> {
        let client = Client::try_from(client_config).context("failed to build kube client")?;
        let context = Arc::new(ReconcilerContext {
            client: client.clone(),
        });

        let bindings: Api<EndpointGroupBinding> = Api::all(client);
        run_controller(bindings, self.config.workers, reconcile, context, &stop).await;

        Ok(())
    }
}

/// Exactly one of `serviceRef` and `ingressRef` must be set.
fn binding_target(spec: &EndpointGroupBindingSpec) -> Result<BindingTarget<'_>, ReconcileError> {
    match (&spec.service_ref, &spec.ingress_ref) {
        (Some(service), None) => Ok(BindingTarget::Service(&service.name)),
        (None, Some(ingress)) => Ok(BindingTarget::Ingress(&ingress.name)),
        (Some(_), Some(_)) => Err(ReconcileError::InvalidObject(String::from(
            "both serviceRef and ingressRef are set",
        ))),
        (None, None) => Err(ReconcileError::InvalidObject(String::from(
            "either serviceRef or ingressRef should be set",
        ))),
    }
}

async fn reconcile(
    binding: Arc<EndpointGroupBinding>,
    context: Arc<ReconcilerContext>,
) -> Result<Action, ReconcileError> {
    let span = span!(Level::ERROR, "reconciler", controller = "endpoint-group-binding");
    instrumented!(span, async move {
        if binding.metadata.deletion_timestamp.is_some() {
            return Ok(Action::await_change());
        }

        let object_ref = ObjectRef::from_obj(binding.as_ref());
        let Some(spec) = binding.spec.as_ref() else {
            return Err(ReconcileError::InvalidObject(format!("{object_ref} has no spec")));
        };

        let namespace = binding.namespace().unwrap_or_default();
        let load_balancer_hostnames = match binding_target(spec)? {
            BindingTarget::Service(name) => {
                let api: Api<Service> = Api::namespaced(context.client.clone(), &namespace);
                api.get_opt(name)
                    .await?
                    .map(|service| service.load_balancer_hostnames())
            }
            BindingTarget::Ingress(name) => {
                let api: Api<Ingress> = Api::namespaced(context.client.clone(), &namespace);
                api.get_opt(name)
                    .await?
                    .map(|ingress| ingress.load_balancer_hostnames())
            }
        };

        let Some(load_balancer_hostnames) = load_balancer_hostnames.filter(|it| !it.is_empty())
        else {
            debug!(%object_ref, "target load balancer is not provisioned yet");
            return Ok(Action::requeue(NOT_PROVISIONED_RECONCILE_DURATION));
        };

        let desired = DesiredEndpoints {
            endpoint_group_arn: spec.endpoint_group_arn.clone(),
            client_ip_preservation: spec.client_ip_preservation,
            weight: spec.weight,
            load_balancer_hostnames,
        };
        debug!(%object_ref, ?desired, "endpoint group desired state");
        Ok(Action::requeue(DEFAULT_RECONCILE_DURATION))
    })
    .await
}
