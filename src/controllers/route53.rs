use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Context, Result};
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::runtime::controller::Action;
use kube::runtime::reflector::ObjectRef;
use kube::{Api, Client, ResourceExt};
use tracing::{debug, span, Level};

use crate::consts::{ROUTE53_HOSTNAME_ANNOTATION_KEY, TXT_HERITAGE};
use crate::controller_config::{Route53Config, ZoneType};
use crate::controllers::utils::{
    run_controller, LoadBalanced, DEFAULT_RECONCILE_DURATION, NOT_PROVISIONED_RECONCILE_DURATION,
};
use crate::controllers::{ReconcileError, ReconciliationController};
use crate::instrumented;
use crate::stop_signal::StopSignal;
use crate::utils::matches_annotation_filters;

/// Keeps alias records pointing at the accelerator of annotated Services and Ingresses.
pub struct Route53Controller {
    config: Route53Config,
}

impl Route53Controller {
    pub fn new(config: Route53Config) -> Self {
        Self { config }
    }
}

struct ReconcilerContext {
    config: Route53Config,
}

// Only consumed by the debug log.
#[allow(dead_code)]
#[derive(Debug, PartialEq, Eq)]
struct DesiredRecordSet {
    zone_type: Option<ZoneType>,
    hostnames: Vec<String>,
    alias_targets: Vec<String>,
    owner_record: String,
}

#[async_trait]
impl ReconciliationController<kube::Config> for Route53Controller {
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

/// TXT record value marking a record set as owned by this deployment.
///
/// Records whose owner differs are never touched, so several deployments can share a zone.
pub fn txt_owner_record_value(
    owner_id: &str,
    kind: &str,
    namespace: &str,
    name: &str,
) -> String {
    let kind = kind.to_lowercase();
    format!("\"heritage={TXT_HERITAGE},owner={owner_id},resource={kind}/{namespace}/{name}\"")
}

fn route53_hostnames<K: ResourceExt>(object: &K) -> Vec<String> {
    object
        .annotations()
        .get(ROUTE53_HOSTNAME_ANNOTATION_KEY)
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|hostname| !hostname.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn desired_record_set<K>(object: &K, config: &Route53Config) -> Option<DesiredRecordSet>
where
    K: LoadBalanced,
{
    if !matches_annotation_filters(object.annotations(), &config.annotation_filters) {
        return None;
    }

    let hostnames = route53_hostnames(object);
    if hostnames.is_empty() {
        return None;
    }

    let kind = K::kind(&());
    let namespace = object.namespace().unwrap_or_default();
    Some(DesiredRecordSet {
        zone_type: config.zone_type,
        hostnames,
        alias_targets: object.load_balancer_hostnames(),
        owner_record: txt_owner_record_value(
            &config.txt_owner_id,
            &kind,
            &namespace,
            &object.name_any(),
        ),
    })
}

async fn reconcile<K>(
    object: Arc<K>,
    context: Arc<ReconcilerContext>,
) -> Result<Action, ReconcileError>
where
    K: LoadBalanced,
{
    let span = span!(Level::ERROR, "reconciler", controller = "route53");
    instrumented!(span, async move {
        if object.meta().deletion_timestamp.is_some() {
            return Ok(Action::await_change());
        }

        let Some(desired) = desired_record_set(object.as_ref(), &context.config) else {
            return Ok(Action::await_change());
        };

        let object_ref = ObjectRef::from_obj(object.as_ref());
        if desired.alias_targets.is_empty() {
            debug!(%object_ref, "load balancer is not provisioned yet");
            return Ok(Action::requeue(NOT_PROVISIONED_RECONCILE_DURATION));
        }

        debug!(%object_ref, ?desired, "record set desired state");
        Ok(Action::requeue(DEFAULT_RECONCILE_DURATION))
    })
    .await
}
