//! Reconciliation controllers, one per managed kind.
//!
//! Cloud-side synchronization is delegated; these controllers derive the desired state from
//! cluster objects and honor the epoch's [`StopSignal`].

mod apis;
mod endpoint_group_binding;
mod global_accelerator;
mod route53;
mod utils;

use async_trait::async_trait;
use eyre::Result;
use thiserror::Error;

use crate::controller_config::ControllerSpec;
use crate::stop_signal::StopSignal;

pub use apis::{EndpointGroupBinding, EndpointGroupBindingSpec};
pub use endpoint_group_binding::EndpointGroupBindingController;
pub use global_accelerator::GlobalAcceleratorController;
pub use route53::{txt_owner_record_value, Route53Controller};

/// A unit reconciling one managed kind until its stop signal is raised.
#[async_trait]
pub trait ReconciliationController<C: Send + 'static>: Send {
    /// Must return soon after `stop` is signaled, once in-flight reconciliations settle.
    async fn run(self: Box<Self>, client_config: C, stop: StopSignal) -> Result<()>;
}

/// Builds the controller for a managed kind, seeded with its own configuration slice.
pub trait ControllerFactory<C: Send + 'static>: Send + Sync {
    fn build(&self, spec: ControllerSpec) -> Result<Box<dyn ReconciliationController<C>>>;
}

/// Builds the kube-runtime backed controllers.
#[derive(Clone, Copy, Debug, Default)]
pub struct KubeControllerFactory;

impl ControllerFactory<kube::Config> for KubeControllerFactory {
    fn build(
        &self,
        spec: ControllerSpec,
    ) -> Result<Box<dyn ReconciliationController<kube::Config>>> {
        let controller: Box<dyn ReconciliationController<kube::Config>> = match spec {
            ControllerSpec::GlobalAccelerator(config) => {
                Box::new(GlobalAcceleratorController::new(config))
            }
            ControllerSpec::Route53(config) => Box::new(Route53Controller::new(config)),
            ControllerSpec::EndpointGroupBinding(config) => {
                Box::new(EndpointGroupBindingController::new(config))
            }
        };
        Ok(controller)
    }
}

#[derive(Error, Debug)]
pub(crate) enum ReconcileError {
    #[error("kube error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("invalid object: {0}")]
    InvalidObject(String),
}
