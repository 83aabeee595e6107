use std::sync::Arc;

use eyre::{eyre, Context, Report, Result};
use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::controller_config::{ControllerConfig, ManagedKind};
use crate::controllers::ControllerFactory;
use crate::spawn_service::{spawn_service, ServiceExit};
use crate::stop_signal::StopSignal;

/// Runs the fixed set of reconciliation controllers for one leadership epoch at a time.
pub struct Manager<F> {
    factory: F,
    config: Arc<ControllerConfig>,
}

struct ControllerHandle {
    kind: ManagedKind,
    handle: JoinHandle<ServiceExit>,
}

impl<F> Manager<F> {
    pub fn new(factory: F, config: Arc<ControllerConfig>) -> Self {
        Self { factory, config }
    }

    /// Start every controller and wait until all of them returned.
    ///
    /// Controllers are all built before any of them starts, so a construction error aborts the
    /// epoch without side effects. A controller that fails or returns early signals `stop` for
    /// its siblings. The first failure, in kind order, is returned.
    pub async fn run<C>(&self, client_config: C, stop: StopSignal) -> Result<()>
    where
        C: Clone + Send + 'static,
        F: ControllerFactory<C>,
    {
        let mut controllers = Vec::new();
        for spec in self.config.specs() {
            let kind = spec.kind();
            let workers = spec.workers();
            let controller = self
                .factory
                .build(spec)
                .wrap_err_with(|| format!("failed to build {kind} controller"))?;
            debug!(%kind, workers, "Controller built");
            controllers.push((kind, controller));
        }

        let mut handles = Vec::with_capacity(controllers.len());
        for (kind, controller) in controllers {
            let future = controller.run(client_config.clone(), stop.clone());
            match spawn_service(&stop, kind.to_string(), future) {
                Ok(handle) => handles.push(ControllerHandle { kind, handle }),
                Err(err) => {
                    // every started controller has already returned
                    debug!(%kind, ?err, "Epoch stopped before the controller started");
                    break;
                }
            }
        }
        info!(count = handles.len(), "Controllers started");

        let exits = join_all(
            handles
                .into_iter()
                .map(|ControllerHandle { kind, handle }| async move { (kind, handle.await) }),
        )
        .await;

        let mut result = Ok(());
        for (kind, exit) in exits {
            let err = match exit {
                Ok(ServiceExit::GracefulShutdown) => continue,
                Ok(ServiceExit::EarlyStop) => eyre!("{kind} controller stopped unexpectedly"),
                Ok(ServiceExit::Failed(err)) => err.wrap_err(format!("{kind} controller failed")),
                Ok(ServiceExit::Panic(err)) | Err(err) => {
                    Report::new(err).wrap_err(format!("{kind} controller panicked"))
                }
            };
            if result.is_ok() {
                result = Err(err);
            }
        }

        result
    }
}
