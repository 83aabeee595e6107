use std::future::Future;
use std::time::Duration;

use eyre::{Context, Result};
use tokio::task::{JoinError, JoinHandle};
use tokio::{select, spawn};
use tracing::{debug, error, span, warn, Instrument, Level};

use crate::stop_signal::{StopReason, StopSignal};

const SLOW_STOP_WARNING_AFTER: Duration = Duration::from_secs(3);

#[derive(Debug)]
pub enum ServiceExit {
    GracefulShutdown,
    EarlyStop,
    Failed(eyre::Report),
    Panic(JoinError),
}

/// Spawn a service that lives until `stop` is signaled.
///
/// A service that fails, panics or returns on its own signals `stop`, so its siblings wind down too.
pub fn spawn_service(
    stop: &StopSignal,
    name: impl Into<String>,
    future: impl Future<Output = Result<()>> + Send + 'static,
) -> Result<JoinHandle<ServiceExit>> {
    let service_name = name.into();

    let wrapped = {
        let stop = stop.clone();
        async move {
            match spawn(future).await {
                Ok(Ok(_)) if stop.is_signaled() => ServiceExit::GracefulShutdown,
                Ok(Ok(_)) => {
                    stop.signal(StopReason::ControllerStopped);
                    ServiceExit::EarlyStop
                }
                Ok(Err(err)) => {
                    stop.signal(StopReason::ControllerFailed);
                    ServiceExit::Failed(err)
                }
                Err(err) => {
                    stop.signal(StopReason::ControllerFailed);
                    ServiceExit::Panic(err)
                }
            }
        }
    };

    let logged = {
        let stop = stop.clone();
        async move {
            let mut wrapped = Box::pin(wrapped);
            let stop_log = async move {
                stop.wait_signaled().await;
                tokio::time::sleep(SLOW_STOP_WARNING_AFTER).await;
            };

            debug!("Service starting");
            select! {
                exit = &mut wrapped => {
                    match &exit {
                        ServiceExit::GracefulShutdown => {
                            debug!("Service gracefully stopped")
                        }
                        ServiceExit::EarlyStop => error!("Service stopped early"),
                        ServiceExit::Failed(err) => error!(?err, "Service failed"),
                        ServiceExit::Panic(err) => error!(%err, "Service panicked"),
                    }
                    exit
                },
                _ = stop_log => {
                    warn!("Service stop is taking some time");
                    wrapped.await
                },
            }
        }
    };

    let instrumented = logged.instrument(span!(Level::ERROR, "service", "{}", service_name));

    let waited = stop.wrap_delay_stop(instrumented).context(service_name)?;

    Ok(spawn(waited))
}
