//! Per-epoch broadcast cancellation shared by every reconciliation controller.

use std::fmt;
use std::future::Future;

use async_shutdown::{
    ShutdownAlreadyCompleted, ShutdownManager, ShutdownSignal, WrapDelayShutdown,
};
use futures::FutureExt;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Renewal failed for longer than the renew deadline, or the lease was taken over.
    LeadershipLost,
    /// The process is shutting down.
    Shutdown,
    /// A controller returned an error or panicked.
    ControllerFailed,
    /// A controller returned before being asked to stop.
    ControllerStopped,
    /// The epoch callback returned on its own.
    EpochEnded,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            StopReason::LeadershipLost => "leadership lost",
            StopReason::Shutdown => "shutdown",
            StopReason::ControllerFailed => "controller failed",
            StopReason::ControllerStopped => "controller stopped",
            StopReason::EpochEnded => "epoch ended",
        };
        f.write_str(reason)
    }
}

/// One-shot and monotonic: the first reason wins and the signal never reverts.
#[derive(Clone)]
pub struct StopSignal {
    inner: ShutdownManager<StopReason>,
}

impl StopSignal {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            inner: ShutdownManager::new(),
        }
    }

    /// Returns `true` if this call made the transition.
    pub fn signal(&self, reason: StopReason) -> bool {
        self.inner.trigger_shutdown(reason).is_ok()
    }

    pub fn is_signaled(&self) -> bool {
        self.inner.is_shutdown_triggered()
    }

    pub fn reason(&self) -> Option<StopReason> {
        self.inner.shutdown_reason()
    }

    pub fn wait_signaled(&self) -> ShutdownSignal<StopReason> {
        self.inner.wait_shutdown_triggered()
    }

    /// Same as [`StopSignal::wait_signaled`], for APIs expecting `Future<Output = ()>`.
    pub fn stopped(&self) -> impl Future<Output = ()> + Send + Sync + 'static {
        self.inner.wait_shutdown_triggered().map(|_| ())
    }

    /// Delays the stop from completing until `future` finishes. Refused once signaled with no
    /// wrapped future left, so nothing starts in an epoch that is already over.
    pub fn wrap_delay_stop<F: Future>(
        &self,
        future: F,
    ) -> Result<WrapDelayShutdown<StopReason, F>, ShutdownAlreadyCompleted<StopReason>> {
        self.inner.wrap_delay_shutdown(future)
    }
}
