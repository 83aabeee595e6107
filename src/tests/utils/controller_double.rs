use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use eyre::{eyre, Result};
use tokio::time::{sleep, Instant};

use crate::controller_config::{ControllerSpec, ManagedKind};
use crate::controllers::{ControllerFactory, ReconciliationController};
use crate::stop_signal::{StopReason, StopSignal};

#[derive(Copy, Clone, Debug)]
pub enum Behavior {
    /// Run until stopped, then take `Duration` to wind down.
    WaitForStop(Duration),
    FailAfter(Duration),
    ReturnAfter(Duration),
    PanicAfter(Duration),
    FailToBuild,
}

#[derive(Clone, Debug)]
pub struct StoppedController {
    pub kind: ManagedKind,
    pub reason: Option<StopReason>,
    pub at: Instant,
}

/// What the controllers went through, shared across epochs.
#[derive(Clone, Default)]
pub struct ControllerLog {
    built: Arc<Mutex<Vec<ControllerSpec>>>,
    started: Arc<Mutex<Vec<ManagedKind>>>,
    stopped: Arc<Mutex<Vec<StoppedController>>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl ControllerLog {
    pub fn built(&self) -> Vec<ControllerSpec> {
        self.built.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<ManagedKind> {
        self.started.lock().unwrap().clone()
    }

    pub fn stopped(&self) -> Vec<StoppedController> {
        self.stopped.lock().unwrap().clone()
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn enter(&self, kind: ManagedKind) {
        self.started.lock().unwrap().push(kind);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
    }

    fn exit(&self, kind: ManagedKind, stop: &StopSignal) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.stopped.lock().unwrap().push(StoppedController {
            kind,
            reason: stop.reason(),
            at: Instant::now(),
        });
    }
}

/// Builds controllers acting out a [`Behavior`] per kind. Unlisted kinds wait for stop.
#[derive(Clone, Default)]
pub struct RecordingFactory {
    pub log: ControllerLog,
    behaviors: HashMap<ManagedKind, Behavior>,
}

impl RecordingFactory {
    pub fn with(mut self, kind: ManagedKind, behavior: Behavior) -> Self {
        self.behaviors.insert(kind, behavior);
        self
    }
}

impl<C: Send + 'static> ControllerFactory<C> for RecordingFactory {
    fn build(&self, spec: ControllerSpec) -> Result<Box<dyn ReconciliationController<C>>> {
        let kind = spec.kind();
        let behavior = self
            .behaviors
            .get(&kind)
            .copied()
            .unwrap_or(Behavior::WaitForStop(Duration::ZERO));
        if let Behavior::FailToBuild = behavior {
            return Err(eyre!("cannot build {kind}"));
        }

        self.log.built.lock().unwrap().push(spec);
        Ok(Box::new(ControllerDouble {
            kind,
            behavior,
            log: self.log.clone(),
        }))
    }
}

struct ControllerDouble {
    kind: ManagedKind,
    behavior: Behavior,
    log: ControllerLog,
}

#[async_trait]
impl<C: Send + 'static> ReconciliationController<C> for ControllerDouble {
    async fn run(self: Box<Self>, _client_config: C, stop: StopSignal) -> Result<()> {
        self.log.enter(self.kind);
        let result = match self.behavior {
            Behavior::WaitForStop(wind_down) => {
                stop.wait_signaled().await;
                sleep(wind_down).await;
                Ok(())
            }
            Behavior::FailAfter(after) => {
                sleep(after).await;
                Err(eyre!("{} failed", self.kind))
            }
            Behavior::ReturnAfter(after) => {
                sleep(after).await;
                Ok(())
            }
            Behavior::PanicAfter(after) => {
                sleep(after).await;
                self.log.exit(self.kind, &stop);
                panic!("{} panicked", self.kind);
            }
            Behavior::FailToBuild => unreachable!(),
        };
        self.log.exit(self.kind, &stop);
        result
    }
}
