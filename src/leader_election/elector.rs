use std::future::{pending, Future};
use std::pin::{pin, Pin};
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use chrono::Utc;
use eyre::{eyre, Result};
use rand::Rng;
use tokio::select;
use tokio::sync::watch;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, span, trace, warn, Instrument, Level};

use crate::consts::RELEASED_LEASE_DURATION;
use crate::error_types::ConfigError;
use crate::leader_election::lease_store::{LeaseRecord, LeaseStore, LeaseStoreError};
use crate::leader_election::{LeaderElectionConfig, LeaderState};
use crate::shutdown::Shutdown;
use crate::stop_signal::{StopReason, StopSignal};

const JITTER_FACTOR: f64 = 0.2;

pub struct LeaderElector<S> {
    store: S,
    config: LeaderElectionConfig,
    state: watch::Sender<LeaderState>,
    observed: Option<ObservedRecord>,
}

/// A record version and when this replica first saw it, on its own monotonic clock.
struct ObservedRecord {
    record: LeaseRecord,
    observed_at: Instant,
}

enum Attempt {
    Acquired,
    HeldByOther(String),
    Conflict,
}

enum HoldEnd {
    Lost,
    Shutdown,
    Fatal(LeaseStoreError),
    EpochEnded,
}

impl<S: LeaseStore> LeaderElector<S> {
    pub fn new(store: S, config: LeaderElectionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (state, _) = watch::channel(LeaderState::Unleased);
        Ok(Self {
            store,
            config,
            state,
            observed: None,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<LeaderState> {
        self.state.subscribe()
    }

    /// Run until `shutdown` is triggered, calling `on_start` on every leadership acquisition.
    ///
    /// The future returned by `on_start` must return soon after its [`StopSignal`] is signaled.
    /// It is always awaited to completion before leadership is attempted again, so epochs never
    /// overlap. Returns an error only when the lease store rejects this replica for good.
    pub async fn run<C, F, Fut>(
        self,
        shutdown: &Shutdown,
        client_config: C,
        on_start: F,
    ) -> Result<()>
    where
        C: Clone,
        F: FnMut(C, StopSignal) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let span = span!(
            Level::ERROR,
            "leader_election",
            lease = %self.config.lease_name,
            identity = %self.config.identity,
        );
        self.run_loop(shutdown, client_config, on_start)
            .instrument(span)
            .await
    }

    async fn run_loop<C, F, Fut>(
        mut self,
        shutdown: &Shutdown,
        client_config: C,
        mut on_start: F,
    ) -> Result<()>
    where
        C: Clone,
        F: FnMut(C, StopSignal) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        loop {
            self.set_state(LeaderState::Unleased);
            let acquired_at = select! {
                result = self.acquire() => match result {
                    Ok(acquired_at) => acquired_at,
                    Err(err) => {
                        error!(?err, "Failed to acquire lease");
                        return Err(eyre!(err).wrap_err("leader election failed"));
                    }
                },
                _ = shutdown.wait_shutdown_triggered() => return Ok(()),
            };

            self.set_state(LeaderState::Held);
            info!("Leadership acquired");

            let stop = StopSignal::new();
            let epoch = on_start(client_config.clone(), stop.clone());
            let end = self.hold(epoch, acquired_at, &stop, shutdown).await;

            match end {
                HoldEnd::Lost => {
                    warn!("Leadership lost");
                }
                HoldEnd::EpochEnded => {
                    self.release().await;
                    if !self
                        .wait_or_shutdown(self.config.retry_period, Some(shutdown))
                        .await
                    {
                        return Ok(());
                    }
                }
                HoldEnd::Shutdown => {
                    self.release().await;
                    return Ok(());
                }
                HoldEnd::Fatal(err) => {
                    error!(?err, "Failed to renew lease");
                    return Err(eyre!(err).wrap_err("leader election failed"));
                }
            }
        }
    }

    /// Keep the lease renewed while the epoch runs. The epoch is always finished on return.
    async fn hold<Fut>(
        &mut self,
        epoch: Fut,
        acquired_at: Instant,
        stop: &StopSignal,
        shutdown: &Shutdown,
    ) -> HoldEnd
    where
        Fut: Future<Output = Result<()>>,
    {
        let mut epoch = pin!(epoch);
        let mut last_renewed = acquired_at;
        let (end, result) = select! {
            result = &mut epoch => {
                stop.signal(StopReason::EpochEnded);
                (HoldEnd::EpochEnded, result)
            }
            end = self.renew_until_lost(&mut last_renewed, Some(shutdown)) => {
                let reason = match &end {
                    HoldEnd::Shutdown => StopReason::Shutdown,
                    _ => {
                        self.set_state(LeaderState::Lost);
                        StopReason::LeadershipLost
                    }
                };
                stop.signal(reason);
                info!(%reason, "Stopping controllers");

                match end {
                    // still the leader until the controllers are gone
                    HoldEnd::Shutdown => self.wind_down(&mut epoch, last_renewed).await,
                    end => (end, epoch.await),
                }
            }
        };

        match result {
            Ok(()) => info!("Controllers stopped"),
            Err(err) => error!(?err, "Controllers failed"),
        }

        end
    }

    /// Keep renewing until the stopped epoch finishes.
    async fn wind_down<Fut>(
        &mut self,
        epoch: &mut Pin<&mut Fut>,
        mut last_renewed: Instant,
    ) -> (HoldEnd, Result<()>)
    where
        Fut: Future<Output = Result<()>>,
    {
        let end = select! {
            result = epoch.as_mut() => return (HoldEnd::Shutdown, result),
            end = self.renew_until_lost(&mut last_renewed, None) => end,
        };

        let end = match end {
            HoldEnd::Fatal(err) => {
                error!(?err, "Failed to renew lease while stopping controllers");
                HoldEnd::Fatal(err)
            }
            _ => {
                self.set_state(LeaderState::Lost);
                warn!("Leadership lost while stopping controllers");
                HoldEnd::Shutdown
            }
        };
        (end, epoch.await)
    }

    /// Renew every retry period. Without `shutdown`, only losing the lease ends the loop.
    async fn renew_until_lost(
        &mut self,
        last_renewed: &mut Instant,
        shutdown: Option<&Shutdown>,
    ) -> HoldEnd {
        loop {
            if !self.wait_or_shutdown(self.config.retry_period, shutdown).await {
                return HoldEnd::Shutdown;
            }

            let started = Instant::now();
            let remaining = self
                .config
                .renew_deadline
                .saturating_sub(started - *last_renewed);
            let attempt = select! {
                attempt = timeout(remaining, self.try_acquire_or_renew()) => attempt,
                _ = shutdown_triggered(shutdown) => return HoldEnd::Shutdown,
            };

            match attempt {
                Ok(Ok(Attempt::Acquired)) => {
                    *last_renewed = started;
                    self.set_state(LeaderState::Held);
                    trace!("Lease renewed");
                }
                Ok(Ok(Attempt::HeldByOther(holder))) => {
                    warn!(%holder, "Lease was taken over");
                    return HoldEnd::Lost;
                }
                Ok(Ok(Attempt::Conflict)) => {
                    self.set_state(LeaderState::Renewing);
                    debug!("Lease renewal conflicted");
                }
                Ok(Err(err @ LeaseStoreError::Fatal(_))) => return HoldEnd::Fatal(err),
                Ok(Err(err)) => {
                    self.set_state(LeaderState::Renewing);
                    warn!(?err, "Failed to renew lease");
                }
                Err(_) => {
                    self.set_state(LeaderState::Renewing);
                    warn!("Lease renewal timed out");
                }
            }

            if last_renewed.elapsed() >= self.config.renew_deadline {
                warn!("Failed to renew lease within the renew deadline");
                return HoldEnd::Lost;
            }
        }
    }

    /// Returns when this replica holds the lease, with the time the successful attempt started.
    async fn acquire(&mut self) -> Result<Instant, LeaseStoreError> {
        let mut backoff = self.new_backoff();
        loop {
            let started = Instant::now();
            let delay = match timeout(self.config.renew_deadline, self.try_acquire_or_renew()).await
            {
                Ok(Ok(Attempt::Acquired)) => return Ok(started),
                Ok(Ok(Attempt::HeldByOther(holder))) => {
                    trace!(%holder, "Lease is held by another replica");
                    backoff.reset();
                    jittered(self.config.retry_period)
                }
                Ok(Ok(Attempt::Conflict)) => {
                    debug!("Lost the race for the lease");
                    backoff.reset();
                    jittered(self.config.retry_period)
                }
                Ok(Err(err @ LeaseStoreError::Fatal(_))) => return Err(err),
                Ok(Err(err)) => {
                    warn!(?err, "Failed to acquire lease, retrying");
                    backoff.next_backoff().unwrap_or(self.config.lease_duration)
                }
                Err(_) => {
                    warn!("Lease acquisition timed out, retrying");
                    backoff.next_backoff().unwrap_or(self.config.lease_duration)
                }
            };

            sleep(delay).await;
        }
    }

    async fn try_acquire_or_renew(&mut self) -> Result<Attempt, LeaseStoreError> {
        let now = Utc::now();
        let identity = self.config.identity.clone();

        let Some(current) = self.store.get().await? else {
            let record = LeaseRecord {
                holder_identity: Some(identity),
                lease_duration: self.config.lease_duration,
                acquire_time: Some(now),
                renew_time: Some(now),
                lease_transitions: 0,
                version: None,
            };
            return match self.store.create(&record).await {
                Ok(created) => {
                    self.observe(created);
                    Ok(Attempt::Acquired)
                }
                Err(LeaseStoreError::Conflict) => Ok(Attempt::Conflict),
                Err(err) => Err(err),
            };
        };

        self.observe(current.clone());

        let held_by_us = current.is_held_by(&identity);
        if !held_by_us {
            if let Some(holder) = current.holder() {
                if !self.observed_expired() {
                    return Ok(Attempt::HeldByOther(holder.to_owned()));
                }
            }
        }

        let mut record = current;
        record.lease_duration = self.config.lease_duration;
        record.renew_time = Some(now);
        if !held_by_us {
            record.holder_identity = Some(identity);
            record.acquire_time = Some(now);
            record.lease_transitions += 1;
        }

        match self.store.update(&record).await {
            Ok(updated) => {
                self.observe(updated);
                Ok(Attempt::Acquired)
            }
            Err(LeaseStoreError::Conflict) => Ok(Attempt::Conflict),
            Err(err) => Err(err),
        }
    }

    /// Step down, so that the other replicas don't have to wait for the lease to expire.
    async fn release(&mut self) {
        let Some(observed) = &self.observed else {
            return;
        };
        if !observed.record.is_held_by(&self.config.identity) {
            return;
        }

        let mut record = observed.record.clone();
        record.holder_identity = None;
        record.lease_duration = RELEASED_LEASE_DURATION;
        record.renew_time = Some(Utc::now());

        match timeout(self.config.renew_deadline, self.store.update(&record)).await {
            Ok(Ok(released)) => {
                self.observe(released);
                info!("Lease released");
            }
            Ok(Err(err)) => warn!(?err, "Failed to release lease"),
            Err(_) => warn!("Lease release timed out"),
        }
        self.set_state(LeaderState::Unleased);
    }

    fn observe(&mut self, record: LeaseRecord) {
        match &mut self.observed {
            Some(observed) if observed.record.version == record.version => {
                observed.record = record;
            }
            _ => {
                self.observed = Some(ObservedRecord {
                    record,
                    observed_at: Instant::now(),
                })
            }
        }
    }

    fn observed_expired(&self) -> bool {
        match &self.observed {
            Some(observed) => {
                observed.observed_at + observed.record.lease_duration <= Instant::now()
            }
            None => true,
        }
    }

    /// Publishes transitions only. Repeating the current state notifies nobody.
    fn set_state(&self, state: LeaderState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            debug!(previous = %current, %state, "Leader state changed");
            *current = state;
            true
        });
    }

    fn new_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.config.retry_period)
            .with_max_interval(self.config.lease_duration)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Returns `false` if shutdown was triggered while waiting.
    async fn wait_or_shutdown(&self, duration: Duration, shutdown: Option<&Shutdown>) -> bool {
        select! {
            _ = sleep(duration) => true,
            _ = shutdown_triggered(shutdown) => false,
        }
    }
}

async fn shutdown_triggered(shutdown: Option<&Shutdown>) {
    match shutdown {
        Some(shutdown) => {
            shutdown.wait_shutdown_triggered().await;
        }
        None => pending().await,
    }
}

fn jittered(duration: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(0.0..JITTER_FACTOR);
    duration + duration.mul_f64(factor)
}
