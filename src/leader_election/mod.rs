//! Single-leader election over a distributed lease.
//!
//! <https://kubernetes.io/docs/concepts/architecture/leases/>

mod elector;
mod kube_lease_store;
mod lease_store;

use std::time::Duration;

use strum_macros::Display;

use crate::config::LeaderElectionOptions;
use crate::downward_api::DownwardAPI;
use crate::error_types::ConfigError;

pub use elector::LeaderElector;
pub use kube_lease_store::KubeLeaseStore;
pub use lease_store::{BoxError, LeaseRecord, LeaseStore, LeaseStoreError};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LeaderState {
    /// Not holding the lease; trying to acquire it.
    Unleased,
    /// Holding the lease; the last renewal succeeded.
    Held,
    /// Holding the lease, but the last renewal failed.
    Renewing,
    /// Renewal deadline passed or the lease was taken over.
    Lost,
}

#[derive(Clone, Debug)]
pub struct LeaderElectionConfig {
    pub lease_name: String,
    pub namespace: String,
    pub identity: String,
    /// How long other replicas wait since the last observed change before taking over.
    pub lease_duration: Duration,
    /// How long the leader keeps trying to renew before it gives up leadership.
    pub renew_deadline: Duration,
    /// Interval between acquire or renew attempts.
    pub retry_period: Duration,
}

impl LeaderElectionConfig {
    pub fn new(
        options: &LeaderElectionOptions,
        downward_api: &DownwardAPI,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            lease_name: options.lease_name.clone(),
            namespace: downward_api.lease_namespace().to_owned(),
            identity: downward_api.holder_identity(),
            lease_duration: *options.lease_duration,
            renew_deadline: *options.renew_deadline,
            retry_period: *options.retry_period,
        };
        config.validate()?;
        Ok(config)
    }

    /// The leader must give up before any other replica may consider the lease expired.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_period.is_zero()
            || self.retry_period >= self.renew_deadline
            || self.renew_deadline >= self.lease_duration
        {
            return Err(ConfigError::InvalidLeaseTimings);
        }

        Ok(())
    }
}
