use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error_codes::{is_409_conflict_error, is_credential_error};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Snapshot of the distributed lease.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaseRecord {
    pub holder_identity: Option<String>,
    pub lease_duration: Duration,
    pub acquire_time: Option<DateTime<Utc>>,
    pub renew_time: Option<DateTime<Utc>>,
    pub lease_transitions: i32,
    /// Opaque version compared on update. `None` until the record is stored.
    pub version: Option<String>,
}

impl LeaseRecord {
    pub fn is_held_by(&self, identity: &str) -> bool {
        self.holder_identity.as_deref() == Some(identity)
    }

    /// The holder, unless the lease was released.
    pub fn holder(&self) -> Option<&str> {
        self.holder_identity
            .as_deref()
            .filter(|holder| !holder.is_empty())
    }
}

#[derive(Debug, Error)]
pub enum LeaseStoreError {
    /// Someone else wrote the record first.
    #[error("lease was modified concurrently")]
    Conflict,

    #[error("lease store is unavailable")]
    Transient(#[source] BoxError),

    /// Retrying won't help, e.g. malformed or rejected credentials.
    #[error("lease store rejected the request")]
    Fatal(#[source] BoxError),
}

impl From<kube::Error> for LeaseStoreError {
    fn from(err: kube::Error) -> Self {
        if is_409_conflict_error(&err) {
            LeaseStoreError::Conflict
        } else if is_credential_error(&err) {
            LeaseStoreError::Fatal(Box::new(err))
        } else {
            LeaseStoreError::Transient(Box::new(err))
        }
    }
}

/// Storage of a single named lease. Writes are conditional, never blind.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    async fn get(&self) -> Result<Option<LeaseRecord>, LeaseStoreError>;

    /// Fails with [`LeaseStoreError::Conflict`] if the lease already exists.
    async fn create(&self, record: &LeaseRecord) -> Result<LeaseRecord, LeaseStoreError>;

    /// Fails with [`LeaseStoreError::Conflict`] unless `record.version` is the stored version.
    async fn update(&self, record: &LeaseRecord) -> Result<LeaseRecord, LeaseStoreError>;
}
