use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::leader_election::{LeaseRecord, LeaseStore, LeaseStoreError};

/// A lease shared by every replica of a test, like the one stored in the API server.
#[derive(Clone, Default)]
pub struct MemoryLease {
    inner: Arc<Mutex<MemoryLeaseInner>>,
}

#[derive(Default)]
struct MemoryLeaseInner {
    record: Option<LeaseRecord>,
    version: u64,
    writes: Vec<LeaseWrite>,
}

#[derive(Clone, Debug)]
pub struct LeaseWrite {
    pub at: Instant,
    pub holder: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Fault {
    None,
    /// Every call fails like an unreachable API server.
    Transient,
    /// Every call hangs forever.
    Hang,
    /// Every call is rejected like with revoked credentials.
    Fatal,
}

/// One replica's view of the [`MemoryLease`], with its own injectable faults.
#[derive(Clone)]
pub struct MemoryLeaseStore {
    lease: MemoryLease,
    fault: Arc<Mutex<Fault>>,
}

impl MemoryLease {
    pub fn replica(&self) -> MemoryLeaseStore {
        MemoryLeaseStore {
            lease: self.clone(),
            fault: Arc::new(Mutex::new(Fault::None)),
        }
    }

    pub fn holder(&self) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .record
            .as_ref()
            .and_then(|record| record.holder().map(String::from))
    }

    pub fn record(&self) -> Option<LeaseRecord> {
        self.inner.lock().unwrap().record.clone()
    }

    pub fn writes(&self) -> Vec<LeaseWrite> {
        self.inner.lock().unwrap().writes.clone()
    }

    /// Compare-and-swap against the stored version. `None` expects no record at all.
    fn compare_and_store(
        &self,
        expected: Option<&str>,
        record: &LeaseRecord,
    ) -> Result<LeaseRecord, LeaseStoreError> {
        let mut inner = self.inner.lock().unwrap();
        let current = inner.record.as_ref().map(|record| record.version.as_deref());
        match (current, expected) {
            (None, None) => {}
            (Some(current), Some(expected)) if current == Some(expected) => {}
            _ => return Err(LeaseStoreError::Conflict),
        }

        inner.version += 1;
        let mut stored = record.clone();
        stored.version = Some(inner.version.to_string());
        inner.record = Some(stored.clone());
        inner.writes.push(LeaseWrite {
            at: Instant::now(),
            holder: stored.holder().map(String::from),
        });
        Ok(stored)
    }
}

impl MemoryLeaseStore {
    pub fn set_fault(&self, fault: Fault) {
        *self.fault.lock().unwrap() = fault;
    }

    async fn check_fault(&self) -> Result<(), LeaseStoreError> {
        let fault = *self.fault.lock().unwrap();
        match fault {
            Fault::None => Ok(()),
            Fault::Transient => Err(LeaseStoreError::Transient("connection refused".into())),
            Fault::Hang => std::future::pending().await,
            Fault::Fatal => Err(LeaseStoreError::Fatal("unauthorized".into())),
        }
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn get(&self) -> Result<Option<LeaseRecord>, LeaseStoreError> {
        self.check_fault().await?;
        Ok(self.lease.record())
    }

    async fn create(&self, record: &LeaseRecord) -> Result<LeaseRecord, LeaseStoreError> {
        self.check_fault().await?;
        self.lease.compare_and_store(None, record)
    }

    async fn update(&self, record: &LeaseRecord) -> Result<LeaseRecord, LeaseStoreError> {
        self.check_fault().await?;
        match record.version.as_deref() {
            Some(version) => self.lease.compare_and_store(Some(version), record),
            None => Err(LeaseStoreError::Conflict),
        }
    }
}
