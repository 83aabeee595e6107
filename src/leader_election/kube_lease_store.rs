use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::coordination::v1::{Lease, LeaseSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{MicroTime, ObjectMeta};
use kube::api::PostParams;
use kube::{Api, Client};

use crate::leader_election::lease_store::{LeaseRecord, LeaseStore, LeaseStoreError};

/// `coordination.k8s.io/v1` Lease, updated with `resourceVersion` preconditions.
pub struct KubeLeaseStore {
    api: Api<Lease>,
    name: String,
}

impl KubeLeaseStore {
    pub fn new(client: Client, namespace: &str, name: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            name: name.to_owned(),
        }
    }

    fn to_lease(&self, record: &LeaseRecord) -> Lease {
        Lease {
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                resource_version: record.version.clone(),
                ..ObjectMeta::default()
            },
            spec: Some(LeaseSpec {
                holder_identity: record.holder_identity.clone(),
                lease_duration_seconds: Some(to_seconds(record.lease_duration)),
                acquire_time: record.acquire_time.map(MicroTime),
                renew_time: record.renew_time.map(MicroTime),
                lease_transitions: Some(record.lease_transitions),
                ..LeaseSpec::default()
            }),
        }
    }
}

fn from_lease(lease: &Lease) -> LeaseRecord {
    let spec = lease.spec.clone().unwrap_or_default();
    LeaseRecord {
        holder_identity: spec.holder_identity,
        lease_duration: Duration::from_secs(
            spec.lease_duration_seconds.unwrap_or_default().max(0) as u64,
        ),
        acquire_time: spec.acquire_time.map(|time| time.0),
        renew_time: spec.renew_time.map(|time| time.0),
        lease_transitions: spec.lease_transitions.unwrap_or_default(),
        version: lease.metadata.resource_version.clone(),
    }
}

/// Rounded up, so a sub-second duration never becomes zero.
fn to_seconds(duration: Duration) -> i32 {
    let seconds = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    i32::try_from(seconds).unwrap_or(i32::MAX)
}

#[async_trait]
impl LeaseStore for KubeLeaseStore {
    async fn get(&self) -> Result<Option<LeaseRecord>, LeaseStoreError> {
        let lease = self.api.get_opt(&self.name).await?;
        Ok(lease.as_ref().map(from_lease))
    }

    async fn create(&self, record: &LeaseRecord) -> Result<LeaseRecord, LeaseStoreError> {
        let mut lease = self.to_lease(record);
        lease.metadata.resource_version = None;
        let created = self.api.create(&PostParams::default(), &lease).await?;
        Ok(from_lease(&created))
    }

    async fn update(&self, record: &LeaseRecord) -> Result<LeaseRecord, LeaseStoreError> {
        if record.version.is_none() {
            // replace without resourceVersion would be a blind write
            return Err(LeaseStoreError::Conflict);
        }

        let lease = self.to_lease(record);
        let replaced = self
            .api
            .replace(&self.name, &PostParams::default(), &lease)
            .await?;
        Ok(from_lease(&replaced))
    }
}
