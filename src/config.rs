use std::path::PathBuf;
use clap::{Args, Parser};
use humantime::Duration;

use crate::consts::{
    CONTROLLER_NAME, DEFAULT_CLUSTER_NAME, DEFAULT_LEASE_DURATION, DEFAULT_RENEW_DEADLINE,
    DEFAULT_RETRY_PERIOD, DEFAULT_TXT_OWNER_ID,
};

#[derive(Clone, Debug, Parser)]
#[command(version, about)]
pub struct Config {
    #[command(flatten)]
    pub controller: ControllerOptions,

    #[command(flatten)]
    pub leader_election: LeaderElectionOptions,

    /// Path to a kubeconfig. Only required if out-of-cluster.
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// The address of the Kubernetes API server. Overrides any value in kubeconfig.
    #[arg(long)]
    pub master: Option<String>,
}

/// Raw controller inputs, validated by [`crate::ControllerConfig::assemble`].
#[derive(Clone, Debug, Args)]
pub struct ControllerOptions {
    /// Concurrent workers number for each controller.
    #[arg(short, long, default_value_t = 1)]
    pub workers: usize,

    /// Owner cluster name which is used in resource tags.
    #[arg(short, long, default_value = DEFAULT_CLUSTER_NAME)]
    pub cluster_name: String,

    /// Annotation filters in 'key=value' form, applied when listing ingresses and services.
    #[arg(long = "annotation-filter", value_delimiter = ',')]
    pub annotation_filters: Vec<String>,

    /// The type of zone(s) to filter in ('public' or 'private').
    #[arg(long, default_value = "")]
    pub route53_zone_type: String,

    /// ID of the owner for the TXT records. Set it when several deployments manage the same zone.
    #[arg(long, default_value = DEFAULT_TXT_OWNER_ID)]
    pub route53_txt_owner_id: String,
}

#[derive(Clone, Debug, Args)]
pub struct LeaderElectionOptions {
    #[arg(long, default_value = CONTROLLER_NAME)]
    pub lease_name: String,

    #[arg(long, default_value_t = DEFAULT_LEASE_DURATION.into())]
    pub lease_duration: Duration,

    #[arg(long, default_value_t = DEFAULT_RENEW_DEADLINE.into())]
    pub renew_deadline: Duration,

    #[arg(long, default_value_t = DEFAULT_RETRY_PERIOD.into())]
    pub retry_period: Duration,
}
