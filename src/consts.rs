use std::time::Duration;

pub const CONTROLLER_NAME: &str = "aws-global-accelerator-controller";

pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_CLUSTER_NAME: &str = "default";
pub const DEFAULT_TXT_OWNER_ID: &str = "aws-global-accelerator-controller";

pub const DEFAULT_LEASE_DURATION: Duration = Duration::from_secs(15);
pub const DEFAULT_RENEW_DEADLINE: Duration = Duration::from_secs(10);
pub const DEFAULT_RETRY_PERIOD: Duration = Duration::from_secs(5);

/// Lease duration written when stepping down, so the next replica doesn't wait a full term.
pub const RELEASED_LEASE_DURATION: Duration = Duration::from_secs(1);

pub const GLOBAL_ACCELERATOR_MANAGED_ANNOTATION_KEY: &str =
    "aws-global-accelerator-controller.h3poteto.dev/global-accelerator-managed";
pub const ROUTE53_HOSTNAME_ANNOTATION_KEY: &str =
    "aws-global-accelerator-controller.h3poteto.dev/route53-hostname";

pub const OWNER_CLUSTER_TAG_KEY: &str = "aws-global-accelerator-controller-owner";
pub const TXT_HERITAGE: &str = "aws-global-accelerator-controller";
