use thiserror::Error;

/// Invalid operator input. Detected before any client or leadership work starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("workers should be between 1 and {max}, got {value}")]
    InvalidWorkers { value: usize, max: u16 },

    #[error("cluster name '{0}' is not a valid tag value")]
    InvalidClusterName(String),

    #[error("route53 zone type should be 'public', 'private' or empty, got '{0}'")]
    InvalidZoneType(String),

    #[error("route53 txt owner id '{0}' is invalid")]
    InvalidTxtOwnerId(String),

    #[error("annotation filter '{0}' should be in 'key=value' form with a non-empty key")]
    InvalidAnnotationFilter(String),

    #[error("leader election timings should satisfy retry-period < renew-deadline < lease-duration")]
    InvalidLeaseTimings,
}
