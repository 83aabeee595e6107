//! Immutable configuration handed to every reconciliation controller.
//!
//! Assembled once from operator inputs before any client or leadership work, and never mutated afterwards.

use std::collections::BTreeMap;
use std::str::FromStr;

use strum_macros::{AsRefStr, Display, EnumString};

use crate::config::ControllerOptions;
use crate::error_types::ConfigError;

const MAX_TAG_VALUE_LENGTH: usize = 256;
const MAX_TXT_OWNER_ID_LENGTH: usize = 63;

#[derive(Copy, Clone, Debug, PartialEq, Eq, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ZoneType {
    Public,
    Private,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, AsRefStr, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ManagedKind {
    GlobalAccelerator,
    #[strum(serialize = "route53")]
    Route53,
    EndpointGroupBinding,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalAcceleratorConfig {
    pub workers: u16,
    pub cluster_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route53Config {
    pub workers: u16,
    pub cluster_name: String,
    pub annotation_filters: BTreeMap<String, String>,
    pub txt_owner_id: String,
    /// `None` selects zones of both types.
    pub zone_type: Option<ZoneType>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointGroupBindingConfig {
    pub workers: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    pub global_accelerator: GlobalAcceleratorConfig,
    pub route53: Route53Config,
    pub endpoint_group_binding: EndpointGroupBindingConfig,
}

/// A managed kind together with its own slice of the configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControllerSpec {
    GlobalAccelerator(GlobalAcceleratorConfig),
    Route53(Route53Config),
    EndpointGroupBinding(EndpointGroupBindingConfig),
}

impl ControllerSpec {
    pub fn kind(&self) -> ManagedKind {
        match self {
            ControllerSpec::GlobalAccelerator(_) => ManagedKind::GlobalAccelerator,
            ControllerSpec::Route53(_) => ManagedKind::Route53,
            ControllerSpec::EndpointGroupBinding(_) => ManagedKind::EndpointGroupBinding,
        }
    }

    pub fn workers(&self) -> u16 {
        match self {
            ControllerSpec::GlobalAccelerator(config) => config.workers,
            ControllerSpec::Route53(config) => config.workers,
            ControllerSpec::EndpointGroupBinding(config) => config.workers,
        }
    }
}

impl ControllerConfig {
    pub fn assemble(options: &ControllerOptions) -> Result<Self, ConfigError> {
        let workers = parse_workers(options.workers)?;
        let cluster_name = parse_cluster_name(&options.cluster_name)?;
        let annotation_filters = parse_annotation_filters(&options.annotation_filters)?;
        let zone_type = parse_zone_type(&options.route53_zone_type)?;
        let txt_owner_id = parse_txt_owner_id(&options.route53_txt_owner_id)?;

        Ok(ControllerConfig {
            global_accelerator: GlobalAcceleratorConfig {
                workers,
                cluster_name: cluster_name.clone(),
            },
            route53: Route53Config {
                workers,
                cluster_name,
                annotation_filters,
                txt_owner_id,
                zone_type,
            },
            endpoint_group_binding: EndpointGroupBindingConfig { workers },
        })
    }

    /// The fixed set of controllers, in a stable order.
    pub fn specs(&self) -> [ControllerSpec; 3] {
        [
            ControllerSpec::GlobalAccelerator(self.global_accelerator.clone()),
            ControllerSpec::Route53(self.route53.clone()),
            ControllerSpec::EndpointGroupBinding(self.endpoint_group_binding.clone()),
        ]
    }
}

fn parse_workers(workers: usize) -> Result<u16, ConfigError> {
    match u16::try_from(workers) {
        Ok(workers) if workers > 0 => Ok(workers),
        _ => Err(ConfigError::InvalidWorkers {
            value: workers,
            max: u16::MAX,
        }),
    }
}

fn parse_cluster_name(input: &str) -> Result<String, ConfigError> {
    let valid = !input.is_empty()
        && input.len() <= MAX_TAG_VALUE_LENGTH
        && input.trim() == input
        && input
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || " +-=._:/@".contains(c));

    if !valid {
        return Err(ConfigError::InvalidClusterName(input.to_owned()));
    }

    Ok(input.to_owned())
}

fn parse_annotation_filters(inputs: &[String]) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut filters = BTreeMap::new();
    for input in inputs {
        match input.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                filters.insert(key.trim().to_owned(), value.trim().to_owned());
            }
            _ => return Err(ConfigError::InvalidAnnotationFilter(input.clone())),
        }
    }

    Ok(filters)
}

fn parse_zone_type(input: &str) -> Result<Option<ZoneType>, ConfigError> {
    if input.is_empty() {
        return Ok(None);
    }

    ZoneType::from_str(input)
        .map(Some)
        .map_err(|_| ConfigError::InvalidZoneType(input.to_owned()))
}

/// The id ends up in `owner=<id>` of a comma separated TXT record value.
fn parse_txt_owner_id(input: &str) -> Result<String, ConfigError> {
    let valid = !input.is_empty()
        && input.len() <= MAX_TXT_OWNER_ID_LENGTH
        && input
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if !valid {
        return Err(ConfigError::InvalidTxtOwnerId(input.to_owned()));
    }

    Ok(input.to_owned())
}
