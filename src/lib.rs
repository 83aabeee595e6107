mod client_config;
mod config;
mod consts;
mod controller_config;
pub mod controllers;
mod downward_api;
mod error_codes;
mod error_types;
pub mod leader_election;
mod manager;
mod shutdown;
mod spawn_service;
mod stop_signal;
mod utils;

pub use crate::client_config::resolve_client_config;
pub use crate::config::{Config, ControllerOptions, LeaderElectionOptions};
pub use crate::controller_config::{
    ControllerConfig, ControllerSpec, EndpointGroupBindingConfig, GlobalAcceleratorConfig,
    ManagedKind, Route53Config, ZoneType,
};
pub use crate::controllers::{
    txt_owner_record_value, ControllerFactory, KubeControllerFactory, ReconciliationController,
};
pub use crate::downward_api::DownwardAPI;
pub use crate::error_types::ConfigError;
pub use crate::leader_election::{
    KubeLeaseStore, LeaderElectionConfig, LeaderElector, LeaderState,
};
pub use crate::manager::Manager;
pub use crate::shutdown::Shutdown;
pub use crate::stop_signal::{StopReason, StopSignal};

#[cfg(test)]
mod tests;

#[cfg(test)]
#[macro_use]
extern crate assert_matches;
