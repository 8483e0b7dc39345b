pub mod config;
pub mod resources;
pub mod types;

pub use config::{ConfigError, REQUIRED_PORTS, SchedulerConfig};
pub use resources::{
    PortRange, Resource, ResourceKind, available_ports, resources_for_role, scalar_total,
};
pub use types::*;
