//! Launch requests built from accepted offers.
//!
//! A launch consumes exactly the configured CPU, RAM and disk plus the
//! first two role-scoped ports of the offer: the first serves the HTTP
//! API, the second the node-to-node transport.

use chrono::{DateTime, Utc};
use esgrid_core::{
    AgentId, NodeAddress, Offer, OfferId, REQUIRED_PORTS, Resource, SchedulerConfig, Task,
    TaskId, TaskStatus, available_ports, resources_for_role,
};
use serde::Serialize;

use crate::error::{SchedulerError, SchedulerResult};

/// A task launch to submit to the cluster manager.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskLaunch {
    pub task_id: TaskId,
    pub offer_id: OfferId,
    pub agent_id: AgentId,
    pub hostname: String,
    pub api_port: u16,
    pub transport_port: u16,
    /// Resources consumed from the offer, scoped to the framework role.
    pub resources: Vec<Resource>,
}

impl TaskLaunch {
    /// The cluster-state record for this launch, before any status update.
    pub fn to_task(&self) -> Task {
        Task {
            id: self.task_id.clone(),
            agent_id: self.agent_id.clone(),
            hostname: self.hostname.clone(),
            client_address: NodeAddress::new(&self.hostname, self.api_port),
            transport_address: NodeAddress::new(&self.hostname, self.transport_port),
            status: TaskStatus::Staging,
        }
    }
}

/// Task id of the form `{framework}_{hostname}_{agent}_{timestamp}`.
///
/// Hostnames need not be unique across agents, so the agent id keeps ids
/// of concurrently live tasks distinct.
pub fn task_id(
    framework_name: &str,
    hostname: &str,
    agent_id: &str,
    now: DateTime<Utc>,
) -> TaskId {
    format!(
        "{framework_name}_{hostname}_{agent_id}_{}",
        now.format("%Y%m%dT%H%M%S%.3fZ")
    )
}

/// Build the launch for an accepted offer.
pub fn build_launch(
    offer: &Offer,
    config: &SchedulerConfig,
    now: DateTime<Utc>,
) -> SchedulerResult<TaskLaunch> {
    let role = config.framework_role();
    let scoped = resources_for_role(offer, role);
    let ports = available_ports(&scoped);
    let [api_port, transport_port] = match ports.get(..REQUIRED_PORTS) {
        Some(&[api, transport]) => [api, transport],
        _ => {
            return Err(SchedulerError::Launch {
                offer_id: offer.id.clone(),
                reason: format!("needs {REQUIRED_PORTS} ports, found {}", ports.len()),
            });
        }
    };

    let resources = vec![
        Resource::cpus(config.resources.cpus, role),
        Resource::mem(config.resources.mem, role),
        Resource::disk(config.resources.disk, role),
        Resource::port_range(api_port, api_port, role),
        Resource::port_range(transport_port, transport_port, role),
    ];

    Ok(TaskLaunch {
        task_id: task_id(&config.framework.name, &offer.hostname, &offer.agent_id, now),
        offer_id: offer.id.clone(),
        agent_id: offer.agent_id.clone(),
        hostname: offer.hostname.clone(),
        api_port,
        transport_port,
        resources,
    })
}
