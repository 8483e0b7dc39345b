//! Offer admission — decides whether an offer should launch a node.
//!
//! Rules run in a fixed order against one snapshot of the cluster state,
//! and the first rule that fails names the decline reason. Reasons are
//! never aggregated: the log should show the first structural reason an
//! offer was unusable.
//!
//! 1. the agent already runs a task
//! 2. the cluster already has its target number of nodes
//! 3. fewer than [`REQUIRED_PORTS`] ports for our role
//! 4. not enough CPU, RAM or disk for our role (checked in that order)
//!
//! Only resources reserved for the configured framework role are visible.
//! Evaluation has no side effects; accepting an offer does not touch the
//! cluster state.

use std::sync::Arc;

use esgrid_core::{
    Offer, REQUIRED_PORTS, Resource, ResourceKind, SchedulerConfig, Task, available_ports,
    resources_for_role, scalar_total,
};
use serde::Serialize;
use tracing::debug;

use crate::cluster_state::ClusterState;

pub const HOST_ALREADY_RUNNING_TASK: &str = "Host already running task";
pub const CLUSTER_SIZE_FULFILLED: &str = "Cluster size already fulfilled";
pub const NOT_ENOUGH_PORTS: &str = "Offer did not have 2 ports";
pub const NOT_ENOUGH_CPU: &str = "Offer did not have enough CPU resources";
pub const NOT_ENOUGH_RAM: &str = "Offer did not have enough RAM resources";
pub const NOT_ENOUGH_DISK: &str = "Offer did not have enough disk resources";

/// Outcome of evaluating one offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfferResult {
    pub accepted: bool,
    /// Why the offer was declined. Always `None` when accepted.
    pub reason: Option<String>,
}

impl OfferResult {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub fn decline(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
        }
    }
}

/// What a rule sees: the offer, its role-scoped resources, and the
/// cluster snapshot taken for this evaluation.
struct Candidate<'a> {
    offer: &'a Offer,
    resources: Vec<&'a Resource>,
    tasks: &'a [Task],
}

/// One admission rule. `declines` returns true when the offer must be
/// declined with `reason`.
struct OfferRule {
    reason: &'static str,
    declines: fn(&SchedulerConfig, &Candidate<'_>) -> bool,
}

const RULES: &[OfferRule] = &[
    OfferRule {
        reason: HOST_ALREADY_RUNNING_TASK,
        declines: |_, c| c.tasks.iter().any(|t| t.agent_id == c.offer.agent_id),
    },
    OfferRule {
        reason: CLUSTER_SIZE_FULFILLED,
        declines: |config, c| c.tasks.len() >= config.target_nodes(),
    },
    OfferRule {
        reason: NOT_ENOUGH_PORTS,
        declines: |_, c| available_ports(&c.resources).len() < REQUIRED_PORTS,
    },
    OfferRule {
        reason: NOT_ENOUGH_CPU,
        declines: |config, c| short(c, ResourceKind::Cpus, config.resources.cpus),
    },
    OfferRule {
        reason: NOT_ENOUGH_RAM,
        declines: |config, c| short(c, ResourceKind::Mem, config.resources.mem),
    },
    OfferRule {
        reason: NOT_ENOUGH_DISK,
        declines: |config, c| short(c, ResourceKind::Disk, config.resources.disk),
    },
];

/// Whether the role's total of `kind` falls below `required`. A NaN or
/// infinite total is never enough.
fn short(c: &Candidate<'_>, kind: ResourceKind, required: f64) -> bool {
    let total = scalar_total(&c.resources, kind);
    !(total.is_finite() && total >= required)
}

/// Evaluates offers against the configuration and current cluster state.
#[derive(Clone)]
pub struct OfferStrategy {
    config: Arc<SchedulerConfig>,
    cluster_state: Arc<ClusterState>,
}

impl OfferStrategy {
    pub fn new(config: Arc<SchedulerConfig>, cluster_state: Arc<ClusterState>) -> Self {
        Self {
            config,
            cluster_state,
        }
    }

    /// Evaluate `offer`. Calling this again with unchanged inputs yields
    /// the same result.
    pub fn evaluate(&self, offer: &Offer) -> OfferResult {
        let tasks = self.cluster_state.task_list();
        let candidate = Candidate {
            offer,
            resources: resources_for_role(offer, self.config.framework_role()),
            tasks: &tasks,
        };

        match RULES
            .iter()
            .find(|rule| (rule.declines)(&self.config, &candidate))
        {
            Some(rule) => {
                debug!(
                    offer_id = %offer.id,
                    agent_id = %offer.agent_id,
                    reason = rule.reason,
                    "offer declined"
                );
                OfferResult::decline(rule.reason)
            }
            None => {
                debug!(offer_id = %offer.id, agent_id = %offer.agent_id, "offer accepted");
                OfferResult::accept()
            }
        }
    }
}
