//! Role-scoped resource grants.
//!
//! An offer may carry resources reserved for several frameworks sharing
//! the same agent. Every grant is tagged with a role, and the scheduler
//! only ever looks at grants for its own role.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::Offer;

/// Kind of a resource grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Cpus,
    Mem,
    Disk,
    Ports,
}

/// Inclusive port range `begin..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub begin: u16,
    pub end: u16,
}

impl PortRange {
    pub fn new(begin: u16, end: u16) -> Self {
        Self { begin, end }
    }

    pub fn single(port: u16) -> Self {
        Self::new(port, port)
    }

    /// Number of ports in the range. Inverted ranges are empty.
    pub fn len(&self) -> usize {
        if self.end < self.begin {
            0
        } else {
            usize::from(self.end - self.begin) + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ports(&self) -> impl Iterator<Item = u16> {
        self.begin..=self.end
    }
}

/// A single resource grant within an offer or launch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
    Cpus { amount: f64, role: String },
    /// Memory in MB.
    Mem { amount: f64, role: String },
    /// Disk in MB.
    Disk { amount: f64, role: String },
    Ports { ranges: Vec<PortRange>, role: String },
}

impl Resource {
    pub fn cpus(amount: f64, role: &str) -> Self {
        Resource::Cpus {
            amount,
            role: role.to_string(),
        }
    }

    pub fn mem(amount: f64, role: &str) -> Self {
        Resource::Mem {
            amount,
            role: role.to_string(),
        }
    }

    pub fn disk(amount: f64, role: &str) -> Self {
        Resource::Disk {
            amount,
            role: role.to_string(),
        }
    }

    pub fn port_range(begin: u16, end: u16, role: &str) -> Self {
        Resource::Ports {
            ranges: vec![PortRange::new(begin, end)],
            role: role.to_string(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Cpus { .. } => ResourceKind::Cpus,
            Resource::Mem { .. } => ResourceKind::Mem,
            Resource::Disk { .. } => ResourceKind::Disk,
            Resource::Ports { .. } => ResourceKind::Ports,
        }
    }

    pub fn role(&self) -> &str {
        match self {
            Resource::Cpus { role, .. }
            | Resource::Mem { role, .. }
            | Resource::Disk { role, .. }
            | Resource::Ports { role, .. } => role,
        }
    }

    /// Scalar amount, or `None` for port grants.
    pub fn scalar(&self) -> Option<f64> {
        match self {
            Resource::Cpus { amount, .. }
            | Resource::Mem { amount, .. }
            | Resource::Disk { amount, .. } => Some(*amount),
            Resource::Ports { .. } => None,
        }
    }
}

/// Grants in `offer` scoped to `role`, in offer order.
pub fn resources_for_role<'a>(offer: &'a Offer, role: &str) -> Vec<&'a Resource> {
    offer.resources.iter().filter(|r| r.role() == role).collect()
}

/// Sum of all scalar grants of `kind` among `resources`.
pub fn scalar_total(resources: &[&Resource], kind: ResourceKind) -> f64 {
    resources
        .iter()
        .filter(|r| r.kind() == kind)
        .filter_map(|r| r.scalar())
        .sum()
}

/// Every distinct port among `resources`, in offer order. A port granted
/// by more than one range is listed once.
pub fn available_ports(resources: &[&Resource]) -> Vec<u16> {
    let mut seen = BTreeSet::new();
    resources
        .iter()
        .filter_map(|r| match r {
            Resource::Ports { ranges, .. } => Some(ranges),
            _ => None,
        })
        .flat_map(|ranges| ranges.iter().flat_map(PortRange::ports))
        .filter(|port| seen.insert(*port))
        .collect()
}
