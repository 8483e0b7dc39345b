//! Shared types used across esgrid crates.
//!
//! These mirror the cluster manager's message set only as far as the
//! scheduler needs it: offers presented to the framework, the tasks it
//! launched, and the identity it registered under.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resources::Resource;

/// Identifier of a single resource offer.
pub type OfferId = String;

/// Identifier of a cluster agent (the host being offered).
pub type AgentId = String;

/// Identifier of a launched task.
pub type TaskId = String;

// ── Framework identity ────────────────────────────────────────────

/// Identity assigned to the framework by the cluster manager.
///
/// The empty value is the "never registered" sentinel; see
/// [`FrameworkId::empty`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameworkId(String);

impl FrameworkId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The sentinel identity of a framework that has never registered.
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FrameworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Offer ─────────────────────────────────────────────────────────

/// Free resources on one agent, presented once per offer cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub framework_id: FrameworkId,
    pub agent_id: AgentId,
    pub hostname: String,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl Offer {
    /// Start an offer with no resources.
    pub fn new(
        id: impl Into<OfferId>,
        framework_id: FrameworkId,
        agent_id: impl Into<AgentId>,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            framework_id,
            agent_id: agent_id.into(),
            hostname: hostname.into(),
            resources: Vec::new(),
        }
    }

    /// Builder-style resource append.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }
}

// ── Task ──────────────────────────────────────────────────────────

/// Host and port at which a node's service is reachable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeAddress {
    pub host: String,
    pub port: u16,
}

impl NodeAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// One deployed search node, bound to exactly one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub agent_id: AgentId,
    pub hostname: String,
    /// HTTP API address.
    pub client_address: NodeAddress,
    /// Internal node-to-node transport address.
    pub transport_address: NodeAddress,
    pub status: TaskStatus,
}

/// Lifecycle status as reported by the cluster manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Staging,
    Starting,
    Running,
    Finished,
    Failed,
    Killed,
    Lost,
    Error,
}

impl TaskStatus {
    /// Terminal statuses remove the task from the cluster state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Finished
                | TaskStatus::Failed
                | TaskStatus::Killed
                | TaskStatus::Lost
                | TaskStatus::Error
        )
    }
}

/// A status update event for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusUpdate {
    pub task_id: TaskId,
    pub status: TaskStatus,
    #[serde(default)]
    pub message: Option<String>,
}
