//! Node directory — maps running tasks to their client addresses.
//!
//! A directory is a snapshot: build a new one from the current task list
//! whenever the cluster state changes. Selection either honours an
//! explicit `host:port` from the caller or draws uniformly from the
//! snapshot with a seedable RNG.

use std::sync::{Mutex, PoisonError};

use esgrid_core::{NodeAddress, Task, TaskId, TaskStatus};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("no running search nodes")]
    NoNodes,

    #[error("unknown search node: {0}")]
    UnknownHost(String),
}

/// One running node.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NodeEntry {
    pub task_id: TaskId,
    pub address: NodeAddress,
}

pub struct NodeDirectory {
    nodes: Vec<NodeEntry>,
    rng: Mutex<StdRng>,
}

impl NodeDirectory {
    /// Directory over the running tasks, with an entropy-seeded RNG.
    pub fn from_tasks(tasks: &[Task]) -> Self {
        Self::with_rng(tasks, StdRng::from_entropy())
    }

    /// Directory with a fixed seed, for reproducible selection.
    pub fn with_seed(tasks: &[Task], seed: u64) -> Self {
        Self::with_rng(tasks, StdRng::seed_from_u64(seed))
    }

    fn with_rng(tasks: &[Task], rng: StdRng) -> Self {
        let nodes: Vec<NodeEntry> = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Running)
            .map(|t| NodeEntry {
                task_id: t.id.clone(),
                address: t.client_address.clone(),
            })
            .collect();
        debug!(nodes = nodes.len(), "node directory built");
        Self {
            nodes,
            rng: Mutex::new(rng),
        }
    }

    pub fn nodes(&self) -> &[NodeEntry] {
        &self.nodes
    }

    pub fn addresses(&self) -> Vec<NodeAddress> {
        self.nodes.iter().map(|n| n.address.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pick the node to send a query to.
    ///
    /// With `host`, the node whose `host:port` matches it (ignoring case);
    /// without, a uniformly random node.
    pub fn select(&self, host: Option<&str>) -> Result<NodeAddress, DirectoryError> {
        if self.nodes.is_empty() {
            return Err(DirectoryError::NoNodes);
        }
        match host {
            Some(host) => self
                .nodes
                .iter()
                .map(|n| &n.address)
                .find(|a| a.to_string().eq_ignore_ascii_case(host))
                .cloned()
                .ok_or_else(|| DirectoryError::UnknownHost(host.to_string())),
            None => {
                let idx = self
                    .rng
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .gen_range(0..self.nodes.len());
                Ok(self.nodes[idx].address.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn task(id: &str, host: &str, status: TaskStatus) -> Task {
        Task {
            id: id.to_string(),
            agent_id: host.to_string(),
            hostname: host.to_string(),
            client_address: NodeAddress::new(host, 9200),
            transport_address: NodeAddress::new(host, 9300),
            status,
        }
    }

    fn tasks() -> Vec<Task> {
        vec![
            task("t1", "es-1.local", TaskStatus::Running),
            task("t2", "es-2.local", TaskStatus::Running),
            task("t3", "es-3.local", TaskStatus::Staging),
            task("t4", "es-4.local", TaskStatus::Running),
        ]
    }

    #[test]
    fn only_running_tasks_are_listed() {
        let directory = NodeDirectory::from_tasks(&tasks());
        let hosts: Vec<_> = directory.addresses().into_iter().map(|a| a.host).collect();
        assert_eq!(hosts, vec!["es-1.local", "es-2.local", "es-4.local"]);
    }

    #[test]
    fn explicit_host_is_case_insensitive() {
        let directory = NodeDirectory::from_tasks(&tasks());
        let selected = directory.select(Some("ES-2.LOCAL:9200")).unwrap();
        assert_eq!(selected, NodeAddress::new("es-2.local", 9200));
    }

    #[test]
    fn unknown_or_pending_host_is_rejected() {
        let directory = NodeDirectory::from_tasks(&tasks());
        assert_eq!(
            directory.select(Some("es-3.local:9200")),
            Err(DirectoryError::UnknownHost("es-3.local:9200".to_string()))
        );
    }

    #[test]
    fn empty_directory_has_no_target() {
        let directory = NodeDirectory::from_tasks(&[]);
        assert!(directory.is_empty());
        assert_eq!(directory.select(None), Err(DirectoryError::NoNodes));
    }

    #[test]
    fn seeded_selection_is_reproducible() {
        let a = NodeDirectory::with_seed(&tasks(), 42);
        let b = NodeDirectory::with_seed(&tasks(), 42);
        for _ in 0..20 {
            assert_eq!(a.select(None).unwrap(), b.select(None).unwrap());
        }
    }

    #[test]
    fn random_selection_covers_every_node() {
        let directory = NodeDirectory::with_seed(&tasks(), 7);
        let picked: HashSet<_> = (0..200)
            .map(|_| directory.select(None).unwrap().host)
            .collect();
        assert_eq!(picked.len(), 3);
    }
}
