//! Cluster state — the tasks the scheduler believes are running or pending.
//!
//! Written from two sides at once: the offer loop records launches and the
//! status-update stream applies lifecycle changes. Every access goes
//! through one `RwLock`, and readers receive a cloned snapshot, so a
//! reader sees a mutation either fully applied or not at all.
//!
//! Agent uniqueness is not enforced here; the offer strategy refuses a
//! second launch on an occupied agent.

use std::sync::{Arc, PoisonError, RwLock};

use esgrid_core::{Task, TaskId, TaskStatus, TaskStatusUpdate};
use esgrid_state::framework::state_root;
use esgrid_state::{StateBackend, StateBackendExt, path};
use tracing::{debug, info, warn};

const CLUSTER_STATE_KEY: &str = "clusterState";

struct Persistence {
    backend: Arc<dyn StateBackend>,
    path: String,
}

/// Shared registry of known tasks, in launch order.
pub struct ClusterState {
    tasks: RwLock<Vec<Task>>,
    persistence: Option<Persistence>,
}

impl ClusterState {
    /// In-memory registry.
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(Vec::new()),
            persistence: None,
        }
    }

    /// Registry that mirrors its task list into `backend` after every
    /// mutation, under `/{framework_name}/state/clusterState`.
    pub fn with_persistence(backend: Arc<dyn StateBackend>, framework_name: &str) -> Self {
        Self {
            tasks: RwLock::new(Vec::new()),
            persistence: Some(Persistence {
                backend,
                path: path::join(&state_root(framework_name), CLUSTER_STATE_KEY),
            }),
        }
    }

    /// Reload the task list from the backend. Returns the number of tasks
    /// restored; an unreadable snapshot is logged and leaves the registry
    /// empty.
    pub fn restore(&self) -> usize {
        let Some(persistence) = &self.persistence else {
            return 0;
        };
        let restored = match persistence.backend.get_json::<Vec<Task>>(&persistence.path) {
            Ok(tasks) => tasks.unwrap_or_default(),
            Err(e) => {
                warn!(path = %persistence.path, error = %e, "unable to restore cluster state");
                Vec::new()
            }
        };
        let count = restored.len();
        *self.tasks.write().unwrap_or_else(PoisonError::into_inner) = restored;
        info!(tasks = count, "cluster state restored");
        count
    }

    /// Snapshot of all known tasks, in launch order.
    pub fn task_list(&self) -> Vec<Task> {
        self.tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn get_task(&self, task_id: &str) -> Option<Task> {
        let tasks = self.tasks.read().unwrap_or_else(PoisonError::into_inner);
        tasks.iter().find(|t| t.id == task_id).cloned()
    }

    /// Whether any known task is bound to `agent_id`.
    pub fn is_agent_occupied(&self, agent_id: &str) -> bool {
        let tasks = self.tasks.read().unwrap_or_else(PoisonError::into_inner);
        tasks.iter().any(|t| t.agent_id == agent_id)
    }

    /// Append a newly launched task.
    pub fn record_launch(&self, task: Task) {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        info!(task_id = %task.id, agent_id = %task.agent_id, "task recorded");
        tasks.push(task);
        self.persist(&tasks);
    }

    /// Remove a task. Returns the removed record, if it was known.
    pub fn remove_task(&self, task_id: &str) -> Option<Task> {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        let idx = tasks.iter().position(|t| t.id == task_id)?;
        let removed = tasks.remove(idx);
        info!(%task_id, agent_id = %removed.agent_id, "task removed");
        self.persist(&tasks);
        Some(removed)
    }

    /// Apply a status update. Terminal statuses remove the task.
    ///
    /// Returns the task's previous status, or `None` for unknown tasks,
    /// which are ignored.
    pub fn apply_status(&self, update: &TaskStatusUpdate) -> Option<TaskStatus> {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        let Some(idx) = tasks.iter().position(|t| t.id == update.task_id) else {
            warn!(task_id = %update.task_id, status = ?update.status, "status update for unknown task");
            return None;
        };
        let previous = tasks[idx].status;
        if update.status.is_terminal() {
            let removed = tasks.remove(idx);
            info!(
                task_id = %removed.id,
                agent_id = %removed.agent_id,
                status = ?update.status,
                message = update.message.as_deref().unwrap_or(""),
                "task terminated"
            );
        } else {
            tasks[idx].status = update.status;
            debug!(task_id = %update.task_id, from = ?previous, to = ?update.status, "task status changed");
        }
        self.persist(&tasks);
        Some(previous)
    }

    fn persist(&self, tasks: &[Task]) {
        let Some(persistence) = &self.persistence else {
            return;
        };
        if let Err(e) = persistence.backend.set_json(&persistence.path, tasks) {
            warn!(path = %persistence.path, error = %e, "unable to persist cluster state");
        }
    }
}

impl Default for ClusterState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use esgrid_core::NodeAddress;
    use esgrid_state::StateStore;

    pub(crate) fn test_task(id: &str, agent_id: &str) -> Task {
        Task {
            id: id.to_string(),
            agent_id: agent_id.to_string(),
            hostname: agent_id.to_string(),
            client_address: NodeAddress::new(agent_id, 9200),
            transport_address: NodeAddress::new(agent_id, 9300),
            status: TaskStatus::Running,
        }
    }

    fn update(task_id: &str, status: TaskStatus) -> TaskStatusUpdate {
        TaskStatusUpdate {
            task_id: task_id.to_string(),
            status,
            message: None,
        }
    }

    #[test]
    fn starts_empty() {
        let state = ClusterState::new();
        assert!(state.task_list().is_empty());
        assert_eq!(state.task_count(), 0);
        assert!(!state.is_agent_occupied("host1"));
    }

    #[test]
    fn record_preserves_launch_order() {
        let state = ClusterState::new();
        state.record_launch(test_task("t1", "host1"));
        state.record_launch(test_task("t2", "host2"));
        state.record_launch(test_task("t3", "host3"));

        let ids: Vec<_> = state.task_list().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["t1", "t2", "t3"]);
        assert!(state.is_agent_occupied("host2"));
        assert_eq!(state.get_task("t2").unwrap().agent_id, "host2");
    }

    #[test]
    fn tolerates_duplicate_agents() {
        let state = ClusterState::new();
        state.record_launch(test_task("t1", "host1"));
        state.record_launch(test_task("t2", "host1"));
        assert_eq!(state.task_count(), 2);
    }

    #[test]
    fn remove_task() {
        let state = ClusterState::new();
        state.record_launch(test_task("t1", "host1"));

        assert_eq!(state.remove_task("t1").map(|t| t.id), Some("t1".to_string()));
        assert!(state.remove_task("t1").is_none());
        assert!(!state.is_agent_occupied("host1"));
    }

    #[test]
    fn status_update_changes_status() {
        let state = ClusterState::new();
        let mut task = test_task("t1", "host1");
        task.status = TaskStatus::Staging;
        state.record_launch(task);

        let previous = state.apply_status(&update("t1", TaskStatus::Running));
        assert_eq!(previous, Some(TaskStatus::Staging));
        assert_eq!(state.get_task("t1").unwrap().status, TaskStatus::Running);
    }

    #[test]
    fn terminal_status_removes_task() {
        let state = ClusterState::new();
        state.record_launch(test_task("t1", "host1"));
        state.record_launch(test_task("t2", "host2"));

        state.apply_status(&update("t1", TaskStatus::Lost));
        let ids: Vec<_> = state.task_list().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["t2"]);
    }

    #[test]
    fn unknown_task_update_is_ignored() {
        let state = ClusterState::new();
        state.record_launch(test_task("t1", "host1"));
        assert_eq!(state.apply_status(&update("nope", TaskStatus::Failed)), None);
        assert_eq!(state.task_count(), 1);
    }

    #[test]
    fn concurrent_readers_never_see_torn_state() {
        use std::thread;

        let state = Arc::new(ClusterState::new());
        let writer = {
            let state = state.clone();
            thread::spawn(move || {
                for i in 0..200 {
                    let id = format!("t{i}");
                    state.record_launch(test_task(&id, &format!("host{i}")));
                    state.remove_task(&id);
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let state = state.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        let snapshot = state.task_list();
                        assert!(snapshot.len() <= 1);
                        if let Some(task) = snapshot.first() {
                            assert_eq!(task.hostname, task.agent_id);
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(state.task_count(), 0);
    }

    #[test]
    fn persisted_state_is_restored() {
        let store = Arc::new(StateStore::open_in_memory().unwrap());
        {
            let state = ClusterState::with_persistence(store.clone(), "elasticsearch");
            state.record_launch(test_task("t1", "host1"));
            state.record_launch(test_task("t2", "host2"));
            state.apply_status(&update("t1", TaskStatus::Killed));
        }

        let state = ClusterState::with_persistence(store.clone(), "elasticsearch");
        assert_eq!(state.restore(), 1);
        assert_eq!(state.task_list()[0].id, "t2");
        assert!(store.exists("/elasticsearch/state/clusterState").unwrap());
    }

    #[test]
    fn restore_without_snapshot_is_empty() {
        let store = Arc::new(StateStore::open_in_memory().unwrap());
        let state = ClusterState::with_persistence(store, "elasticsearch");
        assert_eq!(state.restore(), 0);
        assert_eq!(ClusterState::new().restore(), 0);
    }
}
