//! Operator commands. Each returns the text to print.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use esgrid_core::{FrameworkId, Offer, SchedulerConfig, Task};
use esgrid_proxy::NodeDirectory;
use esgrid_scheduler::{ClusterState, OfferStrategy};
use esgrid_state::{FrameworkState, StateStore};
use tracing::info;

const UNREGISTERED: &str = "<unregistered>";

fn open_store(config: &SchedulerConfig) -> anyhow::Result<StateStore> {
    std::fs::create_dir_all(&config.state.data_dir)
        .with_context(|| format!("creating {}", config.state.data_dir.display()))?;
    let db_path = config.state_db_path();
    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");
    Ok(store)
}

/// Open the store only if it already exists; read-only commands must not
/// create one.
fn open_existing_store(config: &SchedulerConfig) -> anyhow::Result<Option<StateStore>> {
    if !config.state_db_path().exists() {
        return Ok(None);
    }
    open_store(config).map(Some)
}

// ── Identity ──────────────────────────────────────────────────────

pub fn identity_show(config: &SchedulerConfig) -> anyhow::Result<String> {
    let Some(store) = open_existing_store(config)? else {
        return Ok(UNREGISTERED.to_string());
    };
    let id = FrameworkState::new(Arc::new(store), &config.framework.name).framework_id();
    if id.is_empty() {
        Ok(UNREGISTERED.to_string())
    } else {
        Ok(id.to_string())
    }
}

pub fn identity_set(config: &SchedulerConfig, id: &str) -> anyhow::Result<String> {
    anyhow::ensure!(!id.is_empty(), "framework id must not be empty");
    let store = open_store(config)?;
    let state = FrameworkState::new(Arc::new(store), &config.framework.name);
    state.set_framework_id(&FrameworkId::new(id))?;
    Ok(format!("{} = {id}", state.path()))
}

// ── Nodes ─────────────────────────────────────────────────────────

fn node_directory(config: &SchedulerConfig) -> anyhow::Result<NodeDirectory> {
    let tasks = match open_existing_store(config)? {
        Some(store) => {
            let cluster_state = ClusterState::with_persistence(Arc::new(store), &config.framework.name);
            cluster_state.restore();
            cluster_state.task_list()
        }
        None => Vec::new(),
    };
    Ok(NodeDirectory::from_tasks(&tasks))
}

pub fn nodes_list(config: &SchedulerConfig) -> anyhow::Result<String> {
    let directory = node_directory(config)?;
    Ok(serde_json::to_string_pretty(directory.nodes())?)
}

pub fn nodes_select(config: &SchedulerConfig, host: Option<&str>) -> anyhow::Result<String> {
    let directory = node_directory(config)?;
    Ok(directory.select(host)?.to_string())
}

// ── Evaluate ──────────────────────────────────────────────────────

pub fn evaluate(
    config: SchedulerConfig,
    offer: &Path,
    tasks: Option<&Path>,
) -> anyhow::Result<String> {
    let offer: Offer = read_json(offer)?;
    let tasks: Vec<Task> = match tasks {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    Ok(serde_json::to_string_pretty(&evaluate_offer(config, &offer, tasks))?)
}

fn evaluate_offer(
    config: SchedulerConfig,
    offer: &Offer,
    tasks: Vec<Task>,
) -> esgrid_scheduler::OfferResult {
    let cluster_state = Arc::new(ClusterState::new());
    for task in tasks {
        cluster_state.record_launch(task);
    }
    OfferStrategy::new(Arc::new(config), cluster_state).evaluate(offer)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}
