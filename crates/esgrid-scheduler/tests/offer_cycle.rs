//! Offer cycle tests.
//!
//! Drives the scheduler event loop over a real state store: registration,
//! offers, status updates, and a restart that must re-attach to the same
//! framework and remember the nodes it already launched.

use std::sync::{Arc, Mutex};

use esgrid_core::{FrameworkId, Offer, OfferId, Resource, SchedulerConfig, TaskStatus, TaskStatusUpdate};
use esgrid_scheduler::*;
use esgrid_state::{FrameworkState, StateStore};
use tokio::sync::{mpsc, watch};

const ROLE: &str = "search";

#[derive(Default)]
struct RecordingDriver {
    launched: Mutex<Vec<TaskLaunch>>,
    declined: Mutex<Vec<OfferId>>,
}

impl SchedulerDriver for RecordingDriver {
    fn launch_task(&self, _offer_id: &OfferId, launch: &TaskLaunch) -> anyhow::Result<()> {
        self.launched.lock().unwrap().push(launch.clone());
        Ok(())
    }

    fn decline_offer(&self, offer_id: &OfferId) -> anyhow::Result<()> {
        self.declined.lock().unwrap().push(offer_id.clone());
        Ok(())
    }
}

fn test_config() -> Arc<SchedulerConfig> {
    let mut config = SchedulerConfig::default();
    config.framework.role = ROLE.to_string();
    config.cluster.nodes = 3;
    Arc::new(config)
}

fn build_scheduler(store: &StateStore, driver: Arc<RecordingDriver>) -> Scheduler {
    let config = test_config();
    let cluster_state = Arc::new(ClusterState::with_persistence(
        Arc::new(store.clone()),
        &config.framework.name,
    ));
    cluster_state.restore();
    let framework_state = FrameworkState::new(Arc::new(store.clone()), &config.framework.name);
    Scheduler::new(config, cluster_state, framework_state, driver)
}

fn offer(id: &str, agent: &str) -> Offer {
    Offer::new(id, FrameworkId::new("fw-1"), agent, format!("{agent}.example.com"))
        .with_resource(Resource::port_range(9200, 9200, ROLE))
        .with_resource(Resource::port_range(9300, 9300, ROLE))
        .with_resource(Resource::cpus(1.0, ROLE))
        .with_resource(Resource::mem(1024.0, ROLE))
        .with_resource(Resource::disk(1024.0, ROLE))
}

async fn run_events(scheduler: &Scheduler, events: Vec<SchedulerEvent>) {
    let (tx, rx) = mpsc::channel(events.len().max(1));
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    for event in events {
        tx.send(event).await.unwrap();
    }
    drop(tx);
    scheduler.run(rx, shutdown_rx).await;
}

#[tokio::test]
async fn cluster_converges_to_target_size() {
    let store = StateStore::open_in_memory().unwrap();
    let driver = Arc::new(RecordingDriver::default());
    let scheduler = build_scheduler(&store, driver.clone());

    run_events(
        &scheduler,
        vec![
            SchedulerEvent::Registered(FrameworkId::new("fw-1")),
            SchedulerEvent::ResourceOffers(vec![offer("o1", "host1"), offer("o2", "host2")]),
            SchedulerEvent::ResourceOffers(vec![
                offer("o3", "host1"),
                offer("o4", "host3"),
                offer("o5", "host4"),
            ]),
        ],
    )
    .await;

    let hosts: Vec<_> = scheduler.tasks().into_iter().map(|t| t.agent_id).collect();
    assert_eq!(hosts, vec!["host1", "host2", "host3"]);
    assert_eq!(driver.launched.lock().unwrap().len(), 3);
    assert_eq!(*driver.declined.lock().unwrap(), vec!["o3".to_string(), "o5".to_string()]);
}

#[tokio::test]
async fn restart_reattaches_to_same_framework() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("esgrid.redb");

    {
        let store = StateStore::open(&db_path).unwrap();
        let scheduler = build_scheduler(&store, Arc::new(RecordingDriver::default()));
        assert_eq!(scheduler.framework_id(), FrameworkId::empty());

        run_events(
            &scheduler,
            vec![
                SchedulerEvent::Registered(FrameworkId::new("fw-1")),
                SchedulerEvent::ResourceOffers(vec![offer("o1", "host1"), offer("o2", "host2")]),
            ],
        )
        .await;
    }

    let store = StateStore::open(&db_path).unwrap();
    let driver = Arc::new(RecordingDriver::default());
    let scheduler = build_scheduler(&store, driver.clone());

    assert_eq!(scheduler.framework_id(), FrameworkId::new("fw-1"));
    assert_eq!(scheduler.tasks().len(), 2);

    // Known agents are still refused after the restart.
    let result = scheduler.evaluate(&offer("o3", "host1"));
    assert_eq!(result.reason.as_deref(), Some("Host already running task"));

    run_events(
        &scheduler,
        vec![
            SchedulerEvent::Reregistered,
            SchedulerEvent::ResourceOffers(vec![offer("o4", "host3"), offer("o5", "host4")]),
        ],
    )
    .await;
    assert_eq!(driver.launched.lock().unwrap().len(), 1);
    assert_eq!(scheduler.tasks().len(), 3);
}

#[tokio::test]
async fn failed_node_is_replaced() {
    let store = StateStore::open_in_memory().unwrap();
    let driver = Arc::new(RecordingDriver::default());
    let scheduler = build_scheduler(&store, driver.clone());

    run_events(
        &scheduler,
        vec![SchedulerEvent::ResourceOffers(vec![
            offer("o1", "host1"),
            offer("o2", "host2"),
            offer("o3", "host3"),
        ])],
    )
    .await;
    let failed = scheduler.tasks()[1].id.clone();

    run_events(
        &scheduler,
        vec![
            SchedulerEvent::StatusUpdate(TaskStatusUpdate {
                task_id: failed,
                status: TaskStatus::Failed,
                message: Some("process exited".to_string()),
            }),
            SchedulerEvent::ResourceOffers(vec![offer("o4", "host4")]),
        ],
    )
    .await;

    let hosts: Vec<_> = scheduler.tasks().into_iter().map(|t| t.agent_id).collect();
    assert_eq!(hosts, vec!["host1", "host3", "host4"]);
}

#[tokio::test]
async fn agents_sharing_a_hostname_are_tracked_separately() {
    let store = StateStore::open_in_memory().unwrap();
    let driver = Arc::new(RecordingDriver::default());
    let scheduler = build_scheduler(&store, driver.clone());
    let shared = |id: &str, agent: &str| {
        let mut offer = offer(id, agent);
        offer.hostname = "hostname".to_string();
        offer
    };

    run_events(
        &scheduler,
        vec![SchedulerEvent::ResourceOffers(vec![
            shared("o1", "agentA"),
            shared("o2", "agentB"),
        ])],
    )
    .await;
    let tasks = scheduler.tasks();
    assert_eq!(tasks.len(), 2);
    assert_ne!(tasks[0].id, tasks[1].id);

    let lost = tasks[1].id.clone();
    run_events(
        &scheduler,
        vec![SchedulerEvent::StatusUpdate(TaskStatusUpdate {
            task_id: lost,
            status: TaskStatus::Lost,
            message: None,
        })],
    )
    .await;

    let agents: Vec<_> = scheduler.tasks().into_iter().map(|t| t.agent_id).collect();
    assert_eq!(agents, vec!["agentA"]);
    let result = scheduler.evaluate(&shared("o3", "agentA"));
    assert_eq!(result.reason.as_deref(), Some("Host already running task"));
}
