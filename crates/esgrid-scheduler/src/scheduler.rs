//! Scheduler — reacts to cluster-manager callbacks.
//!
//! The `Scheduler` is the control loop that:
//! - Persists the framework id on (re)registration
//! - Evaluates offers in delivery order and launches or declines each one
//! - Applies task status updates to the cluster state
//!
//! The cluster-manager protocol itself sits behind [`SchedulerDriver`].

use std::sync::Arc;

use chrono::Utc;
use esgrid_core::{FrameworkId, Offer, OfferId, SchedulerConfig, Task, TaskStatusUpdate};
use esgrid_state::FrameworkState;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::cluster_state::ClusterState;
use crate::error::SchedulerResult;
use crate::launch::{TaskLaunch, build_launch};
use crate::offer_strategy::{OfferResult, OfferStrategy};

/// Outbound calls to the cluster manager.
pub trait SchedulerDriver: Send + Sync {
    fn launch_task(&self, offer_id: &OfferId, launch: &TaskLaunch) -> anyhow::Result<()>;

    fn decline_offer(&self, offer_id: &OfferId) -> anyhow::Result<()>;
}

/// Inbound callbacks from the cluster manager.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    Registered(FrameworkId),
    Reregistered,
    ResourceOffers(Vec<Offer>),
    StatusUpdate(TaskStatusUpdate),
    Disconnected,
}

/// What happened to one offer.
#[derive(Debug, Clone, PartialEq)]
pub enum OfferDecision {
    Launched(TaskLaunch),
    Declined { offer_id: OfferId, reason: String },
}

pub struct Scheduler {
    config: Arc<SchedulerConfig>,
    cluster_state: Arc<ClusterState>,
    framework_state: FrameworkState,
    strategy: OfferStrategy,
    driver: Arc<dyn SchedulerDriver>,
}

impl Scheduler {
    pub fn new(
        config: Arc<SchedulerConfig>,
        cluster_state: Arc<ClusterState>,
        framework_state: FrameworkState,
        driver: Arc<dyn SchedulerDriver>,
    ) -> Self {
        let strategy = OfferStrategy::new(config.clone(), cluster_state.clone());
        Self {
            config,
            cluster_state,
            framework_state,
            strategy,
            driver,
        }
    }

    /// Framework id to register with: the persisted one, or the empty
    /// sentinel on first boot.
    pub fn framework_id(&self) -> FrameworkId {
        self.framework_state.framework_id()
    }

    /// Snapshot of known tasks.
    pub fn tasks(&self) -> Vec<Task> {
        self.cluster_state.task_list()
    }

    pub fn evaluate(&self, offer: &Offer) -> OfferResult {
        self.strategy.evaluate(offer)
    }

    /// Handle a successful registration. A failed write is logged and the
    /// scheduler keeps running.
    pub fn registered(&self, framework_id: &FrameworkId) {
        info!(%framework_id, framework = %self.config.framework.name, "framework registered");
        if self.framework_state.set_framework_id(framework_id).is_err() {
            warn!(%framework_id, "framework id not persisted; a restart will register as a new framework");
        }
    }

    /// Evaluate offers in delivery order.
    ///
    /// Launched tasks are recorded immediately, so a later offer in the
    /// same batch for the same agent is declined.
    pub fn resource_offers(&self, offers: &[Offer]) -> Vec<OfferDecision> {
        offers.iter().map(|offer| self.handle_offer(offer)).collect()
    }

    pub fn status_update(&self, update: &TaskStatusUpdate) {
        debug!(task_id = %update.task_id, status = ?update.status, "status update");
        self.cluster_state.apply_status(update);
    }

    pub fn handle(&self, event: SchedulerEvent) {
        match event {
            SchedulerEvent::Registered(framework_id) => self.registered(&framework_id),
            SchedulerEvent::Reregistered => {
                info!(framework_id = %self.framework_id(), "framework re-registered");
            }
            SchedulerEvent::ResourceOffers(offers) => {
                self.resource_offers(&offers);
            }
            SchedulerEvent::StatusUpdate(update) => self.status_update(&update),
            SchedulerEvent::Disconnected => warn!("disconnected from cluster manager"),
        }
    }

    /// Process events until the channel closes or shutdown is signalled.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<SchedulerEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(
            framework = %self.config.framework.name,
            target_nodes = self.config.target_nodes(),
            "scheduler started"
        );

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => {
                        info!("event stream closed");
                        break;
                    }
                },
                _ = shutdown.changed() => {
                    info!("scheduler shutting down");
                    break;
                }
            }
        }
    }

    fn handle_offer(&self, offer: &Offer) -> OfferDecision {
        let result = self.strategy.evaluate(offer);
        if !result.accepted {
            let reason = result.reason.unwrap_or_default();
            self.decline(&offer.id, &reason);
            return OfferDecision::Declined {
                offer_id: offer.id.clone(),
                reason,
            };
        }

        match self.launch(offer) {
            Ok(launch) => OfferDecision::Launched(launch),
            Err(e) => {
                error!(offer_id = %offer.id, error = %e, "launch failed");
                let reason = e.to_string();
                self.decline(&offer.id, &reason);
                OfferDecision::Declined {
                    offer_id: offer.id.clone(),
                    reason,
                }
            }
        }
    }

    fn launch(&self, offer: &Offer) -> SchedulerResult<TaskLaunch> {
        let launch = build_launch(offer, &self.config, Utc::now())?;
        self.driver.launch_task(&offer.id, &launch)?;
        info!(
            task_id = %launch.task_id,
            agent_id = %launch.agent_id,
            hostname = %launch.hostname,
            api_port = launch.api_port,
            transport_port = launch.transport_port,
            "task launched"
        );
        self.cluster_state.record_launch(launch.to_task());
        Ok(launch)
    }

    fn decline(&self, offer_id: &OfferId, reason: &str) {
        debug!(%offer_id, reason, "declining offer");
        if let Err(e) = self.driver.decline_offer(offer_id) {
            error!(%offer_id, error = %e, "failed to decline offer");
        }
    }
}
