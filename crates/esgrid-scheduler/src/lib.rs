//! esgrid-scheduler — offer admission and cluster state.
//!
//! Turns cluster-manager offers into search-node launches. The scheduler:
//!
//! - Evaluates each offer against the configuration and cluster state
//! - Launches at most one node per agent, up to the target cluster size
//! - Tracks launched tasks through their status updates
//! - Persists the framework id so restarts re-attach to the same session
//!
//! # Architecture
//!
//! ```text
//! Scheduler (event loop)
//!   ├── OfferStrategy (ordered admission rules, no side effects)
//!   │     └── reads SchedulerConfig + ClusterState snapshot
//!   ├── ClusterState (RwLock'd task list, optional persistence)
//!   ├── FrameworkState (framework id in esgrid-state)
//!   └── SchedulerDriver (launch / decline to the cluster manager)
//! ```

pub mod cluster_state;
pub mod error;
pub mod launch;
pub mod offer_strategy;
pub mod scheduler;

pub use cluster_state::ClusterState;
pub use error::{SchedulerError, SchedulerResult};
pub use launch::{TaskLaunch, build_launch};
pub use offer_strategy::{OfferResult, OfferStrategy};
pub use scheduler::{OfferDecision, Scheduler, SchedulerDriver, SchedulerEvent};
