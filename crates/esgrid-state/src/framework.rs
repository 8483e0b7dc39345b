//! Framework identity persistence.
//!
//! The cluster manager assigns a framework id on first registration. A
//! restarted scheduler must re-register under the same id, otherwise every
//! task it launched before is orphaned. The id lives at
//! `/{framework}/state/frameworkId`.

use std::sync::Arc;

use esgrid_core::FrameworkId;
use tracing::{debug, error, warn};

use crate::backend::{StateBackend, StateBackendExt};
use crate::error::StateResult;
use crate::path;

const FRAMEWORK_ID_KEY: &str = "frameworkId";

/// Root path under which all state for a framework is stored.
pub fn state_root(framework_name: &str) -> String {
    path::join(&format!("/{framework_name}"), "state")
}

/// Reads and writes the framework identity.
#[derive(Clone)]
pub struct FrameworkState {
    backend: Arc<dyn StateBackend>,
    path: String,
}

impl FrameworkState {
    pub fn new(backend: Arc<dyn StateBackend>, framework_name: &str) -> Self {
        Self {
            backend,
            path: path::join(&state_root(framework_name), FRAMEWORK_ID_KEY),
        }
    }

    /// Path the identity is stored at.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The persisted framework id, or [`FrameworkId::empty`] if none was
    /// ever stored.
    ///
    /// Never fails: an unreadable value is logged and treated as absent.
    pub fn framework_id(&self) -> FrameworkId {
        match self.backend.get_json::<FrameworkId>(&self.path) {
            Ok(Some(id)) => id,
            Ok(None) => {
                debug!(path = %self.path, "no framework id stored");
                FrameworkId::empty()
            }
            Err(e) => {
                warn!(path = %self.path, error = %e, "unable to read framework id");
                FrameworkId::empty()
            }
        }
    }

    /// Persist `id`, creating parent nodes as needed.
    ///
    /// Failures are logged and returned; the scheduler keeps running and
    /// the next registration tries again.
    pub fn set_framework_id(&self, id: &FrameworkId) -> StateResult<()> {
        self.backend.set_json(&self.path, id).inspect_err(|e| {
            error!(path = %self.path, framework_id = %id, error = %e, "unable to store framework id");
        })?;
        debug!(path = %self.path, framework_id = %id, "framework id stored");
        Ok(())
    }

    pub fn is_registered(&self) -> bool {
        !self.framework_id().is_empty()
    }
}
