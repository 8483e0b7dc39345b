//! Scheduler error types.

use thiserror::Error;

/// Errors that can occur during scheduling operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("offer {offer_id} cannot satisfy launch: {reason}")]
    Launch { offer_id: String, reason: String },

    #[error("state store error: {0}")]
    State(#[from] esgrid_state::StateError),

    #[error("driver error: {0}")]
    Driver(#[from] anyhow::Error),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
