//! Failures of the znode store.
//!
//! Every variant carries the underlying message as text so errors can
//! cross crate and thread boundaries without dragging redb types along.

use thiserror::Error;

pub type StateResult<T> = Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    /// The redb file could not be created or opened.
    #[error("cannot open state database: {0}")]
    Open(String),

    #[error("state transaction failed: {0}")]
    Transaction(String),

    /// The znode table could not be opened inside a transaction.
    #[error("znode table unavailable: {0}")]
    Table(String),

    #[error("cannot read znode: {0}")]
    Read(String),

    #[error("cannot write znode: {0}")]
    Write(String),

    /// A value could not be encoded as JSON before storing.
    #[error("value is not serializable: {0}")]
    Serialize(String),

    /// A stored znode does not decode into the requested type.
    #[error("stored value is not readable: {0}")]
    Deserialize(String),

    /// Paths must be absolute, `/`-separated and free of empty segments.
    #[error("invalid znode path: {0}")]
    InvalidPath(String),
}
