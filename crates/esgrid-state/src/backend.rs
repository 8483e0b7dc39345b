//! Storage seam for scheduler state.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{StateError, StateResult};

/// A hierarchical key-value store.
///
/// Implementations must be safe to share between the offer loop and the
/// status-update stream.
pub trait StateBackend: Send + Sync {
    /// Raw bytes stored at `path`, or `None` if the node does not exist.
    fn get(&self, path: &str) -> StateResult<Option<Vec<u8>>>;

    /// Store `value` at `path`, creating any missing ancestor nodes.
    fn set_and_create_parents(&self, path: &str, value: &[u8]) -> StateResult<()>;
}

/// Typed JSON access over any [`StateBackend`].
pub trait StateBackendExt: StateBackend {
    /// Deserialize the value at `path`.
    fn get_json<T: DeserializeOwned>(&self, path: &str) -> StateResult<Option<T>> {
        match self.get(path)? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| StateError::Deserialize(format!("{path}: {e}")))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Serialize `value` and store it at `path`, creating parents.
    fn set_json<T: Serialize + ?Sized>(&self, path: &str, value: &T) -> StateResult<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| StateError::Serialize(format!("{path}: {e}")))?;
        self.set_and_create_parents(path, &bytes)
    }
}

impl<B: StateBackend + ?Sized> StateBackendExt for B {}
