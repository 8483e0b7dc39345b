//! esgrid-state — persistent scheduler state.
//!
//! Backed by [redb](https://docs.rs/redb), provides a small hierarchical
//! key-value store in the shape of a coordination service: values live at
//! absolute `/`-separated paths, and writing a path creates any missing
//! ancestors as empty nodes.
//!
//! # Architecture
//!
//! All values are JSON-serialized into redb's `&[u8]` value column. The
//! [`StateBackend`] trait is the storage seam; [`StateStore`] is the redb
//! implementation and [`FrameworkState`] builds the framework identity
//! store on top of any backend.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod backend;
pub mod error;
pub mod framework;
pub mod path;
pub mod store;
pub mod tables;

pub use backend::{StateBackend, StateBackendExt};
pub use error::{StateError, StateResult};
pub use framework::FrameworkState;
pub use store::StateStore;
