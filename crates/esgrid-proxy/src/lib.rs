//! esgrid node directory.
//!
//! Exposes the addresses of the running search nodes to whatever forwards
//! queries to them, and picks a target node per query: the one named by
//! the caller, or a uniformly random one.
//!
//! Query forwarding itself is not part of this crate.

pub mod directory;

pub use directory::{DirectoryError, NodeDirectory, NodeEntry};
