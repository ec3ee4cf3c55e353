//! Core types and traits shared by discovery, manifests and lock sources.

pub mod traits;
pub mod types;

pub use traits::{LockSource, WorkspaceDiscovery};
pub use types::{
    DependencyMap, LockEntry, LockGraph, RESOLUTION_KEY_SEPARATOR, WorkspaceInfo, resolution_key,
};
