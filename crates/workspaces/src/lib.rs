//! Workspace, manifest and lockfile plumbing for `pkgkey`.
//!
//! This crate turns a JavaScript repository on disk into the three inputs the
//! hashing engine consumes:
//!
//! - a [`WorkspaceInfo`]: package name to absolute directory, found by
//!   [`discover_workspace`] from `pnpm-workspace.yaml` or the `workspaces`
//!   field of `package.json`;
//! - a [`PackageManifest`]: the dependencies one package declares;
//! - a [`LockGraph`]: the lockfile normalized into `name@range` resolution keys
//!   by one of the [`LockSource`] implementations.
//!
//! # Lock sources
//!
//! | Source | File | Notes |
//! |--------|------|-------|
//! | [`YarnClassicLockSource`] | `yarn.lock` (v1) | every block descriptor is a key |
//! | [`PnpmLockSource`] | `pnpm-lock.yaml` (v5 to v9) | importer specifiers become alias keys |
//!
//! [`find_lockfile`] picks the nearest `yarn.lock`, then the nearest
//! `pnpm-lock.yaml`. A [`LockfileCache`] keeps parsed graphs for the lifetime
//! of one hashing session.
//!
//! ## Discovery behavior for edge cases
//!
//! - **No workspace declaration**: discovery succeeds with an empty index
//!   (single-package repository).
//! - **Missing or malformed member manifests**: silently skipped. Only members
//!   with a parseable `package.json` carrying a `name` are indexed.
//!
//! # Example
//!
//! ```rust,ignore
//! use pkgkey_workspaces::{LockfileCache, PackageManifest, discover_workspace};
//! use std::path::Path;
//!
//! let package = Path::new("/repo/packages/app");
//! let workspace = discover_workspace(package)?;
//! let manifest = PackageManifest::read(package)?;
//! let lock = LockfileCache::new().for_package(package)?;
//!
//! for (name, range) in manifest.all_dependencies() {
//!     if workspace.contains(&name) {
//!         continue;
//!     }
//!     if let Some(entry) = lock.query(&name, &range) {
//!         println!("{name}@{range} -> {}", entry.version);
//!     }
//! }
//! ```

pub mod core;
pub mod discovery;
pub mod error;
pub mod lockfile;
pub mod manifest;
pub mod parsers;

pub use core::{
    DependencyMap, LockEntry, LockGraph, LockSource, RESOLUTION_KEY_SEPARATOR, WorkspaceDiscovery,
    WorkspaceInfo, resolution_key,
};
pub use discovery::{
    PackageJsonDiscovery, PnpmWorkspaceDiscovery, discover_workspace, find_package_root,
};
pub use error::{Error, Result};
pub use lockfile::{LockfileCache, find_lockfile, parse_lockfile};
pub use manifest::PackageManifest;
pub use parsers::{PnpmLockSource, YarnClassicLockSource};
