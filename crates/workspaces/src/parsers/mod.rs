//! Lock sources converting package-manager lockfiles into a [`LockGraph`](crate::LockGraph).
//!
//! Each source implements the [`LockSource`](crate::LockSource) trait for one
//! lockfile format. The hashing engine only ever consumes the normalized graph.

pub mod javascript;

pub use javascript::*;
