//! JavaScript package manager lock sources.
//!
//! Yarn Classic and pnpm record the same information in very different
//! layouts: yarn keys blocks by the requested descriptors, pnpm keys packages
//! by their resolved version and records requested ranges on importers. Both
//! are folded into resolution keys of the form `name@range`.

pub mod pnpm;
pub mod yarn_classic;

pub use pnpm::PnpmLockSource;
pub use yarn_classic::YarnClassicLockSource;
