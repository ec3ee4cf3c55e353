//! Deterministic cache keys for packages of a JavaScript monorepo.
//!
//! A package's key changes exactly when something that can change its build
//! output changes:
//!
//! - the content or relative path of one of its selected source files;
//! - the version an external dependency (or any transitive dependency) is
//!   locked to;
//! - any of the above in an internal (workspace) package it depends on,
//!   transitively;
//! - the build command.
//!
//! # Hashing pipeline
//!
//! ```text
//! files ──► hash_files ──────────────┐
//!                                    ├─► PackageHashInfo.hash ─┐
//! deps ──► resolve_external ─► sort ─┘                         ├─► fold ─┐
//!            (lock graph)      internal deps (worklist) ───────┘         ├─► key
//! build command ─► hash_string ──────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use pkgkey_hasher::{Hasher, HasherOptions};
//!
//! let options = HasherOptions::new("/repo/packages/app").with_output_folders(["dist"]);
//! let hasher = Hasher::new(options, "yarn build");
//!
//! let key = hasher.create_package_hash(None, None, None)?;
//! let output = hasher.hash_of_output()?;
//! ```

pub mod config;
pub mod error;
pub mod external;
pub mod files;
pub mod hash;
pub mod hasher;
pub mod package;

pub use config::{
    CONFIG_FILE_NAME, ConfigInputs, HasherConfig, HasherOptions, InternalHashOrder,
    options_from_inputs, resolve_options,
};
pub use error::{Error, Result};
pub use external::{filter_external_dependencies, resolve_external_dependencies};
pub use files::{FilePatterns, MatchedFile, collect_files, hash_files, sha256_file};
pub use hash::{hash_string, hash_strings};
pub use hasher::{CompletedPackages, Hasher, PackageHash, combine_hash_of_internal_packages};
pub use package::{PackageHashInfo, calculate_package_hash};
