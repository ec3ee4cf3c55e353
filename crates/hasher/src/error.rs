//! Error types for the hasher crate

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Error type for hashing operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// I/O error while reading files to hash
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(pkgkey::hasher::io),
        help("Check file permissions and that symbolic links point at existing files")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "walk")
        operation: String,
    },

    /// Configuration or validation error
    #[error("Hasher configuration error: {message}")]
    #[diagnostic(
        code(pkgkey::hasher::config),
        help("Check glob patterns, output folders and pkgkey.toml values")
    )]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Workspace, manifest or lockfile error
    #[error(transparent)]
    #[diagnostic(transparent)]
    Workspace(#[from] pkgkey_workspaces::Error),
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }
}

/// Result type for hashing operations
pub type Result<T> = std::result::Result<T, Error>;
