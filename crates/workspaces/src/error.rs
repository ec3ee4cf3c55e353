//! Error types for workspace operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for workspace operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during workspace operations.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Workspace root directory not found.
    #[error("Workspace not found at path: {path}")]
    #[diagnostic(
        code(pkgkey::workspaces::workspace_not_found),
        help(
            "Ensure the path points to a valid workspace root directory with a workspace configuration file"
        )
    )]
    WorkspaceNotFound {
        /// The path that was searched.
        path: PathBuf,
    },

    /// No supported lockfile was found while walking up from a package.
    #[error("Lockfile not found searching upwards from: {path}")]
    #[diagnostic(
        code(pkgkey::workspaces::lockfile_not_found),
        help(
            "pkgkey needs either yarn.lock or pnpm-lock.yaml. Run 'yarn install' or 'pnpm install' to generate one"
        )
    )]
    LockfileNotFound {
        /// The directory the search started from.
        path: PathBuf,
    },

    /// Manifest file not found.
    #[error("Manifest file not found at path: {path}")]
    #[diagnostic(
        code(pkgkey::workspaces::manifest_not_found),
        help("Ensure the package directory contains a 'package.json'")
    )]
    ManifestNotFound {
        /// The path where the manifest was expected.
        path: PathBuf,
    },

    /// Failed to parse lockfile.
    #[error("Failed to parse lockfile at {path}: {message}")]
    #[diagnostic(
        code(pkgkey::workspaces::lockfile_parse_failed),
        help("The lockfile may be corrupted. Try regenerating it with your package manager")
    )]
    LockfileParseFailed {
        /// Path to the lockfile.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// A workspace glob could not be compiled.
    #[error("Invalid workspace glob '{pattern}': {message}")]
    #[diagnostic(
        code(pkgkey::workspaces::invalid_glob),
        help("Check the 'workspaces' field of package.json or the 'packages' list of pnpm-workspace.yaml")
    )]
    InvalidGlob {
        /// The offending pattern.
        pattern: String,
        /// Why it was rejected.
        message: String,
    },

    /// I/O error occurred.
    #[error("I/O error during {operation}{}: {source}", path.as_ref().map(|p| format!(" at {}", p.display())).unwrap_or_default())]
    #[diagnostic(
        code(pkgkey::workspaces::io_error),
        help(
            "Check that the referenced paths exist and that you have permission to read them"
        )
    )]
    Io {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
        /// Optional path where the error occurred.
        path: Option<PathBuf>,
        /// Description of the operation being performed.
        operation: String,
    },

    /// JSON parsing error.
    #[error("JSON parsing error{}: {source}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    #[diagnostic(
        code(pkgkey::workspaces::json_error),
        help("Ensure the JSON has valid syntax and matches the expected package.json schema")
    )]
    Json {
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
        /// Optional path to the file being parsed.
        path: Option<PathBuf>,
    },

    /// YAML parsing error.
    #[error("YAML parsing error{}: {source}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    #[diagnostic(
        code(pkgkey::workspaces::yaml_error),
        help("Ensure the YAML has valid syntax")
    )]
    Yaml {
        /// The underlying YAML error.
        #[source]
        source: serde_yaml::Error,
        /// Optional path to the file being parsed.
        path: Option<PathBuf>,
    },
}

impl Error {
    /// Create an I/O error with path context.
    #[must_use]
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
            operation: operation.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            path: None,
            operation: "file operation".to_string(),
        }
    }
}
