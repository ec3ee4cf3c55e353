//! Capabilities implemented once per package-manager format.

use crate::core::types::{LockGraph, WorkspaceInfo};
use crate::error::{Error, Result};
use std::path::Path;

/// Reads one workspace declaration format from a candidate root directory.
///
/// Implementations only know how to extract member globs from their own file
/// (`pnpm-workspace.yaml`, the `workspaces` field of `package.json`). Turning
/// globs into members is shared by [`discover`](Self::discover).
pub trait WorkspaceDiscovery: Send + Sync {
    /// File whose presence marks a candidate workspace root.
    fn config_file_name(&self) -> &'static str;

    /// Member glob patterns declared at `root`.
    ///
    /// Returns `Ok(None)` when `root` does not declare a workspace in this
    /// format (the file is missing, or `package.json` has no `workspaces`).
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration file exists but cannot be read or parsed.
    fn member_patterns(&self, root: &Path) -> Result<Option<Vec<String>>>;

    /// Builds the workspace index declared at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkspaceNotFound`] when `root` declares no workspace in
    /// this format, or any error raised while resolving member globs.
    fn discover(&self, root: &Path) -> Result<WorkspaceInfo> {
        let patterns = self
            .member_patterns(root)?
            .ok_or_else(|| Error::WorkspaceNotFound {
                path: root.to_path_buf(),
            })?;
        crate::discovery::collect_members(root, &patterns)
    }
}

/// Parses one package manager's lockfile into the shared [`LockGraph`] shape.
///
/// Each package manager has its own lockfile format:
/// - Yarn Classic: `yarn.lock`
/// - pnpm: `pnpm-lock.yaml`
///
/// Implementations own every format-specific detail (descriptor syntax, peer
/// suffixes, importer specifiers). Whatever comes out must be keyed by
/// [`resolution_key`](crate::resolution_key) so that a manifest's
/// `name` + `version range` finds its resolved entry.
///
/// # Example
///
/// ```rust,ignore
/// use pkgkey_workspaces::{LockSource, YarnClassicLockSource};
/// use std::path::Path;
///
/// let lock = YarnClassicLockSource.parse(Path::new("yarn.lock"))?;
/// if let Some(entry) = lock.query("lodash", "^4.17.0") {
///     println!("lodash resolved to {}", entry.version);
/// }
/// ```
pub trait LockSource: Send + Sync {
    /// Parses the lockfile at `lockfile_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid lockfile
    /// of this format.
    fn parse(&self, lockfile_path: &Path) -> Result<LockGraph>;

    /// File name this source looks for while walking up the tree.
    fn lockfile_name(&self) -> &'static str;

    /// Whether `path` looks like a lockfile this source can parse.
    fn supports_lockfile(&self, path: &Path) -> bool {
        path.file_name().and_then(|n| n.to_str()) == Some(self.lockfile_name())
    }
}
