//! Locating lockfiles and caching their parsed graphs for one session.

use crate::core::traits::LockSource;
use crate::core::types::LockGraph;
use crate::error::{Error, Result};
use crate::parsers::{PnpmLockSource, YarnClassicLockSource};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Lock sources in lookup priority order.
static LOCK_SOURCES: [&dyn LockSource; 2] = [&YarnClassicLockSource, &PnpmLockSource];

/// Walks up from `start` (inclusive) to the nearest lockfile.
///
/// Every ancestor is searched for `yarn.lock` first; only when no ancestor
/// has one is the walk repeated for `pnpm-lock.yaml`.
///
/// # Errors
///
/// Returns [`Error::LockfileNotFound`] when neither lockfile exists in any
/// ancestor.
pub fn find_lockfile(start: &Path) -> Result<PathBuf> {
    LOCK_SOURCES
        .iter()
        .find_map(|source| {
            start
                .ancestors()
                .map(|dir| dir.join(source.lockfile_name()))
                .find(|candidate| candidate.is_file())
        })
        .ok_or_else(|| Error::LockfileNotFound {
            path: start.to_path_buf(),
        })
}

/// Picks the lock source able to parse `path`.
///
/// # Errors
///
/// Returns [`Error::LockfileParseFailed`] for file names no source handles.
pub fn lock_source_for(path: &Path) -> Result<&'static dyn LockSource> {
    LOCK_SOURCES
        .iter()
        .copied()
        .find(|source| source.supports_lockfile(path))
        .ok_or_else(|| Error::LockfileParseFailed {
            path: path.to_path_buf(),
            message: "unsupported lockfile; expected yarn.lock (v1) or pnpm-lock.yaml".to_string(),
        })
}

/// Parses `path` with the matching lock source.
///
/// # Errors
///
/// Returns an error if the file is not a supported lockfile or fails to parse.
pub fn parse_lockfile(path: &Path) -> Result<LockGraph> {
    lock_source_for(path)?.parse(path)
}

/// Parsed lock graphs keyed by lockfile path, owned by one hashing session.
///
/// Packages of one repository share a lockfile; the cache makes sure it is
/// parsed once per session. Dropping the cache drops the graphs.
#[derive(Debug, Default)]
pub struct LockfileCache {
    graphs: Mutex<HashMap<PathBuf, Arc<LockGraph>>>,
}

impl LockfileCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the graph for `path`, parsing it on first use.
    ///
    /// Parse failures are not cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the lockfile cannot be parsed.
    pub fn get_or_parse(&self, path: &Path) -> Result<Arc<LockGraph>> {
        if let Some(graph) = self.lock().get(path) {
            tracing::trace!(path = %path.display(), "Lockfile cache hit");
            return Ok(Arc::clone(graph));
        }

        // Parse outside the lock; a racing parse of the same file yields an equal graph
        let graph = Arc::new(parse_lockfile(path)?);
        let mut graphs = self.lock();
        let entry = graphs
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::clone(&graph));
        Ok(Arc::clone(entry))
    }

    /// Finds the lockfile governing `package_root` and returns its graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockfileNotFound`] or a parse error.
    pub fn for_package(&self, package_root: &Path) -> Result<Arc<LockGraph>> {
        let path = find_lockfile(package_root)?;
        self.get_or_parse(&path)
    }

    /// Number of cached graphs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been parsed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Arc<LockGraph>>> {
        self.graphs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
