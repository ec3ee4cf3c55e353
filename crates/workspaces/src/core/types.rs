//! Core types for representing workspaces, declared dependencies and lock graphs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::path::{Path, PathBuf};

/// Dependency name to version range, as declared by one manifest.
///
/// A `BTreeMap` keeps iteration lexicographic so every consumer walks
/// dependencies in the same order regardless of how the manifest was written.
pub type DependencyMap = BTreeMap<String, String>;

/// Separator between a dependency name and its version range in a resolution key.
pub const RESOLUTION_KEY_SEPARATOR: char = '@';

/// Builds the canonical resolution key for a name and version range.
///
/// # Example
///
/// ```
/// use pkgkey_workspaces::resolution_key;
///
/// assert_eq!(resolution_key("lodash", "^4.0.0"), "lodash@^4.0.0");
/// assert_eq!(resolution_key("@babel/core", "7.22.5"), "@babel/core@7.22.5");
/// ```
#[must_use]
pub fn resolution_key(name: &str, version_range: &str) -> String {
    format!("{name}{RESOLUTION_KEY_SEPARATOR}{version_range}")
}

/// Static index of the packages that make up one repository.
///
/// Built once per run by discovery (or by the caller) and never mutated by the
/// hashing engine. Names are unique; each maps to an absolute directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceInfo {
    /// Directory holding the workspace declaration, if one was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    packages: BTreeMap<String, PathBuf>,
}

impl WorkspaceInfo {
    /// Creates an empty index rooted at `root`.
    ///
    /// # Example
    ///
    /// ```
    /// use pkgkey_workspaces::WorkspaceInfo;
    /// use std::path::PathBuf;
    ///
    /// let workspace = WorkspaceInfo::new(PathBuf::from("/repo"));
    /// assert!(workspace.is_empty());
    /// ```
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self {
            root: Some(root),
            packages: BTreeMap::new(),
        }
    }

    /// Adds a package, returning the path previously registered under the same name.
    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Option<PathBuf> {
        self.packages.insert(name.into(), path.into())
    }

    /// Looks up the directory of a workspace package.
    #[must_use]
    pub fn path_of(&self, name: &str) -> Option<&Path> {
        self.packages.get(name).map(PathBuf::as_path)
    }

    /// Whether `name` is an internal (workspace) package.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Package names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    /// `(name, path)` pairs in lexicographic name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.packages
            .iter()
            .map(|(name, path)| (name.as_str(), path.as_path()))
    }

    /// Number of packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the index has no packages (single-package repository).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl<N: Into<String>, P: Into<PathBuf>> FromIterator<(N, P)> for WorkspaceInfo {
    fn from_iter<T: IntoIterator<Item = (N, P)>>(iter: T) -> Self {
        Self {
            root: None,
            packages: iter
                .into_iter()
                .map(|(name, path)| (name.into(), path.into()))
                .collect(),
        }
    }
}

/// One resolved entry of a lock graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockEntry {
    /// Version the package manager actually installed.
    pub version: String,

    /// Dependencies declared by the installed package itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<DependencyMap>,
}

impl LockEntry {
    /// Entry without declared dependencies.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            dependencies: None,
        }
    }

    /// Attaches declared dependencies; an empty map is stored as `None`.
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: DependencyMap) -> Self {
        self.dependencies = (!dependencies.is_empty()).then_some(dependencies);
        self
    }
}

/// Normalized view of a lockfile: resolution key to resolved entry.
///
/// Every lock source produces this shape; the hashing engine never sees the
/// package-manager specific structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockGraph {
    entries: BTreeMap<String, LockEntry>,
}

impl LockGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry under an already-built resolution key.
    pub fn insert(&mut self, key: impl Into<String>, entry: LockEntry) -> Option<LockEntry> {
        self.entries.insert(key.into(), entry)
    }

    /// Inserts an entry for `name` requested with `version_range`.
    pub fn insert_resolution(
        &mut self,
        name: &str,
        version_range: &str,
        entry: LockEntry,
    ) -> Option<LockEntry> {
        self.insert(resolution_key(name, version_range), entry)
    }

    /// Looks up what `name` requested as `version_range` resolved to.
    ///
    /// # Example
    ///
    /// ```
    /// use pkgkey_workspaces::{LockEntry, LockGraph};
    ///
    /// let mut lock = LockGraph::new();
    /// lock.insert_resolution("lodash", "^4.0.0", LockEntry::new("4.17.21"));
    ///
    /// assert_eq!(lock.query("lodash", "^4.0.0").map(|e| e.version.as_str()), Some("4.17.21"));
    /// assert!(lock.query("lodash", "^3.0.0").is_none());
    /// ```
    #[must_use]
    pub fn query(&self, name: &str, version_range: &str) -> Option<&LockEntry> {
        self.entries.get(&resolution_key(name, version_range))
    }

    /// Looks up an entry by its resolution key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&LockEntry> {
        self.entries.get(key)
    }

    /// Number of resolution keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the graph has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in resolution-key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, LockEntry> {
        self.entries.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, LockEntry)> for LockGraph {
    fn from_iter<T: IntoIterator<Item = (K, LockEntry)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
