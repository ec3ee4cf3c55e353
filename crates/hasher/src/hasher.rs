//! The run coordinator: worklist traversal over internal dependencies and
//! the final cache key.

use crate::config::{HasherOptions, InternalHashOrder};
use crate::files::hash_files;
use crate::hash::{hash_string, hash_strings};
use crate::package::{PackageHashInfo, calculate_package_hash};
use crate::Result;
use pkgkey_workspaces::{
    LockGraph, LockfileCache, WorkspaceInfo, discover_workspace, find_package_root,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Package hashes completed so far, in completion order, unique by package root.
///
/// Passed across [`Hasher::create_package_hash`] calls so packages shared by
/// several targets are hashed once. Seeding it with earlier results skips
/// recomputation for those roots.
#[derive(Debug, Clone, Default)]
pub struct CompletedPackages {
    packages: Vec<Arc<PackageHashInfo>>,
    by_root: HashMap<PathBuf, usize>,
}

impl CompletedPackages {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Result previously recorded for `package_root`.
    #[must_use]
    pub fn get(&self, package_root: &Path) -> Option<&Arc<PackageHashInfo>> {
        self.by_root.get(package_root).map(|&index| &self.packages[index])
    }

    /// Whether `package_root` has a result.
    #[must_use]
    pub fn contains(&self, package_root: &Path) -> bool {
        self.by_root.contains_key(package_root)
    }

    /// Appends `info` unless its root is already present; returns whether it was added.
    pub fn insert(&mut self, info: Arc<PackageHashInfo>) -> bool {
        if self.by_root.contains_key(&info.package_root) {
            return false;
        }
        self.by_root
            .insert(info.package_root.clone(), self.packages.len());
        self.packages.push(info);
        true
    }

    /// Results in completion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<PackageHashInfo>> {
        self.packages.iter()
    }

    /// Number of results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether nothing has completed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl FromIterator<PackageHashInfo> for CompletedPackages {
    fn from_iter<T: IntoIterator<Item = PackageHashInfo>>(iter: T) -> Self {
        let mut completed = Self::new();
        for info in iter {
            completed.insert(Arc::new(info));
        }
        completed
    }
}

/// Cache key of one target package and how it was assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageHash {
    /// The cache key.
    pub hash: String,
    /// Digest of every package hash in the target's internal subgraph.
    pub internal_packages_hash: String,
    /// Digest of the build command signature.
    pub build_command_hash: String,
    /// Packages of the subgraph in completion order; the target comes first.
    pub packages: Vec<Arc<PackageHashInfo>>,
}

/// Computes cache keys for packages of one repository.
///
/// Owns the session's [`LockfileCache`]; every key produced by one `Hasher`
/// sees the same parsed lockfile.
///
/// # Example
///
/// ```rust,ignore
/// use pkgkey_hasher::{Hasher, HasherOptions};
///
/// let hasher = Hasher::new(HasherOptions::new("packages/app"), "npm run build");
/// let key = hasher.create_package_hash(None, None, None)?;
/// println!("{}", key.hash);
/// ```
#[derive(Debug)]
pub struct Hasher {
    options: HasherOptions,
    build_command_signature: String,
    lockfiles: LockfileCache,
}

impl Hasher {
    /// Creates a hasher for `options.package_root` and a build command.
    #[must_use]
    pub fn new(options: HasherOptions, build_command_signature: impl Into<String>) -> Self {
        Self {
            options,
            build_command_signature: build_command_signature.into(),
            lockfiles: LockfileCache::new(),
        }
    }

    /// The options this hasher was created with.
    #[must_use]
    pub const fn options(&self) -> &HasherOptions {
        &self.options
    }

    /// Computes the cache key of the package at `location`.
    ///
    /// `location` defaults to the package enclosing the configured package
    /// root. `completed_global` is consulted before hashing any package and
    /// receives every package completed by this call. `lock` defaults to the
    /// lockfile found above the package, parsed once per hasher.
    ///
    /// # Errors
    ///
    /// Returns an error when no lockfile is found (before anything is
    /// hashed), when workspace discovery fails, or when any package of the
    /// subgraph cannot be hashed. A failed package is never recorded in
    /// `completed_global`.
    pub fn create_package_hash(
        &self,
        location: Option<&Path>,
        completed_global: Option<&mut CompletedPackages>,
        lock: Option<&LockGraph>,
    ) -> Result<PackageHash> {
        let package_root = match location {
            Some(location) => absolute(location)?,
            None => find_package_root(&self.options.package_root)?,
        };

        let parsed;
        let lock = match lock {
            Some(lock) => lock,
            None => {
                parsed = self.lockfiles.for_package(&package_root)?;
                parsed.as_ref()
            }
        };
        let workspace = discover_workspace(&package_root)?;

        self.hash_in_workspace(&package_root, &self.options, &workspace, lock, completed_global)
    }

    /// Batch mode: cache keys for several packages of the repository at `repo_root`.
    ///
    /// One lock graph, one workspace index and one completed list are shared,
    /// so common internal dependencies are hashed once. Keys are returned in
    /// the order of `package_roots`.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered; see [`Self::create_package_hash`].
    pub fn create_hash_of_packages(
        &self,
        package_roots: &[PathBuf],
        repo_root: &Path,
    ) -> Result<Vec<String>> {
        Ok(self
            .hash_packages(package_roots, repo_root)?
            .into_iter()
            .map(|package| package.hash)
            .collect())
    }

    /// Batch mode returning the full [`PackageHash`] for every target.
    ///
    /// # Errors
    ///
    /// See [`Self::create_hash_of_packages`].
    pub fn hash_packages(
        &self,
        package_roots: &[PathBuf],
        repo_root: &Path,
    ) -> Result<Vec<PackageHash>> {
        let targets: Vec<(PathBuf, HasherOptions)> = package_roots
            .iter()
            .map(|root| (root.clone(), self.options.clone()))
            .collect();
        self.hash_targets(&targets, repo_root)
    }

    /// Batch mode where every target carries its own resolved options.
    ///
    /// The lock graph and workspace index are shared by all targets. Package
    /// hashes are shared only between targets with the same source patterns,
    /// so each key equals the one a single run with that target's options
    /// would produce.
    ///
    /// # Errors
    ///
    /// See [`Self::create_hash_of_packages`].
    pub fn hash_targets(
        &self,
        targets: &[(PathBuf, HasherOptions)],
        repo_root: &Path,
    ) -> Result<Vec<PackageHash>> {
        let repo_root = absolute(repo_root)?;
        let _span = tracing::info_span!(
            "hasher.batch",
            repo_root = %repo_root.display(),
            targets = targets.len()
        )
        .entered();

        let lock = self.lockfiles.for_package(&repo_root)?;
        let workspace = discover_workspace(&repo_root)?;
        let mut completed: HashMap<Vec<String>, CompletedPackages> = HashMap::new();

        let mut results = Vec::with_capacity(targets.len());
        for (package_root, options) in targets {
            let package_root = absolute(package_root)?;
            let memo = completed.entry(options.source_patterns()).or_default();
            results.push(self.hash_in_workspace(
                &package_root,
                options,
                &workspace,
                &lock,
                Some(memo),
            )?);
        }

        tracing::debug!(
            targets = results.len(),
            packages_hashed = completed.values().map(CompletedPackages::len).sum::<usize>(),
            pattern_sets = completed.len(),
            "Batch hashing complete"
        );
        Ok(results)
    }

    /// Digest of the configured package's output folders.
    ///
    /// # Errors
    ///
    /// Returns an error if an output file cannot be read.
    pub fn hash_of_output(&self) -> Result<String> {
        hash_files(&self.options.package_root, &self.options.output_patterns())
    }

    fn hash_in_workspace(
        &self,
        package_root: &Path,
        options: &HasherOptions,
        workspace: &WorkspaceInfo,
        lock: &LockGraph,
        mut completed_global: Option<&mut CompletedPackages>,
    ) -> Result<PackageHash> {
        let _span =
            tracing::info_span!("hasher.create_package_hash", root = %package_root.display())
                .entered();

        let patterns = options.source_patterns();
        let mut completed = CompletedPackages::new();
        let mut queue = VecDeque::from([package_root.to_path_buf()]);
        // Roots ever enqueued in this run; a superset of `completed`
        let mut queued: HashSet<PathBuf> = HashSet::from([package_root.to_path_buf()]);

        while let Some(root) = queue.pop_front() {
            let info = match completed_global.as_deref().and_then(|global| global.get(&root)) {
                Some(previous) => {
                    tracing::debug!(package = %previous.name, "Reusing completed package hash");
                    Arc::clone(previous)
                }
                None => Arc::new(calculate_package_hash(&root, workspace, lock, &patterns)?),
            };

            for name in &info.internal_dependencies {
                let Some(dependency_root) = workspace.path_of(name) else {
                    tracing::warn!(
                        package = %info.name,
                        dependency = %name,
                        "Internal dependency is not in the workspace; skipping"
                    );
                    continue;
                };
                if queued.insert(dependency_root.to_path_buf()) {
                    queue.push_back(dependency_root.to_path_buf());
                }
            }

            completed.insert(Arc::clone(&info));
            if let Some(global) = completed_global.as_deref_mut() {
                global.insert(info);
            }
        }

        let internal_packages_hash =
            combine_hash_of_internal_packages(&completed, options.internal_hash_order);
        let build_command_hash = hash_string(&self.build_command_signature);
        let hash = hash_strings([&internal_packages_hash, &build_command_hash]);

        tracing::debug!("Hash of internal packages: {internal_packages_hash}");
        tracing::debug!("Hash of build command: {build_command_hash}");
        tracing::debug!(packages = completed.len(), "Combined hash: {hash}");

        Ok(PackageHash {
            hash,
            internal_packages_hash,
            build_command_hash,
            packages: completed.packages,
        })
    }
}

/// Folds the package hashes of one run into a single digest.
#[must_use]
pub fn combine_hash_of_internal_packages(
    completed: &CompletedPackages,
    order: InternalHashOrder,
) -> String {
    let mut hashes: Vec<&str> = completed.iter().map(|info| info.hash.as_str()).collect();
    if order == InternalHashOrder::Sorted {
        hashes.sort_unstable();
    }
    hash_strings(hashes)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| crate::Error::io(e, path, "resolve absolute path"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(root: &str, hash: &str) -> PackageHashInfo {
        PackageHashInfo {
            package_root: PathBuf::from(root),
            name: root.trim_start_matches('/').to_string(),
            files_hash: String::new(),
            dependencies_hash: String::new(),
            hash: hash.to_string(),
            internal_dependencies: Vec::new(),
        }
    }

    #[test]
    fn completed_packages_dedupe_by_root() {
        let mut completed = CompletedPackages::new();
        assert!(completed.insert(Arc::new(info("/a", "1"))));
        assert!(!completed.insert(Arc::new(info("/a", "2"))));
        assert!(completed.insert(Arc::new(info("/b", "3"))));

        assert_eq!(completed.len(), 2);
        assert_eq!(completed.get(Path::new("/a")).unwrap().hash, "1");
        assert!(completed.contains(Path::new("/b")));
        assert!(!completed.contains(Path::new("/c")));
    }

    #[test]
    fn completed_packages_from_iter_keeps_first() {
        let completed: CompletedPackages =
            [info("/a", "1"), info("/b", "2"), info("/a", "3")].into_iter().collect();
        let hashes: Vec<_> = completed.iter().map(|i| i.hash.as_str()).collect();
        assert_eq!(hashes, vec!["1", "2"]);
    }

    #[test]
    fn sorted_fold_ignores_completion_order() {
        let ab: CompletedPackages = [info("/a", "aaa"), info("/b", "bbb")].into_iter().collect();
        let ba: CompletedPackages = [info("/b", "bbb"), info("/a", "aaa")].into_iter().collect();

        assert_eq!(
            combine_hash_of_internal_packages(&ab, InternalHashOrder::Sorted),
            combine_hash_of_internal_packages(&ba, InternalHashOrder::Sorted)
        );
        assert_ne!(
            combine_hash_of_internal_packages(&ab, InternalHashOrder::Completion),
            combine_hash_of_internal_packages(&ba, InternalHashOrder::Completion)
        );
        assert_eq!(
            combine_hash_of_internal_packages(&ab, InternalHashOrder::Completion),
            hash_strings(["aaa", "bbb"])
        );
    }
}
