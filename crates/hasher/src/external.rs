//! Resolution of a package's external dependencies through the lock graph.

use pkgkey_workspaces::{DependencyMap, LockGraph, WorkspaceInfo, resolution_key};
use std::collections::{HashSet, VecDeque};

/// Keeps only the dependencies that are not workspace packages.
#[must_use]
pub fn filter_external_dependencies(
    dependencies: &DependencyMap,
    workspace: &WorkspaceInfo,
) -> DependencyMap {
    dependencies
        .iter()
        .filter(|(name, _)| !workspace.contains(name))
        .map(|(name, range)| (name.clone(), range.clone()))
        .collect()
}

/// Resolves external dependencies, and everything they pull in, to `name@version`.
///
/// Breadth-first over the lock graph starting from the external part of
/// `dependencies`. Each resolution key is expanded at most once, so cyclic
/// graphs terminate. A key missing from the lock graph is reported with its
/// requested range (`name@range`) and not expanded.
///
/// The output is in discovery order, which is deterministic because both the
/// manifest map and every lock entry's dependencies iterate lexicographically.
///
/// # Example
///
/// ```
/// use pkgkey_hasher::resolve_external_dependencies;
/// use pkgkey_workspaces::{DependencyMap, LockEntry, LockGraph, WorkspaceInfo};
///
/// let mut lock = LockGraph::new();
/// lock.insert_resolution("lodash", "^4.0.0", LockEntry::new("4.17.21"));
///
/// let deps = DependencyMap::from([("lodash".to_string(), "^4.0.0".to_string())]);
/// let resolved = resolve_external_dependencies(&deps, &WorkspaceInfo::default(), &lock);
/// assert_eq!(resolved, vec!["lodash@4.17.21"]);
/// ```
#[must_use]
pub fn resolve_external_dependencies(
    dependencies: &DependencyMap,
    workspace: &WorkspaceInfo,
    lock: &LockGraph,
) -> Vec<String> {
    let external = filter_external_dependencies(dependencies, workspace);

    let mut queue: VecDeque<(String, String)> = VecDeque::with_capacity(external.len());
    // Keys that are done or still queued
    let mut seen: HashSet<String> = HashSet::with_capacity(external.len());
    let mut completed = Vec::new();

    for (name, range) in external {
        seen.insert(resolution_key(&name, &range));
        queue.push_back((name, range));
    }

    while let Some((name, range)) = queue.pop_front() {
        let Some(entry) = lock.query(&name, &range) else {
            tracing::trace!(dependency = %resolution_key(&name, &range), "Not in lock graph, using requested range");
            completed.push(resolution_key(&name, &range));
            continue;
        };

        if let Some(dependencies) = &entry.dependencies {
            for (dep_name, dep_range) in dependencies {
                if seen.insert(resolution_key(dep_name, dep_range)) {
                    queue.push_back((dep_name.clone(), dep_range.clone()));
                }
            }
        }

        completed.push(resolution_key(&name, &entry.version));
    }

    completed
}
