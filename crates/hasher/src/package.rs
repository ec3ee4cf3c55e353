//! Hash of one package on its own: files plus resolved external dependencies.

use crate::external::resolve_external_dependencies;
use crate::files::hash_files;
use crate::hash::hash_strings;
use crate::Result;
use pkgkey_workspaces::{LockGraph, PackageManifest, WorkspaceInfo};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Per-package result of [`calculate_package_hash`].
///
/// Identified by `package_root`; never mutated once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageHashInfo {
    /// Absolute package directory.
    pub package_root: PathBuf,
    /// Name from the package manifest.
    pub name: String,
    /// Digest of the package's selected source files.
    pub files_hash: String,
    /// Digest of the sorted external resolution list.
    pub dependencies_hash: String,
    /// `hash_strings([files_hash, dependencies_hash])`.
    pub hash: String,
    /// Dependency names that are workspace packages, in lexicographic order.
    pub internal_dependencies: Vec<String>,
}

/// Computes the hash of the package at `package_root`.
///
/// Internal dependencies are only listed here, not folded in; the
/// [`Hasher`](crate::Hasher) traversal combines them once every package of
/// the subgraph is known.
///
/// # Errors
///
/// Returns an error if the manifest is missing or malformed, a pattern is
/// invalid, or a selected file cannot be read.
pub fn calculate_package_hash(
    package_root: &Path,
    workspace: &WorkspaceInfo,
    lock: &LockGraph,
    patterns: &[String],
) -> Result<PackageHashInfo> {
    let manifest = PackageManifest::read(package_root)?;
    let _span = tracing::info_span!("package_hash", package = %manifest.name).entered();

    let dependencies = manifest.all_dependencies();
    let internal_dependencies: Vec<String> = dependencies
        .keys()
        .filter(|name| workspace.contains(name))
        .cloned()
        .collect();

    let mut resolved = resolve_external_dependencies(&dependencies, workspace, lock);
    resolved.sort();
    let dependencies_hash = hash_strings(&resolved);

    let files_hash = hash_files(package_root, patterns)?;
    let hash = hash_strings([&files_hash, &dependencies_hash]);

    tracing::debug!(
        external = resolved.len(),
        internal = ?internal_dependencies,
        %files_hash,
        %dependencies_hash,
        %hash,
        "Calculated package hash"
    );

    Ok(PackageHashInfo {
        package_root: package_root.to_path_buf(),
        name: manifest.name,
        files_hash,
        dependencies_hash,
        hash,
        internal_dependencies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgkey_workspaces::LockEntry;
    use std::fs;
    use tempfile::TempDir;

    fn all() -> Vec<String> {
        vec!["**".to_string()]
    }

    fn package(root: &Path, manifest: &str, source: &str) {
        fs::create_dir_all(root).unwrap();
        fs::write(root.join("package.json"), manifest).unwrap();
        fs::write(root.join("index.js"), source).unwrap();
    }

    #[test]
    fn splits_internal_and_external_dependencies() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("app");
        package(
            &root,
            r#"{"name": "app", "dependencies": {"lodash": "^4.0.0", "shared": "*"}, "devDependencies": {"jest": "^29.0.0"}}"#,
            "x",
        );
        let workspace: WorkspaceInfo = [("shared", tmp.path().join("shared")), ("app", root.clone())]
            .into_iter()
            .collect();
        let mut lock = LockGraph::new();
        lock.insert_resolution("lodash", "^4.0.0", LockEntry::new("4.17.21"));

        let info = calculate_package_hash(&root, &workspace, &lock, &all()).unwrap();

        assert_eq!(info.name, "app");
        assert_eq!(info.package_root, root);
        assert_eq!(info.internal_dependencies, vec!["shared"]);
        assert_eq!(
            info.dependencies_hash,
            hash_strings(["jest@^29.0.0", "lodash@4.17.21"])
        );
        assert_eq!(info.hash, hash_strings([&info.files_hash, &info.dependencies_hash]));
    }

    #[test]
    fn external_resolution_changes_hash() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("app");
        package(&root, r#"{"name": "app", "dependencies": {"lodash": "^4.0.0"}}"#, "x");
        let workspace = WorkspaceInfo::default();

        let mut old_lock = LockGraph::new();
        old_lock.insert_resolution("lodash", "^4.0.0", LockEntry::new("4.17.20"));
        let mut new_lock = LockGraph::new();
        new_lock.insert_resolution("lodash", "^4.0.0", LockEntry::new("4.17.21"));

        let before = calculate_package_hash(&root, &workspace, &old_lock, &all()).unwrap();
        let after = calculate_package_hash(&root, &workspace, &new_lock, &all()).unwrap();

        assert_eq!(before.files_hash, after.files_hash);
        assert_ne!(before.hash, after.hash);
    }

    #[test]
    fn manifest_key_order_does_not_matter() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        package(&a, r#"{"name": "p", "dependencies": {"x": "1", "y": "2"}}"#, "same");
        package(&b, r#"{"name": "p", "dependencies": {"y": "2", "x": "1"}}"#, "same");

        let lock = LockGraph::new();
        let workspace = WorkspaceInfo::default();
        let patterns = vec!["index.js".to_string()];
        let ha = calculate_package_hash(&a, &workspace, &lock, &patterns).unwrap();
        let hb = calculate_package_hash(&b, &workspace, &lock, &patterns).unwrap();
        assert_eq!(ha.dependencies_hash, hb.dependencies_hash);
        assert_eq!(ha.hash, hb.hash);
    }

    #[test]
    fn missing_manifest_fails() {
        let tmp = TempDir::new().unwrap();
        let err = calculate_package_hash(
            tmp.path(),
            &WorkspaceInfo::default(),
            &LockGraph::new(),
            &all(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Workspace(pkgkey_workspaces::Error::ManifestNotFound { .. })
        ));
    }

    #[test]
    fn serializes_camel_case() {
        let info = PackageHashInfo {
            package_root: PathBuf::from("/repo/a"),
            name: "a".to_string(),
            files_hash: "f".to_string(),
            dependencies_hash: "d".to_string(),
            hash: "h".to_string(),
            internal_dependencies: vec!["b".to_string()],
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["packageRoot"], "/repo/a");
        assert_eq!(json["internalDependencies"][0], "b");
    }
}
