//! Workspace discovery against repositories built on disk.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use pkgkey_workspaces::{PackageManifest, discover_workspace, find_package_root};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn pnpm_declaration_takes_precedence_over_package_json() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "pnpm-workspace.yaml", "packages:\n  - 'libs/*'\n");
    write(root, "package.json", r#"{"name": "root", "workspaces": ["apps/*"]}"#);
    write(root, "libs/core/package.json", r#"{"name": "core"}"#);
    write(root, "apps/web/package.json", r#"{"name": "web"}"#);

    let workspace = discover_workspace(root).unwrap();
    assert_eq!(workspace.names().collect::<Vec<_>>(), vec!["core"]);
}

#[test]
fn nested_package_without_workspaces_field_is_skipped_during_walk() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "package.json", r#"{"workspaces": {"packages": ["packages/**"]}}"#);
    write(root, "packages/a/package.json", r#"{"name": "a", "dependencies": {"b": "*"}}"#);
    write(root, "packages/group/b/package.json", r#"{"name": "b"}"#);
    write(root, "packages/a/node_modules/b/package.json", r#"{"name": "b-copy"}"#);

    let workspace = discover_workspace(&root.join("packages/a")).unwrap();
    assert_eq!(workspace.names().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(
        workspace.path_of("b"),
        Some(root.join("packages/group/b").as_path())
    );

    let package_root = find_package_root(&root.join("packages/a")).unwrap();
    let manifest = PackageManifest::read(&package_root).unwrap();
    let internal: Vec<_> = manifest
        .all_dependencies()
        .into_keys()
        .filter(|name| workspace.contains(name))
        .collect();
    assert_eq!(internal, vec!["b"]);
}

#[test]
fn workspace_serializes_for_debug_output() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "package.json", r#"{"workspaces": ["packages/*"]}"#);
    write(root, "packages/a/package.json", r#"{"name": "a"}"#);

    let workspace = discover_workspace(root).unwrap();
    let json = serde_json::to_value(&workspace).unwrap();
    assert!(json["packages"]["a"].as_str().unwrap().ends_with("a"));
}
