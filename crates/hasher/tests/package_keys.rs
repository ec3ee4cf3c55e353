//! End-to-end cache keys over small monorepos on disk.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use pkgkey_hasher::{
    CompletedPackages, Error, Hasher, HasherOptions, InternalHashOrder, PackageHashInfo,
    combine_hash_of_internal_packages, hash_strings,
};
use proptest::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const YARN_LOCK: &str = r#"# THIS IS AN AUTOGENERATED FILE. DO NOT EDIT THIS FILE DIRECTLY.
# yarn lockfile v1


lodash@^4.17.0:
  version "4.17.21"
  resolved "https://registry.yarnpkg.com/lodash/-/lodash-4.17.21.tgz"
"#;

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// A yarn monorepo where `a` depends on `b` and lodash.
struct Monorepo {
    dir: TempDir,
}

impl Monorepo {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(
            &root.join("package.json"),
            r#"{"name": "monorepo", "private": true, "workspaces": ["packages/*"]}"#,
        );
        write(&root.join("yarn.lock"), YARN_LOCK);
        write(
            &root.join("packages/a/package.json"),
            r#"{"name": "a", "dependencies": {"b": "*", "lodash": "^4.17.0"}}"#,
        );
        write(&root.join("packages/a/src/index.js"), "require('b');");
        write(&root.join("packages/b/package.json"), r#"{"name": "b"}"#);
        write(&root.join("packages/b/src/index.js"), "module.exports = 1;");
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn package(&self, name: &str) -> PathBuf {
        self.root().join("packages").join(name)
    }

    fn hasher(&self, command: &str) -> Hasher {
        Hasher::new(HasherOptions::new(self.package("a")), command)
    }

    fn key(&self, name: &str) -> String {
        self.hasher("yarn build")
            .create_package_hash(Some(&self.package(name)), None, None)
            .unwrap()
            .hash
    }
}

#[test]
fn dependent_package_lists_itself_then_its_dependency() {
    let repo = Monorepo::new();
    let result = repo
        .hasher("yarn build")
        .create_package_hash(None, None, None)
        .unwrap();

    let names: Vec<_> = result.packages.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(result.packages[0].internal_dependencies, vec!["b"]);
    assert_eq!(
        result.packages[0].dependencies_hash,
        hash_strings(["lodash@4.17.21"])
    );
    assert_eq!(result.hash.len(), 64);
    assert_eq!(
        result.hash,
        hash_strings([&result.internal_packages_hash, &result.build_command_hash])
    );
}

#[test]
fn dependency_change_propagates_and_reverts() {
    let repo = Monorepo::new();
    let original = repo.key("a");

    write(&repo.package("b/src/index.js"), "module.exports = 2;");
    let changed = repo.key("a");
    assert_ne!(original, changed);

    write(&repo.package("b/src/index.js"), "module.exports = 1;");
    assert_eq!(original, repo.key("a"));
}

#[test]
fn dependent_change_does_not_touch_dependency() {
    let repo = Monorepo::new();
    let b_before = repo.key("b");
    write(&repo.package("a/src/index.js"), "require('b'); // edited");
    assert_eq!(b_before, repo.key("b"));
}

#[test]
fn output_folders_do_not_affect_key() {
    let repo = Monorepo::new();
    let before = repo.key("a");
    write(&repo.package("a/dist/index.js"), "built");
    write(&repo.package("a/lib/nested/index.js"), "built");
    write(&repo.package("a/node_modules/b/index.js"), "linked");
    assert_eq!(before, repo.key("a"));
}

#[test]
fn files_outside_the_package_do_not_affect_key() {
    let repo = Monorepo::new();
    let before = repo.key("b");
    write(&repo.root().join("README.md"), "docs");
    write(&repo.root().join("packages/c/index.js"), "unrelated");
    assert_eq!(before, repo.key("b"));
}

#[test]
fn build_command_is_part_of_key() {
    let repo = Monorepo::new();
    let a = repo.package("a");
    let build = repo.hasher("yarn build").create_package_hash(Some(&a), None, None).unwrap();
    let test = repo.hasher("yarn test").create_package_hash(Some(&a), None, None).unwrap();

    assert_eq!(build.internal_packages_hash, test.internal_packages_hash);
    assert_ne!(build.hash, test.hash);
}

#[test]
fn locked_version_bump_changes_key() {
    let repo = Monorepo::new();
    let before = repo.key("a");
    let b_before = repo.key("b");

    write(
        &repo.root().join("yarn.lock"),
        &YARN_LOCK.replace("4.17.21", "4.17.22"),
    );
    assert_ne!(before, repo.key("a"));
    assert_eq!(b_before, repo.key("b"));
}

#[test]
fn lockfile_is_parsed_once_per_hasher() {
    let repo = Monorepo::new();
    let hasher = repo.hasher("yarn build");
    let before = hasher.create_package_hash(None, None, None).unwrap();

    // A later edit is invisible to this session
    write(
        &repo.root().join("yarn.lock"),
        &YARN_LOCK.replace("4.17.21", "4.17.22"),
    );
    let after = hasher.create_package_hash(None, None, None).unwrap();
    assert_eq!(before.hash, after.hash);
}

#[test]
fn internal_cycle_terminates_with_one_entry_per_package() {
    let repo = Monorepo::new();
    write(
        &repo.package("b/package.json"),
        r#"{"name": "b", "dependencies": {"a": "*"}}"#,
    );

    let result = repo
        .hasher("yarn build")
        .create_package_hash(Some(&repo.package("b")), None, None)
        .unwrap();
    let names: Vec<_> = result.packages.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["b", "a"]);

    // Under sorted folding both members of the cycle share the internal digest
    let from_a = repo
        .hasher("yarn build")
        .create_package_hash(Some(&repo.package("a")), None, None)
        .unwrap();
    assert_eq!(from_a.internal_packages_hash, result.internal_packages_hash);
}

#[test]
fn completion_order_depends_on_target() {
    let repo = Monorepo::new();
    write(
        &repo.package("b/package.json"),
        r#"{"name": "b", "dependencies": {"a": "*"}}"#,
    );
    let options = HasherOptions::new(repo.package("a"))
        .with_internal_hash_order(InternalHashOrder::Completion);
    let hasher = Hasher::new(options, "yarn build");

    let from_a = hasher.create_package_hash(Some(&repo.package("a")), None, None).unwrap();
    let from_b = hasher.create_package_hash(Some(&repo.package("b")), None, None).unwrap();
    assert_ne!(from_a.internal_packages_hash, from_b.internal_packages_hash);
}

#[test]
fn completed_packages_are_reused_without_rehashing() {
    let repo = Monorepo::new();
    let hasher = repo.hasher("yarn build");
    let mut completed = CompletedPackages::new();

    let first = hasher
        .create_package_hash(Some(&repo.package("a")), Some(&mut completed), None)
        .unwrap();
    assert_eq!(completed.len(), 2);

    write(&repo.package("b/src/index.js"), "module.exports = 2;");
    let memoized = hasher
        .create_package_hash(Some(&repo.package("a")), Some(&mut completed), None)
        .unwrap();
    assert_eq!(first.hash, memoized.hash);
    assert_eq!(completed.len(), 2);

    let fresh = hasher
        .create_package_hash(Some(&repo.package("a")), None, None)
        .unwrap();
    assert_ne!(first.hash, fresh.hash);
}

#[test]
fn batch_shares_work_and_matches_single_runs() {
    let repo = Monorepo::new();
    let hasher = repo.hasher("yarn build");
    let targets = vec![repo.package("a"), repo.package("b")];

    let keys = hasher.create_hash_of_packages(&targets, repo.root()).unwrap();
    assert_eq!(keys, vec![repo.key("a"), repo.key("b")]);

    let detailed = hasher.hash_packages(&targets, repo.root()).unwrap();
    assert!(std::sync::Arc::ptr_eq(
        &detailed[0].packages[1],
        &detailed[1].packages[0]
    ));
}

#[test]
fn batch_targets_keep_their_own_options() {
    let repo = Monorepo::new();
    write(&repo.package("b/generated/out.js"), "v1");
    let hasher = repo.hasher("yarn build");
    let b_options = HasherOptions::new(repo.package("b")).with_output_folders(["generated"]);
    let targets = vec![
        (repo.package("a"), HasherOptions::new(repo.package("a"))),
        (repo.package("b"), b_options.clone()),
    ];

    let batch = hasher.hash_targets(&targets, repo.root()).unwrap();
    let single_b = Hasher::new(b_options.clone(), "yarn build")
        .create_package_hash(None, None, None)
        .unwrap();
    assert_eq!(batch[0].hash, repo.key("a"));
    assert_eq!(batch[1].hash, single_b.hash);
    // Different source patterns, so `b` is hashed once per pattern set
    assert!(!std::sync::Arc::ptr_eq(&batch[0].packages[1], &batch[1].packages[0]));

    write(&repo.package("b/generated/out.js"), "v2");
    let again = hasher.hash_targets(&targets, repo.root()).unwrap();
    assert_eq!(again[1].hash, batch[1].hash);
    assert_ne!(again[0].hash, batch[0].hash);
}

#[test]
fn missing_lockfile_fails_before_hashing() {
    let repo = Monorepo::new();
    fs::remove_file(repo.root().join("yarn.lock")).unwrap();

    let mut completed = CompletedPackages::new();
    let err = repo
        .hasher("yarn build")
        .create_package_hash(None, Some(&mut completed), None)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Workspace(pkgkey_workspaces::Error::LockfileNotFound { .. })
    ));
    assert!(completed.is_empty());
}

#[test]
fn explicit_lock_graph_skips_lockfile_lookup() {
    let repo = Monorepo::new();
    fs::remove_file(repo.root().join("yarn.lock")).unwrap();

    let lock = pkgkey_workspaces::LockGraph::new();
    let result = repo
        .hasher("yarn build")
        .create_package_hash(None, None, Some(&lock))
        .unwrap();
    assert_eq!(
        result.packages[0].dependencies_hash,
        hash_strings(["lodash@^4.17.0"])
    );
}

#[test]
fn unreadable_package_is_not_recorded() {
    let repo = Monorepo::new();
    fs::remove_file(repo.package("b/package.json")).unwrap();
    write(&repo.package("b/package.json"), "{ not json");

    let mut completed = CompletedPackages::new();
    let result = repo.hasher("yarn build").create_package_hash(
        Some(&repo.package("b")),
        Some(&mut completed),
        None,
    );
    assert!(result.is_err());
    assert!(!completed.contains(&repo.package("b")));
}

#[test]
fn output_hash_tracks_output_folders_only() {
    let repo = Monorepo::new();
    let options = HasherOptions::new(repo.package("a")).with_output_folders(["dist"]);
    let hasher = Hasher::new(options, "yarn build");

    write(&repo.package("a/dist/index.js"), "built v1");
    let first = hasher.hash_of_output().unwrap();

    write(&repo.package("a/src/index.js"), "source edit");
    assert_eq!(first, hasher.hash_of_output().unwrap());

    write(&repo.package("a/dist/index.js"), "built v2");
    assert_ne!(first, hasher.hash_of_output().unwrap());
}

#[test]
fn single_package_repository_without_workspace() {
    let dir = TempDir::new().unwrap();
    write(
        &dir.path().join("package.json"),
        r#"{"name": "solo", "dependencies": {"lodash": "^4.17.0"}}"#,
    );
    write(&dir.path().join("yarn.lock"), YARN_LOCK);
    write(&dir.path().join("index.js"), "solo");

    let hasher = Hasher::new(HasherOptions::new(dir.path()), "build");
    let result = hasher.create_package_hash(None, None, None).unwrap();
    assert_eq!(result.packages.len(), 1);
    assert!(result.packages[0].internal_dependencies.is_empty());
}

fn info(index: usize) -> PackageHashInfo {
    PackageHashInfo {
        package_root: PathBuf::from(format!("/repo/packages/p{index}")),
        name: format!("p{index}"),
        files_hash: String::new(),
        dependencies_hash: String::new(),
        hash: hash_strings([index.to_string()]),
        internal_dependencies: Vec::new(),
    }
}

proptest! {
    #[test]
    fn sorted_fold_is_order_independent(
        order in Just((0..8).collect::<Vec<usize>>()).prop_shuffle()
    ) {
        let natural: CompletedPackages = (0..8).map(info).collect();
        let shuffled: CompletedPackages = order.into_iter().map(info).collect();

        prop_assert_eq!(
            combine_hash_of_internal_packages(&natural, InternalHashOrder::Sorted),
            combine_hash_of_internal_packages(&shuffled, InternalHashOrder::Sorted)
        );
    }
}
