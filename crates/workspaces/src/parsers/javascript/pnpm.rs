use crate::core::traits::LockSource;
use crate::core::types::{DependencyMap, LockEntry, LockGraph, resolution_key};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Highest `lockfileVersion` major this source has been tested against.
const HIGHEST_TESTED_MAJOR: u32 = 9;

/// Lock source for pnpm `pnpm-lock.yaml` files (lockfile v5 through v9).
///
/// pnpm keys packages by resolved version (`/left-pad/1.3.0`, `/left-pad@1.3.0`,
/// `left-pad@1.3.0(peer@1.0.0)`); these normalize to `left-pad@1.3.0`. The
/// ranges written in manifests only appear on importers, so every importer
/// dependency also contributes a `name@specifier` alias for its resolved entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct PnpmLockSource;

impl LockSource for PnpmLockSource {
    fn parse(&self, lockfile_path: &Path) -> Result<LockGraph> {
        let contents = fs::read_to_string(lockfile_path)
            .map_err(|source| Error::io(source, lockfile_path, "reading pnpm-lock.yaml"))?;

        let lockfile: PnpmLockfile =
            serde_yaml::from_str(&contents).map_err(|source| Error::LockfileParseFailed {
                path: lockfile_path.to_path_buf(),
                message: source.to_string(),
            })?;

        check_lockfile_version(lockfile_path, lockfile.lockfile_version.as_ref())?;

        let mut graph = LockGraph::new();

        // Resolved packages keyed by name@version
        for (package_key, package) in &lockfile.packages {
            let (name, version) = package_identity(lockfile_path, package_key, package)?;
            let mut dependencies = DependencyMap::new();
            push_dependencies(&mut dependencies, &package.dependencies);
            push_dependencies(&mut dependencies, &package.optional_dependencies);
            graph.insert_resolution(
                &name,
                &version,
                LockEntry::new(version.clone()).with_dependencies(dependencies),
            );
        }

        // v9 moved per-package dependencies into snapshots
        for (snapshot_key, snapshot) in &lockfile.snapshots {
            let (name, version) = parse_package_key(snapshot_key).ok_or_else(|| {
                invalid_key(lockfile_path, snapshot_key)
            })?;
            let mut dependencies = DependencyMap::new();
            push_dependencies(&mut dependencies, &snapshot.dependencies);
            push_dependencies(&mut dependencies, &snapshot.optional_dependencies);

            let key = resolution_key(&name, &version);
            let mut entry = graph
                .get(&key)
                .cloned()
                .unwrap_or_else(|| LockEntry::new(version.clone()));
            if let Some(existing) = entry.dependencies.take() {
                dependencies.extend(existing);
            }
            graph.insert(key, entry.with_dependencies(dependencies));
        }

        // npm: aliases (`string-width-cjs: string-width@4.2.3`) share the real package's entry
        let aliased: Vec<(&String, &String)> = lockfile
            .packages
            .values()
            .flat_map(|package| package.dependencies.iter().chain(&package.optional_dependencies))
            .chain(lockfile.snapshots.values().flat_map(|snapshot| {
                snapshot.dependencies.iter().chain(&snapshot.optional_dependencies)
            }))
            .collect();
        for (name, version) in aliased {
            let version = normalize_version(version);
            let Some((target_name, target_version)) = alias_target(version) else {
                continue;
            };
            let alias = resolution_key(name, version);
            if graph.get(&alias).is_some() {
                continue;
            }
            if let Some(entry) = graph.query(&target_name, &target_version).cloned() {
                tracing::trace!(%alias, target = %target_name, "pnpm npm alias");
                graph.insert(alias, entry);
            }
        }

        // Requested ranges from importers; single-project lockfiles keep them at the top level
        let mut importers: Vec<(&str, &PnpmImporter)> = lockfile
            .importers
            .iter()
            .map(|(path, importer)| (path.as_str(), importer))
            .collect();
        if importers.is_empty() {
            importers.push((".", &lockfile.root));
        }

        let mut aliases = 0usize;
        for (importer_path, importer) in importers {
            for (name, specifier, version) in importer.requested() {
                if version.starts_with("link:") {
                    continue;
                }
                let alias = resolution_key(name, specifier);
                if graph.get(&alias).is_some() {
                    continue;
                }
                let entry = alias_target(version)
                    .and_then(|(target_name, target_version)| {
                        graph.query(&target_name, &target_version)
                    })
                    .or_else(|| graph.query(name, normalize_version(version)))
                    .cloned()
                    .unwrap_or_else(|| LockEntry::new(normalize_version(version)));
                tracing::trace!(importer = importer_path, %alias, version, "pnpm importer alias");
                graph.insert(alias, entry);
                aliases += 1;
            }
        }

        tracing::debug!(
            path = %lockfile_path.display(),
            keys = graph.len(),
            aliases,
            "Parsed pnpm-lock.yaml"
        );
        Ok(graph)
    }

    fn lockfile_name(&self) -> &'static str {
        "pnpm-lock.yaml"
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PnpmLockfile {
    #[serde(default)]
    lockfile_version: Option<serde_yaml::Value>,
    #[serde(default)]
    importers: BTreeMap<String, PnpmImporter>,
    #[serde(default)]
    packages: BTreeMap<String, PnpmPackage>,
    #[serde(default)]
    snapshots: BTreeMap<String, PnpmSnapshot>,
    #[serde(flatten)]
    root: PnpmImporter,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PnpmImporter {
    /// v5 only: requested ranges, separate from resolved versions
    #[serde(default)]
    specifiers: BTreeMap<String, String>,
    #[serde(default)]
    dependencies: BTreeMap<String, ImporterDependency>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, ImporterDependency>,
    #[serde(default)]
    optional_dependencies: BTreeMap<String, ImporterDependency>,
}

impl PnpmImporter {
    /// `(name, requested range, resolved version)` for every importer dependency.
    fn requested(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.dependencies
            .iter()
            .chain(&self.dev_dependencies)
            .chain(&self.optional_dependencies)
            .filter_map(|(name, dependency)| match dependency {
                ImporterDependency::Detailed { specifier, version } => {
                    Some((name.as_str(), specifier.as_str(), version.as_str()))
                }
                ImporterDependency::Plain(version) => self
                    .specifiers
                    .get(name)
                    .map(|specifier| (name.as_str(), specifier.as_str(), version.as_str())),
            })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImporterDependency {
    /// v6+: `{specifier: ^1.0.0, version: 1.2.0}`
    Detailed { specifier: String, version: String },
    /// v5: resolved version only
    Plain(String),
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PnpmPackage {
    /// Present for non-registry packages whose key is not `name@version`
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    optional_dependencies: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PnpmSnapshot {
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    optional_dependencies: BTreeMap<String, String>,
}

fn check_lockfile_version(lockfile_path: &Path, version: Option<&serde_yaml::Value>) -> Result<()> {
    // If lockfileVersion is missing, proceed (compatible with older pnpm versions)
    let Some(version) = version else {
        return Ok(());
    };

    let version_str = match version {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        other => format!("{other:?}"),
    };

    let major_version = version_str
        .split('.')
        .next()
        .and_then(|v| v.trim_matches('\'').parse::<u32>().ok());

    match major_version {
        None => Err(Error::LockfileParseFailed {
            path: lockfile_path.to_path_buf(),
            message: format!(
                "Invalid pnpm lockfileVersion format: '{version_str}'. Expected a numeric version like '6.0'.",
            ),
        }),
        Some(major) => {
            if major > HIGHEST_TESTED_MAJOR {
                tracing::warn!(
                    "Encountered pnpm lockfile version '{version_str}' which is newer than the highest tested version ({HIGHEST_TESTED_MAJOR}.0). Parsing may fail or be incomplete.",
                );
            }
            Ok(())
        }
    }
}

fn package_identity(
    lockfile_path: &Path,
    package_key: &str,
    package: &PnpmPackage,
) -> Result<(String, String)> {
    if let (Some(name), Some(version)) = (&package.name, &package.version) {
        return Ok((name.clone(), normalize_version(version).to_string()));
    }
    parse_package_key(package_key).ok_or_else(|| invalid_key(lockfile_path, package_key))
}

/// Splits a pnpm package key into `(name, version)`.
///
/// Handles `/left-pad/1.3.0` (v5), `/left-pad@1.3.0` (v6), `left-pad@1.3.0` (v9),
/// scoped names, and peer suffixes (`(react@18.2.0)` or v5's `_react@18.2.0`).
fn parse_package_key(package_key: &str) -> Option<(String, String)> {
    let key = package_key.trim_start_matches('/');
    let key = key.split('(').next().unwrap_or(key);

    let scope_len = if key.starts_with('@') {
        key.find('/')? + 1
    } else {
        0
    };
    let (scope, rest) = key.split_at(scope_len);

    // v5 separates with '/', later versions with '@'; peer suffixes may hold either
    let split_at = match (rest.find('/'), rest.find('@')) {
        (Some(slash), Some(at)) => slash.min(at),
        (Some(index), None) | (None, Some(index)) => index,
        (None, None) => return None,
    };
    let (name, version) = (&rest[..split_at], &rest[split_at + 1..]);

    let version = normalize_version(version);
    if name.is_empty() || version.is_empty() {
        return None;
    }
    Some((format!("{scope}{name}"), version.to_string()))
}

/// Real `(name, version)` behind an `npm:` alias's resolved version.
///
/// pnpm records aliased packages as `string-width@4.2.3` (v9) or
/// `/string-width@4.2.3` (v6) where a plain version would otherwise be.
fn alias_target(version: &str) -> Option<(String, String)> {
    let version = version.split('(').next().unwrap_or(version);
    let version = version.trim_start_matches('/');
    if version.starts_with(|c: char| c.is_ascii_digit()) || version.contains(':') {
        return None;
    }
    parse_package_key(version)
}

/// Drops pnpm peer-dependency suffixes from a resolved version.
fn normalize_version(version: &str) -> &str {
    let version = version.split('(').next().unwrap_or(version);
    version.split('_').next().unwrap_or(version)
}

fn push_dependencies(target: &mut DependencyMap, deps: &BTreeMap<String, String>) {
    for (name, version) in deps {
        if version.starts_with("link:") {
            continue;
        }
        target.insert(name.clone(), normalize_version(version).to_string());
    }
}

fn invalid_key(lockfile_path: &Path, package_key: &str) -> Error {
    Error::LockfileParseFailed {
        path: lockfile_path.to_path_buf(),
        message: format!("Invalid pnpm package key format: {package_key}"),
    }
}
