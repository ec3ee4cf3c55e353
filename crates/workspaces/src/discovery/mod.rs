//! Workspace discovery for JavaScript monorepos.
//!
//! A workspace is declared either by `pnpm-workspace.yaml` or by the
//! `workspaces` field of a root `package.json` (npm, Yarn). Both list member
//! globs; every matching directory with a named `package.json` becomes an
//! entry of the resulting [`WorkspaceInfo`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use pkgkey_workspaces::discover_workspace;
//! use std::path::Path;
//!
//! let workspace = discover_workspace(Path::new("packages/app"))?;
//! for (name, path) in workspace.iter() {
//!     println!("{name} -> {}", path.display());
//! }
//! ```

use crate::core::traits::WorkspaceDiscovery;
use crate::core::types::WorkspaceInfo;
use crate::error::{Error, Result};
use glob::{MatchOptions, Pattern};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub mod package_json;
pub mod pnpm_workspace;

pub use package_json::PackageJsonDiscovery;
pub use pnpm_workspace::PnpmWorkspaceDiscovery;

/// Directories never descended into while resolving member globs.
const PRUNED_DIRECTORIES: [&str; 2] = ["node_modules", ".git"];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Finds the workspace enclosing `start` and indexes its members.
///
/// Walks up from `start` (inclusive). At each directory, `pnpm-workspace.yaml`
/// is consulted before `package.json`. When no ancestor declares a workspace
/// the result is an empty [`WorkspaceInfo`]: a single-package repository in
/// which every dependency is external.
///
/// # Errors
///
/// Returns an error if `start` cannot be made absolute, a workspace
/// declaration cannot be parsed, or a member glob is invalid.
pub fn discover_workspace(start: &Path) -> Result<WorkspaceInfo> {
    let start = absolute(start)?;
    let discoveries: [&dyn WorkspaceDiscovery; 2] = [&PnpmWorkspaceDiscovery, &PackageJsonDiscovery];

    for dir in start.ancestors() {
        for discovery in discoveries {
            if let Some(patterns) = discovery.member_patterns(dir)? {
                tracing::debug!(
                    root = %dir.display(),
                    config = discovery.config_file_name(),
                    patterns = ?patterns,
                    "Found workspace declaration"
                );
                return collect_members(dir, &patterns);
            }
        }
    }

    tracing::debug!(start = %start.display(), "No workspace declaration found; treating as single package");
    Ok(WorkspaceInfo::default())
}

/// Nearest ancestor of `start` (inclusive) that holds a `package.json`.
///
/// # Errors
///
/// Returns [`Error::ManifestNotFound`] when no ancestor has a manifest.
pub fn find_package_root(start: &Path) -> Result<PathBuf> {
    let start = absolute(start)?;
    start
        .ancestors()
        .find(|dir| dir.join("package.json").is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::ManifestNotFound {
            path: start.join("package.json"),
        })
}

/// Resolves member globs under `root` and reads each member's name.
///
/// Members are validated tolerantly: a directory without `package.json`, with
/// malformed JSON, or without a `name` is skipped rather than failing the
/// whole discovery.
///
/// # Errors
///
/// Returns an error for invalid globs or unreadable member manifests.
pub fn collect_members(root: &Path, patterns: &[String]) -> Result<WorkspaceInfo> {
    let mut workspace = WorkspaceInfo::new(root.to_path_buf());

    for path in resolve_glob_patterns(root, patterns, &[])? {
        let Some(name) = member_name(&path)? else {
            continue;
        };
        if let Some(previous) = workspace.path_of(&name) {
            tracing::warn!(
                package = %name,
                kept = %previous.display(),
                ignored = %path.display(),
                "Duplicate workspace package name"
            );
            continue;
        }
        workspace.insert(name, path);
    }

    tracing::debug!(root = %root.display(), members = workspace.len(), "Discovered workspace members");
    Ok(workspace)
}

#[derive(Deserialize)]
struct MemberManifest {
    name: Option<String>,
}

fn member_name(member_path: &Path) -> Result<Option<String>> {
    let manifest_path = member_path.join("package.json");
    if !manifest_path.is_file() {
        return Ok(None);
    }

    match read_json_file::<MemberManifest>(&manifest_path) {
        Ok(manifest) => Ok(manifest.name.filter(|name| !name.is_empty())),
        Err(Error::Json { .. }) => {
            tracing::debug!(path = %manifest_path.display(), "Skipping member with malformed package.json");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Resolves glob patterns to find directories, handling exclusions.
///
/// # Arguments
///
/// * `root` - The root directory to resolve patterns from.
/// * `patterns` - List of glob patterns to match (e.g., "packages/*").
/// * `exclusions` - List of glob patterns to exclude (e.g., "packages/excluded").
///   Note: Patterns starting with "!" in the `patterns` list are also treated as exclusions.
///
/// # Returns
///
/// A sorted list of unique, absolute paths (rooted under `root`) that match the patterns and are not excluded.
///
/// # Errors
///
/// Returns [`Error::InvalidGlob`] if any glob pattern is invalid.
pub fn resolve_glob_patterns(
    root: &Path,
    patterns: &[String],
    exclusions: &[String],
) -> Result<Vec<PathBuf>> {
    let mut inclusion_patterns = Vec::new();
    let mut exclusion_patterns = Vec::new();

    for p in exclusions {
        exclusion_patterns.push(compile(p)?);
    }

    for p in patterns {
        if let Some(stripped) = p.strip_prefix('!') {
            exclusion_patterns.push(compile(stripped)?);
        } else {
            inclusion_patterns.push(compile(p)?);
        }
    }

    if inclusion_patterns.is_empty() {
        return Ok(Vec::new());
    }

    let mut matched_paths = BTreeSet::new();
    let walker = WalkDir::new(root).follow_links(false).into_iter().filter_entry(|e| {
        !(e.file_type().is_dir()
            && e.file_name()
                .to_str()
                .is_some_and(|name| PRUNED_DIRECTORIES.contains(&name)))
    });

    for entry in walker.filter_map(std::result::Result::ok) {
        if !entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        // Relativize path for matching; skips root itself
        let Ok(rel_path) = path.strip_prefix(root) else {
            continue;
        };
        if rel_path.as_os_str().is_empty() {
            continue;
        }

        let matches = |p: &Pattern| p.matches_path_with(rel_path, MATCH_OPTIONS);
        if exclusion_patterns.iter().any(matches) {
            continue;
        }
        if inclusion_patterns.iter().any(matches) {
            matched_paths.insert(path.to_path_buf());
        }
    }

    Ok(matched_paths.into_iter().collect())
}

fn compile(pattern: &str) -> Result<Pattern> {
    let normalized = pattern.trim_start_matches("./").trim_end_matches('/');
    Pattern::new(normalized).map_err(|e| Error::InvalidGlob {
        pattern: pattern.to_string(),
        message: e.msg.to_string(),
    })
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| Error::io(e, path, "resolving absolute path"))
}

/// Reads and parses a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed as valid JSON.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).map_err(|e| Error::io(e, path, "reading json file"))?;

    serde_json::from_str(&content).map_err(|e| Error::Json {
        source: e,
        path: Some(path.to_path_buf()),
    })
}

/// Reads and parses a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed as valid YAML.
pub fn read_yaml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).map_err(|e| Error::io(e, path, "reading yaml file"))?;

    serde_yaml::from_str(&content).map_err(|e| Error::Yaml {
        source: e,
        path: Some(path.to_path_buf()),
    })
}
