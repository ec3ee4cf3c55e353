use crate::core::traits::LockSource;
use crate::core::types::{DependencyMap, LockEntry, LockGraph, resolution_key};
use crate::error::{Error, Result};
use std::fs;
use std::panic;
use std::path::Path;

const V1_HEADER: &str =
    "# THIS IS AN AUTOGENERATED FILE. DO NOT EDIT THIS FILE DIRECTLY.\n# yarn lockfile v1\n\n";

/// Lock source for Yarn Classic (v1.x) `yarn.lock` files.
///
/// Every descriptor of a block header (`left-pad@^1.3.0, left-pad@~1.3.0:`)
/// becomes its own resolution key pointing at the same entry, which is exactly
/// how yarn itself answers "what did `left-pad@~1.3.0` resolve to".
#[derive(Debug, Default, Clone, Copy)]
pub struct YarnClassicLockSource;

impl LockSource for YarnClassicLockSource {
    fn parse(&self, lockfile_path: &Path) -> Result<LockGraph> {
        let contents = fs::read_to_string(lockfile_path)
            .map_err(|source| Error::io(source, lockfile_path, "reading yarn.lock"))?;

        if is_yarn_modern(&contents) {
            return Err(parse_error(
                lockfile_path,
                "Yarn Modern (v2+) lockfiles are not supported; expected a '# yarn lockfile v1' file"
                    .to_string(),
            ));
        }

        let Some(normalized) = normalize_v1(&contents) else {
            tracing::debug!(path = %lockfile_path.display(), "yarn.lock has no entries");
            return Ok(LockGraph::new());
        };

        // yarn_lock_parser can panic on malformed input
        let parsed = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            yarn_lock_parser::parse_str(&normalized)
                .map(|lockfile| build_graph(&lockfile.entries))
        }))
        .map_err(|_| parse_error(lockfile_path, "yarn.lock parser panicked".to_string()))?;

        let graph = parsed.map_err(|e| parse_error(lockfile_path, e.to_string()))?;
        tracing::debug!(
            path = %lockfile_path.display(),
            keys = graph.len(),
            "Parsed yarn.lock"
        );
        Ok(graph)
    }

    fn supports_lockfile(&self, path: &Path) -> bool {
        if !matches!(path.file_name().and_then(|n| n.to_str()), Some("yarn.lock")) {
            return false;
        }

        // If the file doesn't exist yet, we can't sniff content
        match fs::read_to_string(path) {
            Ok(contents) => !is_yarn_modern(&contents),
            Err(_) => true,
        }
    }

    fn lockfile_name(&self) -> &'static str {
        "yarn.lock"
    }
}

/// Yarn v2+ writes YAML with a `__metadata:` block and `@npm:` protocol descriptors.
fn is_yarn_modern(contents: &str) -> bool {
    if contents.contains("# yarn lockfile v1") {
        return false;
    }
    contents.contains("__metadata:")
}

/// Rewrites a v1 lockfile into the layout `yarn_lock_parser` expects: the
/// canonical two-line header, then entries separated by exactly one blank line.
///
/// Returns `None` when the file holds no entries at all.
fn normalize_v1(contents: &str) -> Option<String> {
    let mut body = String::with_capacity(contents.len());
    let mut previous_blank = true;

    for line in contents.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            if !previous_blank {
                body.push('\n');
            }
            previous_blank = true;
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        body.push_str(line);
        body.push('\n');
        previous_blank = false;
    }

    if body.trim().is_empty() {
        return None;
    }
    if !previous_blank {
        body.push('\n');
    }
    Some(format!("{V1_HEADER}{body}"))
}

fn build_graph(entries: &[yarn_lock_parser::Entry<'_>]) -> LockGraph {
    let mut graph = LockGraph::new();

    for entry in entries {
        let dependencies: DependencyMap = entry
            .dependencies
            .iter()
            .chain(&entry.optional_dependencies)
            .map(|(name, range)| ((*name).to_string(), (*range).to_string()))
            .collect();
        let lock_entry = LockEntry::new(entry.version).with_dependencies(dependencies);

        for (name, range) in &entry.descriptors {
            graph.insert(resolution_key(name, range), lock_entry.clone());
        }
    }

    graph
}

fn parse_error(path: &Path, message: String) -> Error {
    Error::LockfileParseFailed {
        path: path.to_path_buf(),
        message,
    }
}
