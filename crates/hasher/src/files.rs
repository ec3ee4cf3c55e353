//! Content hashing of the files selected by glob patterns.

use crate::hash::hash_strings;
use crate::{Error, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Include and exclude globs compiled from a `["**", "!dist/**"]` style list.
#[derive(Debug, Clone)]
pub struct FilePatterns {
    include: GlobSet,
    exclude: GlobSet,
    /// Directories whose whole subtree is excluded (`dir/**` exclusions).
    prune: GlobSet,
    /// Literal leading directories of each inclusion.
    roots: Vec<IncludeRoot>,
}

/// `src/lib/**/*.ts` splits into the literal `["src", "lib"]` and an open tail.
#[derive(Debug, Clone, PartialEq, Eq)]
struct IncludeRoot {
    literal: Vec<String>,
    open: bool,
}

impl IncludeRoot {
    fn new(pattern: &str) -> Self {
        let mut literal = Vec::new();
        let mut parts = pattern.split('/').filter(|part| !part.is_empty());
        let open = loop {
            match parts.next() {
                None => break false,
                Some(part) if part.contains(['*', '?', '[', '{', '\\']) => break true,
                Some(part) => literal.push(part.to_string()),
            }
        };
        Self { literal, open }
    }

    fn may_contain(&self, dir: &[String]) -> bool {
        let on_path = dir.iter().zip(&self.literal).all(|(a, b)| a == b);
        on_path && (dir.len() < self.literal.len() || self.open)
    }
}

impl FilePatterns {
    /// Compiles `patterns`; a leading `!` marks an exclusion.
    ///
    /// `*` never crosses a `/`; `**` matches any number of directories.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first invalid glob.
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut include = GlobSetBuilder::new();
        let mut exclude = GlobSetBuilder::new();
        let mut prune = GlobSetBuilder::new();
        let mut roots = Vec::new();

        for pattern in patterns {
            let pattern = pattern.trim();
            if pattern.is_empty() {
                continue;
            }

            if let Some(negated) = pattern.strip_prefix('!') {
                let negated = normalize_pattern(negated);
                exclude.add(compile(negated)?);
                if let Some(dir) = negated.strip_suffix("/**") {
                    prune.add(compile(dir)?);
                }
            } else {
                let pattern = normalize_pattern(pattern);
                include.add(compile(pattern)?);
                roots.push(IncludeRoot::new(pattern));
            }
        }

        Ok(Self {
            include: build(include)?,
            exclude: build(exclude)?,
            prune: build(prune)?,
            roots,
        })
    }

    /// Whether a root-relative file path is selected.
    #[must_use]
    pub fn is_match(&self, rel_path: &Path) -> bool {
        self.include.is_match(rel_path) && !self.exclude.is_match(rel_path)
    }

    /// Whether the walk should skip the root-relative directory `rel_dir`:
    /// it is excluded wholesale, or no inclusion can reach below it.
    fn is_pruned(&self, rel_dir: &Path) -> bool {
        if self.prune.is_match(rel_dir) {
            return true;
        }
        let dir: Vec<String> = rel_dir
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        !self.roots.iter().any(|root| root.may_contain(&dir))
    }
}

fn normalize_pattern(pattern: &str) -> &str {
    pattern.trim_start_matches("./")
}

fn compile(pattern: &str) -> Result<globset::Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| Error::configuration(format!("Invalid glob pattern '{pattern}': {e}")))
}

fn build(builder: GlobSetBuilder) -> Result<GlobSet> {
    builder
        .build()
        .map_err(|e| Error::configuration(format!("Failed to build glob set: {e}")))
}

/// A file selected for hashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedFile {
    /// Root-relative path with `/` separators.
    pub rel_path: String,
    /// Path on disk.
    pub path: PathBuf,
}

/// Lists the files under `root` selected by `patterns`, sorted by relative path.
///
/// Symbolic links are not followed into directories; a link to a file is
/// hashed through its target.
///
/// # Errors
///
/// Returns an error for broken symbolic links and for unreadable directories
/// that could hold a selected file, naming the offending path. Directories no
/// inclusion can reach are never read.
pub fn collect_files(root: &Path, patterns: &FilePatterns) -> Result<Vec<MatchedFile>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let keep = entry
                .path()
                .strip_prefix(root)
                .map_or(true, |rel| !patterns.is_pruned(rel));
            if !keep {
                tracing::trace!(path = %entry.path().display(), "Skipping directory outside the patterns");
            }
            keep
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
            Error::io(e.into(), path, "walk")
        })?;

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }

        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        if !patterns.is_match(rel) {
            continue;
        }

        if file_type.is_symlink() {
            let target = fs::metadata(entry.path())
                .map_err(|e| Error::io(e, entry.path(), "resolve symlink"))?;
            if target.is_dir() {
                tracing::trace!(path = %entry.path().display(), "Skipping symlinked directory");
                continue;
            }
        }

        files.push(MatchedFile {
            rel_path: to_slash(rel),
            path: entry.path().to_path_buf(),
        });
    }

    // Walk order depends on the platform; byte order of the relative path does not
    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(files)
}

fn to_slash(rel: &Path) -> String {
    rel.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// SHA-256 of one file's content.
///
/// # Errors
///
/// Returns an I/O error naming `path` when it cannot be opened or read.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path).map_err(|e| Error::io(e, path, "open"))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 1024 * 64];
    let mut total: u64 = 0;
    loop {
        let n = file.read(&mut buf).map_err(|e| Error::io(e, path, "read"))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        total += n as u64;
    }
    tracing::trace!(path = %path.display(), size = total, "Hashed file");
    Ok(hex::encode(hasher.finalize()))
}

/// Digest of every file under `root` selected by `patterns`.
///
/// Files are hashed in parallel and folded in sorted relative-path order, so
/// the result depends only on which files match, their relative paths and
/// their contents. Any unreadable file aborts the whole hash.
///
/// # Example
///
/// ```rust,ignore
/// use pkgkey_hasher::hash_files;
///
/// let digest = hash_files(Path::new("packages/app"), &["**".into(), "!dist/**".into()])?;
/// ```
///
/// # Errors
///
/// Returns a configuration error for invalid patterns and an I/O error naming
/// the first file that could not be read.
pub fn hash_files(root: &Path, patterns: &[String]) -> Result<String> {
    let _span = tracing::debug_span!("hash_files", root = %root.display()).entered();

    let compiled = FilePatterns::new(patterns)?;
    let files = collect_files(root, &compiled)?;

    let entries = files
        .par_iter()
        .map(|file| sha256_file(&file.path).map(|digest| format!("{}\0{digest}", file.rel_path)))
        .collect::<Result<Vec<_>>>()?;

    let digest = hash_strings(&entries);
    tracing::debug!(files = entries.len(), %digest, "Hashed files");
    Ok(digest)
}
