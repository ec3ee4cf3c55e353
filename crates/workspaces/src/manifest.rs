//! Reading the dependency declarations of one package.

use crate::core::types::DependencyMap;
use crate::discovery::read_json_file;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File name of a package manifest.
pub const MANIFEST_FILE_NAME: &str = "package.json";

/// The parts of `package.json` that influence a package's cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    /// Package name; falls back to the directory name when absent.
    #[serde(default)]
    pub name: String,

    /// Runtime dependencies.
    #[serde(default)]
    pub dependencies: DependencyMap,

    /// Development dependencies, installed for builds as well.
    #[serde(default)]
    pub dev_dependencies: DependencyMap,
}

impl PackageManifest {
    /// Reads `package.json` from `package_root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ManifestNotFound`] when the file is missing, or a
    /// [`Error::Json`] error naming the path when it is malformed.
    pub fn read(package_root: &Path) -> Result<Self> {
        let manifest_path = Self::path_in(package_root);
        if !manifest_path.is_file() {
            return Err(Error::ManifestNotFound {
                path: manifest_path,
            });
        }

        let mut manifest: Self = read_json_file(&manifest_path)?;
        if manifest.name.is_empty() {
            manifest.name = package_root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        Ok(manifest)
    }

    /// Location of the manifest inside `package_root`.
    #[must_use]
    pub fn path_in(package_root: &Path) -> PathBuf {
        package_root.join(MANIFEST_FILE_NAME)
    }

    /// Runtime and development dependencies merged; dev entries win on conflicts.
    #[must_use]
    pub fn all_dependencies(&self) -> DependencyMap {
        let mut all = self.dependencies.clone();
        all.extend(
            self.dev_dependencies
                .iter()
                .map(|(name, range)| (name.clone(), range.clone())),
        );
        all
    }
}
