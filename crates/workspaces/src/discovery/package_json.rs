//! Discovery for npm/Yarn workspaces declared in `package.json`.

use crate::core::traits::WorkspaceDiscovery;
use crate::discovery::read_json_file;
use crate::error::Result;
use serde::Deserialize;
use std::path::Path;

/// Discovers workspaces configured in `package.json`.
///
/// This handles the `workspaces` field in `package.json`, which is supported by
/// npm and Yarn. It supports both the array format and the object format
/// (with `packages` key).
#[derive(Debug, Default, Clone, Copy)]
pub struct PackageJsonDiscovery;

impl WorkspaceDiscovery for PackageJsonDiscovery {
    fn config_file_name(&self) -> &'static str {
        "package.json"
    }

    fn member_patterns(&self, root: &Path) -> Result<Option<Vec<String>>> {
        let package_json_path = root.join(self.config_file_name());
        if !package_json_path.is_file() {
            return Ok(None);
        }

        let package_json: PackageJson = read_json_file(&package_json_path)?;
        Ok(package_json.workspaces.map(|field| match field {
            WorkspacesField::Array(patterns) => patterns,
            WorkspacesField::Object { packages } => packages,
        }))
    }
}

#[derive(Deserialize)]
struct PackageJson {
    workspaces: Option<WorkspacesField>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WorkspacesField {
    Array(Vec<String>),
    Object {
        #[serde(default)]
        packages: Vec<String>,
    },
}
