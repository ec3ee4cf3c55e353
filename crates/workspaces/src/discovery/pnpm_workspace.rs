//! Discovery for pnpm workspaces declared in `pnpm-workspace.yaml`.

use crate::core::traits::WorkspaceDiscovery;
use crate::discovery::read_yaml_file;
use crate::error::Result;
use serde::Deserialize;
use std::path::Path;

/// Discovers workspaces configured in `pnpm-workspace.yaml`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PnpmWorkspaceDiscovery;

impl WorkspaceDiscovery for PnpmWorkspaceDiscovery {
    fn config_file_name(&self) -> &'static str {
        "pnpm-workspace.yaml"
    }

    fn member_patterns(&self, root: &Path) -> Result<Option<Vec<String>>> {
        let workspace_yaml_path = root.join(self.config_file_name());
        if !workspace_yaml_path.is_file() {
            return Ok(None);
        }

        // An empty file is a valid declaration with no members
        let config: Option<PnpmWorkspace> = read_yaml_file(&workspace_yaml_path)?;
        Ok(Some(config.map(|c| c.packages).unwrap_or_default()))
    }
}

#[derive(Deserialize)]
struct PnpmWorkspace {
    #[serde(default)]
    packages: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn reads_packages_list() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("pnpm-workspace.yaml"),
            "packages:\n  - 'packages/*'\n  - '!**/test/**'\n",
        )
        .unwrap();

        let patterns = PnpmWorkspaceDiscovery.member_patterns(temp.path()).unwrap();
        assert_eq!(
            patterns,
            Some(vec!["packages/*".to_string(), "!**/test/**".to_string()])
        );
    }

    #[test]
    fn empty_package_list_declares_empty_workspace() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("pnpm-workspace.yaml"), "packages: []\n").unwrap();

        let workspace = PnpmWorkspaceDiscovery.discover(temp.path()).unwrap();
        assert!(workspace.is_empty());
        assert_eq!(workspace.root.as_deref(), Some(temp.path()));
    }

    #[test]
    fn missing_file_is_not_a_declaration() {
        let temp = TempDir::new().unwrap();
        assert_eq!(PnpmWorkspaceDiscovery.member_patterns(temp.path()).unwrap(), None);
    }

    #[test]
    fn discovers_members() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("pnpm-workspace.yaml"), "packages:\n  - libs/*\n").unwrap();
        fs::create_dir_all(root.join("libs/core")).unwrap();
        fs::write(root.join("libs/core/package.json"), r#"{"name": "core"}"#).unwrap();

        let workspace = PnpmWorkspaceDiscovery.discover(root).unwrap();
        assert_eq!(workspace.names().collect::<Vec<_>>(), vec!["core"]);
    }
}
