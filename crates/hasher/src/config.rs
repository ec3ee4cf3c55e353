//! Hasher options and their resolution from flags, environment and `pkgkey.toml`.

use crate::files::FilePatterns;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Name of the optional per-package configuration file.
pub const CONFIG_FILE_NAME: &str = "pkgkey.toml";

/// Environment variable overriding output folders (comma separated).
pub const ENV_OUTPUT_FOLDERS: &str = "PKGKEY_OUTPUT_FOLDERS";

/// Environment variable overriding [`InternalHashOrder`].
pub const ENV_INTERNAL_HASH_ORDER: &str = "PKGKEY_INTERNAL_HASH_ORDER";

/// How internal package hashes are ordered before being folded together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InternalHashOrder {
    /// Sort hash values first; the key is independent of traversal order.
    #[default]
    Sorted,
    /// Fold in traversal completion order.
    Completion,
}

impl FromStr for InternalHashOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sorted" => Ok(Self::Sorted),
            "completion" => Ok(Self::Completion),
            other => Err(Error::configuration(format!(
                "Unknown internal hash order '{other}'; expected 'sorted' or 'completion'"
            ))),
        }
    }
}

impl fmt::Display for InternalHashOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sorted => "sorted",
            Self::Completion => "completion",
        })
    }
}

/// Everything a [`Hasher`](crate::Hasher) needs besides the build command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HasherOptions {
    /// Package the hasher was created for; also the root of output hashing.
    pub package_root: PathBuf,
    /// Build output directories, relative to each package root.
    pub output_folders: Vec<String>,
    /// Source globs to hash.
    pub include: Vec<String>,
    /// Source globs to leave out (without a leading `!`).
    pub exclude: Vec<String>,
    /// Fold order of internal package hashes.
    pub internal_hash_order: InternalHashOrder,
}

impl HasherOptions {
    /// Options with the default patterns for `package_root`.
    #[must_use]
    pub fn new(package_root: impl Into<PathBuf>) -> Self {
        Self {
            package_root: package_root.into(),
            output_folders: default_output_folders(),
            include: default_include(),
            exclude: default_exclude(),
            internal_hash_order: InternalHashOrder::default(),
        }
    }

    /// Replaces the output folders.
    #[must_use]
    pub fn with_output_folders<I, S>(mut self, folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_folders = folders.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the internal hash fold order.
    #[must_use]
    pub fn with_internal_hash_order(mut self, order: InternalHashOrder) -> Self {
        self.internal_hash_order = order;
        self
    }

    /// Patterns selecting a package's source files.
    ///
    /// Includes, then `!`-prefixed excludes, then one `!<folder>/**` per
    /// output folder.
    ///
    /// ```
    /// use pkgkey_hasher::HasherOptions;
    ///
    /// let options = HasherOptions::new("/repo/app").with_output_folders(["dist"]);
    /// assert_eq!(
    ///     options.source_patterns(),
    ///     vec!["**", "!**/node_modules/**", "!**/.git/**", "!dist/**"]
    /// );
    /// ```
    #[must_use]
    pub fn source_patterns(&self) -> Vec<String> {
        self.include
            .iter()
            .cloned()
            .chain(self.exclude.iter().map(|p| format!("!{}", p.trim_start_matches('!'))))
            .chain(self.output_folders.iter().map(|f| format!("!{}/**", trim_folder(f))))
            .collect()
    }

    /// Patterns selecting every file inside the output folders.
    #[must_use]
    pub fn output_patterns(&self) -> Vec<String> {
        self.output_folders
            .iter()
            .map(|f| format!("{}/**", trim_folder(f)))
            .collect()
    }

    /// Checks that every pattern compiles and no output folder is empty.
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if let Some(folder) = self.output_folders.iter().find(|f| trim_folder(f).is_empty()) {
            return Err(Error::configuration(format!(
                "Output folder '{folder}' is empty or the package root itself"
            )));
        }
        FilePatterns::new(&self.source_patterns())?;
        Ok(())
    }
}

fn trim_folder(folder: &str) -> &str {
    folder.trim().trim_start_matches("./").trim_end_matches('/')
}

fn default_output_folders() -> Vec<String> {
    vec!["lib".to_string(), "dist".to_string()]
}

fn default_include() -> Vec<String> {
    vec!["**".to_string()]
}

fn default_exclude() -> Vec<String> {
    vec!["**/node_modules/**".to_string(), "**/.git/**".to_string()]
}

/// Partial configuration: from `pkgkey.toml`, or explicit caller values.
///
/// ```toml
/// output_folders = ["build"]
/// exclude = ["**/*.test.ts"]
/// internal_hash_order = "completion"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HasherConfig {
    /// Output folders.
    pub output_folders: Option<Vec<String>>,
    /// Source include globs.
    pub include: Option<Vec<String>>,
    /// Source exclude globs.
    pub exclude: Option<Vec<String>>,
    /// Internal hash fold order.
    pub internal_hash_order: Option<InternalHashOrder>,
}

impl HasherConfig {
    /// Parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error naming the path, or a configuration error for
    /// invalid TOML or unknown keys.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| Error::io(e, path, "read"))?;
        toml::from_str(&contents).map_err(|e| {
            Error::configuration(format!("Invalid config file {}: {e}", path.display()))
        })
    }

    /// Parses `path` if given, else `pkgkey.toml` in `package_root` if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file is missing or any file is invalid.
    pub fn discover(package_root: &Path, path: Option<&Path>) -> Result<Option<Self>> {
        if let Some(path) = path {
            return Self::load(path).map(Some);
        }
        let default_path = package_root.join(CONFIG_FILE_NAME);
        if default_path.is_file() {
            tracing::debug!(path = %default_path.display(), "Loading hasher config");
            return Self::load(&default_path).map(Some);
        }
        Ok(None)
    }
}

/// Raw inputs to option resolution, gathered up front so resolution is a pure function.
#[derive(Debug, Clone, Default)]
pub struct ConfigInputs {
    /// Values passed explicitly by the caller.
    pub explicit: HasherConfig,
    /// Value of `PKGKEY_OUTPUT_FOLDERS`.
    pub env_output_folders: Option<String>,
    /// Value of `PKGKEY_INTERNAL_HASH_ORDER`.
    pub env_internal_hash_order: Option<String>,
    /// Parsed configuration file, if any.
    pub file: Option<HasherConfig>,
}

impl ConfigInputs {
    /// Reads the environment and the configuration file for `package_root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded.
    pub fn gather(
        package_root: &Path,
        explicit: HasherConfig,
        config_path: Option<&Path>,
    ) -> Result<Self> {
        Ok(Self {
            explicit,
            env_output_folders: non_empty_env(ENV_OUTPUT_FOLDERS),
            env_internal_hash_order: non_empty_env(ENV_INTERNAL_HASH_ORDER),
            file: HasherConfig::discover(package_root, config_path)?,
        })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

/// Resolves options for `package_root` from `inputs`.
///
/// Resolution order per field: explicit value, environment, config file, default.
///
/// # Errors
///
/// Returns a configuration error for an invalid environment value or an
/// options set that fails [`HasherOptions::validate`].
pub fn options_from_inputs(package_root: &Path, inputs: ConfigInputs) -> Result<HasherOptions> {
    let ConfigInputs {
        explicit,
        env_output_folders,
        env_internal_hash_order,
        file,
    } = inputs;
    let file = file.unwrap_or_default();

    let env_folders = env_output_folders.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect::<Vec<_>>()
    });
    let env_order = env_internal_hash_order
        .as_deref()
        .map(InternalHashOrder::from_str)
        .transpose()?;

    let options = HasherOptions {
        package_root: package_root.to_path_buf(),
        output_folders: explicit
            .output_folders
            .or(env_folders)
            .or(file.output_folders)
            .unwrap_or_else(default_output_folders),
        include: explicit
            .include
            .or(file.include)
            .unwrap_or_else(default_include),
        exclude: explicit
            .exclude
            .or(file.exclude)
            .unwrap_or_else(default_exclude),
        internal_hash_order: explicit
            .internal_hash_order
            .or(env_order)
            .or(file.internal_hash_order)
            .unwrap_or_default(),
    };

    options.validate()?;
    Ok(options)
}

/// Resolves options for `package_root` from the process environment and config file.
///
/// # Errors
///
/// See [`ConfigInputs::gather`] and [`options_from_inputs`].
pub fn resolve_options(
    package_root: &Path,
    explicit: HasherConfig,
    config_path: Option<&Path>,
) -> Result<HasherOptions> {
    let inputs = ConfigInputs::gather(package_root, explicit, config_path)?;
    options_from_inputs(package_root, inputs)
}
