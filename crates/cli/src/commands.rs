//! Subcommand execution.

use crate::cli::Commands;
use miette::IntoDiagnostic;
use pkgkey_hasher::{Hasher, HasherConfig, PackageHash, resolve_options};
use pkgkey_workspaces::find_lockfile;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Runs `command`, writing results to stdout.
pub fn execute(command: Commands, json: bool) -> miette::Result<()> {
    match command {
        Commands::Hash {
            paths,
            command,
            config,
            repo_root,
            output_folders,
            internal_hash_order,
        } => {
            let explicit = HasherConfig {
                output_folders: (!output_folders.is_empty()).then_some(output_folders),
                internal_hash_order: internal_hash_order.map(Into::into),
                ..HasherConfig::default()
            };
            let results = execute_hash(
                &paths,
                &command,
                explicit,
                config.as_deref(),
                repo_root.as_deref(),
            )?;
            if json {
                write_json(&results)
            } else {
                write_lines(results.iter().map(|result| result.hash.as_str()))
            }
        }
        Commands::OutputHash {
            path,
            config,
            output_folders,
        } => {
            let explicit = HasherConfig {
                output_folders: (!output_folders.is_empty()).then_some(output_folders),
                ..HasherConfig::default()
            };
            let options = resolve_options(&path, explicit, config.as_deref())?;
            let digest = Hasher::new(options, "").hash_of_output()?;
            if json {
                write_json(&OutputDigest { hash: &digest })
            } else {
                write_lines([digest.as_str()])
            }
        }
    }
}

/// Cache keys for `paths`, in order. No path means the package containing cwd.
fn execute_hash(
    paths: &[PathBuf],
    command: &str,
    explicit: HasherConfig,
    config: Option<&Path>,
    repo_root: Option<&Path>,
) -> miette::Result<Vec<PackageHash>> {
    let cwd = std::env::current_dir().into_diagnostic()?;
    let package_root = paths.first().cloned().unwrap_or(cwd);

    if paths.len() <= 1 {
        let options = resolve_options(&package_root, explicit, config)?;
        let hasher = Hasher::new(options, command);
        let _span = tracing::info_span!("command", command = "hash").entered();
        return Ok(vec![hasher.create_package_hash(None, None, None)?]);
    }

    // Each target reads its own pkgkey.toml
    let targets = paths
        .iter()
        .map(|path| {
            resolve_options(path, explicit.clone(), config).map(|options| (path.clone(), options))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let hasher = Hasher::new(targets[0].1.clone(), command);

    let repo_root = match repo_root {
        Some(root) => root.to_path_buf(),
        None => {
            let lockfile = find_lockfile(&package_root)?;
            lockfile
                .parent()
                .map_or_else(|| package_root.clone(), Path::to_path_buf)
        }
    };
    let _span = tracing::info_span!("command", command = "hash", batch = paths.len()).entered();
    Ok(hasher.hash_targets(&targets, &repo_root)?)
}

#[derive(Serialize)]
struct OutputDigest<'a> {
    hash: &'a str,
}

fn write_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> miette::Result<()> {
    let mut stdout = std::io::stdout().lock();
    for line in lines {
        writeln!(stdout, "{line}").into_diagnostic()?;
    }
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(value: &T) -> miette::Result<()> {
    let rendered = serde_json::to_string_pretty(value).into_diagnostic()?;
    write_lines([rendered.as_str()])
}
