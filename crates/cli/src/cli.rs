use crate::tracing::LogLevel;
use clap::{Parser, Subcommand, ValueEnum};
use pkgkey_hasher::InternalHashOrder;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pkgkey")]
#[command(about = "Deterministic cache keys for packages of a JavaScript monorepo")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 'l',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    #[arg(long, global = true, help = "Output results and logs in JSON format")]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Print the cache key of one or more packages")]
    Hash {
        #[arg(
            help = "Package directories; several paths hash in batch mode, each with its own pkgkey.toml",
            value_name = "PATHS"
        )]
        paths: Vec<PathBuf>,

        #[arg(
            long,
            short = 'c',
            help = "Build command signature folded into the key",
            default_value = ""
        )]
        command: String,

        #[arg(long, help = "Path to a pkgkey.toml configuration file")]
        config: Option<PathBuf>,

        #[arg(
            long,
            help = "Repository root for batch mode (defaults to the lockfile directory)"
        )]
        repo_root: Option<PathBuf>,

        #[arg(
            long = "output-folder",
            short = 'o',
            help = "Output folder to leave out of the key (repeatable)"
        )]
        output_folders: Vec<String>,

        #[arg(long, help = "Fold order of internal package hashes", value_enum)]
        internal_hash_order: Option<HashOrder>,
    },
    #[command(about = "Print the digest of a package's output folders")]
    OutputHash {
        #[arg(help = "Package directory", default_value = ".")]
        path: PathBuf,

        #[arg(long, help = "Path to a pkgkey.toml configuration file")]
        config: Option<PathBuf>,

        #[arg(
            long = "output-folder",
            short = 'o',
            help = "Output folder to hash (repeatable)"
        )]
        output_folders: Vec<String>,
    },
}

/// Order in which internal package hashes are folded into the key.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashOrder {
    /// Sort package hashes first; the key ignores traversal order
    Sorted,
    /// Fold in the order packages complete
    Completion,
}

impl From<HashOrder> for InternalHashOrder {
    fn from(order: HashOrder) -> Self {
        match order {
            HashOrder::Sorted => Self::Sorted,
            HashOrder::Completion => Self::Completion,
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
