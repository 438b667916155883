//! Argument surface (`SPEC_FULL.md` §4.12 / §6 "Config surface consumed by
//! the core: none directly — external flags/env inject ancestor names and
//! the cascade/force booleans").

use std::path::PathBuf;

use clap::{crate_authors, crate_description, crate_version, Parser, Subcommand, ValueEnum};

use crate::render::OutputFormat;
use crate::telemetry::LogFormat;

#[derive(Parser, Debug)]
#[command(
    name = "kuke",
    about = crate_description!(),
    version = crate_version!(),
    author = crate_authors!("\n"),
)]
pub struct Args {
    /// Root directory for the on-disk metadata store.
    #[arg(long, env = "KUKE_STORE_DIR")]
    pub store_dir: Option<PathBuf>,

    /// `tracing_subscriber::EnvFilter` directive, e.g. "info,kukeon_core=debug".
    #[arg(long, default_value = "info", env = "KUKE_LOG_FILTER")]
    pub log_filter: String,

    /// Log line format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "KUKE_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Result rendering format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, env = "KUKE_OUTPUT")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply a declarative multi-document manifest.
    Apply {
        /// Path to a YAML file containing one or more `---`-separated documents.
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Fetch and print a single resource.
    Get {
        #[arg(value_enum)]
        kind: ResourceKind,
        name: String,
        #[arg(long, default_value = "")]
        realm: String,
        #[arg(long, default_value = "")]
        space: String,
        #[arg(long, default_value = "")]
        stack: String,
        #[arg(long, default_value = "")]
        cell: String,
    },
    /// Delete a resource, optionally cascading to its children.
    Delete {
        #[arg(value_enum)]
        kind: ResourceKind,
        name: String,
        #[arg(long, default_value = "")]
        realm: String,
        #[arg(long, default_value = "")]
        space: String,
        #[arg(long, default_value = "")]
        stack: String,
        #[arg(long, default_value = "")]
        cell: String,
        /// Recursively delete children instead of failing when any exist.
        #[arg(long)]
        cascade: bool,
        /// Delete even when children exist and `--cascade` was not given.
        #[arg(long)]
        force: bool,
    },
    /// Like delete, but also best-effort sweeps remnants and succeeds even
    /// if the typed resource's metadata is already gone.
    Purge {
        #[arg(value_enum)]
        kind: ResourceKind,
        name: String,
        #[arg(long, default_value = "")]
        realm: String,
        #[arg(long, default_value = "")]
        space: String,
        #[arg(long, default_value = "")]
        stack: String,
        #[arg(long, default_value = "")]
        cell: String,
        #[arg(long)]
        cascade: bool,
        #[arg(long)]
        force: bool,
    },
    /// Re-observe every resource and report what was found.
    Refresh,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Realm,
    Space,
    Stack,
    Cell,
    Container,
}
