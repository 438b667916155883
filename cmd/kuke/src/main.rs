//! `kuke`: command-line client for the Kukeon container orchestrator
//! (`SPEC_FULL.md` §4.12). Parses a manifest, wires the reference
//! [`kukeon_runtime::LocalRunner`], and drives one of the five
//! orchestrator entry points in `kukeon-core`.

mod cli;
mod render;
mod telemetry;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::error;

use cli::{Args, Command, ResourceKind};
use kukeon_core::{
    apply, delete_cell, delete_container, delete_realm, delete_space, delete_stack, document::RawDocument,
    purge_cell, purge_realm, purge_space, purge_stack, refresh, refresh_succeeded, Document, Runner,
};
use kukeon_runtime::{LocalRunner, MetadataStore};
use render::render_apply;

fn default_store_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg).join("kukeon")
    } else {
        PathBuf::from(".kukeon")
    }
}

/// Splits a multi-document YAML stream the way `serde_yaml` natively
/// supports, rather than hand-splitting on `---` (`SPEC_FULL.md` §4.10).
fn parse_manifest(text: &str) -> anyhow::Result<Vec<Document>> {
    let mut documents = Vec::new();
    for de in serde_yaml::Deserializer::from_str(text) {
        let raw = RawDocument::deserialize(de)?;
        if raw.kind.is_empty() && raw.api_version.is_empty() {
            continue; // blank/empty document between `---` separators
        }
        documents.push(Document::try_from(raw)?);
    }
    Ok(documents)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = telemetry::init(&args.log_filter, args.log_format) {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "kuke failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let store_dir = args.store_dir.clone().unwrap_or_else(default_store_dir);
    let runner = LocalRunner::new(MetadataStore::new(store_dir));

    match args.command {
        Command::Apply { file } => run_apply(&runner, &file, args.output).await,
        Command::Get { kind, name, realm, space, stack, cell } => {
            run_get(&runner, kind, &name, &realm, &space, &stack, &cell, args.output).await
        }
        Command::Delete { kind, name, realm, space, stack, cell, cascade, force } => {
            run_delete(&runner, kind, &name, &realm, &space, &stack, &cell, force, cascade, args.output).await
        }
        Command::Purge { kind, name, realm, space, stack, cell, cascade, force } => {
            run_purge(&runner, kind, &name, &realm, &space, &stack, &cell, force, cascade, args.output).await
        }
        Command::Refresh => run_refresh(&runner, args.output).await,
    }
}

async fn run_apply(runner: &LocalRunner, file: &PathBuf, output: render::OutputFormat) -> anyhow::Result<ExitCode> {
    let text = std::fs::read_to_string(file)?;
    let documents = parse_manifest(&text)?;
    let result = apply(runner, documents, &CancellationToken::new()).await;
    println!("{}", render_apply(output, &result)?);
    Ok(if result.succeeded() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn run_get(
    runner: &LocalRunner,
    kind: ResourceKind,
    name: &str,
    realm: &str,
    space: &str,
    stack: &str,
    cell: &str,
    output: render::OutputFormat,
) -> anyhow::Result<ExitCode> {
    let text = match kind {
        ResourceKind::Realm => render::render(output, &runner.get_realm(name).await?)?,
        ResourceKind::Space => render::render(output, &runner.get_space(realm, name).await?)?,
        ResourceKind::Stack => render::render(output, &runner.get_stack(realm, space, name).await?)?,
        ResourceKind::Cell => render::render(output, &runner.get_cell(realm, space, stack, name).await?)?,
        ResourceKind::Container => {
            let parent = runner.get_cell(realm, space, stack, cell).await?;
            let container = parent
                .spec
                .containers
                .iter()
                .find(|c| c.id == name)
                .ok_or_else(|| anyhow::anyhow!("container {name:?} not found in cell {cell:?}"))?;
            render::render(output, container)?
        }
    };
    println!("{text}");
    Ok(ExitCode::SUCCESS)
}

#[allow(clippy::too_many_arguments)]
async fn run_delete(
    runner: &LocalRunner,
    kind: ResourceKind,
    name: &str,
    realm: &str,
    space: &str,
    stack: &str,
    cell: &str,
    force: bool,
    cascade: bool,
    output: render::OutputFormat,
) -> anyhow::Result<ExitCode> {
    let result = match kind {
        ResourceKind::Realm => delete_realm(runner, name, force, cascade).await?,
        ResourceKind::Space => delete_space(runner, realm, name, force, cascade).await?,
        ResourceKind::Stack => delete_stack(runner, realm, space, name, force, cascade).await?,
        ResourceKind::Cell => delete_cell(runner, realm, space, stack, name, force, cascade).await?,
        ResourceKind::Container => delete_container(runner, realm, space, stack, cell, name, force).await?,
    };
    println!("{}", render::render(output, &result)?);
    Ok(ExitCode::SUCCESS)
}

#[allow(clippy::too_many_arguments)]
async fn run_purge(
    runner: &LocalRunner,
    kind: ResourceKind,
    name: &str,
    realm: &str,
    space: &str,
    stack: &str,
    cell: &str,
    force: bool,
    cascade: bool,
    output: render::OutputFormat,
) -> anyhow::Result<ExitCode> {
    let result = match kind {
        ResourceKind::Realm => purge_realm(runner, name, force, cascade).await?,
        ResourceKind::Space => purge_space(runner, realm, name, force, cascade).await?,
        ResourceKind::Stack => purge_stack(runner, realm, space, name, force, cascade).await?,
        ResourceKind::Cell => purge_cell(runner, realm, space, stack, name, force, cascade).await?,
        ResourceKind::Container => {
            // Containers have no out-of-band remnants of their own to sweep;
            // purge degrades to a plain delete (`cell` holds the parent name).
            let deleted = delete_container(runner, realm, space, stack, cell, name, force).await?;
            kukeon_core::PurgeResult { deleted: deleted.deleted, purged: Vec::new() }
        }
    };
    println!("{}", render::render(output, &result)?);
    Ok(ExitCode::SUCCESS)
}

async fn run_refresh(runner: &LocalRunner, output: render::OutputFormat) -> anyhow::Result<ExitCode> {
    let result = refresh(runner).await;
    println!("{}", render::render(output, &result)?);
    Ok(if refresh_succeeded(&result).is_ok() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
