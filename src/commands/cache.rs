/// `scriptpack cache` command implementation
///
/// Inspects and removes per-script restore projects.
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;
use walkdir::WalkDir;

use super::{script_location, Session};
use crate::cli::{CacheArgs, CacheCommands};
use crate::cli_utils::scriptpack_prefix;
use scriptpack::logging::{operations, status};

pub async fn run(args: CacheArgs) -> Result<()> {
    let session = Session::load(&args.common)?;

    match &args.command {
        CacheCommands::Path { script } => path(&session, script),
        CacheCommands::Clean { script, all } => clean(&session, script.as_deref(), *all),
    }
}

/// Print the project directory of a script
fn path(session: &Session, script: &Path) -> Result<()> {
    let (_, script_dir) = script_location(script)?;
    let project = session
        .store
        .project_dir(&script_dir, &session.target, scriptpack::restore::SCRIPT_VARIANT);

    println!("{}", project.display());
    Ok(())
}

fn clean(session: &Session, script: Option<&Path>, all: bool) -> Result<()> {
    let dir = if all {
        session.store.root().join("projects")
    } else {
        let Some(script) = script else {
            anyhow::bail!("Specify --all to clean all projects, or provide a script path");
        };
        let (_, script_dir) = script_location(script)?;
        session.store.script_root(&script_dir)
    };

    if !dir.exists() {
        println!("{} Nothing to clean.", scriptpack_prefix());
        return Ok(());
    }

    let size = directory_size(&dir);
    fs::remove_dir_all(&dir)
        .with_context(|| format!("Failed to remove {}", dir.display()))?;

    info!(
        operation = operations::CACHE_CLEAN,
        status = status::SUCCESS,
        dir = %dir.display(),
        size_bytes = size,
        "restore projects removed"
    );
    println!(
        "{} Removed {} ({:.2} MB)",
        scriptpack_prefix(),
        dir.display(),
        size as f64 / 1_000_000.0
    );
    Ok(())
}

fn directory_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}
