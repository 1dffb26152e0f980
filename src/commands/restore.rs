/// `scriptpack restore` command implementation
///
/// Scans a script, writes its manifest and restores it.
use anyhow::{Context, Result};

use super::{script_location, Session};
use crate::cli::RestoreArgs;
use crate::cli_utils::scriptpack_prefix;

pub async fn run(args: RestoreArgs) -> Result<()> {
    let (script, script_dir) = script_location(&args.script)?;
    let session = Session::load(&args.common)?;
    let pipeline = session.pipeline();
    let target = session.target.clone();

    let project = tokio::task::spawn_blocking(move || {
        pipeline.restore_scripts(&script_dir, &[script], &target)
    })
    .await
    .context("Restore task panicked")??;

    println!(
        "{} Restored {} package(s) and {} framework(s) for {}",
        scriptpack_prefix(),
        project.result.packages.len(),
        project.result.frameworks.len(),
        args.script.display()
    );
    println!("  Manifest:   {}", project.manifest_file.path.display());
    println!(
        "  Resolution: {}",
        project.manifest_file.resolution_path().display()
    );
    if !project.manifest.is_pinned() {
        println!("  Floating versions present; restore cache not used");
    }

    Ok(())
}
