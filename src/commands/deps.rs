/// `scriptpack deps` command implementation
///
/// Prints compile-time or runtime dependencies of a script.
use anyhow::{Context, Result};

use super::{script_location, Session};
use crate::cli::DepsArgs;
use scriptpack::resolution::{
    CompilationDependency, CompilationDependencyResolver, RuntimeDependency,
    RuntimeDependencyResolver,
};

pub async fn run(args: DepsArgs) -> Result<()> {
    let (script, script_dir) = script_location(&args.script)?;
    let session = Session::load(&args.common)?;
    let pipeline = session.pipeline();
    let target = session.target.clone();

    if args.runtime {
        let deps = tokio::task::spawn_blocking(move || {
            RuntimeDependencyResolver::new(pipeline).get_dependencies(
                &script_dir,
                &[script],
                &target,
            )
        })
        .await
        .context("Resolve task panicked")??;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&deps)?);
        } else {
            print_runtime(&deps);
        }
    } else {
        let include_transitive = !args.direct;
        let deps = tokio::task::spawn_blocking(move || {
            CompilationDependencyResolver::new(pipeline).get_dependencies(
                &script_dir,
                &[script],
                include_transitive,
                &target,
            )
        })
        .await
        .context("Resolve task panicked")??;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&deps)?);
        } else {
            print_compilation(&deps);
        }
    }

    Ok(())
}

fn print_compilation(deps: &[CompilationDependency]) {
    if deps.is_empty() {
        println!("No dependencies.");
        return;
    }

    for dep in deps {
        println!("{} {}", dep.name, dep.version);
        for path in &dep.assembly_paths {
            println!("  ref      {}", path.display());
        }
        for path in &dep.analyzer_paths {
            println!("  analyzer {}", path.display());
        }
        for path in &dep.native_paths {
            println!("  native   {}", path.display());
        }
        for path in &dep.script_paths {
            println!("  script   {}", path.display());
        }
    }
}

fn print_runtime(deps: &[RuntimeDependency]) {
    if deps.is_empty() {
        println!("No dependencies.");
        return;
    }

    for dep in deps {
        println!("{} {}", dep.name, dep.version);
        for assembly in &dep.assemblies {
            println!("  lib      {}", assembly.path.display());
        }
        for path in &dep.native_assets {
            println!("  native   {}", path.display());
        }
        for path in &dep.script_paths {
            println!("  script   {}", path.display());
        }
    }
}
