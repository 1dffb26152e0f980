/// `scriptpack resolve` command implementation
///
/// Resolves one `#r` reference the way a compiler host would.
use anyhow::{Context, Result};

use super::Session;
use crate::cli::ResolveArgs;
use scriptpack::reference::{AssemblyReference, ReferenceDirectiveResolver};
use scriptpack::resolution::CompilationDependencyResolver;

pub async fn run(args: ResolveArgs) -> Result<()> {
    let base_file = if args.from.exists() {
        args.from
            .canonicalize()
            .with_context(|| format!("Failed to resolve path: {}", args.from.display()))?
    } else {
        // Interactive input has no backing file; resolve relative to the current directory
        std::env::current_dir()?.join(&args.from)
    };

    let session = Session::load(&args.common)?;
    let resolver = ReferenceDirectiveResolver::new(
        CompilationDependencyResolver::new(session.pipeline()),
        session.target.clone(),
    );
    let reference = args.reference.clone();

    let references = tokio::task::spawn_blocking(move || resolver.resolve(&reference, &base_file))
        .await
        .context("Resolve task panicked")??;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&references)?);
        return Ok(());
    }

    for reference in &references {
        match reference {
            AssemblyReference::File(path) => println!("{}", path.display()),
            AssemblyReference::Name(name) => println!("{}", name),
        }
    }

    Ok(())
}
