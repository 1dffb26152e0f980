use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// scriptpack - dependency restore and resolution for single-file scripts
///
/// Scans `#r`/`#load` directives, restores the referenced packages through an external
/// restore tool and reports the assemblies a compiler or runtime host needs.
#[derive(Parser, Debug)]
#[command(name = "scriptpack")]
#[command(author = "Tuist Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dependency restore and resolution for single-file scripts", long_about = None)]
pub struct Cli {
    /// Log level when RUST_LOG is unset (trace|debug|info|warn|error)
    #[arg(long, global = true, env = "SCRIPTPACK_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Configuration arguments shared across commands
#[derive(Parser, Debug, Clone, Default)]
pub struct CommonConfigArgs {
    /// Config file path
    #[arg(short = 'c', long, env = "SCRIPTPACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root of restore project directories
    #[arg(long, env = "SCRIPTPACK_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Target platform identifier (e.g. "net8.0")
    #[arg(long, env = "SCRIPTPACK_TARGET")]
    pub target: Option<String>,

    /// Restore tool executable
    #[arg(long, env = "SCRIPTPACK_RESTORE_COMMAND")]
    pub restore_command: Option<String>,

    /// Registry source(s), comma-separated; overrides configured sources
    #[arg(long = "source", env = "SCRIPTPACK_SOURCES", value_delimiter = ',')]
    pub sources: Vec<String>,

    /// Always run the restore tool, ignoring the restore cache
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a script and restore its packages
    Restore(RestoreArgs),

    /// Print the dependencies of a script
    Deps(DepsArgs),

    /// Resolve a single `#r` reference as the compiler would
    Resolve(ResolveArgs),

    /// Inspect or clean restore projects
    Cache(CacheArgs),
}

#[derive(Parser, Debug)]
pub struct RestoreArgs {
    /// Script file
    pub script: PathBuf,

    #[command(flatten)]
    pub common: CommonConfigArgs,
}

#[derive(Parser, Debug)]
pub struct DepsArgs {
    /// Script file
    pub script: PathBuf,

    /// Runtime dependencies for this machine instead of compile-time dependencies
    #[arg(long)]
    pub runtime: bool,

    /// Only packages and frameworks referenced directly by the script
    #[arg(long, conflicts_with = "runtime")]
    pub direct: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub common: CommonConfigArgs,
}

#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Reference text, e.g. "package:Newtonsoft.Json,13.0.3" or "lib/Helpers.dll"
    pub reference: String,

    /// File containing the directive
    #[arg(long)]
    pub from: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub common: CommonConfigArgs,
}

#[derive(Parser, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,

    #[command(flatten)]
    pub common: CommonConfigArgs,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Print the restore project directory of a script
    Path {
        /// Script file
        script: PathBuf,
    },

    /// Remove restore projects
    Clean {
        /// Script file (omit with --all)
        script: Option<PathBuf>,

        /// Remove the projects of every script
        #[arg(long, conflicts_with = "script")]
        all: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sources_split_on_commas() {
        let cli = Cli::try_parse_from([
            "scriptpack",
            "restore",
            "main.csx",
            "--source",
            "https://a.example/index.json,https://b.example/index.json",
        ])
        .unwrap();

        let Commands::Restore(args) = cli.command else {
            panic!("expected restore");
        };
        assert_eq!(args.common.sources.len(), 2);
    }
}
