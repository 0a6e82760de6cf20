//! Command line interface definition

use clap::{Parser, Subcommand};
use hpcstack_types::ColorChoice;
use std::path::PathBuf;

/// hpcstack - dependency resolution and toolchain mapping for easyconfigs
#[derive(Parser)]
#[command(name = "hpcstack")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dependency resolution and toolchain mapping for easyconfig-based software stacks")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Easyconfig search path, replaces the configured one (repeatable)
    #[arg(long = "robot-path", global = true, value_name = "PATH")]
    pub robot_paths: Vec<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Print the build order of easyconfigs and their missing dependencies
    #[command(alias = "order")]
    Resolve {
        /// Easyconfig files or file names on the robot path
        #[arg(required = true)]
        easyconfigs: Vec<String>,

        /// Leave out requested easyconfigs whose module is already installed
        #[arg(long)]
        skip_available: bool,
    },

    /// Show which easyconfigs would be built
    #[command(alias = "dry")]
    DryRun {
        /// Easyconfig files or file names on the robot path
        #[arg(required = true)]
        easyconfigs: Vec<String>,

        /// Abbreviate the common path prefix as $CFGS
        #[arg(long)]
        short: bool,

        /// Mark requested easyconfigs as forced rebuilds
        #[arg(long)]
        force: bool,

        /// Mark requested easyconfigs as rebuilds
        #[arg(long)]
        rebuild: bool,
    },

    /// Write the dependency graph of easyconfigs as a DOT file
    DepGraph {
        /// Easyconfig files or file names on the robot path
        #[arg(required = true)]
        easyconfigs: Vec<String>,

        /// Output file
        #[arg(short, long, default_value = "dep-graph.dot")]
        output: PathBuf,
    },

    /// Check dependency graphs for version conflicts
    CheckConflicts {
        /// Easyconfig files or file names on the robot path
        #[arg(required = true)]
        easyconfigs: Vec<String>,
    },

    /// Show the hierarchy of a toolchain
    Hierarchy {
        /// Toolchain as NAME/VERSION
        toolchain: String,

        /// Include the capabilities of every level
        #[arg(long)]
        capabilities: bool,
    },

    /// Map the hierarchy of one toolchain onto another
    MapToolchain {
        /// Source toolchain as NAME/VERSION
        source: String,

        /// Target toolchain as NAME/VERSION
        target: String,
    },

    /// Search easyconfig file names on the robot path
    #[command(alias = "find")]
    Search {
        /// Regular expression matched against file names
        query: String,
    },

    /// Pick a version among the easyconfigs built with a toolchain
    PickVersion {
        /// Software name
        name: String,

        /// Toolchain as NAME/VERSION
        #[arg(long, default_value = "system")]
        toolchain: String,

        /// Most recent acceptable version
        #[arg(long, value_name = "VERSION")]
        required: Option<String>,
    },

    /// Rewrite easyconfigs and their dependencies for another toolchain
    Tweak {
        /// Easyconfig files or file names on the robot path
        #[arg(required = true)]
        easyconfigs: Vec<String>,

        /// Target toolchain as NAME/VERSION
        #[arg(long)]
        toolchain: String,

        /// Directory the rewritten easyconfigs are written to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Select an easyconfig for a software, generating one from the closest
    /// match when none fits exactly
    Obtain {
        /// Software name
        name: String,

        /// Software version
        #[arg(long)]
        version: Option<String>,

        /// Toolchain as NAME or NAME/VERSION
        #[arg(long)]
        toolchain: Option<String>,

        /// Versionsuffix
        #[arg(long, allow_hyphen_values = true)]
        versionsuffix: Option<String>,

        /// Directory a generated easyconfig is written to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

impl Commands {
    /// Operation name used in events and logs
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Resolve { .. } => "resolve",
            Commands::DryRun { .. } => "dry-run",
            Commands::CheckConflicts { .. } => "check-conflicts",
            Commands::Hierarchy { .. } => "hierarchy",
            Commands::MapToolchain { .. } => "map-toolchain",
            Commands::Search { .. } => "search",
            Commands::PickVersion { .. } => "pick-version",
            Commands::Tweak { .. } => "tweak",
            Commands::Obtain { .. } => "obtain",
            Commands::DepGraph { .. } => "dep-graph",
        }
    }
}
