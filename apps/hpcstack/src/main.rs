//! hpcstack - dependency resolution and toolchain mapping for easyconfigs
//!
//! This is the main CLI application that orchestrates all operations
//! through the ops crate.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands};
use crate::display::OutputRenderer;
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use hpcstack_config::Config;
use hpcstack_errors::OpsError;
use hpcstack_events::{EventReceiver, EventSender};
use hpcstack_ops::{
    parse_toolchain, run_operation, DryRunOptions, EasyconfigRequest, OperationResult,
    OpsContextBuilder, OpsCtx,
};
use hpcstack_types::{ColorChoice, OutputFormat};
use std::process;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments first to check for JSON mode
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("Application error: {}", e);
            if !json_mode {
                eprintln!("Error: {e}");
            }
            process::exit(1);
        }
    }
}

/// Main application logic; returns whether the result counts as success
async fn run(cli: Cli) -> Result<bool, CliError> {
    info!("Starting hpcstack v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration with proper precedence:
    // 1. Start with file config (or defaults)
    let mut config = Config::load_or_default(cli.global.config.as_deref())
        .await
        .map_err(CliError::Config)?;

    // 2. Merge environment variables
    config.merge_env().map_err(CliError::Config)?;

    // 3. Apply CLI flags (highest precedence)
    apply_cli_config(&mut config, &cli.global);
    if let Commands::Resolve {
        skip_available: true,
        ..
    } = &cli.command
    {
        config.resolve.skip_available = true;
    }

    let json_output = config.general.default_output == OutputFormat::Json;
    let renderer = OutputRenderer::new(json_output, config.general.color);

    let colors_enabled = match config.general.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stderr().features().colors_supported(),
    };
    let mut event_handler = EventHandler::new(colors_enabled, cli.global.debug, json_output);

    let (event_sender, event_receiver) = hpcstack_events::channel();

    let result =
        execute_command_with_events(cli.command, config, event_sender, event_receiver, &mut event_handler)
            .await?;

    renderer.render_result(&result)?;

    info!("Command completed");
    Ok(result.is_success())
}

/// Run the command on a blocking worker while handling its events
async fn execute_command_with_events(
    command: Commands,
    config: Config,
    event_sender: EventSender,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<OperationResult, CliError> {
    let mut task = tokio::task::spawn_blocking(move || {
        let ctx = build_ops_context(config, event_sender)?;
        execute_command(command, &ctx)
    });
    let mut channel_open = true;

    loop {
        select! {
            // Command completed
            joined = &mut task => {
                // Drain any remaining events
                while let Ok(message) = event_receiver.try_recv() {
                    event_handler.handle_event(&message);
                }
                return match joined {
                    Ok(result) => result.map_err(CliError::from),
                    Err(e) => Err(CliError::Ops(OpsError::TaskFailed { message: e.to_string() }.into())),
                };
            }

            // Event received
            message = event_receiver.recv(), if channel_open => {
                match message {
                    Some(message) => event_handler.handle_event(&message),
                    None => channel_open = false,
                }
            }
        }
    }
}

/// Build operations context from the effective configuration
fn build_ops_context(config: Config, event_sender: EventSender) -> Result<OpsCtx, hpcstack_errors::Error> {
    OpsContextBuilder::new()
        .with_config(config)
        .with_event_sender(event_sender)
        .build()
}

/// Execute the specified command
fn execute_command(command: Commands, ctx: &OpsCtx) -> Result<OperationResult, hpcstack_errors::Error> {
    let name = command.name();
    match command {
        Commands::Resolve { easyconfigs, .. } => {
            run_operation(ctx, name, |ctx| hpcstack_ops::resolve(ctx, &easyconfigs))
                .map(OperationResult::BuildOrder)
        }

        Commands::DepGraph { easyconfigs, output } => {
            run_operation(ctx, name, |ctx| hpcstack_ops::dep_graph(ctx, &easyconfigs, &output))
                .map(OperationResult::DepGraph)
        }

        Commands::DryRun {
            easyconfigs,
            short,
            force,
            rebuild,
        } => {
            let options = DryRunOptions {
                short,
                force,
                rebuild,
            };
            run_operation(ctx, name, |ctx| hpcstack_ops::dry_run(ctx, &easyconfigs, options))
                .map(OperationResult::DryRun)
        }

        Commands::CheckConflicts { easyconfigs } => {
            run_operation(ctx, name, |ctx| hpcstack_ops::check_conflicts(ctx, &easyconfigs))
                .map(OperationResult::Conflicts)
        }

        Commands::Hierarchy {
            toolchain,
            capabilities,
        } => run_operation(ctx, name, |ctx| hpcstack_ops::hierarchy(ctx, &toolchain, capabilities))
            .map(OperationResult::Hierarchy),

        Commands::MapToolchain { source, target } => {
            run_operation(ctx, name, |ctx| hpcstack_ops::map_toolchains(ctx, &source, &target))
                .map(OperationResult::Mapping)
        }

        Commands::Search { query } => {
            run_operation(ctx, name, |ctx| hpcstack_ops::search(ctx, &query))
                .map(OperationResult::SearchResults)
        }

        Commands::PickVersion {
            name: software,
            toolchain,
            required,
        } => run_operation(ctx, name, |ctx| {
            hpcstack_ops::pick_version(ctx, &software, &toolchain, required.as_deref())
        })
        .map(OperationResult::VersionPick),

        Commands::Tweak {
            easyconfigs,
            toolchain,
            output_dir,
        } => run_operation(ctx, name, |ctx| {
            hpcstack_ops::tweak(ctx, &easyconfigs, &toolchain, output_dir.as_deref())
        })
        .map(OperationResult::Tweak),

        Commands::Obtain {
            name: software,
            version,
            toolchain,
            versionsuffix,
            output_dir,
        } => run_operation(ctx, name, |ctx| {
            let request = obtain_request(software, version, toolchain.as_deref(), versionsuffix)?;
            hpcstack_ops::obtain(ctx, &request, output_dir.as_deref())
        })
        .map(OperationResult::Obtain),
    }
}

/// Request for `obtain`; a toolchain without a version only fixes its name
fn obtain_request(
    name: String,
    version: Option<String>,
    toolchain: Option<&str>,
    versionsuffix: Option<String>,
) -> Result<EasyconfigRequest, hpcstack_errors::Error> {
    let mut request = EasyconfigRequest::new(name);
    request.version = version;
    request.versionsuffix = versionsuffix;
    Ok(match toolchain {
        Some(spec) if spec.contains('/') || spec.eq_ignore_ascii_case("system") => {
            request.with_toolchain(&parse_toolchain(spec)?)
        }
        Some(tc_name) => request.with_toolchain_name(tc_name),
        None => request,
    })
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;
    let filter = |default: &str| {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default))
    };

    if json_mode {
        if debug_enabled {
            // JSON logs on stderr keep stdout parseable
            tracing_subscriber::fmt()
                .json()
                .with_writer(std::io::stderr)
                .with_env_filter(filter("info,hpcstack=debug,hpcstack_ops=debug"))
                .init();
        } else {
            tracing_subscriber::fmt()
                .with_writer(std::io::sink)
                .with_env_filter("off")
                .init();
        }
    } else if debug_enabled {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter("debug"))
            .init();
    } else {
        // Normal mode: minimal logging to stderr
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter("warn,hpcstack=warn,hpcstack_ops=warn"))
            .init();
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &cli::GlobalArgs) {
    if let Some(color) = global.color {
        config.general.color = color;
    }
    if global.json {
        config.general.default_output = OutputFormat::Json;
    }
    if !global.robot_paths.is_empty() {
        config.robot.paths.clone_from(&global.robot_paths);
    }
}
