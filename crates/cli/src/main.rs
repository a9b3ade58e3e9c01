//! Augur CLI
//!
//! Main entry point for the augur command-line tool.
//! Asks a language model a typed question and exports the trace.

mod commands;

use augur_core::{config::AppConfig, logging, AppResult};
use clap::{Parser, Subcommand};
use commands::{AskCommand, InspectCommand};
use std::path::PathBuf;
use tracing::Instrument;

/// Augur - typed question answering with trace export
#[derive(Parser, Debug)]
#[command(name = "augur")]
#[command(about = "Typed question answering with trace export", long_about = None)]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "AUGUR_CONFIG")]
    config: Option<PathBuf>,

    /// Model identifier, `<provider>/<model>`
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Do not export traces
    #[arg(long, global = true)]
    no_telemetry: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    ask: AskCommand,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question (the default command)
    Ask(AskCommand),

    /// Show the parsed signature and the prompt without calling the model
    Inspect(InspectCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Defaults, config file and environment
    let config = AppConfig::load(cli.config)?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.no_telemetry,
    );

    // Held until the end of main so pending spans are flushed on exit
    let _telemetry =
        logging::init_logging(config.log_level.as_deref(), config.no_color, &config.telemetry)?;

    tracing::info!("Augur starting");
    tracing::debug!("Config file: {:?}", config.config_file);
    tracing::debug!("Model: {}", config.lm.model);

    let command = cli.command.unwrap_or(Commands::Ask(cli.ask));
    let result = run(command, &config).await;

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ask(_) => "ask",
            Commands::Inspect(_) => "inspect",
        }
    }
}

/// Route to the command handler inside a `command` span.
async fn run(command: Commands, config: &AppConfig) -> AppResult<()> {
    let span = tracing::info_span!("command", name = command.name());

    async move {
        match command {
            Commands::Ask(cmd) => cmd.execute(config).await,
            Commands::Inspect(cmd) => cmd.execute(),
        }
    }
    .instrument(span)
    .await
}
