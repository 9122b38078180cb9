//! LevelUp - game progression engine
//!
//! CLI entry point for inspecting models and persisted progress.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use levelup::cli::reset::{ResetCommand, ResetOptions};
use levelup::cli::status::{StatusCommand, StatusOptions};
use levelup::cli::validate::{ValidateCommand, ValidateOptions};
use levelup::config::Config;
use levelup::context::Context;
use levelup::error::exit_codes;
use levelup::inventory::MemoryInventory;

// =============================================================================
// CLI Definition
// =============================================================================

/// LevelUp - game progression engine
#[derive(Parser)]
#[command(name = "levelup")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a model document and summarize it
    Validate {
        /// Path to the model document (JSON)
        model: PathBuf,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show persisted progress for every world, level, gate and score
    Status {
        /// Path to the model document; defaults to the stored model
        model: Option<PathBuf>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Clear persisted progress, keeping the stored model
    Reset {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("LEVELUP_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("levelup error: {}", e);
            ExitCode::from(exit_codes::FAILURE as u8)
        }
    }
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { model, json, quiet } => run_validate(model, json, quiet),
        Commands::Status { model, json, quiet } => run_status(model, json, quiet),
        Commands::Reset { json, quiet } => run_reset(json, quiet),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

/// Convert a success boolean to an exit code.
fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::OK as u8)
    } else {
        ExitCode::from(exit_codes::FAILURE as u8)
    }
}

fn print_output(formatted: &str) {
    if !formatted.is_empty() {
        print!("{}", formatted);
    }
}

/// Build a context from layered configuration.
///
/// The CLI has no game inventory, so balances read as unknown items. An
/// unusable configuration is a usage error.
fn load_context() -> Result<Context, Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let config = Config::load_from_cwd(&cwd);
    Ok(Context::from_config(&config, Arc::new(MemoryInventory::new()))?)
}

fn run_validate(
    model: PathBuf,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = ValidateCommand::new();
    let options = ValidateOptions { json, quiet };

    let output = cmd.run(&model, &options);
    print_output(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.valid))
}

fn run_status(
    model: Option<PathBuf>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let ctx = match load_context() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("levelup error: {}", e);
            return Ok(ExitCode::from(exit_codes::USAGE as u8));
        }
    };
    let cmd = StatusCommand::new(ctx);
    let options = StatusOptions { json, quiet };

    let output = cmd.run(model.as_deref(), &options);
    print_output(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_reset(json: bool, quiet: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let ctx = match load_context() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("levelup error: {}", e);
            return Ok(ExitCode::from(exit_codes::USAGE as u8));
        }
    };
    let cmd = ResetCommand::new(ctx);
    let options = ResetOptions { json, quiet };

    let output = cmd.run(&options);
    print_output(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

// =============================================================================
// Tests
// =============================================================================
