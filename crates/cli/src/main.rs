//! PeopleOS CLI - command-line client for the PeopleOS HR backend

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use peopleos_http::ClientError;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level, error, info};

/// Exit code when the session ended and the user has to sign in again
const EXIT_SESSION_ENDED: i32 = 2;

#[derive(Parser)]
#[command(name = "peopleos")]
#[command(about = "Command-line client for the PeopleOS HR platform")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "info")]
    log_level: LogLevel,

    /// Directory holding the stored session and logs
    #[arg(short = 'd', long, global = true, env = "PEOPLEOS_STATE_DIR")]
    data_dir: Option<PathBuf>,

    /// API base URL
    #[arg(long, global = true, env = "PEOPLEOS_API_URL")]
    api_url: Option<String>,

    /// Configuration file (TOML or YAML)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Timeout for operations in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "30")]
    timeout: u64,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let settings = config::resolve_settings(cli.config.as_deref(), cli.api_url, cli.data_dir)?;
    logging::init_logging(
        cli.log_level.into(),
        &settings.session.data_dir,
        cli.no_file_log,
    )?;

    info!(api = %settings.api.base_url, "Starting PeopleOS CLI");

    let client = config::connect(&settings)?;

    let outcome = if cli.timeout == 0 {
        cli.command.execute(&client).await
    } else {
        let timeout_duration = Duration::from_secs(cli.timeout);
        match tokio::time::timeout(timeout_duration, cli.command.execute(&client)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!("Command timed out after {} seconds", cli.timeout);
                std::process::exit(1);
            }
        }
    };

    match outcome {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(e) => {
            if let Some(redirect) = e.downcast_ref::<ClientError>().and_then(ClientError::redirect) {
                error!("{e}");
                eprintln!("Session ended, sign in again ({redirect})");
                std::process::exit(EXIT_SESSION_ENDED);
            }
            error!("Command failed: {e:#}");
            std::process::exit(1);
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}
