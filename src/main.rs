//! # AI Bridge CLI (`ai-bridge`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ai-bridge providers <DB_PATH>` | Print the normalized providers from a configuration store |
//! | `ai-bridge attachments` | Read attachments from stdin and print content blocks |
//!
//! Results are a single JSON line on stdout. Fatal errors are a single
//! `{ "success": false, ... }` JSON line on stderr with exit code 1. Logs go
//! to stderr and are controlled by `RUST_LOG` (default `warn`).
//!
//! ## Examples
//!
//! ```bash
//! ai-bridge providers ~/.cc-switch/cc-switch.db
//!
//! echo '{"attachments":[],"message":"hi"}' | CLAUDE_USE_STDIN=true ai-bridge attachments
//! ```

use ai_bridge::config::BridgeConfig;
use ai_bridge::error::BridgeError;
use ai_bridge::models::FailureEnvelope;
use ai_bridge::{config, content, providers};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "ai-bridge",
    about = "Bridge between an editor host and an AI chat backend",
    version
)]
struct Cli {
    /// Optional TOML configuration file.
    ///
    /// Environment variables (`CLAUDE_USE_STDIN`, `CLAUDE_ATTACHMENTS_FILE`)
    /// are applied on top of it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read provider settings from a configuration store.
    ///
    /// Both settings generations (nested `env` and legacy top-level
    /// `base_url`/`api_key`) are normalized to one shape.
    Providers {
        /// Path to the SQLite configuration store.
        db_path: Option<PathBuf>,
    },

    /// Turn host-supplied attachments into content blocks.
    ///
    /// Reads stdin when `CLAUDE_USE_STDIN=true`, otherwise the file named by
    /// `CLAUDE_ATTACHMENTS_FILE`.
    Attachments {
        /// User message; overrides the payload's `message` field.
        #[arg(long)]
        message: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let code = match config::load_config(cli.config.as_deref()) {
        Ok(cfg) => run(cli.command, &cfg).await?,
        Err(err) => report_failure(&BridgeError::Config(format!("{:#}", err)))?,
    };

    // Exit without dropping the runtime: a timed-out stdin read is still
    // parked on a blocking thread and would hold shutdown open.
    std::process::exit(code);
}

async fn run(command: Commands, cfg: &BridgeConfig) -> anyhow::Result<i32> {
    match command {
        Commands::Providers { db_path } => {
            match providers::run_providers(cfg, db_path.as_deref()).await {
                Ok(envelope) => {
                    println!("{}", serde_json::to_string(&envelope)?);
                    Ok(0)
                }
                Err(err) => report_failure(&err),
            }
        }
        Commands::Attachments { message } => {
            let envelope = content::run_attachments(&cfg.channel, message.as_deref()).await;
            println!("{}", serde_json::to_string(&envelope)?);
            Ok(0)
        }
    }
}

/// Write the failure envelope to stderr and return the exit code.
fn report_failure(err: &BridgeError) -> anyhow::Result<i32> {
    tracing::debug!(?err, "command failed");
    eprintln!("{}", serde_json::to_string(&FailureEnvelope::from(err))?);
    Ok(1)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
