//! briefing CLI — the main entry point.
//!
//! Commands:
//! - `route`   — Classify a prompt (no session state touched)
//! - `turn`    — Produce the briefing for a prompt in a session
//! - `respond` — Record a finished exchange in session history
//! - `compact` — Signal an imminent compaction
//! - `start`   — Start (or reset) a session
//! - `end`     — End a session and persist its metadata
//! - `status`  — Show a session's pressure and history
//! - `config`  — Print or validate configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod adapters;
mod commands;

#[derive(Parser)]
#[command(
    name = "briefing",
    about = "briefing — context budgeting for AI coding assistants",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file (defaults to ~/.briefing/config.toml)
    #[arg(short, long, global = true, env = "BRIEFING_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a prompt and show the routing decision
    Route {
        prompt: String,

        /// Pressure level to route under (low, medium, high, critical)
        #[arg(short, long, default_value = "low")]
        pressure: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Produce the briefing for a new prompt
    Turn {
        prompt: String,

        #[arg(short, long, env = "BRIEFING_SESSION")]
        session: Option<String>,

        /// Directory of `<source>.json` files served as adapters
        #[arg(long, env = "BRIEFING_SOURCES")]
        sources: Option<PathBuf>,

        /// Print briefing and metadata as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a finished user/assistant exchange
    Respond {
        #[arg(short, long, env = "BRIEFING_SESSION")]
        session: Option<String>,

        #[arg(long)]
        user: String,

        #[arg(long)]
        assistant: String,
    },

    /// Signal that the host is about to compact the conversation
    Compact {
        #[arg(short, long, env = "BRIEFING_SESSION")]
        session: Option<String>,
    },

    /// Start a session, resetting any previous state
    Start {
        #[arg(short, long, env = "BRIEFING_SESSION")]
        session: Option<String>,
    },

    /// End a session and persist its metadata
    End {
        #[arg(short, long, env = "BRIEFING_SESSION")]
        session: Option<String>,
    },

    /// Show pressure and condensed history for a session
    Status {
        #[arg(short, long, env = "BRIEFING_SESSION")]
        session: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config {
        /// Only validate, print nothing on success
        #[arg(long)]
        validate: bool,

        /// Print the built-in defaults instead
        #[arg(long)]
        defaults: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the briefing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Route {
            prompt,
            pressure,
            json,
        } => commands::route::run(config_path, &prompt, &pressure, json)?,
        Commands::Turn {
            prompt,
            session,
            sources,
            json,
        } => commands::turn::run(config_path, session, sources.as_deref(), &prompt, json).await?,
        Commands::Respond {
            session,
            user,
            assistant,
        } => commands::session::respond(config_path, session, &user, &assistant)?,
        Commands::Compact { session } => commands::session::compact(config_path, session)?,
        Commands::Start { session } => commands::session::start(config_path, session)?,
        Commands::End { session } => commands::session::end(config_path, session)?,
        Commands::Status { session, json } => commands::session::status(config_path, session, json)?,
        Commands::Config { validate, defaults } => {
            commands::config_cmd::run(config_path, validate, defaults)?
        }
    }

    Ok(())
}
