// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0

//! # Ruya CLI
//!
//! The `ruya` binary runs the agent learning API and talks to a running
//! instance of it.
//!
//! ## Commands
//!
//! - `ruya serve` - Run the HTTP API in the foreground
//! - `ruya config show|validate|generate` - Configuration management
//! - `ruya migrate [--dry-run]` - Apply PostgreSQL migrations
//! - `ruya metrics|insights|state` - Query learning data
//! - `ruya critic evaluate|list|approve|reject` - Prompt review workflow

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use ruya_cli::client::ApiClient;
use ruya_cli::commands::{self, ConfigCommand, CriticCommand, MigrateCommand};
use ruya_core::domain::service_config::ServiceConfigManifest;

/// Ruya agent learning service
#[derive(Parser)]
#[command(name = "ruya")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, env = "RUYA_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// API host (default: spec.server.bind_address)
    #[arg(long, global = true, env = "RUYA_HOST")]
    host: Option<String>,

    /// API port (default: spec.server.port)
    #[arg(long, global = true, env = "RUYA_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RUYA_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (text, json)
    #[arg(long, global = true, env = "RUYA_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the learning API server
    Serve,

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Apply database migrations
    Migrate {
        #[command(flatten)]
        command: MigrateCommand,
    },

    /// Show agent metrics
    Metrics {
        /// Agent type; all agents when omitted
        #[arg(value_name = "AGENT")]
        agent_type: Option<String>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Show learning insights for an agent
    Insights {
        #[arg(value_name = "AGENT")]
        agent_type: String,

        #[arg(long)]
        json: bool,
    },

    /// Show or update an agent's learning state
    State {
        #[arg(value_name = "AGENT")]
        agent_type: String,

        #[arg(long)]
        learning_enabled: Option<bool>,

        #[arg(long)]
        auto_adapt: Option<bool>,

        #[arg(long)]
        exploration_rate: Option<f64>,
    },

    /// Prompt critic review workflow
    Critic {
        #[command(subcommand)]
        command: CriticCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is not an error.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let observability = ServiceConfigManifest::load_or_default(cli.config.clone())
        .map(|config| config.spec.observability)
        .unwrap_or_default();
    init_logging(
        cli.log_level.as_deref().unwrap_or(&observability.log_level),
        cli.log_format.as_deref().unwrap_or(&observability.log_format),
    )?;

    let Some(command) = cli.command else {
        eprintln!("{}", "No command specified. Use --help for usage.".yellow());
        std::process::exit(1);
    };

    match command {
        Commands::Serve => commands::serve::execute(cli.config, cli.host.as_deref(), cli.port).await,
        Commands::Config { command } => commands::config::handle_command(command, cli.config).await,
        Commands::Migrate { command } => commands::migrate::execute(command, cli.config).await,
        Commands::Metrics { agent_type, json } => {
            let client = api_client(&cli.config, cli.host.as_deref(), cli.port)?;
            commands::learning::metrics(&client, agent_type.as_deref(), json).await
        }
        Commands::Insights { agent_type, json } => {
            let client = api_client(&cli.config, cli.host.as_deref(), cli.port)?;
            commands::learning::insights(&client, &agent_type, json).await
        }
        Commands::State {
            agent_type,
            learning_enabled,
            auto_adapt,
            exploration_rate,
        } => {
            let client = api_client(&cli.config, cli.host.as_deref(), cli.port)?;
            commands::learning::state(&client, &agent_type, learning_enabled, auto_adapt, exploration_rate).await
        }
        Commands::Critic { command } => {
            let client = api_client(&cli.config, cli.host.as_deref(), cli.port)?;
            commands::critic::handle_command(command, &client).await
        }
    }
}

/// Client for the server described by the manifest, with flag overrides.
fn api_client(config_path: &Option<PathBuf>, host: Option<&str>, port: Option<u16>) -> Result<ApiClient> {
    let config = ServiceConfigManifest::load_or_default(config_path.clone()).context("Failed to load configuration")?;
    let host = host.unwrap_or(match config.spec.server.bind_address.as_str() {
        "0.0.0.0" => "127.0.0.1",
        other => other,
    });
    ApiClient::new(host, port.unwrap_or(config.spec.server.port))
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        "json" => builder.json().init(),
        _ => builder.compact().init(),
    }

    Ok(())
}

