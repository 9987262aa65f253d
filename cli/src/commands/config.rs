// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use ruya_core::domain::service_config::{DatabaseBackend, ServiceConfigManifest};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate a configuration file with every default spelled out
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./ruya-config.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, force } => generate(&output, force),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = ServiceConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. RUYA_CONFIG_PATH: {}",
            std::env::var("RUYA_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./ruya-config.yaml");
        println!("  4. ~/.ruya/config.yaml");
        println!("  5. /etc/ruya/config.yaml");
        println!();
    }

    let spec = &config.spec;
    println!("{} {}", "Service:".bold(), config.metadata.name);
    println!();

    println!("{}", "Server:".bold());
    println!("  Listen: {}:{}", spec.server.bind_address, spec.server.port);
    println!("  Allowed origins: {}", spec.server.allowed_origins.join(", "));
    println!();

    println!("{}", "Database:".bold());
    match spec.database.backend {
        DatabaseBackend::InMemory => println!("  Backend: in-memory"),
        DatabaseBackend::Postgres => {
            println!("  Backend: postgres");
            let url = if config.database_url().is_some() {
                "(set)".green()
            } else {
                "(missing)".red()
            };
            println!("  URL: {}", url);
            println!("  Max connections: {}", spec.database.max_connections);
        }
    }
    println!();

    println!("{}", "Critic LLM:".bold());
    println!("  Provider: {:?}", spec.llm.provider);
    println!("  Endpoint: {}", spec.llm.endpoint);
    println!("  Model: {}", spec.llm.model);
    println!("  Timeout: {}s", spec.llm.timeout_seconds);
    if spec.llm.api_key.is_some() {
        println!("  API key: {}", "(set)".green());
    }
    println!();

    println!("{}", "Learning:".bold());
    println!("  Baseline performance: {}", spec.learning.baseline_performance);
    println!("  Default exploration rate: {}", spec.learning.default_exploration_rate);
    println!("  Failure decay: {}", spec.learning.failure_decay);
    println!(
        "  Evolution patterns: up to {} with success rate >= {}",
        spec.learning.evolution_pattern_limit, spec.learning.evolution_min_success_rate
    );
    println!();

    println!("{}", "Critic:".bold());
    println!("  Evaluations dir: {}", spec.critic.evaluations_dir.display());
    println!("  Default samples: {}", spec.critic.default_sample_limit);

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ServiceConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());
    Ok(())
}

fn generate(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", output.display());
    }

    ServiceConfigManifest::default()
        .to_yaml_file(output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generated_config_validates() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ruya-config.yaml");

        generate(&path, false).unwrap();
        let config = ServiceConfigManifest::from_yaml_file(&path).unwrap();
        assert!(config.validate().is_ok());

        assert!(generate(&path, false).is_err());
        assert!(generate(&path, true).is_ok());
    }
}
