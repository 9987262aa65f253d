// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! Database Migration Command
//!
//! `ruya migrate` applies the bundled SQL migrations (the five learning
//! tables) to the PostgreSQL database named in the manifest.
//!
//! ```bash
//! # Apply all pending migrations
//! ruya migrate
//!
//! # Preview migrations without applying
//! ruya migrate --dry-run
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use std::collections::HashSet;
use std::path::PathBuf;

use ruya_core::domain::repository::StorageBackend;
use ruya_core::domain::service_config::ServiceConfigManifest;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Args)]
pub struct MigrateCommand {
    /// List pending migrations without applying them
    #[arg(long)]
    dry_run: bool,
}

pub async fn execute(cmd: MigrateCommand, config_path: Option<PathBuf>) -> Result<()> {
    println!("{}", "Ruya Migrate".bold().green());

    let config = ServiceConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
    let StorageBackend::PostgreSQL(pg) = config.storage_backend()? else {
        anyhow::bail!("spec.database.backend is in_memory; migrations only apply to postgres");
    };

    println!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&pg.connection_string)
        .await
        .context("Failed to connect to database")?;

    // The bookkeeping table does not exist before the first run.
    let applied: HashSet<i64> = sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations WHERE success")
        .fetch_all(&pool)
        .await
        .map(|versions| versions.into_iter().collect())
        .unwrap_or_default();

    let pending: Vec<_> = MIGRATOR.iter().filter(|m| !applied.contains(&m.version)).collect();
    println!(
        "Migration status: {} applied, {} total available.",
        applied.len(),
        MIGRATOR.iter().count()
    );

    if pending.is_empty() {
        println!("{}", "✓ Database is up to date.".green());
        return Ok(());
    }

    if cmd.dry_run {
        println!("Pending migrations (dry run):");
        for migration in &pending {
            println!("  - {} {}", migration.version, migration.description);
        }
        return Ok(());
    }

    println!("Applying {} pending migration(s)...", pending.len());
    MIGRATOR.run(&pool).await.context("Failed to apply migrations")?;
    println!("{}", "✓ Database updated successfully.".green());

    Ok(())
}
