// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0

//! `ruya serve`: run the learning API in the foreground.

use anyhow::{Context, Result};
use std::path::PathBuf;

use ruya_core::domain::service_config::ServiceConfigManifest;

use crate::server::start_server;

pub async fn execute(config_path: Option<PathBuf>, host: Option<&str>, port: Option<u16>) -> Result<()> {
    let config = ServiceConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
    start_server(config, host, port).await
}
