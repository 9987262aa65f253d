// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Ruya CLI

pub mod config;
pub mod critic;
pub mod learning;
pub mod migrate;
pub mod serve;

pub use self::config::ConfigCommand;
pub use self::critic::CriticCommand;
pub use self::migrate::MigrateCommand;
