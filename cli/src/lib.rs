// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! Ruya CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** API server wiring, HTTP client for a running server and the
//!   `ruya` subcommands

pub mod client;
pub mod commands;
pub mod server;
