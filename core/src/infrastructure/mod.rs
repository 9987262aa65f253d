// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure Layer
//!
//! Adapters behind the domain contracts: repositories for both storage
//! backends, the evaluation file store, LLM providers and the event bus.

pub mod db;
pub mod event_bus;
pub mod evaluation_store;
pub mod llm;
pub mod repositories;
