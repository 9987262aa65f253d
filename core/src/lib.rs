// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! # Ruya Learning Core
//!
//! Self-improvement layer for the HR recruitment agents (CV shortlisting,
//! interview, email scheduling, HR chat).
//!
//! # Architecture
//!
//! - **Layer:** Learning & Memory Layer
//! - **Purpose:** Records feedback, aggregates agent metrics, learns reusable
//!   patterns, versions system prompts and runs the prompt critic.
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`domain`] | Aggregates, value objects, repository and LLM contracts |
//! | [`application`] | Learning and critic services |
//! | [`infrastructure`] | In-memory / PostgreSQL repositories, LLM adapters, event bus |
//! | [`presentation`] | Axum HTTP routes |

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
