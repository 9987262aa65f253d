// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! Domain Layer
//!
//! Aggregates and contracts of the learning bounded context.

pub mod agent;
pub mod feedback;
pub mod pattern;
pub mod metrics;
pub mod learning_state;
pub mod prompt;
pub mod evaluation;
pub mod events;
pub mod repository;
pub mod llm;
pub mod service_config;

pub use agent::*;
pub use feedback::*;
pub use pattern::*;
pub use metrics::*;
pub use learning_state::*;
pub use prompt::*;
pub use evaluation::*;
pub use events::*;
