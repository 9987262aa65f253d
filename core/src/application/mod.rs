// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! Application Layer
//!
//! Use cases of the learning service: recording feedback, learning and
//! selecting patterns, evolving prompts and running the critic.

pub mod critic_service;
pub mod learning_service;
pub mod metrics_aggregator;
pub mod pattern_learner;
pub mod pattern_selector;
pub mod prompt_evolver;
pub mod repository_factory;
