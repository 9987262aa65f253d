// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory
//!
//! Creates the concrete repositories for the configured storage backend. The
//! domain layer only defines the traits; this module is where a backend
//! choice turns into implementations.

use std::sync::Arc;

use sqlx::PgPool;

use crate::domain::repository::{
    FeedbackRepository, LearningStateRepository, MetricsRepository, PatternRepository, PromptRepository,
    StorageBackend,
};
use crate::infrastructure::repositories::postgres_feedback::PostgresFeedbackRepository;
use crate::infrastructure::repositories::postgres_learning_state::PostgresLearningStateRepository;
use crate::infrastructure::repositories::postgres_metrics::PostgresMetricsRepository;
use crate::infrastructure::repositories::postgres_pattern::PostgresPatternRepository;
use crate::infrastructure::repositories::postgres_prompt::PostgresPromptRepository;
use crate::infrastructure::repositories::{
    InMemoryFeedbackRepository, InMemoryLearningStateRepository, InMemoryMetricsRepository,
    InMemoryPatternRepository, InMemoryPromptRepository,
};

/// One repository per learning collection.
#[derive(Clone)]
pub struct LearningRepositories {
    pub feedback: Arc<dyn FeedbackRepository>,
    pub patterns: Arc<dyn PatternRepository>,
    pub metrics: Arc<dyn MetricsRepository>,
    pub states: Arc<dyn LearningStateRepository>,
    pub prompts: Arc<dyn PromptRepository>,
}

impl LearningRepositories {
    pub fn in_memory() -> Self {
        Self {
            feedback: Arc::new(InMemoryFeedbackRepository::new()),
            patterns: Arc::new(InMemoryPatternRepository::new()),
            metrics: Arc::new(InMemoryMetricsRepository::new()),
            states: Arc::new(InMemoryLearningStateRepository::new()),
            prompts: Arc::new(InMemoryPromptRepository::new()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            feedback: Arc::new(PostgresFeedbackRepository::new(pool.clone())),
            patterns: Arc::new(PostgresPatternRepository::new(pool.clone())),
            metrics: Arc::new(PostgresMetricsRepository::new(pool.clone())),
            states: Arc::new(PostgresLearningStateRepository::new(pool.clone())),
            prompts: Arc::new(PostgresPromptRepository::new(pool)),
        }
    }
}

/// Creates the repositories for `backend`. The pool is only used by the
/// PostgreSQL backend and must be present for it.
pub fn create_repositories(backend: &StorageBackend, pool: Option<PgPool>) -> anyhow::Result<LearningRepositories> {
    match (backend, pool) {
        (StorageBackend::InMemory, _) => Ok(LearningRepositories::in_memory()),
        (StorageBackend::PostgreSQL(_), Some(pool)) => Ok(LearningRepositories::postgres(pool)),
        (StorageBackend::PostgreSQL(_), None) => {
            anyhow::bail!("PostgreSQL backend selected but no connection pool was provided")
        }
    }
}
