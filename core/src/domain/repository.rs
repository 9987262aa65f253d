// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for the learning collections. Interfaces live in the
//! domain layer and are implemented in `crate::infrastructure::repositories`
//! and `crate::infrastructure::evaluation_store`.
//!
//! | Trait | Collection | Implementations |
//! |-------|------------|-----------------|
//! | `FeedbackRepository` | `agent_feedback` | `InMemoryFeedbackRepository`, `PostgresFeedbackRepository` |
//! | `PatternRepository` | `learning_patterns` | `InMemoryPatternRepository`, `PostgresPatternRepository` |
//! | `MetricsRepository` | `agent_metrics` | `InMemoryMetricsRepository`, `PostgresMetricsRepository` |
//! | `LearningStateRepository` | `agent_learning_state` | `InMemoryLearningStateRepository`, `PostgresLearningStateRepository` |
//! | `PromptRepository` | `prompt_evolution` | `InMemoryPromptRepository`, `PostgresPromptRepository` |
//! | `EvaluationRepository` | evaluation files | `InMemoryEvaluationRepository`, `FileEvaluationRepository` |
//!
//! Every write that folds into an existing record is atomic with respect to
//! concurrent writers of the same record: metrics and decay are single
//! statements, accumulating pattern observations retry on a revision check,
//! and prompt appends name the parent version they expect to replace.

use async_trait::async_trait;

use crate::domain::agent::AgentType;
use crate::domain::evaluation::{EvaluationStatus, PromptEvaluation};
use crate::domain::feedback::{FeedbackEvent, FeedbackId};
use crate::domain::learning_state::{AgentLearningState, LearningStateUpdate};
use crate::domain::metrics::{AgentMetrics, MetricsDelta};
use crate::domain::pattern::{LearningPattern, PatternId, PatternKind};
use crate::domain::prompt::{PromptEvolution, PromptVersion};

/// Storage backend selected at startup.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
    pub max_connections: u32,
}

#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    async fn save(&self, feedback: &FeedbackEvent) -> Result<(), RepositoryError>;

    async fn mark_processed(&self, id: FeedbackId) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: FeedbackId) -> Result<Option<FeedbackEvent>, RepositoryError>;

    /// Newest first.
    async fn find_recent(&self, agent_type: AgentType, limit: usize) -> Result<Vec<FeedbackEvent>, RepositoryError>;
}

/// Outcome of folding one observation into a pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternUpsert {
    Created(LearningPattern),
    Updated(LearningPattern),
}

impl PatternUpsert {
    pub fn pattern(&self) -> &LearningPattern {
        match self {
            PatternUpsert::Created(p) | PatternUpsert::Updated(p) => p,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, PatternUpsert::Created(_))
    }
}

#[async_trait]
pub trait PatternRepository: Send + Sync {
    async fn find_by_id(&self, id: &PatternId) -> Result<Option<LearningPattern>, RepositoryError>;

    /// Inserts `first` when its id is unknown, otherwise applies
    /// [`LearningPattern::observe`] with `success` to the stored record.
    async fn upsert_observation(
        &self,
        first: LearningPattern,
        success: bool,
    ) -> Result<PatternUpsert, RepositoryError>;

    /// Inserts a pattern, replacing any record with the same id.
    async fn insert(&self, pattern: &LearningPattern) -> Result<(), RepositoryError>;

    /// Multiplies the success rate by `factor` and counts one more use.
    /// Returns `None` when the pattern does not exist.
    async fn decay(&self, id: &PatternId, factor: f64) -> Result<Option<LearningPattern>, RepositoryError>;

    /// Active patterns of one type, unordered, at most `limit`.
    async fn find_active(
        &self,
        agent_type: AgentType,
        pattern_type: PatternKind,
        limit: usize,
    ) -> Result<Vec<LearningPattern>, RepositoryError>;

    /// Active pattern of one type with the highest success rate, then usage.
    async fn find_best(
        &self,
        agent_type: AgentType,
        pattern_type: PatternKind,
    ) -> Result<Option<LearningPattern>, RepositoryError>;

    /// Active patterns of any type, by success rate descending.
    async fn top_active(&self, agent_type: AgentType, limit: usize) -> Result<Vec<LearningPattern>, RepositoryError>;

    /// Patterns at or above `min_success_rate`, by success rate descending.
    async fn find_successful(
        &self,
        agent_type: AgentType,
        min_success_rate: f64,
        limit: usize,
    ) -> Result<Vec<LearningPattern>, RepositoryError>;
}

#[async_trait]
pub trait MetricsRepository: Send + Sync {
    async fn find(&self, agent_type: AgentType) -> Result<Option<AgentMetrics>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<AgentMetrics>, RepositoryError>;

    /// Creates the row with `baseline` if missing, then applies `delta`.
    async fn record(
        &self,
        agent_type: AgentType,
        delta: &MetricsDelta,
        baseline: f64,
    ) -> Result<AgentMetrics, RepositoryError>;

    /// Counts one newly learned pattern.
    async fn record_pattern_learned(&self, agent_type: AgentType, baseline: f64) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait LearningStateRepository: Send + Sync {
    /// Returns the state, inserting `default` first if the agent has none.
    async fn get_or_init(&self, default: AgentLearningState) -> Result<AgentLearningState, RepositoryError>;

    async fn update(
        &self,
        default: AgentLearningState,
        update: &LearningStateUpdate,
    ) -> Result<AgentLearningState, RepositoryError>;

    async fn record_learning(&self, default: AgentLearningState) -> Result<AgentLearningState, RepositoryError>;
}

#[async_trait]
pub trait PromptRepository: Send + Sync {
    /// Newest version of the agent's chain.
    async fn active(&self, agent_type: AgentType) -> Result<Option<PromptEvolution>, RepositoryError>;

    /// Appends `version` as the agent's new head. Fails with
    /// [`RepositoryError::Conflict`] when the current head is not
    /// `expected_parent` (`None` meaning the chain must be empty).
    async fn append(
        &self,
        version: &PromptEvolution,
        expected_parent: Option<PromptVersion>,
    ) -> Result<(), RepositoryError>;

    /// Creation order, oldest first, with `is_active` set on the head.
    async fn history(&self, agent_type: AgentType) -> Result<Vec<PromptEvolution>, RepositoryError>;
}

#[async_trait]
pub trait EvaluationRepository: Send + Sync {
    /// Creates or overwrites the evaluation with the same id.
    async fn save(&self, evaluation: &PromptEvaluation) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<PromptEvaluation>, RepositoryError>;

    /// Newest first.
    async fn list(
        &self,
        agent_type: Option<AgentType>,
        status: Option<EvaluationStatus>,
    ) -> Result<Vec<PromptEvaluation>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for RepositoryError {
    fn from(err: std::io::Error) -> Self {
        RepositoryError::Database(err.to_string())
    }
}

impl From<crate::domain::agent::UnknownVariant> for RepositoryError {
    fn from(err: crate::domain::agent::UnknownVariant) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

impl From<crate::domain::prompt::InvalidPromptVersion> for RepositoryError {
    fn from(err: crate::domain::prompt::InvalidPromptVersion) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
