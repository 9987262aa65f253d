// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Learning State Repository
//!
//! `LearningStateRepository` backed by `agent_learning_state`, one row per
//! agent type. Rows are created lazily from the caller's default.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::agent::AgentType;
use crate::domain::learning_state::{AgentLearningState, LearningStateUpdate};
use crate::domain::repository::{LearningStateRepository, RepositoryError};

const STATE_COLUMNS: &str =
    "agent_type, learning_enabled, auto_adapt, exploration_rate, total_learnings, last_learning_at, updated_at";

pub struct PostgresLearningStateRepository {
    pool: PgPool,
}

impl PostgresLearningStateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure(&self, default: &AgentLearningState) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO agent_learning_state (
                agent_type, learning_enabled, auto_adapt, exploration_rate,
                total_learnings, last_learning_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (agent_type) DO NOTHING
            "#,
        )
        .bind(default.agent_type.as_str())
        .bind(default.learning_enabled)
        .bind(default.auto_adapt)
        .bind(default.exploration_rate)
        .bind(default.total_learnings as i64)
        .bind(default.last_learning_at)
        .bind(default.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn state_from_row(row: &PgRow) -> Result<AgentLearningState, RepositoryError> {
    let agent_type: String = row.get("agent_type");
    let total_learnings: i64 = row.get("total_learnings");
    Ok(AgentLearningState {
        agent_type: agent_type.parse::<AgentType>()?,
        learning_enabled: row.get("learning_enabled"),
        auto_adapt: row.get("auto_adapt"),
        exploration_rate: row.get("exploration_rate"),
        total_learnings: total_learnings.max(0) as u64,
        last_learning_at: row.get("last_learning_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl LearningStateRepository for PostgresLearningStateRepository {
    async fn get_or_init(&self, default: AgentLearningState) -> Result<AgentLearningState, RepositoryError> {
        self.ensure(&default).await?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM agent_learning_state WHERE agent_type = $1",
            STATE_COLUMNS
        ))
        .bind(default.agent_type.as_str())
        .fetch_one(&self.pool)
        .await?;

        state_from_row(&row)
    }

    async fn update(
        &self,
        default: AgentLearningState,
        update: &LearningStateUpdate,
    ) -> Result<AgentLearningState, RepositoryError> {
        self.ensure(&default).await?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE agent_learning_state SET
                learning_enabled = COALESCE($2, learning_enabled),
                auto_adapt = COALESCE($3, auto_adapt),
                exploration_rate = COALESCE($4, exploration_rate),
                updated_at = NOW()
            WHERE agent_type = $1
            RETURNING {}
            "#,
            STATE_COLUMNS
        ))
        .bind(default.agent_type.as_str())
        .bind(update.learning_enabled)
        .bind(update.auto_adapt)
        .bind(update.exploration_rate)
        .fetch_one(&self.pool)
        .await?;

        state_from_row(&row)
    }

    async fn record_learning(&self, default: AgentLearningState) -> Result<AgentLearningState, RepositoryError> {
        self.ensure(&default).await?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE agent_learning_state SET
                total_learnings = total_learnings + 1,
                last_learning_at = NOW(),
                updated_at = NOW()
            WHERE agent_type = $1
            RETURNING {}
            "#,
            STATE_COLUMNS
        ))
        .bind(default.agent_type.as_str())
        .fetch_one(&self.pool)
        .await?;

        state_from_row(&row)
    }
}
