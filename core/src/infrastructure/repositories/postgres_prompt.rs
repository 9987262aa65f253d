// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Prompt Repository
//!
//! `PromptRepository` backed by the append-only `prompt_evolution` table.
//! Appends run in a transaction holding a per-agent advisory lock, so the
//! parent check and the insert see the same head.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::agent::AgentType;
use crate::domain::prompt::{mark_active, PromptEvolution, PromptVersion};
use crate::domain::repository::{PromptRepository, RepositoryError};

const PROMPT_COLUMNS: &str = "agent_type, prompt_version, prompt_template, performance_score, \
     parent_version, improvements, evaluation_id, created_at";

pub struct PostgresPromptRepository {
    pool: PgPool,
}

impl PostgresPromptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn prompt_from_row(row: &PgRow) -> Result<PromptEvolution, RepositoryError> {
    let agent_type: String = row.get("agent_type");
    let version: String = row.get("prompt_version");
    let parent: Option<String> = row.get("parent_version");
    let improvements: Value = row.get("improvements");

    Ok(PromptEvolution {
        agent_type: agent_type.parse::<AgentType>()?,
        prompt_version: version.parse::<PromptVersion>()?,
        prompt_template: row.get("prompt_template"),
        performance_score: row.get("performance_score"),
        parent_version: parent.map(|p| p.parse::<PromptVersion>()).transpose()?,
        improvements: serde_json::from_value(improvements)?,
        evaluation_id: row.get("evaluation_id"),
        created_at: row.get("created_at"),
        is_active: false,
    })
}

#[async_trait]
impl PromptRepository for PostgresPromptRepository {
    async fn active(&self, agent_type: AgentType) -> Result<Option<PromptEvolution>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM prompt_evolution WHERE agent_type = $1 ORDER BY id DESC LIMIT 1",
            PROMPT_COLUMNS
        ))
        .bind(agent_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut head = prompt_from_row(&row)?;
        head.is_active = true;
        Ok(Some(head))
    }

    async fn append(
        &self,
        version: &PromptEvolution,
        expected_parent: Option<PromptVersion>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(version.agent_type.as_str())
            .execute(&mut *tx)
            .await?;

        let head: Option<String> = sqlx::query_scalar(
            "SELECT prompt_version FROM prompt_evolution WHERE agent_type = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(version.agent_type.as_str())
        .fetch_optional(&mut *tx)
        .await?;
        let head = head.map(|v| v.parse::<PromptVersion>()).transpose()?;

        if head != expected_parent {
            return Err(RepositoryError::Conflict(format!(
                "prompt chain of {} moved to {} while appending {}",
                version.agent_type,
                head.map(|v| v.to_string()).unwrap_or_else(|| "nothing".to_string()),
                version.prompt_version
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO prompt_evolution (
                agent_type, prompt_version, prompt_template, performance_score,
                parent_version, improvements, evaluation_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(version.agent_type.as_str())
        .bind(version.prompt_version.to_string())
        .bind(&version.prompt_template)
        .bind(version.performance_score)
        .bind(version.parent_version.map(|v| v.to_string()))
        .bind(serde_json::to_value(&version.improvements)?)
        .bind(&version.evaluation_id)
        .bind(version.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict(format!(
                "prompt version {} already exists for {}",
                version.prompt_version, version.agent_type
            )),
            other => RepositoryError::from(other),
        })?;

        tx.commit().await?;
        Ok(())
    }

    async fn history(&self, agent_type: AgentType) -> Result<Vec<PromptEvolution>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM prompt_evolution WHERE agent_type = $1 ORDER BY id ASC",
            PROMPT_COLUMNS
        ))
        .bind(agent_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut history = rows.iter().map(prompt_from_row).collect::<Result<Vec<_>, _>>()?;
        mark_active(&mut history);
        Ok(history)
    }
}
