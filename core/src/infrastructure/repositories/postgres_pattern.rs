// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Pattern Repository
//!
//! `PatternRepository` backed by the `learning_patterns` table.
//!
//! Folding an observation into a pattern needs the current record (skill
//! weights keep their counters inside `pattern_data`), so it cannot be a single
//! arithmetic `UPDATE`. Every row carries a `revision` that each write bumps;
//! an observation is written only if the revision it read is still current and
//! is retried on a fresh read otherwise.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::debug;

use crate::domain::agent::AgentType;
use crate::domain::pattern::{LearningPattern, PatternId, PatternKind};
use crate::domain::repository::{PatternRepository, PatternUpsert, RepositoryError};

/// Attempts before a contended observation is reported as a conflict.
const MAX_OBSERVATION_ATTEMPTS: usize = 5;

const PATTERN_COLUMNS: &str = "pattern_id, agent_type, pattern_type, pattern_data, success_rate, \
     usage_count, created_at, last_used_at, is_active, revision";

pub struct PostgresPatternRepository {
    pool: PgPool,
}

impl PostgresPatternRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_with_revision(&self, id: &PatternId) -> Result<Option<(LearningPattern, i64)>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM learning_patterns WHERE pattern_id = $1",
            PATTERN_COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Ok::<_, RepositoryError>((pattern_from_row(&row)?, row.get::<i64, _>("revision"))))
            .transpose()
    }

    /// Inserts unless the id exists. Returns whether the row was written.
    async fn try_insert(&self, pattern: &LearningPattern) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO learning_patterns (
                pattern_id, agent_type, pattern_type, pattern_data, success_rate,
                usage_count, created_at, last_used_at, is_active, revision
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0)
            ON CONFLICT (pattern_id) DO NOTHING
            "#,
        )
        .bind(pattern.pattern_id.as_str())
        .bind(pattern.agent_type.as_str())
        .bind(pattern.pattern_type.as_str())
        .bind(&pattern.pattern_data)
        .bind(pattern.success_rate)
        .bind(pattern.usage_count as i64)
        .bind(pattern.created_at)
        .bind(pattern.last_used_at)
        .bind(pattern.is_active)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Writes `pattern` if the row is still at `revision`.
    async fn try_update(&self, pattern: &LearningPattern, revision: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE learning_patterns SET
                pattern_data = $2,
                success_rate = $3,
                usage_count = $4,
                last_used_at = $5,
                is_active = $6,
                revision = revision + 1
            WHERE pattern_id = $1 AND revision = $7
            "#,
        )
        .bind(pattern.pattern_id.as_str())
        .bind(&pattern.pattern_data)
        .bind(pattern.success_rate)
        .bind(pattern.usage_count as i64)
        .bind(pattern.last_used_at)
        .bind(pattern.is_active)
        .bind(revision)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn query_patterns(
        &self,
        sql: &str,
        agent_type: AgentType,
        extra: Option<QueryArg<'_>>,
        limit: usize,
    ) -> Result<Vec<LearningPattern>, RepositoryError> {
        let mut query = sqlx::query(sql).bind(agent_type.as_str());
        query = match extra {
            Some(QueryArg::Kind(kind)) => query.bind(kind.as_str()),
            Some(QueryArg::MinRate(rate)) => query.bind(rate),
            None => query,
        };
        let rows = query.bind(limit as i64).fetch_all(&self.pool).await?;
        rows.iter().map(pattern_from_row).collect()
    }
}

enum QueryArg<'a> {
    Kind(&'a PatternKind),
    MinRate(f64),
}

fn pattern_from_row(row: &PgRow) -> Result<LearningPattern, RepositoryError> {
    let agent_type: String = row.get("agent_type");
    let pattern_type: String = row.get("pattern_type");
    let pattern_id: String = row.get("pattern_id");
    let usage_count: i64 = row.get("usage_count");

    Ok(LearningPattern {
        pattern_id: PatternId(pattern_id),
        agent_type: agent_type.parse::<AgentType>()?,
        pattern_type: pattern_type.parse::<PatternKind>()?,
        pattern_data: row.get("pattern_data"),
        success_rate: row.get("success_rate"),
        usage_count: usage_count.max(0) as u64,
        created_at: row.get("created_at"),
        last_used_at: row.get("last_used_at"),
        is_active: row.get("is_active"),
    })
}

#[async_trait]
impl PatternRepository for PostgresPatternRepository {
    async fn find_by_id(&self, id: &PatternId) -> Result<Option<LearningPattern>, RepositoryError> {
        Ok(self.find_with_revision(id).await?.map(|(pattern, _)| pattern))
    }

    async fn upsert_observation(
        &self,
        first: LearningPattern,
        success: bool,
    ) -> Result<PatternUpsert, RepositoryError> {
        for attempt in 1..=MAX_OBSERVATION_ATTEMPTS {
            match self.find_with_revision(&first.pattern_id).await? {
                None => {
                    if self.try_insert(&first).await? {
                        return Ok(PatternUpsert::Created(first));
                    }
                }
                Some((mut existing, revision)) => {
                    existing.observe(success);
                    if self.try_update(&existing, revision).await? {
                        return Ok(PatternUpsert::Updated(existing));
                    }
                }
            }
            debug!(pattern_id = %first.pattern_id, attempt, "Pattern changed concurrently, retrying");
        }

        Err(RepositoryError::Conflict(format!(
            "pattern {} kept changing after {} attempts",
            first.pattern_id, MAX_OBSERVATION_ATTEMPTS
        )))
    }

    async fn insert(&self, pattern: &LearningPattern) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO learning_patterns (
                pattern_id, agent_type, pattern_type, pattern_data, success_rate,
                usage_count, created_at, last_used_at, is_active, revision
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0)
            ON CONFLICT (pattern_id) DO UPDATE SET
                agent_type = EXCLUDED.agent_type,
                pattern_type = EXCLUDED.pattern_type,
                pattern_data = EXCLUDED.pattern_data,
                success_rate = EXCLUDED.success_rate,
                usage_count = EXCLUDED.usage_count,
                created_at = EXCLUDED.created_at,
                last_used_at = EXCLUDED.last_used_at,
                is_active = EXCLUDED.is_active,
                revision = learning_patterns.revision + 1
            "#,
        )
        .bind(pattern.pattern_id.as_str())
        .bind(pattern.agent_type.as_str())
        .bind(pattern.pattern_type.as_str())
        .bind(&pattern.pattern_data)
        .bind(pattern.success_rate)
        .bind(pattern.usage_count as i64)
        .bind(pattern.created_at)
        .bind(pattern.last_used_at)
        .bind(pattern.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save pattern: {}", e)))?;

        Ok(())
    }

    async fn decay(&self, id: &PatternId, factor: f64) -> Result<Option<LearningPattern>, RepositoryError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE learning_patterns SET
                success_rate = success_rate * $2,
                usage_count = usage_count + 1,
                last_used_at = NOW(),
                revision = revision + 1
            WHERE pattern_id = $1
            RETURNING {}
            "#,
            PATTERN_COLUMNS
        ))
        .bind(id.as_str())
        .bind(factor)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(pattern_from_row).transpose()
    }

    async fn find_active(
        &self,
        agent_type: AgentType,
        pattern_type: PatternKind,
        limit: usize,
    ) -> Result<Vec<LearningPattern>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM learning_patterns \
             WHERE agent_type = $1 AND pattern_type = $2 AND is_active \
             LIMIT $3",
            PATTERN_COLUMNS
        );
        self.query_patterns(&sql, agent_type, Some(QueryArg::Kind(&pattern_type)), limit)
            .await
    }

    async fn find_best(
        &self,
        agent_type: AgentType,
        pattern_type: PatternKind,
    ) -> Result<Option<LearningPattern>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM learning_patterns \
             WHERE agent_type = $1 AND pattern_type = $2 AND is_active \
             ORDER BY success_rate DESC, usage_count DESC \
             LIMIT $3",
            PATTERN_COLUMNS
        );
        let mut best = self
            .query_patterns(&sql, agent_type, Some(QueryArg::Kind(&pattern_type)), 1)
            .await?;
        Ok(best.pop())
    }

    async fn top_active(&self, agent_type: AgentType, limit: usize) -> Result<Vec<LearningPattern>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM learning_patterns \
             WHERE agent_type = $1 AND is_active \
             ORDER BY success_rate DESC, usage_count DESC \
             LIMIT $2",
            PATTERN_COLUMNS
        );
        self.query_patterns(&sql, agent_type, None, limit).await
    }

    async fn find_successful(
        &self,
        agent_type: AgentType,
        min_success_rate: f64,
        limit: usize,
    ) -> Result<Vec<LearningPattern>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM learning_patterns \
             WHERE agent_type = $1 AND success_rate >= $2 AND is_active \
             ORDER BY success_rate DESC, usage_count DESC \
             LIMIT $3",
            PATTERN_COLUMNS
        );
        self.query_patterns(&sql, agent_type, Some(QueryArg::MinRate(min_success_rate)), limit)
            .await
    }
}
