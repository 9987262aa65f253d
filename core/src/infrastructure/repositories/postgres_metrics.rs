// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Metrics Repository
//!
//! `MetricsRepository` backed by the `agent_metrics` table. Each feedback event
//! is folded in by one `INSERT ... ON CONFLICT DO UPDATE` statement that
//! reproduces [`AgentMetrics::apply`] in SQL, so concurrent submissions never
//! lose an increment.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::agent::AgentType;
use crate::domain::metrics::{AgentMetrics, MetricsDelta};
use crate::domain::repository::{MetricsRepository, RepositoryError};

const METRICS_COLUMNS: &str = "agent_type, version, total_actions, successful_actions, failed_actions, \
     rated_actions, average_rating, baseline_performance, improvement_rate, patterns_learned, \
     last_improvement_at, created_at, updated_at";

pub struct PostgresMetricsRepository {
    pool: PgPool,
}

impl PostgresMetricsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn counter(row: &PgRow, column: &str) -> u64 {
    row.get::<i64, _>(column).max(0) as u64
}

fn metrics_from_row(row: &PgRow) -> Result<AgentMetrics, RepositoryError> {
    let agent_type: String = row.get("agent_type");
    Ok(AgentMetrics {
        agent_type: agent_type.parse::<AgentType>()?,
        version: row.get("version"),
        total_actions: counter(row, "total_actions"),
        successful_actions: counter(row, "successful_actions"),
        failed_actions: counter(row, "failed_actions"),
        rated_actions: counter(row, "rated_actions"),
        average_rating: row.get("average_rating"),
        baseline_performance: row.get("baseline_performance"),
        improvement_rate: row.get("improvement_rate"),
        patterns_learned: counter(row, "patterns_learned"),
        last_improvement_at: row.get("last_improvement_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl MetricsRepository for PostgresMetricsRepository {
    async fn find(&self, agent_type: AgentType) -> Result<Option<AgentMetrics>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM agent_metrics WHERE agent_type = $1",
            METRICS_COLUMNS
        ))
        .bind(agent_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(metrics_from_row).transpose()
    }

    async fn list_all(&self) -> Result<Vec<AgentMetrics>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM agent_metrics ORDER BY agent_type ASC",
            METRICS_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(metrics_from_row).collect()
    }

    async fn record(
        &self,
        agent_type: AgentType,
        delta: &MetricsDelta,
        baseline: f64,
    ) -> Result<AgentMetrics, RepositoryError> {
        // In the DO UPDATE branch every agent_metrics.* reference reads the
        // row as it was before this statement.
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO agent_metrics (
                agent_type, version, total_actions, successful_actions, failed_actions,
                rated_actions, average_rating, baseline_performance, improvement_rate,
                patterns_learned, created_at, updated_at
            )
            VALUES (
                $1, '1.0.0', 1, $2, $3, $4, COALESCE($5::float8, 0), $6,
                CASE WHEN $6 > 0 THEN ($2::float8 - $6) / $6 * 100 ELSE 0 END,
                0, NOW(), NOW()
            )
            ON CONFLICT (agent_type) DO UPDATE SET
                total_actions = agent_metrics.total_actions + 1,
                successful_actions = agent_metrics.successful_actions + $2,
                failed_actions = agent_metrics.failed_actions + $3,
                rated_actions = agent_metrics.rated_actions + $4,
                average_rating = CASE
                    WHEN $5::float8 IS NULL THEN agent_metrics.average_rating
                    ELSE (agent_metrics.average_rating * agent_metrics.rated_actions + $5::float8)
                         / (agent_metrics.rated_actions + 1)
                END,
                improvement_rate = CASE
                    WHEN agent_metrics.baseline_performance > 0 THEN
                        ((agent_metrics.successful_actions + $2)::float8 / (agent_metrics.total_actions + 1)
                         - agent_metrics.baseline_performance)
                        / agent_metrics.baseline_performance * 100
                    ELSE agent_metrics.improvement_rate
                END,
                updated_at = NOW()
            RETURNING {}
            "#,
            METRICS_COLUMNS
        ))
        .bind(agent_type.as_str())
        .bind(i64::from(delta.successful))
        .bind(i64::from(delta.failed))
        .bind(i64::from(delta.rating.is_some()))
        .bind(delta.rating.map(f64::from))
        .bind(baseline)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to record metrics: {}", e)))?;

        metrics_from_row(&row)
    }

    async fn record_pattern_learned(&self, agent_type: AgentType, baseline: f64) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO agent_metrics (
                agent_type, version, total_actions, successful_actions, failed_actions,
                rated_actions, average_rating, baseline_performance, improvement_rate,
                patterns_learned, last_improvement_at, created_at, updated_at
            )
            VALUES ($1, '1.0.0', 0, 0, 0, 0, 0, $2, 0, 1, NOW(), NOW(), NOW())
            ON CONFLICT (agent_type) DO UPDATE SET
                patterns_learned = agent_metrics.patterns_learned + 1,
                last_improvement_at = NOW(),
                updated_at = NOW()
            "#,
        )
        .bind(agent_type.as_str())
        .bind(baseline)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
