// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Feedback Repository
//!
//! `FeedbackRepository` backed by the `agent_feedback` table. The typed
//! interaction is stored as separate `context` / `outcome` JSONB columns next
//! to its `agent_type` discriminator and reassembled on read.

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::agent::{AgentType, FeedbackType};
use crate::domain::feedback::{AgentInteraction, FeedbackEvent, FeedbackId};
use crate::domain::repository::{FeedbackRepository, RepositoryError};

pub struct PostgresFeedbackRepository {
    pool: PgPool,
}

impl PostgresFeedbackRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const FEEDBACK_COLUMNS: &str = "feedback_id, agent_type, feedback_type, context, outcome, \
     user_rating, user_comments, created_at, processed";

fn feedback_from_row(row: &PgRow) -> Result<FeedbackEvent, RepositoryError> {
    let agent_type: String = row.get("agent_type");
    let context: Value = row.get("context");
    let outcome: Value = row.get("outcome");
    let interaction: AgentInteraction = serde_json::from_value(json!({
        "agent_type": agent_type,
        "context": context,
        "outcome": outcome,
    }))?;

    let feedback_type: String = row.get("feedback_type");
    let user_rating: Option<i16> = row.get("user_rating");

    Ok(FeedbackEvent {
        feedback_id: FeedbackId(row.get("feedback_id")),
        interaction,
        feedback_type: feedback_type.parse::<FeedbackType>()?,
        user_rating: user_rating.map(|r| r as u8),
        user_comments: row.get("user_comments"),
        created_at: row.get("created_at"),
        processed: row.get("processed"),
    })
}

#[async_trait]
impl FeedbackRepository for PostgresFeedbackRepository {
    async fn save(&self, feedback: &FeedbackEvent) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO agent_feedback (
                feedback_id, agent_type, feedback_type, context, outcome,
                user_rating, user_comments, created_at, processed
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (feedback_id) DO UPDATE SET processed = EXCLUDED.processed
            "#,
        )
        .bind(feedback.feedback_id.0)
        .bind(feedback.agent_type().as_str())
        .bind(feedback.feedback_type.as_str())
        .bind(feedback.interaction.context_json())
        .bind(feedback.interaction.outcome_json())
        .bind(feedback.user_rating.map(i16::from))
        .bind(&feedback.user_comments)
        .bind(feedback.created_at)
        .bind(feedback.processed)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save feedback: {}", e)))?;

        Ok(())
    }

    async fn mark_processed(&self, id: FeedbackId) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE agent_feedback SET processed = TRUE WHERE feedback_id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("feedback {}", id)));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: FeedbackId) -> Result<Option<FeedbackEvent>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM agent_feedback WHERE feedback_id = $1",
            FEEDBACK_COLUMNS
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(feedback_from_row).transpose()
    }

    async fn find_recent(&self, agent_type: AgentType, limit: usize) -> Result<Vec<FeedbackEvent>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM agent_feedback WHERE agent_type = $1 ORDER BY created_at DESC LIMIT $2",
            FEEDBACK_COLUMNS
        ))
        .bind(agent_type.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(feedback_from_row).collect()
    }
}
