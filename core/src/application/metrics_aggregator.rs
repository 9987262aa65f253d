// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0

use std::sync::Arc;

use crate::domain::agent::{AgentType, FeedbackType};
use crate::domain::metrics::{AgentMetrics, MetricsDelta};
use crate::domain::repository::{MetricsRepository, RepositoryError};

/// Folds feedback events into per-agent [`AgentMetrics`].
pub struct MetricsAggregator {
    repo: Arc<dyn MetricsRepository>,
    baseline: f64,
}

impl MetricsAggregator {
    pub fn new(repo: Arc<dyn MetricsRepository>, baseline: f64) -> Self {
        Self { repo, baseline }
    }

    pub async fn record(
        &self,
        agent_type: AgentType,
        feedback_type: FeedbackType,
        user_rating: Option<u8>,
    ) -> Result<AgentMetrics, RepositoryError> {
        let delta = MetricsDelta::from_feedback(feedback_type, user_rating);
        self.repo.record(agent_type, &delta, self.baseline).await
    }

    pub async fn record_pattern_learned(&self, agent_type: AgentType) -> Result<(), RepositoryError> {
        self.repo.record_pattern_learned(agent_type, self.baseline).await
    }

    /// Stored metrics, or zero-valued metrics when the agent has none yet.
    pub async fn get(&self, agent_type: AgentType) -> Result<AgentMetrics, RepositoryError> {
        Ok(self
            .repo
            .find(agent_type)
            .await?
            .unwrap_or_else(|| AgentMetrics::new(agent_type, self.baseline)))
    }

    pub async fn list_all(&self) -> Result<Vec<AgentMetrics>, RepositoryError> {
        self.repo.list_all().await
    }
}
