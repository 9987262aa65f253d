// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the repository traits defined in
//! `crate::domain::repository`.
//!
//! # Available Implementations
//!
//! ## PostgreSQL Repositories
//!
//! - **PostgresFeedbackRepository** - `agent_feedback`
//! - **PostgresPatternRepository** - `learning_patterns`, revision-checked updates
//! - **PostgresMetricsRepository** - `agent_metrics`, single-statement upserts
//! - **PostgresLearningStateRepository** - `agent_learning_state`
//! - **PostgresPromptRepository** - `prompt_evolution`, parent-checked appends
//!
//! ## In-Memory Repositories
//!
//! HashMap-backed storage for tests and single-process deployments. Each
//! read-modify-write happens under one write lock, which gives the same
//! atomicity the PostgreSQL statements provide.

pub mod postgres_feedback;
pub mod postgres_learning_state;
pub mod postgres_metrics;
pub mod postgres_pattern;
pub mod postgres_prompt;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::agent::AgentType;
use crate::domain::feedback::{FeedbackEvent, FeedbackId};
use crate::domain::learning_state::{AgentLearningState, LearningStateUpdate};
use crate::domain::metrics::{AgentMetrics, MetricsDelta};
use crate::domain::pattern::{LearningPattern, PatternId, PatternKind};
use crate::domain::prompt::{mark_active, PromptEvolution, PromptVersion};
use crate::domain::repository::{
    FeedbackRepository, LearningStateRepository, MetricsRepository, PatternRepository, PatternUpsert,
    PromptRepository, RepositoryError,
};

#[derive(Clone, Default)]
pub struct InMemoryFeedbackRepository {
    events: Arc<RwLock<HashMap<FeedbackId, FeedbackEvent>>>,
}

impl InMemoryFeedbackRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedbackRepository for InMemoryFeedbackRepository {
    async fn save(&self, feedback: &FeedbackEvent) -> Result<(), RepositoryError> {
        self.events.write().insert(feedback.feedback_id, feedback.clone());
        Ok(())
    }

    async fn mark_processed(&self, id: FeedbackId) -> Result<(), RepositoryError> {
        let mut events = self.events.write();
        let event = events
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("feedback {}", id)))?;
        event.processed = true;
        Ok(())
    }

    async fn find_by_id(&self, id: FeedbackId) -> Result<Option<FeedbackEvent>, RepositoryError> {
        Ok(self.events.read().get(&id).cloned())
    }

    async fn find_recent(&self, agent_type: AgentType, limit: usize) -> Result<Vec<FeedbackEvent>, RepositoryError> {
        let events = self.events.read();
        let mut recent: Vec<FeedbackEvent> = events
            .values()
            .filter(|e| e.agent_type() == agent_type)
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.truncate(limit);
        Ok(recent)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryPatternRepository {
    patterns: Arc<RwLock<HashMap<PatternId, LearningPattern>>>,
}

impl InMemoryPatternRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn ranked(&self, filter: impl Fn(&LearningPattern) -> bool) -> Vec<LearningPattern> {
        let patterns = self.patterns.read();
        let mut matching: Vec<LearningPattern> = patterns.values().filter(|p| filter(p)).cloned().collect();
        matching.sort_by(|a, b| b.rank_cmp(a));
        matching
    }
}

#[async_trait]
impl PatternRepository for InMemoryPatternRepository {
    async fn find_by_id(&self, id: &PatternId) -> Result<Option<LearningPattern>, RepositoryError> {
        Ok(self.patterns.read().get(id).cloned())
    }

    async fn upsert_observation(
        &self,
        first: LearningPattern,
        success: bool,
    ) -> Result<PatternUpsert, RepositoryError> {
        let mut patterns = self.patterns.write();
        match patterns.get_mut(&first.pattern_id) {
            Some(existing) => {
                existing.observe(success);
                Ok(PatternUpsert::Updated(existing.clone()))
            }
            None => {
                patterns.insert(first.pattern_id.clone(), first.clone());
                Ok(PatternUpsert::Created(first))
            }
        }
    }

    async fn insert(&self, pattern: &LearningPattern) -> Result<(), RepositoryError> {
        self.patterns.write().insert(pattern.pattern_id.clone(), pattern.clone());
        Ok(())
    }

    async fn decay(&self, id: &PatternId, factor: f64) -> Result<Option<LearningPattern>, RepositoryError> {
        let mut patterns = self.patterns.write();
        Ok(patterns.get_mut(id).map(|pattern| {
            pattern.decay(factor);
            pattern.clone()
        }))
    }

    async fn find_active(
        &self,
        agent_type: AgentType,
        pattern_type: PatternKind,
        limit: usize,
    ) -> Result<Vec<LearningPattern>, RepositoryError> {
        let patterns = self.patterns.read();
        Ok(patterns
            .values()
            .filter(|p| p.is_active && p.agent_type == agent_type && p.pattern_type == pattern_type)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_best(
        &self,
        agent_type: AgentType,
        pattern_type: PatternKind,
    ) -> Result<Option<LearningPattern>, RepositoryError> {
        let patterns = self.patterns.read();
        Ok(patterns
            .values()
            .filter(|p| p.is_active && p.agent_type == agent_type && p.pattern_type == pattern_type)
            .max_by(|a, b| a.rank_cmp(b))
            .cloned())
    }

    async fn top_active(&self, agent_type: AgentType, limit: usize) -> Result<Vec<LearningPattern>, RepositoryError> {
        let mut top = self.ranked(|p| p.is_active && p.agent_type == agent_type);
        top.truncate(limit);
        Ok(top)
    }

    async fn find_successful(
        &self,
        agent_type: AgentType,
        min_success_rate: f64,
        limit: usize,
    ) -> Result<Vec<LearningPattern>, RepositoryError> {
        let mut successful =
            self.ranked(|p| p.is_active && p.agent_type == agent_type && p.success_rate >= min_success_rate);
        successful.truncate(limit);
        Ok(successful)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryMetricsRepository {
    metrics: Arc<RwLock<HashMap<AgentType, AgentMetrics>>>,
}

impl InMemoryMetricsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricsRepository for InMemoryMetricsRepository {
    async fn find(&self, agent_type: AgentType) -> Result<Option<AgentMetrics>, RepositoryError> {
        Ok(self.metrics.read().get(&agent_type).cloned())
    }

    async fn list_all(&self) -> Result<Vec<AgentMetrics>, RepositoryError> {
        let metrics = self.metrics.read();
        let mut all: Vec<AgentMetrics> = metrics.values().cloned().collect();
        all.sort_by_key(|m| m.agent_type.as_str());
        Ok(all)
    }

    async fn record(
        &self,
        agent_type: AgentType,
        delta: &MetricsDelta,
        baseline: f64,
    ) -> Result<AgentMetrics, RepositoryError> {
        let mut metrics = self.metrics.write();
        let row = metrics
            .entry(agent_type)
            .or_insert_with(|| AgentMetrics::new(agent_type, baseline));
        row.apply(delta);
        Ok(row.clone())
    }

    async fn record_pattern_learned(&self, agent_type: AgentType, baseline: f64) -> Result<(), RepositoryError> {
        let mut metrics = self.metrics.write();
        let row = metrics
            .entry(agent_type)
            .or_insert_with(|| AgentMetrics::new(agent_type, baseline));
        let now = chrono::Utc::now();
        row.patterns_learned += 1;
        row.last_improvement_at = Some(now);
        row.updated_at = now;
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryLearningStateRepository {
    states: Arc<RwLock<HashMap<AgentType, AgentLearningState>>>,
}

impl InMemoryLearningStateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LearningStateRepository for InMemoryLearningStateRepository {
    async fn get_or_init(&self, default: AgentLearningState) -> Result<AgentLearningState, RepositoryError> {
        let mut states = self.states.write();
        Ok(states.entry(default.agent_type).or_insert(default).clone())
    }

    async fn update(
        &self,
        default: AgentLearningState,
        update: &LearningStateUpdate,
    ) -> Result<AgentLearningState, RepositoryError> {
        let mut states = self.states.write();
        let state = states.entry(default.agent_type).or_insert(default);
        state.apply(update);
        Ok(state.clone())
    }

    async fn record_learning(&self, default: AgentLearningState) -> Result<AgentLearningState, RepositoryError> {
        let mut states = self.states.write();
        let state = states.entry(default.agent_type).or_insert(default);
        state.record_learning();
        Ok(state.clone())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryPromptRepository {
    chains: Arc<RwLock<HashMap<AgentType, Vec<PromptEvolution>>>>,
}

impl InMemoryPromptRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PromptRepository for InMemoryPromptRepository {
    async fn active(&self, agent_type: AgentType) -> Result<Option<PromptEvolution>, RepositoryError> {
        let chains = self.chains.read();
        Ok(chains.get(&agent_type).and_then(|chain| chain.last()).map(|head| {
            let mut head = head.clone();
            head.is_active = true;
            head
        }))
    }

    async fn append(
        &self,
        version: &PromptEvolution,
        expected_parent: Option<PromptVersion>,
    ) -> Result<(), RepositoryError> {
        let mut chains = self.chains.write();
        let chain = chains.entry(version.agent_type).or_default();

        let head = chain.last().map(|v| v.prompt_version);
        if head != expected_parent {
            return Err(RepositoryError::Conflict(format!(
                "prompt chain of {} moved to {} while appending {}",
                version.agent_type,
                head.map(|v| v.to_string()).unwrap_or_else(|| "nothing".to_string()),
                version.prompt_version
            )));
        }
        if chain.iter().any(|v| v.prompt_version == version.prompt_version) {
            return Err(RepositoryError::Conflict(format!(
                "prompt version {} already exists for {}",
                version.prompt_version, version.agent_type
            )));
        }

        chain.push(version.clone());
        Ok(())
    }

    async fn history(&self, agent_type: AgentType) -> Result<Vec<PromptEvolution>, RepositoryError> {
        let mut history = self.chains.read().get(&agent_type).cloned().unwrap_or_default();
        mark_active(&mut history);
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::FeedbackType;
    use crate::domain::feedback::{AgentInteraction, HrChatContext, HrChatOutcome};

    fn chat_feedback() -> FeedbackEvent {
        FeedbackEvent::new(
            AgentInteraction::HrChat {
                context: HrChatContext::default(),
                outcome: HrChatOutcome::default(),
            },
            FeedbackType::Neutral,
            Some(3),
            None,
        )
    }

    #[tokio::test]
    async fn test_feedback_recent_is_newest_first() {
        let repo = InMemoryFeedbackRepository::new();
        let mut older = chat_feedback();
        older.created_at -= chrono::Duration::minutes(5);
        let newer = chat_feedback();
        repo.save(&older).await.unwrap();
        repo.save(&newer).await.unwrap();

        let recent = repo.find_recent(AgentType::HrChat, 10).await.unwrap();
        assert_eq!(recent[0].feedback_id, newer.feedback_id);
        assert_eq!(repo.find_recent(AgentType::HrChat, 1).await.unwrap().len(), 1);
        assert!(repo.find_recent(AgentType::Interview, 10).await.unwrap().is_empty());

        repo.mark_processed(older.feedback_id).await.unwrap();
        assert!(repo.find_by_id(older.feedback_id).await.unwrap().unwrap().processed);
        assert!(matches!(
            repo.mark_processed(FeedbackId::new()).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_upsert_accumulates_same_question() {
        let repo = InMemoryPatternRepository::new();
        let first = repo
            .upsert_observation(LearningPattern::question_template("Explain CAP theorem", "senior", true), true)
            .await
            .unwrap();
        assert!(first.is_created());

        let second = repo
            .upsert_observation(LearningPattern::question_template("Explain CAP theorem", "senior", true), true)
            .await
            .unwrap();
        assert!(!second.is_created());
        assert_eq!(second.pattern().usage_count, 2);
        assert_eq!(second.pattern().success_rate, 1.0);
    }

    #[tokio::test]
    async fn test_decay_missing_pattern() {
        let repo = InMemoryPatternRepository::new();
        assert!(repo.decay(&PatternId::from("nope"), 0.8).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_successful_patterns_ranked() {
        let repo = InMemoryPatternRepository::new();
        for (text, rate) in [("low", 0.5), ("high", 0.95), ("mid", 0.75)] {
            let mut p = LearningPattern::prompt_enhancement(AgentType::HrChat, text, true);
            p.success_rate = rate;
            repo.insert(&p).await.unwrap();
        }
        let found = repo.find_successful(AgentType::HrChat, 0.7, 10).await.unwrap();
        let texts: Vec<&str> = found.iter().filter_map(|p| p.enhancement()).collect();
        assert_eq!(texts, vec!["high", "mid"]);
    }

    #[tokio::test]
    async fn test_metrics_rows_are_created_with_baseline() {
        let repo = InMemoryMetricsRepository::new();
        let delta = MetricsDelta::from_feedback(FeedbackType::Positive, Some(5));
        let row = repo.record(AgentType::Interview, &delta, 0.4).await.unwrap();
        assert_eq!(row.baseline_performance, 0.4);
        assert_eq!(row.total_actions, 1);

        // The baseline is fixed at creation.
        let row = repo.record(AgentType::Interview, &delta, 0.9).await.unwrap();
        assert_eq!(row.baseline_performance, 0.4);

        repo.record_pattern_learned(AgentType::Interview, 0.4).await.unwrap();
        let row = repo.find(AgentType::Interview).await.unwrap().unwrap();
        assert_eq!(row.patterns_learned, 1);
        assert!(row.last_improvement_at.is_some());
    }

    #[tokio::test]
    async fn test_learning_state_initialised_once() {
        let repo = InMemoryLearningStateRepository::new();
        let state = repo.get_or_init(AgentLearningState::new(AgentType::HrChat, 0.1)).await.unwrap();
        assert_eq!(state.exploration_rate, 0.1);

        let state = repo.get_or_init(AgentLearningState::new(AgentType::HrChat, 0.9)).await.unwrap();
        assert_eq!(state.exploration_rate, 0.1);

        let state = repo.record_learning(AgentLearningState::new(AgentType::HrChat, 0.1)).await.unwrap();
        assert_eq!(state.total_learnings, 1);
    }

    #[tokio::test]
    async fn test_prompt_append_checks_parent() {
        let repo = InMemoryPromptRepository::new();
        let first = PromptEvolution::initial(AgentType::Interview, "v1", 0.8);
        repo.append(&first, None).await.unwrap();

        // A second initial append races against the first.
        let err = repo.append(&first, None).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let second = first.successor(first.prompt_version.bump_minor(), "v2", 0.0, vec![]);
        repo.append(&second, Some(PromptVersion::INITIAL)).await.unwrap();

        let history = repo.history(AgentType::Interview).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(!history[0].is_active);
        assert!(history[1].is_active);
        assert_eq!(
            repo.active(AgentType::Interview).await.unwrap().unwrap().prompt_template,
            "v2"
        );
    }
}
