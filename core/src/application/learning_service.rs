// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! # LearningService
//!
//! Entry point of the learning loop. Recording feedback stores the event,
//! folds it into the agent's metrics and, when the agent's learning state has
//! `auto_adapt` set, runs the [`PatternLearner`] and marks the event processed.
//! These steps are sequential with no rollback: a failure part way leaves the
//! earlier steps in place.
//!
//! The remaining operations are read models (metrics, insights, evolution
//! history), learning state configuration, epsilon-greedy pattern selection,
//! and the prompt evolver.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::application::metrics_aggregator::MetricsAggregator;
use crate::application::pattern_learner::PatternLearner;
use crate::application::pattern_selector::{PatternSelection, PatternSelector};
use crate::application::prompt_evolver::{EvolutionHistory, EvolutionResult, PromptEvolver};
use crate::application::repository_factory::LearningRepositories;
use crate::domain::agent::{AgentType, FeedbackType};
use crate::domain::events::LearningEvent;
use crate::domain::feedback::{
    AgentInteraction, CandidateProfile, CvContext, CvOutcome, EmailContext, EmailOutcome, FeedbackEvent, FeedbackId,
    InterviewContext, InterviewOutcome, MAX_RATING, MIN_RATING,
};
use crate::domain::learning_state::{AgentLearningState, LearningStateUpdate};
use crate::domain::metrics::AgentMetrics;
use crate::domain::pattern::{LearningPattern, PatternKind};
use crate::domain::repository::{FeedbackRepository, LearningStateRepository, PatternRepository, RepositoryError};
use crate::domain::service_config::LearningConfig;
use crate::infrastructure::event_bus::EventBus;

/// Patterns listed in insights.
const INSIGHT_PATTERN_LIMIT: usize = 10;
/// Feedback window counted in insights.
const INSIGHT_FEEDBACK_WINDOW: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum LearningError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Feedback as submitted by a client. Keeps the flat wire shape of
/// [`FeedbackEvent`]; the rating is range-checked on record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackSubmission {
    #[serde(flatten)]
    pub interaction: AgentInteraction,
    pub feedback_type: FeedbackType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_rating: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_comments: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackReceipt {
    pub feedback_id: FeedbackId,
    pub agent_type: AgentType,
    /// Whether the pattern learner ran for this event.
    pub learning_applied: bool,
    pub patterns_created: usize,
    pub patterns_updated: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateQuestionRequest {
    pub interview_id: String,
    pub question: String,
    pub rating: i64,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSelectionRequest {
    pub candidate_id: String,
    pub was_hired: bool,
    pub rating: i64,
    #[serde(default)]
    pub candidate_data: CandidateProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailCorrectionRequest {
    pub original_text: String,
    #[serde(default)]
    pub incorrect_result: Value,
    pub correct_result: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTrend {
    Improving,
    Declining,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningInsights {
    pub agent_type: AgentType,
    pub metrics: AgentMetrics,
    pub learning_state: AgentLearningState,
    pub top_patterns: Vec<LearningPattern>,
    pub recent_feedback_count: usize,
    pub learning_enabled: bool,
    pub performance_trend: PerformanceTrend,
}

#[async_trait]
pub trait LearningService: Send + Sync {
    async fn record_feedback(&self, submission: FeedbackSubmission) -> Result<FeedbackReceipt, LearningError>;

    async fn rate_interview_question(&self, request: RateQuestionRequest) -> Result<FeedbackReceipt, LearningError>;

    async fn rate_candidate_selection(
        &self,
        request: CandidateSelectionRequest,
    ) -> Result<FeedbackReceipt, LearningError>;

    async fn correct_email_parsing(&self, request: EmailCorrectionRequest) -> Result<FeedbackReceipt, LearningError>;

    async fn get_metrics(&self, agent_type: AgentType) -> Result<AgentMetrics, LearningError>;

    async fn list_metrics(&self) -> Result<Vec<AgentMetrics>, LearningError>;

    async fn get_insights(&self, agent_type: AgentType) -> Result<LearningInsights, LearningError>;

    async fn get_learning_state(&self, agent_type: AgentType) -> Result<AgentLearningState, LearningError>;

    async fn update_learning_state(
        &self,
        agent_type: AgentType,
        update: LearningStateUpdate,
    ) -> Result<AgentLearningState, LearningError>;

    async fn select_pattern(
        &self,
        agent_type: AgentType,
        pattern_type: PatternKind,
    ) -> Result<PatternSelection, LearningError>;

    async fn evolve_prompt(
        &self,
        agent_type: AgentType,
        current_prompt: &str,
        performance_score: f64,
    ) -> Result<EvolutionResult, LearningError>;

    async fn evolution_history(&self, agent_type: AgentType) -> Result<EvolutionHistory, LearningError>;
}

pub struct StandardLearningService {
    feedback: Arc<dyn FeedbackRepository>,
    patterns: Arc<dyn PatternRepository>,
    states: Arc<dyn LearningStateRepository>,
    aggregator: Arc<MetricsAggregator>,
    learner: PatternLearner,
    selector: PatternSelector,
    evolver: Arc<PromptEvolver>,
    event_bus: Arc<EventBus>,
    default_exploration_rate: f64,
}

impl StandardLearningService {
    pub fn new(repos: &LearningRepositories, event_bus: Arc<EventBus>, config: &LearningConfig) -> Self {
        let selector = PatternSelector::new(repos.patterns.clone());
        Self::with_selector(repos, event_bus, config, selector)
    }

    /// Uses `selector` for pattern selection, e.g. a seeded one in tests.
    pub fn with_selector(
        repos: &LearningRepositories,
        event_bus: Arc<EventBus>,
        config: &LearningConfig,
        selector: PatternSelector,
    ) -> Self {
        let aggregator = Arc::new(MetricsAggregator::new(repos.metrics.clone(), config.baseline_performance));
        let learner = PatternLearner::new(
            repos.patterns.clone(),
            repos.states.clone(),
            aggregator.clone(),
            event_bus.clone(),
        )
        .with_failure_decay(config.failure_decay)
        .with_default_exploration_rate(config.default_exploration_rate);
        let evolver = Arc::new(
            PromptEvolver::new(repos.prompts.clone(), repos.patterns.clone(), event_bus.clone())
                .with_pattern_threshold(config.evolution_min_success_rate, config.evolution_pattern_limit),
        );

        Self {
            feedback: repos.feedback.clone(),
            patterns: repos.patterns.clone(),
            states: repos.states.clone(),
            aggregator,
            learner,
            selector,
            evolver,
            event_bus,
            default_exploration_rate: config.default_exploration_rate,
        }
    }

    /// Shared with the critic, which reads metrics and appends reviewed prompts.
    pub fn aggregator(&self) -> Arc<MetricsAggregator> {
        self.aggregator.clone()
    }

    pub fn evolver(&self) -> Arc<PromptEvolver> {
        self.evolver.clone()
    }

    fn default_state(&self, agent_type: AgentType) -> AgentLearningState {
        AgentLearningState::new(agent_type, self.default_exploration_rate)
    }
}

fn validate_rating(rating: Option<i64>) -> Result<Option<u8>, LearningError> {
    match rating {
        None => Ok(None),
        Some(r) if (i64::from(MIN_RATING)..=i64::from(MAX_RATING)).contains(&r) => Ok(Some(r as u8)),
        Some(r) => Err(LearningError::InvalidInput(format!(
            "user_rating must be between {} and {}, got {}",
            MIN_RATING, MAX_RATING, r
        ))),
    }
}

#[async_trait]
impl LearningService for StandardLearningService {
    async fn record_feedback(&self, submission: FeedbackSubmission) -> Result<FeedbackReceipt, LearningError> {
        let user_rating = validate_rating(submission.user_rating)?;
        let feedback = FeedbackEvent::new(
            submission.interaction,
            submission.feedback_type,
            user_rating,
            submission.user_comments,
        );
        let agent_type = feedback.agent_type();

        self.feedback.save(&feedback).await?;
        self.aggregator
            .record(agent_type, feedback.feedback_type, feedback.user_rating)
            .await?;

        let state = self.states.get_or_init(self.default_state(agent_type)).await?;
        let mut receipt = FeedbackReceipt {
            feedback_id: feedback.feedback_id,
            agent_type,
            learning_applied: false,
            patterns_created: 0,
            patterns_updated: 0,
        };

        if state.auto_adapt {
            let outcome = self.learner.learn(&feedback).await?;
            self.feedback.mark_processed(feedback.feedback_id).await?;
            receipt.learning_applied = true;
            receipt.patterns_created = outcome.created.len();
            receipt.patterns_updated = outcome.updated.len();
        } else {
            debug!(agent_type = %agent_type, "auto_adapt disabled, feedback left unprocessed");
        }

        metrics::counter!(
            "ruya_feedback_total",
            "agent_type" => agent_type.as_str(),
            "feedback_type" => feedback.feedback_type.as_str()
        )
        .increment(1);

        info!(
            feedback_id = %feedback.feedback_id,
            agent_type = %agent_type,
            feedback_type = %feedback.feedback_type,
            rating = ?feedback.user_rating,
            learning_applied = receipt.learning_applied,
            "Feedback recorded"
        );
        self.event_bus.publish(LearningEvent::FeedbackRecorded {
            feedback_id: feedback.feedback_id,
            agent_type,
            feedback_type: feedback.feedback_type,
            user_rating: feedback.user_rating,
            recorded_at: Utc::now(),
        });

        Ok(receipt)
    }

    async fn rate_interview_question(&self, request: RateQuestionRequest) -> Result<FeedbackReceipt, LearningError> {
        let feedback_type = if request.rating >= 4 {
            FeedbackType::Positive
        } else {
            FeedbackType::Negative
        };

        self.record_feedback(FeedbackSubmission {
            interaction: AgentInteraction::Interview {
                context: InterviewContext {
                    interview_id: Some(request.interview_id),
                    questions: vec![request.question],
                    job_level: "mid".to_string(),
                    pattern_id: None,
                },
                outcome: InterviewOutcome {
                    question_rated: true,
                    ..Default::default()
                },
            },
            feedback_type,
            user_rating: Some(request.rating),
            user_comments: request.comments,
        })
        .await
    }

    async fn rate_candidate_selection(
        &self,
        request: CandidateSelectionRequest,
    ) -> Result<FeedbackReceipt, LearningError> {
        let (feedback_type, decision) = if request.was_hired {
            (FeedbackType::Positive, "hired")
        } else {
            (FeedbackType::Negative, "rejected")
        };

        self.record_feedback(FeedbackSubmission {
            interaction: AgentInteraction::CvShortlisting {
                context: CvContext {
                    candidate_id: Some(request.candidate_id),
                    candidate: request.candidate_data,
                    pattern_id: None,
                },
                outcome: CvOutcome {
                    hired: Some(request.was_hired),
                    final_decision: Some(decision.to_string()),
                    ..Default::default()
                },
            },
            feedback_type,
            user_rating: Some(request.rating),
            user_comments: None,
        })
        .await
    }

    async fn correct_email_parsing(&self, request: EmailCorrectionRequest) -> Result<FeedbackReceipt, LearningError> {
        let incorrect_parsing = match request.incorrect_result {
            Value::Null => None,
            other => Some(other),
        };

        // A correction means the original parse was wrong: lowest rating.
        self.record_feedback(FeedbackSubmission {
            interaction: AgentInteraction::EmailScheduling {
                context: EmailContext {
                    email_text: request.original_text,
                    incorrect_parsing,
                    pattern_id: None,
                },
                outcome: EmailOutcome {
                    correction: Some(request.correct_result),
                    corrected_by_user: true,
                    ..Default::default()
                },
            },
            feedback_type: FeedbackType::Correction,
            user_rating: Some(i64::from(MIN_RATING)),
            user_comments: None,
        })
        .await
    }

    async fn get_metrics(&self, agent_type: AgentType) -> Result<AgentMetrics, LearningError> {
        Ok(self.aggregator.get(agent_type).await?)
    }

    async fn list_metrics(&self) -> Result<Vec<AgentMetrics>, LearningError> {
        Ok(self.aggregator.list_all().await?)
    }

    async fn get_insights(&self, agent_type: AgentType) -> Result<LearningInsights, LearningError> {
        let metrics = self.aggregator.get(agent_type).await?;
        let learning_state = self.states.get_or_init(self.default_state(agent_type)).await?;
        let top_patterns = self.patterns.top_active(agent_type, INSIGHT_PATTERN_LIMIT).await?;
        let recent_feedback = self.feedback.find_recent(agent_type, INSIGHT_FEEDBACK_WINDOW).await?;

        let performance_trend = if metrics.is_improving() {
            PerformanceTrend::Improving
        } else {
            PerformanceTrend::Declining
        };

        Ok(LearningInsights {
            agent_type,
            learning_enabled: learning_state.learning_enabled,
            metrics,
            learning_state,
            top_patterns,
            recent_feedback_count: recent_feedback.len(),
            performance_trend,
        })
    }

    async fn get_learning_state(&self, agent_type: AgentType) -> Result<AgentLearningState, LearningError> {
        Ok(self.states.get_or_init(self.default_state(agent_type)).await?)
    }

    async fn update_learning_state(
        &self,
        agent_type: AgentType,
        update: LearningStateUpdate,
    ) -> Result<AgentLearningState, LearningError> {
        update.validate().map_err(LearningError::InvalidInput)?;
        let state = self.states.update(self.default_state(agent_type), &update).await?;
        info!(agent_type = %agent_type, ?update, "Learning state updated");
        Ok(state)
    }

    async fn select_pattern(
        &self,
        agent_type: AgentType,
        pattern_type: PatternKind,
    ) -> Result<PatternSelection, LearningError> {
        let state = self.states.get_or_init(self.default_state(agent_type)).await?;
        let selection = self
            .selector
            .select(agent_type, pattern_type, state.exploration_rate)
            .await?;
        debug!(
            agent_type = %agent_type,
            pattern_type = %pattern_type,
            mode = ?selection.mode,
            pattern_id = ?selection.pattern.as_ref().map(|p| p.pattern_id.as_str()),
            "Pattern selected"
        );
        Ok(selection)
    }

    async fn evolve_prompt(
        &self,
        agent_type: AgentType,
        current_prompt: &str,
        performance_score: f64,
    ) -> Result<EvolutionResult, LearningError> {
        if current_prompt.trim().is_empty() {
            return Err(LearningError::InvalidInput("current_prompt cannot be empty".to_string()));
        }
        if !performance_score.is_finite() {
            return Err(LearningError::InvalidInput("performance_score must be a finite number".to_string()));
        }
        Ok(self.evolver.evolve(agent_type, current_prompt, performance_score).await?)
    }

    async fn evolution_history(&self, agent_type: AgentType) -> Result<EvolutionHistory, LearningError> {
        Ok(self.evolver.history(agent_type).await?)
    }
}
