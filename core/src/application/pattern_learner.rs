// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! # Pattern Learner
//!
//! Turns one feedback event into pattern observations. The first matching
//! rule wins:
//!
//! 1. **Correction** carrying a corrected result: stored verbatim as a new
//!    `correction` pattern with a success rate of 1.0.
//! 2. **Endorsement** (positive, rated 4 or 5): every question, skill or parse
//!    the agent produced is observed as a success, plus any reviewer-supplied
//!    prompt enhancement.
//! 3. **Failure** (negative, or rated 1 or 2): the pattern the agent reported
//!    applying is decayed.
//!
//! Each newly created pattern counts towards the agent's `patterns_learned`
//! metric and its learning state's `total_learnings`.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::application::metrics_aggregator::MetricsAggregator;
use crate::domain::agent::{AgentType, FeedbackType};
use crate::domain::events::LearningEvent;
use crate::domain::feedback::{AgentInteraction, FeedbackEvent};
use crate::domain::learning_state::AgentLearningState;
use crate::domain::pattern::{LearningPattern, PatternId};
use crate::domain::repository::{LearningStateRepository, PatternRepository, PatternUpsert, RepositoryError};
use crate::infrastructure::event_bus::EventBus;

/// What one feedback event changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LearningOutcome {
    pub created: Vec<PatternId>,
    pub updated: Vec<PatternId>,
    pub decayed: Option<PatternId>,
}

impl LearningOutcome {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.decayed.is_none()
    }
}

pub struct PatternLearner {
    patterns: Arc<dyn PatternRepository>,
    states: Arc<dyn LearningStateRepository>,
    metrics: Arc<MetricsAggregator>,
    event_bus: Arc<EventBus>,
    failure_decay: f64,
    default_exploration_rate: f64,
}

impl PatternLearner {
    pub fn new(
        patterns: Arc<dyn PatternRepository>,
        states: Arc<dyn LearningStateRepository>,
        metrics: Arc<MetricsAggregator>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            patterns,
            states,
            metrics,
            event_bus,
            failure_decay: 0.8,
            default_exploration_rate: 0.1,
        }
    }

    pub fn with_failure_decay(mut self, factor: f64) -> Self {
        self.failure_decay = factor;
        self
    }

    pub fn with_default_exploration_rate(mut self, rate: f64) -> Self {
        self.default_exploration_rate = rate;
        self
    }

    pub async fn learn(&self, feedback: &FeedbackEvent) -> Result<LearningOutcome, RepositoryError> {
        if feedback.feedback_type == FeedbackType::Correction {
            return self.apply_correction(feedback).await;
        }
        if feedback.is_endorsement() {
            return self.learn_success(feedback).await;
        }
        if feedback.is_failure() {
            return self.learn_failure(feedback).await;
        }
        Ok(LearningOutcome::default())
    }

    async fn apply_correction(&self, feedback: &FeedbackEvent) -> Result<LearningOutcome, RepositoryError> {
        let mut outcome = LearningOutcome::default();
        let Some(correction) = feedback.interaction.correction() else {
            return Ok(outcome);
        };

        let pattern = LearningPattern::correction(feedback.agent_type(), correction.clone(), Utc::now());
        self.patterns.insert(&pattern).await?;
        self.on_created(&pattern).await?;
        outcome.created.push(pattern.pattern_id);
        Ok(outcome)
    }

    async fn learn_success(&self, feedback: &FeedbackEvent) -> Result<LearningOutcome, RepositoryError> {
        let mut outcome = LearningOutcome::default();

        for first in success_observations(&feedback.interaction) {
            match self.patterns.upsert_observation(first, true).await? {
                PatternUpsert::Created(pattern) => {
                    self.on_created(&pattern).await?;
                    outcome.created.push(pattern.pattern_id);
                }
                PatternUpsert::Updated(pattern) => {
                    debug!(
                        pattern_id = %pattern.pattern_id,
                        success_rate = pattern.success_rate,
                        usage_count = pattern.usage_count,
                        "Pattern updated"
                    );
                    self.event_bus.publish(LearningEvent::PatternUpdated {
                        pattern_id: pattern.pattern_id.clone(),
                        agent_type: pattern.agent_type,
                        success_rate: pattern.success_rate,
                        usage_count: pattern.usage_count,
                        updated_at: Utc::now(),
                    });
                    outcome.updated.push(pattern.pattern_id);
                }
            }
        }

        Ok(outcome)
    }

    async fn learn_failure(&self, feedback: &FeedbackEvent) -> Result<LearningOutcome, RepositoryError> {
        let mut outcome = LearningOutcome::default();
        let Some(pattern_id) = feedback.interaction.pattern_id() else {
            return Ok(outcome);
        };

        let id = PatternId::from(pattern_id);
        match self.patterns.decay(&id, self.failure_decay).await? {
            Some(pattern) => {
                debug!(pattern_id = %id, success_rate = pattern.success_rate, "Pattern decayed");
                self.event_bus.publish(LearningEvent::PatternDecayed {
                    pattern_id: id.clone(),
                    agent_type: pattern.agent_type,
                    success_rate: pattern.success_rate,
                    decayed_at: Utc::now(),
                });
                outcome.decayed = Some(id);
            }
            None => debug!(pattern_id = %id, "Failed pattern is unknown, nothing to decay"),
        }

        Ok(outcome)
    }

    async fn on_created(&self, pattern: &LearningPattern) -> Result<(), RepositoryError> {
        let agent_type = pattern.agent_type;
        debug!(pattern_id = %pattern.pattern_id, pattern_type = %pattern.pattern_type, "Pattern created");

        self.metrics.record_pattern_learned(agent_type).await?;
        self.states.record_learning(self.default_state(agent_type)).await?;

        metrics::counter!(
            "ruya_patterns_created_total",
            "agent_type" => agent_type.as_str(),
            "pattern_type" => pattern.pattern_type.as_str()
        )
        .increment(1);

        self.event_bus.publish(LearningEvent::PatternCreated {
            pattern_id: pattern.pattern_id.clone(),
            agent_type,
            pattern_type: pattern.pattern_type,
            created_at: pattern.created_at,
        });
        Ok(())
    }

    fn default_state(&self, agent_type: AgentType) -> AgentLearningState {
        AgentLearningState::new(agent_type, self.default_exploration_rate)
    }
}

/// First-observation candidates extracted from an endorsed interaction.
fn success_observations(interaction: &AgentInteraction) -> Vec<LearningPattern> {
    let mut observations = Vec::new();

    match interaction {
        AgentInteraction::Interview { context, .. } => {
            for question in context.questions.iter().filter(|q| !q.trim().is_empty()) {
                observations.push(LearningPattern::question_template(question, &context.job_level, true));
            }
        }
        AgentInteraction::CvShortlisting { context, .. } => {
            for skill in context.candidate.skills.iter().filter(|s| !s.trim().is_empty()) {
                observations.push(LearningPattern::skill_weight(skill, true));
            }
        }
        AgentInteraction::EmailScheduling { context, outcome } => {
            observations.push(LearningPattern::parsing(
                &context.email_text,
                &outcome.parsed_slots,
                true,
                Utc::now(),
            ));
        }
        AgentInteraction::HrChat { .. } => {}
    }

    if let Some(enhancement) = interaction.prompt_enhancement() {
        observations.push(LearningPattern::prompt_enhancement(
            interaction.agent_type(),
            enhancement,
            true,
        ));
    }

    observations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::feedback::{
        CandidateProfile, CvContext, CvOutcome, EmailContext, EmailOutcome, HrChatContext, HrChatOutcome,
        InterviewContext, InterviewOutcome,
    };
    use crate::domain::pattern::PatternKind;
    use crate::domain::repository::MetricsRepository;
    use crate::infrastructure::repositories::{
        InMemoryLearningStateRepository, InMemoryMetricsRepository, InMemoryPatternRepository,
    };
    use serde_json::json;

    struct Fixture {
        learner: PatternLearner,
        patterns: Arc<InMemoryPatternRepository>,
        metrics: Arc<InMemoryMetricsRepository>,
        states: Arc<InMemoryLearningStateRepository>,
    }

    fn fixture() -> Fixture {
        let patterns = Arc::new(InMemoryPatternRepository::new());
        let metrics = Arc::new(InMemoryMetricsRepository::new());
        let states = Arc::new(InMemoryLearningStateRepository::new());
        let aggregator = Arc::new(MetricsAggregator::new(metrics.clone(), 0.5));
        let learner = PatternLearner::new(
            patterns.clone(),
            states.clone(),
            aggregator,
            Arc::new(EventBus::new(16)),
        );
        Fixture {
            learner,
            patterns,
            metrics,
            states,
        }
    }

    fn interview(questions: &[&str], pattern_id: Option<&str>) -> AgentInteraction {
        AgentInteraction::Interview {
            context: InterviewContext {
                questions: questions.iter().map(|q| q.to_string()).collect(),
                job_level: "senior".to_string(),
                pattern_id: pattern_id.map(str::to_string),
                ..Default::default()
            },
            outcome: InterviewOutcome::default(),
        }
    }

    #[tokio::test]
    async fn test_repeated_endorsement_accumulates_one_pattern() {
        let f = fixture();
        for _ in 0..2 {
            let feedback = FeedbackEvent::new(
                interview(&["Explain CAP theorem"], None),
                FeedbackType::Positive,
                Some(5),
                None,
            );
            f.learner.learn(&feedback).await.unwrap();
        }

        let id = PatternId::interview_question("Explain CAP theorem");
        let pattern = f.patterns.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(pattern.usage_count, 2);
        assert_eq!(pattern.success_rate, 1.0);
        assert_eq!(pattern.pattern_type, PatternKind::QuestionTemplate);
        assert_eq!(pattern.pattern_data["job_level"], "senior");

        // only the first observation created a pattern
        let metrics = f.metrics.find(AgentType::Interview).await.unwrap().unwrap();
        assert_eq!(metrics.patterns_learned, 1);
        let state = f
            .states
            .get_or_init(AgentLearningState::new(AgentType::Interview, 0.1))
            .await
            .unwrap();
        assert_eq!(state.total_learnings, 1);
        assert!(state.last_learning_at.is_some());
    }

    #[tokio::test]
    async fn test_correction_wins_over_low_rating() {
        let f = fixture();
        let feedback = FeedbackEvent::new(
            AgentInteraction::EmailScheduling {
                context: EmailContext {
                    email_text: "I'm free Tuesday afternoon".to_string(),
                    incorrect_parsing: Some(json!({ "day": "Monday" })),
                    pattern_id: None,
                },
                outcome: EmailOutcome {
                    correction: Some(json!({ "day": "Tuesday", "from": "13:00" })),
                    corrected_by_user: true,
                    ..Default::default()
                },
            },
            FeedbackType::Correction,
            Some(1),
            None,
        );

        let outcome = f.learner.learn(&feedback).await.unwrap();
        assert_eq!(outcome.created.len(), 1);

        let pattern = f.patterns.find_by_id(&outcome.created[0]).await.unwrap().unwrap();
        assert_eq!(pattern.pattern_type, PatternKind::Correction);
        assert_eq!(pattern.success_rate, 1.0);
        assert_eq!(pattern.usage_count, 1);
        assert_eq!(pattern.pattern_data["day"], "Tuesday");
        assert!(pattern.pattern_id.as_str().starts_with("email_scheduling_"));
    }

    #[tokio::test]
    async fn test_correction_without_value_is_noop() {
        let f = fixture();
        let feedback = FeedbackEvent::new(interview(&["Q"], None), FeedbackType::Correction, Some(5), None);
        assert!(f.learner.learn(&feedback).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_decays_reported_pattern() {
        let f = fixture();
        let seed = LearningPattern::question_template("Explain ACID", "mid", true);
        f.patterns.insert(&seed).await.unwrap();

        let feedback = FeedbackEvent::new(
            interview(&["Explain ACID"], Some(seed.pattern_id.as_str())),
            FeedbackType::Negative,
            None,
            None,
        );
        let outcome = f.learner.learn(&feedback).await.unwrap();
        assert_eq!(outcome.decayed, Some(seed.pattern_id.clone()));

        let pattern = f.patterns.find_by_id(&seed.pattern_id).await.unwrap().unwrap();
        assert!((pattern.success_rate - 0.8).abs() < 1e-12);
        assert_eq!(pattern.usage_count, 2);
    }

    #[tokio::test]
    async fn test_failure_without_pattern_id_is_noop() {
        let f = fixture();
        let feedback = FeedbackEvent::new(interview(&["Q"], None), FeedbackType::Neutral, Some(2), None);
        assert!(f.learner.learn(&feedback).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_skill_weights_and_enhancement() {
        let f = fixture();
        let feedback = FeedbackEvent::new(
            AgentInteraction::CvShortlisting {
                context: CvContext {
                    candidate: CandidateProfile {
                        skills: vec!["Machine Learning".to_string(), "Rust".to_string()],
                        ..Default::default()
                    },
                    ..Default::default()
                },
                outcome: CvOutcome {
                    hired: Some(true),
                    prompt_enhancement: Some("Weigh shipped projects over certificates".to_string()),
                    ..Default::default()
                },
            },
            FeedbackType::Positive,
            Some(4),
            None,
        );

        let outcome = f.learner.learn(&feedback).await.unwrap();
        assert_eq!(outcome.created.len(), 3);
        assert!(outcome.created.contains(&PatternId::cv_skill("machine learning")));
        assert!(outcome
            .created
            .contains(&PatternId::prompt_enhancement(AgentType::CvShortlisting, "Weigh shipped projects over certificates")));
    }

    #[tokio::test]
    async fn test_unrated_positive_learns_nothing() {
        let f = fixture();
        let feedback = FeedbackEvent::new(
            AgentInteraction::HrChat {
                context: HrChatContext::default(),
                outcome: HrChatOutcome::default(),
            },
            FeedbackType::Positive,
            None,
            None,
        );
        assert!(f.learner.learn(&feedback).await.unwrap().is_empty());
    }
}
