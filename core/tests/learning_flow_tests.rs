// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0

use std::sync::Arc;

use ruya_core::application::learning_service::{
    CandidateSelectionRequest, EmailCorrectionRequest, FeedbackSubmission, LearningService, PerformanceTrend,
    StandardLearningService,
};
use ruya_core::application::pattern_selector::PatternSelector;
use ruya_core::application::repository_factory::LearningRepositories;
use ruya_core::domain::agent::{AgentType, FeedbackType};
use ruya_core::domain::events::LearningEvent;
use ruya_core::domain::feedback::{AgentInteraction, CandidateProfile, InterviewContext, InterviewOutcome};
use ruya_core::domain::pattern::{PatternId, PatternKind};
use ruya_core::domain::service_config::LearningConfig;
use ruya_core::infrastructure::event_bus::EventBus;
use serde_json::json;

fn service() -> (StandardLearningService, Arc<EventBus>) {
    let repos = LearningRepositories::in_memory();
    let bus = Arc::new(EventBus::new(128));
    let selector = PatternSelector::with_seed(repos.patterns.clone(), 42);
    let service = StandardLearningService::with_selector(&repos, bus.clone(), &LearningConfig::default(), selector);
    (service, bus)
}

fn interview(question: &str, feedback_type: FeedbackType, rating: i64, pattern_id: Option<String>) -> FeedbackSubmission {
    FeedbackSubmission {
        interaction: AgentInteraction::Interview {
            context: InterviewContext {
                interview_id: Some("int-1".to_string()),
                questions: vec![question.to_string()],
                job_level: "mid".to_string(),
                pattern_id,
            },
            outcome: InterviewOutcome::default(),
        },
        feedback_type,
        user_rating: Some(rating),
        user_comments: None,
    }
}

#[tokio::test]
async fn hired_candidate_teaches_skill_weights() {
    let (service, bus) = service();
    let mut events = bus.subscribe();

    let receipt = service
        .rate_candidate_selection(CandidateSelectionRequest {
            candidate_id: "cand-7".to_string(),
            was_hired: true,
            rating: 5,
            candidate_data: CandidateProfile {
                skills: vec!["Rust".to_string(), "Distributed Systems".to_string()],
                ..Default::default()
            },
        })
        .await
        .unwrap();
    assert!(receipt.learning_applied);
    assert_eq!(receipt.patterns_created, 2);

    let insights = service.get_insights(AgentType::CvShortlisting).await.unwrap();
    assert_eq!(insights.top_patterns.len(), 2);
    assert!(insights
        .top_patterns
        .iter()
        .any(|p| p.pattern_id == PatternId::cv_skill("Distributed Systems")));
    assert_eq!(insights.recent_feedback_count, 1);
    assert_eq!(insights.performance_trend, PerformanceTrend::Improving);
    assert_eq!(insights.learning_state.total_learnings, 2);

    let mut created = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, LearningEvent::PatternCreated { pattern_type: PatternKind::SkillWeight, .. }) {
            created += 1;
        }
    }
    assert_eq!(created, 2);
}

#[tokio::test]
async fn failed_pattern_use_decays_success_rate() {
    let (service, _) = service();
    let question = "Walk me through a production incident you led";

    service
        .record_feedback(interview(question, FeedbackType::Positive, 5, None))
        .await
        .unwrap();

    let pattern_id = PatternId::interview_question(question).0;
    let receipt = service
        .record_feedback(interview(question, FeedbackType::Negative, 2, Some(pattern_id.clone())))
        .await
        .unwrap();
    assert_eq!(receipt.patterns_created, 0);

    let selection = service
        .select_pattern(AgentType::Interview, PatternKind::QuestionTemplate)
        .await
        .unwrap();
    let pattern = selection.pattern.unwrap();
    assert_eq!(pattern.pattern_id.0, pattern_id);
    assert!((pattern.success_rate - 0.8).abs() < 1e-9);
    assert_eq!(pattern.usage_count, 2);

    let metrics = service.get_metrics(AgentType::Interview).await.unwrap();
    assert_eq!(metrics.successful_actions, 1);
    assert_eq!(metrics.failed_actions, 1);
    assert!((metrics.average_rating - 3.5).abs() < 1e-9);
}

#[tokio::test]
async fn email_correction_is_stored_as_correction_pattern() {
    let (service, _) = service();

    let receipt = service
        .correct_email_parsing(EmailCorrectionRequest {
            original_text: "Can we meet Tuesday after 3?".to_string(),
            incorrect_result: json!([{"day": "Thursday"}]),
            correct_result: json!([{"day": "Tuesday", "start": "15:00"}]),
        })
        .await
        .unwrap();
    assert_eq!(receipt.patterns_created, 1);

    let selection = service
        .select_pattern(AgentType::EmailScheduling, PatternKind::Correction)
        .await
        .unwrap();
    let pattern = selection.pattern.unwrap();
    assert_eq!(pattern.success_rate, 1.0);
    assert_eq!(pattern.pattern_data, json!([{"day": "Tuesday", "start": "15:00"}]));

    let metrics = service.get_metrics(AgentType::EmailScheduling).await.unwrap();
    assert_eq!(metrics.total_actions, 1);
    assert_eq!(metrics.successful_actions, 0);
    assert_eq!(metrics.average_rating, 1.0);
}

#[tokio::test]
async fn no_patterns_means_no_selection() {
    let (service, _) = service();
    let selection = service
        .select_pattern(AgentType::HrChat, PatternKind::PromptEnhancement)
        .await
        .unwrap();
    assert!(selection.pattern.is_none());
}
