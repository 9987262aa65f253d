// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! # CriticService
//!
//! LLM-driven review of an agent's system prompt.
//!
//! An evaluation sends the agent's active prompt together with its measured
//! performance (metrics plus a sample of recent feedback) to the critic model
//! and stores the returned verdict as a `pending_review` [`PromptEvaluation`].
//! Nothing changes for the agent until a reviewer approves the evaluation; the
//! improved prompt is then appended to the agent's prompt chain as a new major
//! version.
//!
//! Model output that is not valid JSON is recovered locally with a heuristic
//! verdict flagged for manual review. LLM calls are never retried.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::application::metrics_aggregator::MetricsAggregator;
use crate::application::prompt_evolver::PromptEvolver;
use crate::domain::agent::{AgentType, FeedbackType};
use crate::domain::evaluation::{
    CriticVerdict, EvaluationStatus, InteractionSample, PerformanceSnapshot, PromptEvaluation,
};
use crate::domain::events::LearningEvent;
use crate::domain::feedback::FeedbackEvent;
use crate::domain::llm::{ChatMessage, GenerationOptions, LLMError, LLMProvider, ProviderInfo};
use crate::domain::repository::{EvaluationRepository, FeedbackRepository, RepositoryError};
use crate::infrastructure::event_bus::EventBus;

pub const CRITIC_SYSTEM_PROMPT: &str = r#"You are an expert AI prompt engineer and quality evaluator. Your role is to:
1. Analyze agent performance based on input-output pairs and metrics
2. Identify weaknesses in agent responses
3. Propose specific, actionable improvements to the agent's system prompt
4. Provide clear reasoning for each improvement

When evaluating:
- Consider user feedback ratings (1-5 stars)
- Analyze task success rates
- Review response quality, accuracy, and helpfulness
- Identify patterns in failures or low ratings

When improving prompts:
- Be specific and actionable
- Preserve core agent functionality
- Add guardrails for common failure modes
- Improve clarity and instruction structure
- Keep prompts concise but comprehensive

Respond in JSON format:
{
    "evaluation_score": <1-10>,
    "issues_identified": ["issue1", "issue2", ...],
    "improvement_reasoning": "Clear explanation of why changes are needed",
    "improved_prompt": "The complete improved system prompt",
    "expected_improvements": ["improvement1", "improvement2", ...]
}
"#;

pub const FALLBACK_ISSUE: &str = "JSON parsing failed - manual review recommended";
const FALLBACK_SCORE: f64 = 5.0;
const FALLBACK_PROMPT_PLACEHOLDER: &str =
    "Please review the improvement_reasoning field for details. Consider triggering a new evaluation.";
/// Extracted prompts this short are treated as noise.
const MIN_EXTRACTED_PROMPT_CHARS: usize = 20;
const RAW_EXCERPT_CHARS: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum CriticError {
    #[error("Evaluation not found: {0}")]
    NotFound(String),

    #[error("Evaluation {id} was already reviewed ({status})")]
    AlreadyReviewed { id: String, status: EvaluationStatus },

    #[error("LLM error: {0}")]
    Llm(#[from] LLMError),

    #[error(transparent)]
    Repository(RepositoryError),

    #[error("Evaluation storage error: {0}")]
    Storage(RepositoryError),
}

#[derive(Debug, Clone, Serialize)]
pub struct CriticHealth {
    pub status: &'static str,
    #[serde(flatten)]
    pub provider: ProviderInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[async_trait]
pub trait CriticService: Send + Sync {
    /// Evaluates the agent's active prompt against up to `limit_samples`
    /// recent interactions (the configured default when `None`).
    async fn evaluate(
        &self,
        agent_type: AgentType,
        limit_samples: Option<usize>,
    ) -> Result<PromptEvaluation, CriticError>;

    /// Newest first.
    async fn list_evaluations(
        &self,
        agent_type: Option<AgentType>,
        status: Option<EvaluationStatus>,
    ) -> Result<Vec<PromptEvaluation>, CriticError>;

    async fn get_evaluation(&self, evaluation_id: &str) -> Result<PromptEvaluation, CriticError>;

    async fn approve(&self, evaluation_id: &str) -> Result<PromptEvaluation, CriticError>;

    async fn reject(&self, evaluation_id: &str, reason: Option<String>) -> Result<PromptEvaluation, CriticError>;

    async fn current_prompt(&self, agent_type: AgentType) -> Result<String, CriticError>;

    async fn health(&self) -> CriticHealth;
}

pub struct StandardCriticService {
    llm: Arc<dyn LLMProvider>,
    evaluations: Arc<dyn EvaluationRepository>,
    feedback: Arc<dyn FeedbackRepository>,
    metrics: Arc<MetricsAggregator>,
    evolver: Arc<PromptEvolver>,
    event_bus: Arc<EventBus>,
    default_sample_limit: usize,
}

impl StandardCriticService {
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        evaluations: Arc<dyn EvaluationRepository>,
        feedback: Arc<dyn FeedbackRepository>,
        metrics: Arc<MetricsAggregator>,
        evolver: Arc<PromptEvolver>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            llm,
            evaluations,
            feedback,
            metrics,
            evolver,
            event_bus,
            default_sample_limit: 10,
        }
    }

    pub fn with_default_sample_limit(mut self, limit: usize) -> Self {
        self.default_sample_limit = limit;
        self
    }

    async fn performance_snapshot(
        &self,
        agent_type: AgentType,
        limit: usize,
    ) -> Result<PerformanceSnapshot, CriticError> {
        let metrics = self.metrics.get(agent_type).await.map_err(CriticError::Repository)?;
        let recent = self
            .feedback
            .find_recent(agent_type, limit)
            .await
            .map_err(CriticError::Repository)?;

        Ok(PerformanceSnapshot {
            avg_feedback_rating: (metrics.rated_actions > 0).then_some(metrics.average_rating),
            success_rate: (metrics.total_actions > 0).then(|| metrics.success_rate()),
            total_interactions: metrics.total_actions,
            input_output_pairs: recent.iter().map(sample_from_feedback).collect(),
        })
    }

    async fn load(&self, evaluation_id: &str) -> Result<PromptEvaluation, CriticError> {
        self.evaluations
            .find_by_id(evaluation_id)
            .await
            .map_err(CriticError::Storage)?
            .ok_or_else(|| CriticError::NotFound(evaluation_id.to_string()))
    }

    async fn load_pending(&self, evaluation_id: &str) -> Result<PromptEvaluation, CriticError> {
        let evaluation = self.load(evaluation_id).await?;
        if !evaluation.is_pending() {
            return Err(CriticError::AlreadyReviewed {
                id: evaluation.evaluation_id,
                status: evaluation.status,
            });
        }
        Ok(evaluation)
    }

    fn announce_review(&self, evaluation: &PromptEvaluation) {
        self.event_bus.publish(LearningEvent::EvaluationReviewed {
            evaluation_id: evaluation.evaluation_id.clone(),
            agent_type: evaluation.agent_type,
            status: evaluation.status,
            reviewed_at: Utc::now(),
        });
    }
}

#[async_trait]
impl CriticService for StandardCriticService {
    async fn evaluate(
        &self,
        agent_type: AgentType,
        limit_samples: Option<usize>,
    ) -> Result<PromptEvaluation, CriticError> {
        let limit = limit_samples.unwrap_or(self.default_sample_limit);
        info!(agent_type = %agent_type, samples = limit, "Evaluating agent prompt");

        let current_prompt = self
            .evolver
            .current_prompt(agent_type)
            .await
            .map_err(CriticError::Repository)?;
        let snapshot = self.performance_snapshot(agent_type, limit).await?;

        let messages = [
            ChatMessage::system(CRITIC_SYSTEM_PROMPT),
            ChatMessage::user(build_evaluation_context(agent_type, &current_prompt, &snapshot)),
        ];
        let options = GenerationOptions {
            json_mode: true,
            ..Default::default()
        };
        let response = self.llm.generate(&messages, &options).await?;
        let verdict = parse_verdict(&response.text);

        let evaluation = PromptEvaluation::pending(agent_type, current_prompt, verdict, snapshot);
        self.evaluations.save(&evaluation).await.map_err(CriticError::Storage)?;

        metrics::counter!("ruya_critic_evaluations_total", "agent_type" => agent_type.as_str()).increment(1);
        info!(
            evaluation_id = %evaluation.evaluation_id,
            agent_type = %agent_type,
            score = evaluation.evaluation_score,
            model = %response.model,
            "Evaluation stored for review"
        );
        self.event_bus.publish(LearningEvent::EvaluationCreated {
            evaluation_id: evaluation.evaluation_id.clone(),
            agent_type,
            evaluation_score: evaluation.evaluation_score,
            created_at: evaluation.timestamp,
        });

        Ok(evaluation)
    }

    async fn list_evaluations(
        &self,
        agent_type: Option<AgentType>,
        status: Option<EvaluationStatus>,
    ) -> Result<Vec<PromptEvaluation>, CriticError> {
        self.evaluations.list(agent_type, status).await.map_err(CriticError::Storage)
    }

    async fn get_evaluation(&self, evaluation_id: &str) -> Result<PromptEvaluation, CriticError> {
        self.load(evaluation_id).await
    }

    async fn approve(&self, evaluation_id: &str) -> Result<PromptEvaluation, CriticError> {
        let mut evaluation = self.load_pending(evaluation_id).await?;

        let version = self
            .evolver
            .adopt(
                evaluation.agent_type,
                &evaluation.improved_prompt,
                &evaluation.evaluation_id,
                evaluation.expected_improvements.clone(),
            )
            .await
            .map_err(CriticError::Repository)?;

        evaluation.approve();
        self.evaluations.save(&evaluation).await.map_err(CriticError::Storage)?;

        info!(
            evaluation_id,
            agent_type = %evaluation.agent_type,
            version = %version.prompt_version,
            "Improvement approved"
        );
        self.announce_review(&evaluation);
        Ok(evaluation)
    }

    async fn reject(&self, evaluation_id: &str, reason: Option<String>) -> Result<PromptEvaluation, CriticError> {
        let mut evaluation = self.load_pending(evaluation_id).await?;
        evaluation.reject(reason);
        self.evaluations.save(&evaluation).await.map_err(CriticError::Storage)?;

        info!(evaluation_id, reason = ?evaluation.rejection_reason, "Improvement rejected");
        self.announce_review(&evaluation);
        Ok(evaluation)
    }

    async fn current_prompt(&self, agent_type: AgentType) -> Result<String, CriticError> {
        self.evolver.current_prompt(agent_type).await.map_err(CriticError::Repository)
    }

    async fn health(&self) -> CriticHealth {
        let provider = self.llm.describe();
        match self.llm.health_check().await {
            Ok(()) => CriticHealth {
                status: "healthy",
                provider,
                error: None,
            },
            Err(e) => CriticHealth {
                status: "unhealthy",
                provider,
                error: Some(e.to_string()),
            },
        }
    }
}

fn sample_from_feedback(feedback: &FeedbackEvent) -> InteractionSample {
    let mut output = feedback.interaction.outcome_json().to_string();
    if let Some(comments) = feedback.user_comments.as_deref().filter(|c| !c.trim().is_empty()) {
        output.push_str(&format!(" (reviewer: {})", comments.trim()));
    }

    InteractionSample {
        input: feedback.interaction.context_json().to_string(),
        output,
        rating: feedback.user_rating,
        success: !feedback.is_failure() && feedback.feedback_type != FeedbackType::Correction,
    }
}

/// User message sent to the critic model.
pub fn build_evaluation_context(agent_type: AgentType, current_prompt: &str, data: &PerformanceSnapshot) -> String {
    let rating = data
        .avg_feedback_rating
        .map(|r| format!("{:.2}", r))
        .unwrap_or_else(|| "N/A".to_string());
    let success = data
        .success_rate
        .map(|r| format!("{:.1}%", r * 100.0))
        .unwrap_or_else(|| "N/A".to_string());

    let mut context = format!(
        "# Agent Evaluation Request\n\n\
         **Agent Type:** {agent_type}\n\
         **Current System Prompt:**\n```\n{current_prompt}\n```\n\n\
         **Performance Metrics:**\n\
         - Average Feedback Rating: {rating}/5.0\n\
         - Task Success Rate: {success}\n\
         - Total Interactions: {total}\n\n\
         **Sample Interactions:**\n",
        total = data.total_interactions,
    );

    for (i, sample) in data.input_output_pairs.iter().enumerate() {
        let rating = sample
            .rating
            .map(|r| r.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        context.push_str(&format!(
            "\n---\n**Interaction {}:**\n- Input: {}\n- Output: {}\n- User Rating: {}/5\n- Success: {}\n",
            i + 1,
            sample.input,
            sample.output,
            rating,
            sample.success
        ));
    }

    context.push_str(
        "\n---\n\nPlease analyze this agent's performance and suggest improvements to the system prompt.\n\
         Focus on addressing low-rated interactions and improving overall success rate.\n",
    );
    context
}

/// Parses the model's verdict, unwrapping a fenced code block if needed. Any
/// JSON object is accepted with missing or mistyped fields defaulted; only
/// output with no JSON object in it goes to [`fallback_verdict`].
pub fn parse_verdict(raw: &str) -> CriticVerdict {
    let object = serde_json::from_str::<Value>(raw.trim())
        .ok()
        .filter(Value::is_object)
        .or_else(|| {
            extract_json(raw)
                .and_then(|inner| serde_json::from_str::<Value>(&inner).ok())
                .filter(Value::is_object)
        });

    match object {
        Some(object) => verdict_from_object(&object),
        None => {
            warn!("Critic response is not a valid JSON verdict, using fallback");
            fallback_verdict(raw)
        }
    }
}

fn verdict_from_object(object: &Value) -> CriticVerdict {
    let evaluation_score = match object.get("evaluation_score") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    let evaluation_score = evaluation_score.unwrap_or_else(|| {
        warn!("Critic verdict has no numeric evaluation_score, defaulting to {}", FALLBACK_SCORE);
        FALLBACK_SCORE
    });

    let improved_prompt = object
        .get("improved_prompt")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|prompt| !prompt.is_empty())
        .unwrap_or(FALLBACK_PROMPT_PLACEHOLDER)
        .to_string();

    CriticVerdict {
        evaluation_score,
        issues_identified: string_list(object.get("issues_identified")),
        improvement_reasoning: object
            .get("improvement_reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        improved_prompt,
        expected_improvements: string_list(object.get("expected_improvements")),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

/// Content of the first ```json (or bare ```) fenced block.
pub fn extract_json(text: &str) -> Option<String> {
    for marker in ["```json", "```"] {
        if let Some(start) = text.find(marker) {
            let content_start = start + marker.len();
            if let Some(end_offset) = text[content_start..].find("```") {
                let content_end = content_start + end_offset;
                return Some(text[content_start..content_end].trim().to_string());
            }
        }
    }
    None
}

/// Heuristic verdict for unparseable output: keeps whatever follows an
/// `"improved_prompt"` key when it is long enough, and flags the evaluation
/// for manual review.
pub fn fallback_verdict(raw: &str) -> CriticVerdict {
    let mut improved = raw.to_string();
    if let Some((_, after_key)) = raw.split_once("\"improved_prompt\"") {
        let candidate = after_key
            .split("\",")
            .next()
            .unwrap_or_default()
            .trim_matches(|c| c == ':' || c == ' ' || c == '"');
        if candidate.chars().count() > MIN_EXTRACTED_PROMPT_CHARS {
            improved = candidate.to_string();
        }
    }
    if improved.chars().count() <= MIN_EXTRACTED_PROMPT_CHARS {
        improved = FALLBACK_PROMPT_PLACEHOLDER.to_string();
    }

    let excerpt: String = raw.chars().take(RAW_EXCERPT_CHARS).collect();
    CriticVerdict {
        evaluation_score: FALLBACK_SCORE,
        issues_identified: vec![FALLBACK_ISSUE.to_string()],
        improvement_reasoning: format!(
            "The LLM response could not be parsed as JSON. Raw response:\n\n{}...",
            excerpt
        ),
        improved_prompt: improved,
        expected_improvements: vec![
            "Improved response quality".to_string(),
            "Better structured output".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::repository_factory::LearningRepositories;
    use crate::domain::llm::GenerationResponse;
    use crate::infrastructure::evaluation_store::InMemoryEvaluationRepository;
    use parking_lot::Mutex;

    const VERDICT_JSON: &str = r#"{
        "evaluation_score": 6.5,
        "issues_identified": ["No scoring rubric"],
        "improvement_reasoning": "Shortlists vary between runs",
        "improved_prompt": "You are an expert CV screening specialist. Score each candidate 1-10 against the listed requirements.",
        "expected_improvements": ["Consistent shortlists"]
    }"#;

    struct CannedLLM {
        reply: String,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl CannedLLM {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for CannedLLM {
        async fn generate(
            &self,
            messages: &[ChatMessage],
            options: &GenerationOptions,
        ) -> Result<GenerationResponse, LLMError> {
            assert!(options.json_mode);
            self.seen.lock().push(messages.to_vec());
            Ok(GenerationResponse {
                text: self.reply.clone(),
                provider: "canned".to_string(),
                model: "canned-1".to_string(),
            })
        }

        async fn health_check(&self) -> Result<(), LLMError> {
            Err(LLMError::Network("connection refused".to_string()))
        }

        fn describe(&self) -> ProviderInfo {
            ProviderInfo {
                provider: "canned".to_string(),
                model: "canned-1".to_string(),
                endpoint: "memory://".to_string(),
            }
        }
    }

    fn critic(reply: &str) -> (StandardCriticService, Arc<CannedLLM>, Arc<PromptEvolver>) {
        let repos = LearningRepositories::in_memory();
        let bus = Arc::new(EventBus::new(16));
        let llm = Arc::new(CannedLLM::new(reply));
        let evolver = Arc::new(PromptEvolver::new(repos.prompts.clone(), repos.patterns.clone(), bus.clone()));
        let service = StandardCriticService::new(
            llm.clone(),
            Arc::new(InMemoryEvaluationRepository::new()),
            repos.feedback.clone(),
            Arc::new(MetricsAggregator::new(repos.metrics.clone(), 0.5)),
            evolver.clone(),
            bus,
        );
        (service, llm, evolver)
    }

    #[tokio::test]
    async fn test_evaluate_stores_pending_evaluation() {
        let (service, llm, _) = critic(VERDICT_JSON);
        let evaluation = service.evaluate(AgentType::CvShortlisting, None).await.unwrap();

        assert_eq!(evaluation.status, EvaluationStatus::PendingReview);
        assert_eq!(evaluation.evaluation_score, 6.5);
        assert_eq!(evaluation.current_prompt, AgentType::CvShortlisting.default_system_prompt());
        assert!(evaluation.evaluation_id.starts_with("cv_shortlisting_"));

        let seen = llm.seen.lock();
        assert_eq!(seen[0][0].content, CRITIC_SYSTEM_PROMPT);
        assert!(seen[0][1].content.contains("**Agent Type:** cv_shortlisting"));

        let listed = service.list_evaluations(None, Some(EvaluationStatus::PendingReview)).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_approve_appends_prompt_version() {
        let (service, _, evolver) = critic(VERDICT_JSON);
        let evaluation = service.evaluate(AgentType::CvShortlisting, Some(5)).await.unwrap();

        let approved = service.approve(&evaluation.evaluation_id).await.unwrap();
        assert_eq!(approved.status, EvaluationStatus::Approved);
        assert!(approved.approved_at.is_some());

        let prompt = service.current_prompt(AgentType::CvShortlisting).await.unwrap();
        assert!(prompt.contains("Score each candidate 1-10"));
        let active = evolver.active_version(AgentType::CvShortlisting).await.unwrap().unwrap();
        assert_eq!(active.evaluation_id.as_deref(), Some(evaluation.evaluation_id.as_str()));

        let err = service.reject(&evaluation.evaluation_id, None).await.unwrap_err();
        assert!(matches!(err, CriticError::AlreadyReviewed { .. }));
    }

    #[tokio::test]
    async fn test_reject_keeps_prompt() {
        let (service, _, _) = critic(VERDICT_JSON);
        let evaluation = service.evaluate(AgentType::HrChat, None).await.unwrap();
        let rejected = service
            .reject(&evaluation.evaluation_id, Some("Not aligned with business requirements".to_string()))
            .await
            .unwrap();

        assert_eq!(rejected.status, EvaluationStatus::Rejected);
        assert_eq!(
            rejected.rejection_reason.as_deref(),
            Some("Not aligned with business requirements")
        );
        assert_eq!(
            service.current_prompt(AgentType::HrChat).await.unwrap(),
            AgentType::HrChat.default_system_prompt()
        );
    }

    #[tokio::test]
    async fn test_unknown_evaluation() {
        let (service, _, _) = critic(VERDICT_JSON);
        assert!(matches!(
            service.get_evaluation("interview_20200101_000000").await,
            Err(CriticError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_health_reports_provider_failure() {
        let (service, _, _) = critic(VERDICT_JSON);
        let health = service.health().await;
        assert_eq!(health.status, "unhealthy");
        assert_eq!(health.provider.model, "canned-1");
        assert!(health.error.unwrap().contains("connection refused"));
    }

    #[test]
    fn test_fenced_verdict_is_unwrapped() {
        let raw = format!("Here is my review:\n```json\n{}\n```\nThanks", VERDICT_JSON);
        let verdict = parse_verdict(&raw);
        assert_eq!(verdict.evaluation_score, 6.5);
        assert_eq!(verdict.issues_identified, vec!["No scoring rubric".to_string()]);
    }

    #[test]
    fn test_fallback_extracts_improved_prompt() {
        let raw = r#"{"evaluation_score": 7, "improved_prompt": "You are a careful HR assistant who cites policy sections", oops"#;
        let verdict = parse_verdict(raw);
        assert_eq!(verdict.evaluation_score, 5.0);
        assert_eq!(verdict.issues_identified, vec![FALLBACK_ISSUE.to_string()]);
        assert_eq!(
            verdict.improved_prompt,
            "You are a careful HR assistant who cites policy sections, oops"
        );
        assert!(verdict.improvement_reasoning.contains("Raw response"));
    }

    #[test]
    fn test_object_missing_fields_keeps_model_score() {
        let raw = r#"{"evaluation_score": 7.0, "issues_identified": ["x"], "improvement_reasoning": "ok"}"#;
        let verdict = parse_verdict(raw);
        assert_eq!(verdict.evaluation_score, 7.0);
        assert_eq!(verdict.issues_identified, vec!["x".to_string()]);
        assert_eq!(verdict.improvement_reasoning, "ok");
        assert_eq!(verdict.improved_prompt, FALLBACK_PROMPT_PLACEHOLDER);
        assert!(verdict.expected_improvements.is_empty());
    }

    #[test]
    fn test_object_with_string_score_and_odd_types() {
        let raw = r#"```json
{"evaluation_score": "8.5", "issues_identified": "none", "improved_prompt": "You are a concise interview assistant."}
```"#;
        let verdict = parse_verdict(raw);
        assert_eq!(verdict.evaluation_score, 8.5);
        assert!(verdict.issues_identified.is_empty());
        assert_eq!(verdict.improved_prompt, "You are a concise interview assistant.");
        assert_eq!(verdict.improvement_reasoning, "");
    }

    #[test]
    fn test_object_without_score_uses_default() {
        let verdict = parse_verdict(r#"{"improved_prompt": "Ask one question at a time."}"#);
        assert_eq!(verdict.evaluation_score, FALLBACK_SCORE);
        assert!(verdict.issues_identified.is_empty());
    }

    #[test]
    fn test_non_object_json_falls_back() {
        let verdict = parse_verdict(r#""just a string""#);
        assert_eq!(verdict.issues_identified, vec![FALLBACK_ISSUE.to_string()]);
    }

    #[test]
    fn test_fallback_placeholder_for_short_output() {
        let verdict = fallback_verdict("nope");
        assert_eq!(verdict.improved_prompt, FALLBACK_PROMPT_PLACEHOLDER);
    }

    #[test]
    fn test_fallback_keeps_long_unstructured_text() {
        let raw = "The prompt should ask for structured availability windows.";
        assert_eq!(fallback_verdict(raw).improved_prompt, raw);
    }
}
