// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! # HTTP API
//!
//! JSON routes over [`LearningService`] and [`CriticService`]. Handlers parse
//! and validate path/query input, call one service operation and shape the
//! response; errors map onto status codes through [`ApiError`].

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::application::critic_service::{CriticError, CriticService};
use crate::application::learning_service::{
    CandidateSelectionRequest, EmailCorrectionRequest, FeedbackReceipt, FeedbackSubmission, LearningError,
    LearningService, RateQuestionRequest,
};
use crate::domain::agent::AgentType;
use crate::domain::evaluation::EvaluationStatus;
use crate::domain::learning_state::LearningStateUpdate;
use crate::domain::pattern::PatternKind;
use crate::domain::repository::RepositoryError;

pub struct AppState {
    pub learning: Arc<dyn LearningService>,
    pub critic: Arc<dyn CriticService>,
}

pub fn app(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/learning/feedback", post(submit_feedback))
        .route("/learning/metrics", get(list_metrics))
        .route("/learning/metrics/{agent_type}", get(get_metrics))
        .route("/learning/insights/{agent_type}", get(get_insights))
        .route("/learning/state/{agent_type}", get(get_state).put(update_state))
        .route("/learning/interview/rate-question", post(rate_question))
        .route("/learning/cv/rate-candidate-selection", post(rate_candidate_selection))
        .route("/learning/email/correct-parsing", post(correct_email_parsing))
        .route("/learning/patterns/{agent_type}/select", get(select_pattern))
        .route("/learning/evolution/{agent_type}", get(evolution_history).post(evolve_prompt))
        .route("/critic/evaluate", post(evaluate_agent))
        .route("/critic/improvements", get(list_improvements))
        .route("/critic/improvements/{evaluation_id}", get(get_improvement))
        .route("/critic/improvements/{evaluation_id}/approve", post(approve_improvement))
        .route("/critic/improvements/{evaluation_id}/reject", post(reject_improvement))
        .route("/critic/prompt/{agent_type}", get(current_prompt))
        .route("/critic/health", get(critic_health))
        .with_state(Arc::new(state))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m),
            ApiError::Internal(m) => {
                error!(error = %m, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(_) => ApiError::NotFound(err.to_string()),
            RepositoryError::Conflict(_) => ApiError::Conflict(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<LearningError> for ApiError {
    fn from(err: LearningError) -> Self {
        match err {
            LearningError::InvalidInput(m) => ApiError::BadRequest(m),
            LearningError::Repository(e) => e.into(),
        }
    }
}

impl From<CriticError> for ApiError {
    fn from(err: CriticError) -> Self {
        match err {
            CriticError::NotFound(_) => ApiError::NotFound(err.to_string()),
            CriticError::AlreadyReviewed { .. } => ApiError::Conflict(err.to_string()),
            CriticError::Repository(e) => e.into(),
            CriticError::Storage(RepositoryError::Conflict(m)) => ApiError::Conflict(m),
            CriticError::Storage(_) | CriticError::Llm(_) => ApiError::Internal(err.to_string()),
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_agent_type(raw: &str) -> Result<AgentType, ApiError> {
    raw.parse().map_err(|e: crate::domain::agent::UnknownVariant| ApiError::BadRequest(e.to_string()))
}

/// A message followed by the fields of `body`.
#[derive(Serialize)]
struct Acknowledged<T: Serialize> {
    message: String,
    #[serde(flatten)]
    body: T,
}

fn acknowledged<T: Serialize>(message: impl Into<String>, body: T) -> Json<Acknowledged<T>> {
    Json(Acknowledged {
        message: message.into(),
        body,
    })
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "ruya-learning",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<FeedbackSubmission>,
) -> ApiResult<Acknowledged<FeedbackReceipt>> {
    let receipt = state.learning.record_feedback(submission).await?;
    Ok(acknowledged("Feedback recorded successfully", receipt))
}

async fn list_metrics(State(state): State<Arc<AppState>>) -> ApiResult<Value> {
    let metrics = state.learning.list_metrics().await?;
    Ok(Json(json!(metrics)))
}

async fn get_metrics(State(state): State<Arc<AppState>>, Path(agent_type): Path<String>) -> ApiResult<Value> {
    let metrics = state.learning.get_metrics(parse_agent_type(&agent_type)?).await?;
    Ok(Json(json!(metrics)))
}

async fn get_insights(State(state): State<Arc<AppState>>, Path(agent_type): Path<String>) -> ApiResult<Value> {
    let insights = state.learning.get_insights(parse_agent_type(&agent_type)?).await?;
    Ok(Json(json!(insights)))
}

async fn get_state(State(state): State<Arc<AppState>>, Path(agent_type): Path<String>) -> ApiResult<Value> {
    let learning_state = state.learning.get_learning_state(parse_agent_type(&agent_type)?).await?;
    Ok(Json(json!(learning_state)))
}

async fn update_state(
    State(state): State<Arc<AppState>>,
    Path(agent_type): Path<String>,
    Json(update): Json<LearningStateUpdate>,
) -> ApiResult<Value> {
    let agent_type = parse_agent_type(&agent_type)?;
    let updated = state.learning.update_learning_state(agent_type, update.clone()).await?;
    Ok(Json(json!({
        "message": format!("Learning state updated for {}", agent_type),
        "updates": update,
        "state": updated,
    })))
}

async fn rate_question(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RateQuestionRequest>,
) -> ApiResult<Acknowledged<FeedbackReceipt>> {
    let receipt = state.learning.rate_interview_question(request).await?;
    Ok(acknowledged("Question rating recorded, agent will learn from this", receipt))
}

async fn rate_candidate_selection(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CandidateSelectionRequest>,
) -> ApiResult<Acknowledged<FeedbackReceipt>> {
    let receipt = state.learning.rate_candidate_selection(request).await?;
    Ok(acknowledged(
        "Candidate outcome recorded, CV Agent will improve its shortlisting",
        receipt,
    ))
}

#[derive(Serialize)]
struct CorrectionReceipt {
    correction_applied: bool,
    #[serde(flatten)]
    receipt: FeedbackReceipt,
}

async fn correct_email_parsing(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EmailCorrectionRequest>,
) -> ApiResult<Acknowledged<CorrectionReceipt>> {
    let receipt = state.learning.correct_email_parsing(request).await?;
    Ok(acknowledged(
        "Correction recorded, Email Agent will learn from this",
        CorrectionReceipt {
            correction_applied: true,
            receipt,
        },
    ))
}

#[derive(Debug, Deserialize)]
struct SelectParams {
    pattern_type: String,
}

async fn select_pattern(
    State(state): State<Arc<AppState>>,
    Path(agent_type): Path<String>,
    Query(params): Query<SelectParams>,
) -> ApiResult<Value> {
    let agent_type = parse_agent_type(&agent_type)?;
    let pattern_type: PatternKind = params
        .pattern_type
        .parse()
        .map_err(|e: crate::domain::agent::UnknownVariant| ApiError::BadRequest(e.to_string()))?;

    let selection = state.learning.select_pattern(agent_type, pattern_type).await?;
    Ok(Json(json!(selection)))
}

async fn evolution_history(State(state): State<Arc<AppState>>, Path(agent_type): Path<String>) -> ApiResult<Value> {
    let history = state.learning.evolution_history(parse_agent_type(&agent_type)?).await?;
    Ok(Json(json!(history)))
}

#[derive(Debug, Deserialize)]
struct EvolveRequest {
    current_prompt: String,
    performance_score: f64,
}

async fn evolve_prompt(
    State(state): State<Arc<AppState>>,
    Path(agent_type): Path<String>,
    Json(request): Json<EvolveRequest>,
) -> ApiResult<Value> {
    let result = state
        .learning
        .evolve_prompt(
            parse_agent_type(&agent_type)?,
            &request.current_prompt,
            request.performance_score,
        )
        .await?;
    Ok(Json(json!(result)))
}

#[derive(Debug, Deserialize)]
struct EvaluationRequest {
    agent_type: String,
    #[serde(default)]
    limit_samples: Option<usize>,
}

async fn evaluate_agent(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EvaluationRequest>,
) -> ApiResult<Value> {
    let agent_type = parse_agent_type(&request.agent_type)?;
    let evaluation = state.critic.evaluate(agent_type, request.limit_samples).await?;
    Ok(Json(json!({
        "message": "Agent evaluation completed",
        "evaluation_id": evaluation.evaluation_id,
        "evaluation": evaluation,
    })))
}

#[derive(Debug, Deserialize)]
struct ImprovementFilter {
    #[serde(default)]
    agent_type: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

async fn list_improvements(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ImprovementFilter>,
) -> ApiResult<Value> {
    let agent_type = filter.agent_type.as_deref().map(parse_agent_type).transpose()?;
    let status = filter
        .status
        .as_deref()
        .map(|s| s.parse::<EvaluationStatus>())
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let evaluations = state.critic.list_evaluations(agent_type, status).await?;
    Ok(Json(json!(evaluations)))
}

async fn get_improvement(
    State(state): State<Arc<AppState>>,
    Path(evaluation_id): Path<String>,
) -> ApiResult<Value> {
    let evaluation = state.critic.get_evaluation(&evaluation_id).await?;
    Ok(Json(json!(evaluation)))
}

async fn approve_improvement(
    State(state): State<Arc<AppState>>,
    Path(evaluation_id): Path<String>,
) -> ApiResult<Value> {
    let evaluation = state.critic.approve(&evaluation_id).await?;
    Ok(Json(json!({
        "message": "Improvement approved and applied",
        "evaluation_id": evaluation.evaluation_id,
        "agent_type": evaluation.agent_type,
        "applied_at": evaluation.approved_at,
    })))
}

#[derive(Debug, Default, Deserialize)]
struct RejectRequest {
    #[serde(default)]
    reason: Option<String>,
}

/// The body is optional; an empty body rejects without a reason.
async fn reject_improvement(
    State(state): State<Arc<AppState>>,
    Path(evaluation_id): Path<String>,
    body: Bytes,
) -> ApiResult<Value> {
    let request: RejectRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RejectRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?
    };

    let evaluation = state.critic.reject(&evaluation_id, request.reason).await?;
    Ok(Json(json!({
        "message": "Improvement rejected",
        "evaluation_id": evaluation.evaluation_id,
        "agent_type": evaluation.agent_type,
        "rejected_at": evaluation.rejected_at,
        "reason": evaluation.rejection_reason,
    })))
}

async fn current_prompt(State(state): State<Arc<AppState>>, Path(agent_type): Path<String>) -> ApiResult<Value> {
    let agent_type = parse_agent_type(&agent_type)?;
    let prompt = state.critic.current_prompt(agent_type).await?;
    Ok(Json(json!({
        "agent_type": agent_type,
        "current_prompt": prompt,
    })))
}

async fn critic_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!(state.critic.health().await))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (ApiError::from(LearningError::InvalidInput("bad".into())), StatusCode::BAD_REQUEST),
            (
                ApiError::from(CriticError::NotFound("x".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(CriticError::AlreadyReviewed {
                    id: "x".into(),
                    status: EvaluationStatus::Approved,
                }),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(LearningError::Repository(RepositoryError::Conflict("moved".into()))),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(CriticError::Llm(crate::domain::llm::LLMError::Timeout(120))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_unknown_agent_type_is_bad_request() {
        assert!(matches!(parse_agent_type("recruiter"), Err(ApiError::BadRequest(_))));
        assert_eq!(parse_agent_type("hr_chat").unwrap(), AgentType::HrChat);
    }
}
