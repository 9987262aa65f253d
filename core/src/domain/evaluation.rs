// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! Critic evaluations
//!
//! The critic asks an LLM to review an agent's system prompt against its
//! recent performance. Each run produces a [`PromptEvaluation`] that waits in
//! `pending_review` until a person approves or rejects it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::agent::{AgentType, UnknownVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    PendingReview,
    Approved,
    Rejected,
}

impl EvaluationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationStatus::PendingReview => "pending_review",
            EvaluationStatus::Approved => "approved",
            EvaluationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvaluationStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_review" => Ok(EvaluationStatus::PendingReview),
            "approved" => Ok(EvaluationStatus::Approved),
            "rejected" => Ok(EvaluationStatus::Rejected),
            other => Err(UnknownVariant {
                kind: "evaluation status",
                value: other.to_string(),
            }),
        }
    }
}

/// One reviewed interaction shown to the critic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionSample {
    pub input: String,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    pub success: bool,
}

/// Performance data the critic bases its verdict on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_feedback_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_rate: Option<f64>,
    #[serde(default)]
    pub total_interactions: u64,
    #[serde(default)]
    pub input_output_pairs: Vec<InteractionSample>,
}

/// Structured answer requested from the critic model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticVerdict {
    #[serde(default)]
    pub evaluation_score: f64,
    #[serde(default)]
    pub issues_identified: Vec<String>,
    #[serde(default)]
    pub improvement_reasoning: String,
    #[serde(default)]
    pub improved_prompt: String,
    #[serde(default)]
    pub expected_improvements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptEvaluation {
    pub evaluation_id: String,
    pub agent_type: AgentType,
    pub timestamp: DateTime<Utc>,
    pub current_prompt: String,
    pub improved_prompt: String,
    pub evaluation_score: f64,
    #[serde(default)]
    pub issues_identified: Vec<String>,
    pub improvement_reasoning: String,
    #[serde(default)]
    pub expected_improvements: Vec<String>,
    pub performance_metrics: PerformanceSnapshot,
    pub status: EvaluationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl PromptEvaluation {
    /// `<agent_type>_<YYYYmmdd_HHMMSS>`
    pub fn make_id(agent_type: AgentType, at: DateTime<Utc>) -> String {
        format!("{}_{}", agent_type, at.format("%Y%m%d_%H%M%S"))
    }

    pub fn pending(
        agent_type: AgentType,
        current_prompt: String,
        verdict: CriticVerdict,
        performance_metrics: PerformanceSnapshot,
    ) -> Self {
        let timestamp = Utc::now();
        Self {
            evaluation_id: Self::make_id(agent_type, timestamp),
            agent_type,
            timestamp,
            current_prompt,
            improved_prompt: verdict.improved_prompt,
            evaluation_score: verdict.evaluation_score,
            issues_identified: verdict.issues_identified,
            improvement_reasoning: verdict.improvement_reasoning,
            expected_improvements: verdict.expected_improvements,
            performance_metrics,
            status: EvaluationStatus::PendingReview,
            approved_at: None,
            rejected_at: None,
            rejection_reason: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == EvaluationStatus::PendingReview
    }

    pub fn approve(&mut self) {
        self.status = EvaluationStatus::Approved;
        self.approved_at = Some(Utc::now());
    }

    pub fn reject(&mut self, reason: Option<String>) {
        self.status = EvaluationStatus::Rejected;
        self.rejected_at = Some(Utc::now());
        self.rejection_reason = reason;
    }
}
