// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::{AgentType, FeedbackType};
use crate::domain::evaluation::EvaluationStatus;
use crate::domain::feedback::FeedbackId;
use crate::domain::pattern::{PatternId, PatternKind};
use crate::domain::prompt::PromptVersion;

/// Facts published by the learning and critic services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LearningEvent {
    FeedbackRecorded {
        feedback_id: FeedbackId,
        agent_type: AgentType,
        feedback_type: FeedbackType,
        user_rating: Option<u8>,
        recorded_at: DateTime<Utc>,
    },
    PatternCreated {
        pattern_id: PatternId,
        agent_type: AgentType,
        pattern_type: PatternKind,
        created_at: DateTime<Utc>,
    },
    PatternUpdated {
        pattern_id: PatternId,
        agent_type: AgentType,
        success_rate: f64,
        usage_count: u64,
        updated_at: DateTime<Utc>,
    },
    PatternDecayed {
        pattern_id: PatternId,
        agent_type: AgentType,
        success_rate: f64,
        decayed_at: DateTime<Utc>,
    },
    PromptEvolved {
        agent_type: AgentType,
        from_version: Option<PromptVersion>,
        to_version: PromptVersion,
        evolved_at: DateTime<Utc>,
    },
    EvaluationCreated {
        evaluation_id: String,
        agent_type: AgentType,
        evaluation_score: f64,
        created_at: DateTime<Utc>,
    },
    EvaluationReviewed {
        evaluation_id: String,
        agent_type: AgentType,
        status: EvaluationStatus,
        reviewed_at: DateTime<Utc>,
    },
}

impl LearningEvent {
    pub fn agent_type(&self) -> AgentType {
        match self {
            LearningEvent::FeedbackRecorded { agent_type, .. }
            | LearningEvent::PatternCreated { agent_type, .. }
            | LearningEvent::PatternUpdated { agent_type, .. }
            | LearningEvent::PatternDecayed { agent_type, .. }
            | LearningEvent::PromptEvolved { agent_type, .. }
            | LearningEvent::EvaluationCreated { agent_type, .. }
            | LearningEvent::EvaluationReviewed { agent_type, .. } => *agent_type,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            LearningEvent::FeedbackRecorded { recorded_at, .. } => *recorded_at,
            LearningEvent::PatternCreated { created_at, .. } => *created_at,
            LearningEvent::PatternUpdated { updated_at, .. } => *updated_at,
            LearningEvent::PatternDecayed { decayed_at, .. } => *decayed_at,
            LearningEvent::PromptEvolved { evolved_at, .. } => *evolved_at,
            LearningEvent::EvaluationCreated { created_at, .. } => *created_at,
            LearningEvent::EvaluationReviewed { reviewed_at, .. } => *reviewed_at,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            LearningEvent::FeedbackRecorded { .. } => "feedback_recorded",
            LearningEvent::PatternCreated { .. } => "pattern_created",
            LearningEvent::PatternUpdated { .. } => "pattern_updated",
            LearningEvent::PatternDecayed { .. } => "pattern_decayed",
            LearningEvent::PromptEvolved { .. } => "prompt_evolved",
            LearningEvent::EvaluationCreated { .. } => "evaluation_created",
            LearningEvent::EvaluationReviewed { .. } => "evaluation_reviewed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tagging() {
        let event = LearningEvent::PromptEvolved {
            agent_type: AgentType::HrChat,
            from_version: Some(PromptVersion::INITIAL),
            to_version: PromptVersion::INITIAL.bump_minor(),
            evolved_at: Utc::now(),
        };
        assert_eq!(event.event_type(), "prompt_evolved");
        assert_eq!(event.agent_type(), AgentType::HrChat);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "prompt_evolved");
        assert_eq!(json["to_version"], "1.1.0");
    }
}
