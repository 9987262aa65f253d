// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! Feedback
//!
//! A [`FeedbackEvent`] is the review of one agent interaction. What the agent
//! did (`context`) and what happened (`outcome`) are typed per agent through
//! [`AgentInteraction`], a union discriminated by `agent_type`, so every
//! learning path reads named fields instead of probing an opaque map.
//!
//! On the wire the event keeps its flat shape:
//!
//! ```json
//! {
//!   "agent_type": "interview",
//!   "feedback_type": "positive",
//!   "context": { "questions": ["Explain CAP theorem"], "job_level": "senior" },
//!   "outcome": { "candidate_hired": true },
//!   "user_rating": 5
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::agent::{AgentType, FeedbackType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedbackId(pub Uuid);

impl FeedbackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FeedbackId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FeedbackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Inclusive bounds of `user_rating`.
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Context and outcome of one interaction, typed per agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "agent_type", rename_all = "snake_case")]
pub enum AgentInteraction {
    CvShortlisting {
        #[serde(default)]
        context: CvContext,
        #[serde(default)]
        outcome: CvOutcome,
    },
    Interview {
        #[serde(default)]
        context: InterviewContext,
        #[serde(default)]
        outcome: InterviewOutcome,
    },
    EmailScheduling {
        #[serde(default)]
        context: EmailContext,
        #[serde(default)]
        outcome: EmailOutcome,
    },
    HrChat {
        #[serde(default)]
        context: HrChatContext,
        #[serde(default)]
        outcome: HrChatOutcome,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterviewContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview_id: Option<String>,
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default = "default_job_level")]
    pub job_level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_id: Option<String>,
}

fn default_job_level() -> String {
    "mid".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterviewOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_hired: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview_quality: Option<String>,
    #[serde(default)]
    pub question_rated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_enhancement: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CvContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_id: Option<String>,
    #[serde(default)]
    pub candidate: CandidateProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_id: Option<String>,
}

/// Candidate attributes the CV agent scored. Unknown attributes are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_years: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CvOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hired: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_decision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_enhancement: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailContext {
    #[serde(default)]
    pub email_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incorrect_parsing: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailOutcome {
    #[serde(default)]
    pub parsed_slots: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<Value>,
    #[serde(default)]
    pub corrected_by_user: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_enhancement: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HrChatContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HrChatOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_enhancement: Option<String>,
}

impl AgentInteraction {
    pub fn agent_type(&self) -> AgentType {
        match self {
            AgentInteraction::CvShortlisting { .. } => AgentType::CvShortlisting,
            AgentInteraction::Interview { .. } => AgentType::Interview,
            AgentInteraction::EmailScheduling { .. } => AgentType::EmailScheduling,
            AgentInteraction::HrChat { .. } => AgentType::HrChat,
        }
    }

    /// Pattern the agent applied during the interaction, if it reported one.
    pub fn pattern_id(&self) -> Option<&str> {
        match self {
            AgentInteraction::CvShortlisting { context, .. } => context.pattern_id.as_deref(),
            AgentInteraction::Interview { context, .. } => context.pattern_id.as_deref(),
            AgentInteraction::EmailScheduling { context, .. } => context.pattern_id.as_deref(),
            AgentInteraction::HrChat { context, .. } => context.pattern_id.as_deref(),
        }
    }

    /// User-supplied corrected result.
    pub fn correction(&self) -> Option<&Value> {
        match self {
            AgentInteraction::CvShortlisting { outcome, .. } => outcome.correction.as_ref(),
            AgentInteraction::Interview { outcome, .. } => outcome.correction.as_ref(),
            AgentInteraction::EmailScheduling { outcome, .. } => outcome.correction.as_ref(),
            AgentInteraction::HrChat { outcome, .. } => outcome.correction.as_ref(),
        }
    }

    /// Reviewer-suggested practice to fold into the agent's system prompt.
    pub fn prompt_enhancement(&self) -> Option<&str> {
        let enhancement = match self {
            AgentInteraction::CvShortlisting { outcome, .. } => outcome.prompt_enhancement.as_deref(),
            AgentInteraction::Interview { outcome, .. } => outcome.prompt_enhancement.as_deref(),
            AgentInteraction::EmailScheduling { outcome, .. } => outcome.prompt_enhancement.as_deref(),
            AgentInteraction::HrChat { outcome, .. } => outcome.prompt_enhancement.as_deref(),
        };
        enhancement.map(str::trim).filter(|e| !e.is_empty())
    }

    pub fn context_json(&self) -> Value {
        let value = match self {
            AgentInteraction::CvShortlisting { context, .. } => serde_json::to_value(context),
            AgentInteraction::Interview { context, .. } => serde_json::to_value(context),
            AgentInteraction::EmailScheduling { context, .. } => serde_json::to_value(context),
            AgentInteraction::HrChat { context, .. } => serde_json::to_value(context),
        };
        value.unwrap_or(Value::Null)
    }

    pub fn outcome_json(&self) -> Value {
        let value = match self {
            AgentInteraction::CvShortlisting { outcome, .. } => serde_json::to_value(outcome),
            AgentInteraction::Interview { outcome, .. } => serde_json::to_value(outcome),
            AgentInteraction::EmailScheduling { outcome, .. } => serde_json::to_value(outcome),
            AgentInteraction::HrChat { outcome, .. } => serde_json::to_value(outcome),
        };
        value.unwrap_or(Value::Null)
    }
}

/// Stored review of an agent interaction.
///
/// Immutable once saved, except for `processed`, which the learner sets after
/// it has extracted patterns from the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEvent {
    pub feedback_id: FeedbackId,
    #[serde(flatten)]
    pub interaction: AgentInteraction,
    pub feedback_type: FeedbackType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_comments: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub processed: bool,
}

impl FeedbackEvent {
    pub fn new(
        interaction: AgentInteraction,
        feedback_type: FeedbackType,
        user_rating: Option<u8>,
        user_comments: Option<String>,
    ) -> Self {
        Self {
            feedback_id: FeedbackId::new(),
            interaction,
            feedback_type,
            user_rating,
            user_comments,
            created_at: Utc::now(),
            processed: false,
        }
    }

    pub fn agent_type(&self) -> AgentType {
        self.interaction.agent_type()
    }

    /// Positive feedback the reviewer rated 4 or 5.
    pub fn is_endorsement(&self) -> bool {
        self.feedback_type == FeedbackType::Positive && self.user_rating.is_some_and(|r| r >= 4)
    }

    /// Negative feedback, or any feedback rated 1 or 2.
    pub fn is_failure(&self) -> bool {
        self.feedback_type == FeedbackType::Negative || self.user_rating.is_some_and(|r| r <= 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_wire_shape_roundtrip() {
        let raw = json!({
            "feedback_id": "8d1f6b5e-3b0a-4c43-9a53-4f3f6b7d9c10",
            "agent_type": "interview",
            "feedback_type": "positive",
            "context": { "questions": ["Explain CAP theorem"], "job_level": "senior" },
            "outcome": { "candidate_hired": true },
            "user_rating": 5,
            "created_at": "2026-03-01T10:00:00Z"
        });

        let event: FeedbackEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.agent_type(), AgentType::Interview);
        assert!(!event.processed);
        match &event.interaction {
            AgentInteraction::Interview { context, outcome } => {
                assert_eq!(context.questions, vec!["Explain CAP theorem".to_string()]);
                assert_eq!(context.job_level, "senior");
                assert_eq!(outcome.candidate_hired, Some(true));
            }
            other => panic!("unexpected variant: {:?}", other),
        }

        let back = serde_json::to_value(&event).unwrap();
        assert_eq!(back["agent_type"], "interview");
        assert_eq!(back["context"]["questions"][0], "Explain CAP theorem");
    }

    #[test]
    fn test_missing_context_uses_defaults() {
        let interaction: AgentInteraction =
            serde_json::from_value(json!({ "agent_type": "interview" })).unwrap();
        match interaction {
            AgentInteraction::Interview { context, .. } => {
                assert!(context.questions.is_empty());
                assert_eq!(context.job_level, "mid");
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_candidate_profile_keeps_unknown_attributes() {
        let interaction: AgentInteraction = serde_json::from_value(json!({
            "agent_type": "cv_shortlisting",
            "context": { "candidate": { "skills": ["Rust"], "university": "KAU" } }
        }))
        .unwrap();
        match interaction {
            AgentInteraction::CvShortlisting { context, .. } => {
                assert_eq!(context.candidate.skills, vec!["Rust".to_string()]);
                assert_eq!(context.candidate.extra["university"], "KAU");
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_endorsement_and_failure_classification() {
        let interaction = AgentInteraction::HrChat {
            context: HrChatContext::default(),
            outcome: HrChatOutcome::default(),
        };
        let positive = FeedbackEvent::new(interaction.clone(), FeedbackType::Positive, Some(4), None);
        assert!(positive.is_endorsement());
        assert!(!positive.is_failure());

        let low_neutral = FeedbackEvent::new(interaction.clone(), FeedbackType::Neutral, Some(2), None);
        assert!(low_neutral.is_failure());

        let unrated_positive = FeedbackEvent::new(interaction, FeedbackType::Positive, None, None);
        assert!(!unrated_positive.is_endorsement());
    }

    #[test]
    fn test_blank_prompt_enhancement_is_ignored() {
        let interaction = AgentInteraction::HrChat {
            context: HrChatContext::default(),
            outcome: HrChatOutcome {
                prompt_enhancement: Some("   ".to_string()),
                ..Default::default()
            },
        };
        assert!(interaction.prompt_enhancement().is_none());
    }
}
