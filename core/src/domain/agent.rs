// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! Agent
//!
//! Identifies the functional bots whose behaviour the learning service tracks,
//! and the kinds of feedback a reviewer can give about them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four functional agents of the recruitment platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    CvShortlisting,
    Interview,
    EmailScheduling,
    HrChat,
}

impl AgentType {
    pub const ALL: [AgentType; 4] = [
        AgentType::CvShortlisting,
        AgentType::Interview,
        AgentType::EmailScheduling,
        AgentType::HrChat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::CvShortlisting => "cv_shortlisting",
            AgentType::Interview => "interview",
            AgentType::EmailScheduling => "email_scheduling",
            AgentType::HrChat => "hr_chat",
        }
    }

    /// System prompt used until a version has been recorded for the agent.
    pub fn default_system_prompt(&self) -> &'static str {
        match self {
            AgentType::CvShortlisting => "You are an expert CV screening specialist. Review candidate resumes and match them to job requirements based on skills, experience, and qualifications.",
            AgentType::Interview => "You are an AI interviewer. Conduct professional job interviews by asking relevant questions, evaluating responses, and providing a fair assessment of candidates.",
            AgentType::EmailScheduling => "You are an email scheduling assistant. Parse availability from emails and coordinate interview schedules efficiently while being polite and professional.",
            AgentType::HrChat => "You are a helpful HR assistant. Answer employee questions about policies, leave balance, and company procedures. Be professional, accurate, and empathetic.",
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentType::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "agent type",
                value: s.to_string(),
            })
    }
}

/// Reviewer verdict on a single agent interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    Positive,
    Negative,
    Neutral,
    Correction,
}

impl FeedbackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackType::Positive => "positive",
            FeedbackType::Negative => "negative",
            FeedbackType::Neutral => "neutral",
            FeedbackType::Correction => "correction",
        }
    }
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(FeedbackType::Positive),
            "negative" => Ok(FeedbackType::Negative),
            "neutral" => Ok(FeedbackType::Neutral),
            "correction" => Ok(FeedbackType::Correction),
            other => Err(UnknownVariant {
                kind: "feedback type",
                value: other.to_string(),
            }),
        }
    }
}

/// Returned when a stored or user-supplied string names no known variant.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown {kind}: '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_type_wire_names() {
        for agent in AgentType::ALL {
            let json = serde_json::to_string(&agent).unwrap();
            assert_eq!(json, format!("\"{}\"", agent.as_str()));
            assert_eq!(agent.as_str().parse::<AgentType>().unwrap(), agent);
        }
    }

    #[test]
    fn test_unknown_agent_type() {
        let err = "recruiter".parse::<AgentType>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown agent type: 'recruiter'");
    }

    #[test]
    fn test_feedback_type_parse() {
        assert_eq!("correction".parse::<FeedbackType>().unwrap(), FeedbackType::Correction);
        assert!("great".parse::<FeedbackType>().is_err());
    }
}
