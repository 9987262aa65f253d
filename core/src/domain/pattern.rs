// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! Learned patterns
//!
//! A [`LearningPattern`] is a reusable decision fragment (a good interview
//! question, a skill weight, a parse correction) with an empirical success
//! rate. Pattern ids are derived from the observed entity rather than drawn at
//! random, so repeated observations of the same question or skill accumulate
//! into one record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use super::agent::{AgentType, UnknownVariant};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternId(pub String);

impl PatternId {
    /// `interview_q_<12 hex chars of sha256(question)>`
    pub fn interview_question(question: &str) -> Self {
        Self(format!("interview_q_{}", short_digest(question.trim())))
    }

    /// `cv_skill_<lowercased skill, spaces replaced by underscores>`
    pub fn cv_skill(skill: &str) -> Self {
        Self(format!("cv_skill_{}", skill.trim().to_lowercase().replace(' ', "_")))
    }

    /// `<agent>_enh_<12 hex chars of sha256(enhancement)>`
    pub fn prompt_enhancement(agent_type: AgentType, enhancement: &str) -> Self {
        Self(format!("{}_enh_{}", agent_type, short_digest(enhancement.trim())))
    }

    /// `parsing_<unix seconds>.<micros>`; unique per observation.
    pub fn parsing(at: DateTime<Utc>) -> Self {
        Self(format!("parsing_{}", timestamp_key(at)))
    }

    /// `<agent>_<unix seconds>.<micros>`; unique per correction.
    pub fn correction(agent_type: AgentType, at: DateTime<Utc>) -> Self {
        Self(format!("{}_{}", agent_type, timestamp_key(at)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PatternId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

fn short_digest(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(&digest[..6])
}

fn timestamp_key(at: DateTime<Utc>) -> String {
    format!("{}.{:06}", at.timestamp(), at.timestamp_subsec_micros())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    QuestionTemplate,
    SkillWeight,
    ParsingPattern,
    Correction,
    PromptEnhancement,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::QuestionTemplate => "question_template",
            PatternKind::SkillWeight => "skill_weight",
            PatternKind::ParsingPattern => "parsing_pattern",
            PatternKind::Correction => "correction",
            PatternKind::PromptEnhancement => "prompt_enhancement",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "question_template" => Ok(PatternKind::QuestionTemplate),
            "skill_weight" => Ok(PatternKind::SkillWeight),
            "parsing_pattern" => Ok(PatternKind::ParsingPattern),
            "correction" => Ok(PatternKind::Correction),
            "prompt_enhancement" => Ok(PatternKind::PromptEnhancement),
            other => Err(UnknownVariant {
                kind: "pattern type",
                value: other.to_string(),
            }),
        }
    }
}

/// Hiring correlation counters kept in a `skill_weight` pattern's data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillWeightData {
    pub skill: String,
    #[serde(default)]
    pub times_evaluated: u64,
    #[serde(default)]
    pub hired_count: u64,
    #[serde(default)]
    pub rejected_count: u64,
}

impl SkillWeightData {
    pub fn hire_correlation(&self) -> f64 {
        if self.times_evaluated == 0 {
            0.5
        } else {
            self.hired_count as f64 / self.times_evaluated as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPattern {
    pub pattern_id: PatternId,
    pub agent_type: AgentType,
    pub pattern_type: PatternKind,
    pub pattern_data: Value,
    pub success_rate: f64,
    pub usage_count: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl LearningPattern {
    /// A pattern seen for the first time: one use, rate 1.0 or 0.0.
    pub fn first_observation(
        pattern_id: PatternId,
        agent_type: AgentType,
        pattern_type: PatternKind,
        pattern_data: Value,
        success: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            pattern_id,
            agent_type,
            pattern_type,
            pattern_data,
            success_rate: if success { 1.0 } else { 0.0 },
            usage_count: 1,
            created_at: now,
            last_used_at: Some(now),
            is_active: true,
        }
    }

    pub fn question_template(question: &str, job_level: &str, success: bool) -> Self {
        Self::first_observation(
            PatternId::interview_question(question),
            AgentType::Interview,
            PatternKind::QuestionTemplate,
            json!({ "question": question, "job_level": job_level, "success": success }),
            success,
        )
    }

    pub fn skill_weight(skill: &str, success: bool) -> Self {
        let data = SkillWeightData {
            skill: skill.to_string(),
            times_evaluated: 1,
            hired_count: u64::from(success),
            rejected_count: u64::from(!success),
        };
        Self::first_observation(
            PatternId::cv_skill(skill),
            AgentType::CvShortlisting,
            PatternKind::SkillWeight,
            serde_json::to_value(&data).unwrap_or(Value::Null),
            success,
        )
    }

    pub fn parsing(original_text: &str, parsed_result: &[Value], success: bool, at: DateTime<Utc>) -> Self {
        Self::first_observation(
            PatternId::parsing(at),
            AgentType::EmailScheduling,
            PatternKind::ParsingPattern,
            json!({ "original_text": original_text, "parsed_result": parsed_result, "success": success }),
            success,
        )
    }

    /// Trusted verbatim: a correction starts at a success rate of 1.0.
    pub fn correction(agent_type: AgentType, correction: Value, at: DateTime<Utc>) -> Self {
        Self::first_observation(
            PatternId::correction(agent_type, at),
            agent_type,
            PatternKind::Correction,
            correction,
            true,
        )
    }

    pub fn prompt_enhancement(agent_type: AgentType, enhancement: &str, success: bool) -> Self {
        Self::first_observation(
            PatternId::prompt_enhancement(agent_type, enhancement),
            agent_type,
            PatternKind::PromptEnhancement,
            json!({ "enhancement": enhancement }),
            success,
        )
    }

    /// Folds one more observation into the running success rate:
    /// `(rate * usage + outcome) / (usage + 1)`.
    ///
    /// Skill-weight patterns track hires instead, so their rate is the hire
    /// correlation and their usage the number of evaluations.
    pub fn observe(&mut self, success: bool) {
        match self.pattern_type {
            PatternKind::SkillWeight => self.observe_skill(success),
            _ => {
                let usage = self.usage_count as f64;
                let outcome = if success { 1.0 } else { 0.0 };
                self.success_rate = (self.success_rate * usage + outcome) / (usage + 1.0);
                self.usage_count += 1;
            }
        }
        self.last_used_at = Some(Utc::now());
    }

    fn observe_skill(&mut self, success: bool) {
        let mut data: SkillWeightData = serde_json::from_value(self.pattern_data.clone()).unwrap_or_default();
        data.times_evaluated += 1;
        if success {
            data.hired_count += 1;
        } else {
            data.rejected_count += 1;
        }
        self.success_rate = data.hire_correlation();
        self.usage_count = data.times_evaluated;
        if let Ok(value) = serde_json::to_value(&data) {
            self.pattern_data = value;
        }
    }

    /// Penalises a pattern that was applied and failed.
    pub fn decay(&mut self, factor: f64) {
        self.success_rate *= factor;
        self.usage_count += 1;
        self.last_used_at = Some(Utc::now());
    }

    /// Enhancement text carried by `prompt_enhancement` patterns.
    pub fn enhancement(&self) -> Option<&str> {
        if self.pattern_type != PatternKind::PromptEnhancement {
            return None;
        }
        self.pattern_data
            .get("enhancement")
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty())
    }

    /// Ranking used for exploitation: success rate, then usage count.
    pub fn rank_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.success_rate
            .partial_cmp(&other.success_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(self.usage_count.cmp(&other.usage_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_question_ids_are_stable() {
        let a = PatternId::interview_question("Explain CAP theorem");
        let b = PatternId::interview_question("Explain CAP theorem");
        let c = PatternId::interview_question("Explain ACID");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.as_str().starts_with("interview_q_"));
        assert_eq!(a.as_str().len(), "interview_q_".len() + 12);
    }

    #[test]
    fn test_skill_ids_normalise_case_and_spaces() {
        assert_eq!(PatternId::cv_skill("Machine Learning").as_str(), "cv_skill_machine_learning");
        assert_eq!(PatternId::cv_skill("machine learning"), PatternId::cv_skill("Machine Learning"));
    }

    #[test]
    fn test_timestamp_ids() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(PatternId::parsing(at).as_str(), "parsing_1772359200.000000");
        assert_eq!(
            PatternId::correction(AgentType::EmailScheduling, at).as_str(),
            "email_scheduling_1772359200.000000"
        );
    }

    #[test]
    fn test_observe_running_rate() {
        let mut pattern = LearningPattern::question_template("Q", "mid", true);
        pattern.observe(true);
        assert_eq!(pattern.usage_count, 2);
        assert_eq!(pattern.success_rate, 1.0);

        pattern.observe(false);
        assert_eq!(pattern.usage_count, 3);
        assert!((pattern.success_rate - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_skill_weight_tracks_hire_correlation() {
        let mut pattern = LearningPattern::skill_weight("Rust", true);
        pattern.observe(false);
        pattern.observe(true);

        let data: SkillWeightData = serde_json::from_value(pattern.pattern_data.clone()).unwrap();
        assert_eq!(data.times_evaluated, 3);
        assert_eq!(data.hired_count, 2);
        assert_eq!(data.rejected_count, 1);
        assert_eq!(pattern.usage_count, 3);
        assert!((pattern.success_rate - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_decay() {
        let mut pattern = LearningPattern::question_template("Q", "mid", true);
        pattern.decay(0.8);
        assert!((pattern.success_rate - 0.8).abs() < 1e-12);
        assert_eq!(pattern.usage_count, 2);
    }

    #[test]
    fn test_enhancement_only_for_enhancement_patterns() {
        let enh = LearningPattern::prompt_enhancement(AgentType::HrChat, "Cite the policy section", true);
        assert_eq!(enh.enhancement(), Some("Cite the policy section"));

        let question = LearningPattern::question_template("Q", "mid", true);
        assert_eq!(question.enhancement(), None);
    }
}
