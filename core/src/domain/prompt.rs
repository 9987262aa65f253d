// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! Prompt evolution
//!
//! System prompts form an append-only chain of [`PromptEvolution`] versions
//! per agent. A version is never edited after it is appended; the newest
//! version of an agent is its active one, so "deactivating" the previous
//! version is the act of appending a successor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::agent::AgentType;

/// `MAJOR.MINOR.PATCH` prompt version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PromptVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PromptVersion {
    pub const INITIAL: PromptVersion = PromptVersion { major: 1, minor: 0, patch: 0 };

    /// Automatic evolution: `X.Y.Z -> X.(Y+1).0`.
    pub fn bump_minor(&self) -> Self {
        Self {
            major: self.major,
            minor: self.minor + 1,
            patch: 0,
        }
    }

    /// Reviewed rewrite: `X.Y.Z -> (X+1).0.0`.
    pub fn bump_major(&self) -> Self {
        Self {
            major: self.major + 1,
            minor: 0,
            patch: 0,
        }
    }
}

impl fmt::Display for PromptVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid prompt version: '{0}'")]
pub struct InvalidPromptVersion(pub String);

impl FromStr for PromptVersion {
    type Err = InvalidPromptVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidPromptVersion(s.to_string());
        let mut parts = s.trim().split('.');
        let mut next = || -> Result<u32, InvalidPromptVersion> {
            parts.next().ok_or_else(invalid)?.parse().map_err(|_| invalid())
        };
        let major = next()?;
        let minor = next()?;
        // Older records may omit the patch component.
        let patch = match parts.next() {
            Some(p) => p.parse().map_err(|_| invalid())?,
            None => 0,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self { major, minor, patch })
    }
}

impl Serialize for PromptVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PromptVersion {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptEvolution {
    pub agent_type: AgentType,
    pub prompt_version: PromptVersion,
    pub prompt_template: String,
    pub performance_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_version: Option<PromptVersion>,
    #[serde(default)]
    pub improvements: Vec<String>,
    /// Critic evaluation the version was approved from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Derived when read: true only for the newest version of the agent.
    #[serde(default)]
    pub is_active: bool,
}

impl PromptEvolution {
    pub fn initial(agent_type: AgentType, prompt: impl Into<String>, performance_score: f64) -> Self {
        Self {
            agent_type,
            prompt_version: PromptVersion::INITIAL,
            prompt_template: prompt.into(),
            performance_score,
            parent_version: None,
            improvements: Vec::new(),
            evaluation_id: None,
            created_at: Utc::now(),
            is_active: true,
        }
    }

    /// Successor of `self`, carrying `self` as parent.
    pub fn successor(
        &self,
        version: PromptVersion,
        prompt: impl Into<String>,
        performance_score: f64,
        improvements: Vec<String>,
    ) -> Self {
        Self {
            agent_type: self.agent_type,
            prompt_version: version,
            prompt_template: prompt.into(),
            performance_score,
            parent_version: Some(self.prompt_version),
            improvements,
            evaluation_id: None,
            created_at: Utc::now(),
            is_active: true,
        }
    }
}

/// Marks the last version of a creation-ordered history as the active one.
pub fn mark_active(history: &mut [PromptEvolution]) {
    let last = history.len().saturating_sub(1);
    for (i, version) in history.iter_mut().enumerate() {
        version.is_active = i == last;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse_and_bump() {
        let v: PromptVersion = "1.0.0".parse().unwrap();
        assert_eq!(v, PromptVersion::INITIAL);
        assert_eq!(v.bump_minor().to_string(), "1.1.0");
        assert_eq!("1.4.2".parse::<PromptVersion>().unwrap().bump_minor().to_string(), "1.5.0");
        assert_eq!("1.4.2".parse::<PromptVersion>().unwrap().bump_major().to_string(), "2.0.0");
        assert_eq!("3.1".parse::<PromptVersion>().unwrap().to_string(), "3.1.0");
    }

    #[test]
    fn test_invalid_versions() {
        assert!("".parse::<PromptVersion>().is_err());
        assert!("one.two".parse::<PromptVersion>().is_err());
        assert!("1.2.3.4".parse::<PromptVersion>().is_err());
    }

    #[test]
    fn test_version_serializes_as_string() {
        let json = serde_json::to_string(&PromptVersion::INITIAL).unwrap();
        assert_eq!(json, "\"1.0.0\"");
        let back: PromptVersion = serde_json::from_str("\"2.3.0\"").unwrap();
        assert_eq!(back.to_string(), "2.3.0");
    }

    #[test]
    fn test_mark_active() {
        let first = PromptEvolution::initial(AgentType::HrChat, "v1", 0.9);
        let second = first.successor(first.prompt_version.bump_minor(), "v2", 0.0, vec![]);
        let mut history = vec![first, second];
        mark_active(&mut history);
        assert!(!history[0].is_active);
        assert!(history[1].is_active);
        assert_eq!(history[1].parent_version, Some(PromptVersion::INITIAL));
    }
}
