// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::agent::AgentType;

/// Per-agent learning toggles. Exactly one row per agent type, created on
/// first read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentLearningState {
    pub agent_type: AgentType,
    pub learning_enabled: bool,
    /// Run the pattern learner on every recorded feedback event.
    pub auto_adapt: bool,
    /// Probability of picking a random pattern instead of the best one.
    pub exploration_rate: f64,
    pub total_learnings: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_learning_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl AgentLearningState {
    pub fn new(agent_type: AgentType, exploration_rate: f64) -> Self {
        Self {
            agent_type,
            learning_enabled: true,
            auto_adapt: true,
            exploration_rate,
            total_learnings: 0,
            last_learning_at: None,
            updated_at: Utc::now(),
        }
    }

    pub fn apply(&mut self, update: &LearningStateUpdate) {
        if let Some(enabled) = update.learning_enabled {
            self.learning_enabled = enabled;
        }
        if let Some(auto_adapt) = update.auto_adapt {
            self.auto_adapt = auto_adapt;
        }
        if let Some(rate) = update.exploration_rate {
            self.exploration_rate = rate;
        }
        self.updated_at = Utc::now();
    }

    pub fn record_learning(&mut self) {
        self.total_learnings += 1;
        let now = Utc::now();
        self.last_learning_at = Some(now);
        self.updated_at = now;
    }
}

/// Partial update of the learning toggles; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningStateUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_adapt: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exploration_rate: Option<f64>,
}

impl LearningStateUpdate {
    pub fn is_empty(&self) -> bool {
        self.learning_enabled.is_none() && self.auto_adapt.is_none() && self.exploration_rate.is_none()
    }

    pub fn validate(&self) -> Result<(), String> {
        match self.exploration_rate {
            Some(rate) if !(0.0..=1.0).contains(&rate) => {
                Err("Exploration rate must be between 0.0 and 1.0".to_string())
            }
            _ => Ok(()),
        }
    }
}
