// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! # Prompt Evolver
//!
//! Maintains each agent's append-only chain of system prompt versions.
//!
//! - The first evolution request records the supplied prompt as `1.0.0`.
//! - A request whose performance score falls below the active version's score
//!   appends a minor version whose prompt carries the enhancements of the
//!   agent's most successful patterns.
//! - Critic approvals append a major version holding the reviewed prompt.
//!
//! Appends name the version they expect to supersede, so two concurrent
//! evolutions of the same agent cannot both become active.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::domain::agent::AgentType;
use crate::domain::events::LearningEvent;
use crate::domain::pattern::LearningPattern;
use crate::domain::prompt::{PromptEvolution, PromptVersion};
use crate::domain::repository::{PatternRepository, PromptRepository, RepositoryError};
use crate::infrastructure::event_bus::EventBus;

pub const LEARNED_PRACTICES_HEADER: &str = "\n\nLearned best practices:\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvolutionOutcome {
    /// No version existed; the supplied prompt became `1.0.0`.
    Initialized,
    Evolved,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvolutionResult {
    pub agent_type: AgentType,
    pub outcome: EvolutionOutcome,
    pub prompt: String,
    pub active_version: PromptVersion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformancePoint {
    pub version: PromptVersion,
    pub performance_score: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvolutionHistory {
    pub agent_type: AgentType,
    pub total_versions: usize,
    pub evolution_history: Vec<PromptEvolution>,
    pub performance_trend: Vec<PerformancePoint>,
}

pub struct PromptEvolver {
    prompts: Arc<dyn PromptRepository>,
    patterns: Arc<dyn PatternRepository>,
    event_bus: Arc<EventBus>,
    min_success_rate: f64,
    pattern_limit: usize,
}

impl PromptEvolver {
    pub fn new(
        prompts: Arc<dyn PromptRepository>,
        patterns: Arc<dyn PatternRepository>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            prompts,
            patterns,
            event_bus,
            min_success_rate: 0.7,
            pattern_limit: 10,
        }
    }

    pub fn with_pattern_threshold(mut self, min_success_rate: f64, pattern_limit: usize) -> Self {
        self.min_success_rate = min_success_rate;
        self.pattern_limit = pattern_limit;
        self
    }

    pub async fn evolve(
        &self,
        agent_type: AgentType,
        current_prompt: &str,
        performance_score: f64,
    ) -> Result<EvolutionResult, RepositoryError> {
        let Some(active) = self.prompts.active(agent_type).await? else {
            let initial = PromptEvolution::initial(agent_type, current_prompt, performance_score);
            self.prompts.append(&initial, None).await?;
            self.announce(agent_type, None, initial.prompt_version);
            return Ok(EvolutionResult {
                agent_type,
                outcome: EvolutionOutcome::Initialized,
                prompt: current_prompt.to_string(),
                active_version: initial.prompt_version,
            });
        };

        if performance_score >= active.performance_score {
            return Ok(EvolutionResult {
                agent_type,
                outcome: EvolutionOutcome::Unchanged,
                prompt: current_prompt.to_string(),
                active_version: active.prompt_version,
            });
        }

        let patterns = self
            .patterns
            .find_successful(agent_type, self.min_success_rate, self.pattern_limit)
            .await?;
        let evolved = compose_evolved_prompt(current_prompt, &patterns);

        let next = active.successor(
            active.prompt_version.bump_minor(),
            evolved.clone(),
            0.0,
            vec!["Incorporated high success rate patterns".to_string()],
        );
        self.prompts.append(&next, Some(active.prompt_version)).await?;

        info!(
            agent_type = %agent_type,
            from = %active.prompt_version,
            to = %next.prompt_version,
            score = performance_score,
            previous_score = active.performance_score,
            "Prompt evolved after performance regression"
        );
        self.announce(agent_type, Some(active.prompt_version), next.prompt_version);

        Ok(EvolutionResult {
            agent_type,
            outcome: EvolutionOutcome::Evolved,
            prompt: evolved,
            active_version: next.prompt_version,
        })
    }

    /// Appends a reviewed prompt as a new major version (`1.0.0` for an empty
    /// chain). The new version inherits the parent's performance score.
    pub async fn adopt(
        &self,
        agent_type: AgentType,
        prompt: &str,
        evaluation_id: &str,
        improvements: Vec<String>,
    ) -> Result<PromptEvolution, RepositoryError> {
        let active = self.prompts.active(agent_type).await?;

        let mut version = match &active {
            Some(parent) => parent.successor(
                parent.prompt_version.bump_major(),
                prompt,
                parent.performance_score,
                improvements,
            ),
            None => {
                let mut initial = PromptEvolution::initial(agent_type, prompt, 0.0);
                initial.improvements = improvements;
                initial
            }
        };
        version.evaluation_id = Some(evaluation_id.to_string());

        let parent_version = active.map(|a| a.prompt_version);
        self.prompts.append(&version, parent_version).await?;

        info!(
            agent_type = %agent_type,
            version = %version.prompt_version,
            evaluation_id,
            "Reviewed prompt adopted"
        );
        self.announce(agent_type, parent_version, version.prompt_version);
        Ok(version)
    }

    /// Active prompt text, or the agent's built-in default.
    pub async fn current_prompt(&self, agent_type: AgentType) -> Result<String, RepositoryError> {
        Ok(self
            .prompts
            .active(agent_type)
            .await?
            .map(|v| v.prompt_template)
            .unwrap_or_else(|| agent_type.default_system_prompt().to_string()))
    }

    pub async fn active_version(&self, agent_type: AgentType) -> Result<Option<PromptEvolution>, RepositoryError> {
        self.prompts.active(agent_type).await
    }

    pub async fn history(&self, agent_type: AgentType) -> Result<EvolutionHistory, RepositoryError> {
        let evolution_history = self.prompts.history(agent_type).await?;
        let performance_trend = evolution_history
            .iter()
            .map(|v| PerformancePoint {
                version: v.prompt_version,
                performance_score: v.performance_score,
                created_at: v.created_at,
            })
            .collect();

        Ok(EvolutionHistory {
            agent_type,
            total_versions: evolution_history.len(),
            evolution_history,
            performance_trend,
        })
    }

    fn announce(&self, agent_type: AgentType, from_version: Option<PromptVersion>, to_version: PromptVersion) {
        metrics::counter!("ruya_prompt_evolutions_total", "agent_type" => agent_type.as_str()).increment(1);
        self.event_bus.publish(LearningEvent::PromptEvolved {
            agent_type,
            from_version,
            to_version,
            evolved_at: Utc::now(),
        });
    }
}

/// Appends the enhancements of `prompt_enhancement` patterns, one per line,
/// under [`LEARNED_PRACTICES_HEADER`]. Returns `base` unchanged when there are
/// none.
pub fn compose_evolved_prompt(base: &str, patterns: &[LearningPattern]) -> String {
    let practices: Vec<&str> = patterns.iter().filter_map(LearningPattern::enhancement).collect();
    if practices.is_empty() {
        return base.to_string();
    }
    format!("{}{}{}", base, LEARNED_PRACTICES_HEADER, practices.join("\n"))
}
