// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::domain::agent::AgentType;
use crate::domain::pattern::{LearningPattern, PatternKind};
use crate::domain::repository::{PatternRepository, RepositoryError};

/// Upper bound on the candidates considered when exploring.
pub const EXPLORATION_CANDIDATE_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    Explore,
    Exploit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternSelection {
    pub mode: SelectionMode,
    pub pattern: Option<LearningPattern>,
}

/// Epsilon-greedy choice among an agent's active patterns.
///
/// With probability `exploration_rate` a uniformly random active pattern is
/// returned, otherwise the one with the highest success rate (ties broken by
/// usage count).
pub struct PatternSelector {
    patterns: Arc<dyn PatternRepository>,
    rng: Mutex<StdRng>,
}

impl PatternSelector {
    pub fn new(patterns: Arc<dyn PatternRepository>) -> Self {
        Self {
            patterns,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic selector for tests and replays.
    pub fn with_seed(patterns: Arc<dyn PatternRepository>, seed: u64) -> Self {
        Self {
            patterns,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub async fn select(
        &self,
        agent_type: AgentType,
        pattern_type: PatternKind,
        exploration_rate: f64,
    ) -> Result<PatternSelection, RepositoryError> {
        let explore = self.rng.lock().random::<f64>() < exploration_rate;

        if explore {
            let candidates = self
                .patterns
                .find_active(agent_type, pattern_type, EXPLORATION_CANDIDATE_LIMIT)
                .await?;
            let pattern = candidates.choose(&mut *self.rng.lock()).cloned();
            Ok(PatternSelection {
                mode: SelectionMode::Explore,
                pattern,
            })
        } else {
            let pattern = self.patterns.find_best(agent_type, pattern_type).await?;
            Ok(PatternSelection {
                mode: SelectionMode::Exploit,
                pattern,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pattern::PatternId;
    use crate::infrastructure::repositories::InMemoryPatternRepository;

    async fn seeded_repo(questions: &[(&str, f64, u64)]) -> Arc<InMemoryPatternRepository> {
        let repo = Arc::new(InMemoryPatternRepository::new());
        for (question, success_rate, usage_count) in questions {
            let mut pattern = LearningPattern::question_template(question, "mid", true);
            pattern.success_rate = *success_rate;
            pattern.usage_count = *usage_count;
            repo.insert(&pattern).await.unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn test_no_patterns_selects_nothing() {
        let selector = PatternSelector::with_seed(Arc::new(InMemoryPatternRepository::new()), 7);
        for rate in [0.0, 1.0] {
            let selection = selector
                .select(AgentType::Interview, PatternKind::QuestionTemplate, rate)
                .await
                .unwrap();
            assert!(selection.pattern.is_none());
        }
    }

    #[tokio::test]
    async fn test_pure_exploitation_picks_best() {
        let repo = seeded_repo(&[("A", 0.6, 10), ("B", 0.9, 2), ("C", 0.9, 5)]).await;
        let selector = PatternSelector::with_seed(repo, 42);

        for _ in 0..20 {
            let selection = selector
                .select(AgentType::Interview, PatternKind::QuestionTemplate, 0.0)
                .await
                .unwrap();
            assert_eq!(selection.mode, SelectionMode::Exploit);
            let pattern = selection.pattern.unwrap();
            assert_eq!(pattern.pattern_id, PatternId::interview_question("C"));
        }
    }

    #[tokio::test]
    async fn test_pure_exploration_is_roughly_uniform() {
        let repo = seeded_repo(&[("A", 0.5, 1), ("B", 0.5, 1), ("C", 0.5, 1), ("D", 0.5, 1)]).await;
        let selector = PatternSelector::with_seed(repo, 1234);
        let target = PatternId::interview_question("A");

        let trials = 2000;
        let mut hits = 0;
        for _ in 0..trials {
            let selection = selector
                .select(AgentType::Interview, PatternKind::QuestionTemplate, 1.0)
                .await
                .unwrap();
            assert_eq!(selection.mode, SelectionMode::Explore);
            if selection.pattern.unwrap().pattern_id == target {
                hits += 1;
            }
        }

        let share = hits as f64 / trials as f64;
        assert!((share - 0.25).abs() < 0.05, "share was {}", share);
    }

    #[tokio::test]
    async fn test_inactive_patterns_are_never_selected() {
        let repo = Arc::new(InMemoryPatternRepository::new());
        let mut retired = LearningPattern::question_template("Retired", "mid", true);
        retired.is_active = false;
        repo.insert(&retired).await.unwrap();

        let selector = PatternSelector::with_seed(repo, 3);
        for rate in [0.0, 1.0] {
            let selection = selector
                .select(AgentType::Interview, PatternKind::QuestionTemplate, rate)
                .await
                .unwrap();
            assert!(selection.pattern.is_none());
        }
    }
}
