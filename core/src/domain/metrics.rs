// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! Agent performance metrics
//!
//! One [`AgentMetrics`] row per agent type. Counters only ever grow; the
//! average rating and the improvement rate are recomputed from the counters on
//! every update, and the baseline they compare against is fixed at creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::agent::{AgentType, FeedbackType};

/// Reference success rate used when a metrics row is first created.
pub const DEFAULT_BASELINE_PERFORMANCE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub agent_type: AgentType,
    pub version: String,
    pub total_actions: u64,
    pub successful_actions: u64,
    pub failed_actions: u64,
    /// Actions that carried a user rating; the denominator of `average_rating`.
    pub rated_actions: u64,
    pub average_rating: f64,
    pub baseline_performance: f64,
    /// Percentage over (or under) the baseline success rate.
    pub improvement_rate: f64,
    pub patterns_learned: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_improvement_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The contribution of one feedback event to the counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsDelta {
    pub successful: bool,
    pub failed: bool,
    pub rating: Option<u8>,
}

impl MetricsDelta {
    pub fn from_feedback(feedback_type: FeedbackType, rating: Option<u8>) -> Self {
        Self {
            successful: feedback_type == FeedbackType::Positive,
            failed: feedback_type == FeedbackType::Negative,
            rating,
        }
    }
}

impl AgentMetrics {
    pub fn new(agent_type: AgentType, baseline_performance: f64) -> Self {
        let now = Utc::now();
        Self {
            agent_type,
            version: "1.0.0".to_string(),
            total_actions: 0,
            successful_actions: 0,
            failed_actions: 0,
            rated_actions: 0,
            average_rating: 0.0,
            baseline_performance,
            improvement_rate: 0.0,
            patterns_learned: 0,
            last_improvement_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_actions == 0 {
            0.0
        } else {
            self.successful_actions as f64 / self.total_actions as f64
        }
    }

    /// Applies one feedback event. Storage backends that cannot lock the row
    /// must reproduce this arithmetic in a single atomic statement.
    pub fn apply(&mut self, delta: &MetricsDelta) {
        self.total_actions += 1;
        if delta.successful {
            self.successful_actions += 1;
        }
        if delta.failed {
            self.failed_actions += 1;
        }

        if let Some(rating) = delta.rating {
            self.rated_actions += 1;
            let n = self.rated_actions as f64;
            self.average_rating = (self.average_rating * (n - 1.0) + f64::from(rating)) / n;
        }

        if self.baseline_performance > 0.0 {
            self.improvement_rate =
                (self.success_rate() - self.baseline_performance) / self.baseline_performance * 100.0;
        }

        self.updated_at = Utc::now();
    }

    pub fn is_improving(&self) -> bool {
        self.improvement_rate > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply_all(metrics: &mut AgentMetrics, events: &[(FeedbackType, Option<u8>)]) {
        for (feedback_type, rating) in events {
            metrics.apply(&MetricsDelta::from_feedback(*feedback_type, *rating));
        }
    }

    #[test]
    fn test_counters() {
        let mut metrics = AgentMetrics::new(AgentType::Interview, DEFAULT_BASELINE_PERFORMANCE);
        apply_all(
            &mut metrics,
            &[
                (FeedbackType::Positive, Some(5)),
                (FeedbackType::Negative, Some(1)),
                (FeedbackType::Neutral, None),
                (FeedbackType::Correction, Some(2)),
            ],
        );

        assert_eq!(metrics.total_actions, 4);
        assert_eq!(metrics.successful_actions, 1);
        assert_eq!(metrics.failed_actions, 1);
        assert!(metrics.successful_actions + metrics.failed_actions <= metrics.total_actions);
        assert_eq!(metrics.rated_actions, 3);
    }

    #[test]
    fn test_average_rating_is_order_independent_mean() {
        let ratings = [5u8, 3, 4, 1, 2];
        let mut forward = AgentMetrics::new(AgentType::HrChat, DEFAULT_BASELINE_PERFORMANCE);
        let mut backward = AgentMetrics::new(AgentType::HrChat, DEFAULT_BASELINE_PERFORMANCE);

        for r in ratings {
            forward.apply(&MetricsDelta::from_feedback(FeedbackType::Neutral, Some(r)));
        }
        for r in ratings.iter().rev() {
            backward.apply(&MetricsDelta::from_feedback(FeedbackType::Neutral, Some(*r)));
        }

        assert!((forward.average_rating - 3.0).abs() < 1e-9);
        assert!((forward.average_rating - backward.average_rating).abs() < 1e-9);
    }

    #[test]
    fn test_improvement_rate_over_baseline() {
        let mut metrics = AgentMetrics::new(AgentType::CvShortlisting, 0.5);
        apply_all(
            &mut metrics,
            &[
                (FeedbackType::Positive, None),
                (FeedbackType::Positive, None),
                (FeedbackType::Positive, None),
                (FeedbackType::Negative, None),
            ],
        );
        // success 0.75 against baseline 0.5
        assert!((metrics.improvement_rate - 50.0).abs() < 1e-9);
        assert!(metrics.is_improving());
    }

    #[test]
    fn test_zero_baseline_leaves_improvement_rate() {
        let mut metrics = AgentMetrics::new(AgentType::CvShortlisting, 0.0);
        metrics.apply(&MetricsDelta::from_feedback(FeedbackType::Positive, None));
        assert_eq!(metrics.improvement_rate, 0.0);
    }
}
