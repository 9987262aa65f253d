// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! # Evaluation Store
//!
//! Critic evaluations are kept as one pretty-printed JSON document per
//! evaluation, `<evaluations_dir>/<evaluation_id>.json`, so reviewers can read
//! and diff them directly. Writes go through a temporary file and a rename.
//!
//! [`InMemoryEvaluationRepository`] backs tests and ephemeral runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::warn;

use crate::domain::agent::AgentType;
use crate::domain::evaluation::{EvaluationStatus, PromptEvaluation};
use crate::domain::repository::{EvaluationRepository, RepositoryError};

/// Evaluation ids are `<agent_type>_<YYYYmmdd_HHMMSS>`; anything outside this
/// charset cannot name a stored evaluation.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn matches_filter(evaluation: &PromptEvaluation, agent_type: Option<AgentType>, status: Option<EvaluationStatus>) -> bool {
    agent_type.is_none_or(|a| evaluation.agent_type == a) && status.is_none_or(|s| evaluation.status == s)
}

pub struct FileEvaluationRepository {
    dir: PathBuf,
}

impl FileEvaluationRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

#[async_trait]
impl EvaluationRepository for FileEvaluationRepository {
    async fn save(&self, evaluation: &PromptEvaluation) -> Result<(), RepositoryError> {
        if !is_valid_id(&evaluation.evaluation_id) {
            return Err(RepositoryError::Serialization(format!(
                "Invalid evaluation id: {}",
                evaluation.evaluation_id
            )));
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let body = serde_json::to_vec_pretty(evaluation)?;

        let path = self.path_for(&evaluation.evaluation_id);
        let tmp = self.dir.join(format!(".{}.json.tmp", evaluation.evaluation_id));
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<PromptEvaluation>, RepositoryError> {
        if !is_valid_id(id) {
            return Ok(None);
        }

        match tokio::fs::read(self.path_for(id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(
        &self,
        agent_type: Option<AgentType>,
        status: Option<EvaluationStatus>,
    ) -> Result<Vec<PromptEvaluation>, RepositoryError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut evaluations = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_json = path.extension().is_some_and(|ext| ext == "json");
            let is_hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            if !is_json || is_hidden {
                continue;
            }

            let bytes = tokio::fs::read(&path).await?;
            match serde_json::from_slice::<PromptEvaluation>(&bytes) {
                Ok(evaluation) if matches_filter(&evaluation, agent_type, status) => evaluations.push(evaluation),
                Ok(_) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable evaluation file"),
            }
        }

        evaluations.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(evaluations)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryEvaluationRepository {
    evaluations: Arc<RwLock<HashMap<String, PromptEvaluation>>>,
}

impl InMemoryEvaluationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EvaluationRepository for InMemoryEvaluationRepository {
    async fn save(&self, evaluation: &PromptEvaluation) -> Result<(), RepositoryError> {
        self.evaluations
            .write()
            .insert(evaluation.evaluation_id.clone(), evaluation.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<PromptEvaluation>, RepositoryError> {
        Ok(self.evaluations.read().get(id).cloned())
    }

    async fn list(
        &self,
        agent_type: Option<AgentType>,
        status: Option<EvaluationStatus>,
    ) -> Result<Vec<PromptEvaluation>, RepositoryError> {
        let evaluations = self.evaluations.read();
        let mut matching: Vec<PromptEvaluation> = evaluations
            .values()
            .filter(|e| matches_filter(e, agent_type, status))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::evaluation::{CriticVerdict, PerformanceSnapshot};
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn evaluation(agent_type: AgentType, minutes_ago: i64) -> PromptEvaluation {
        let verdict = CriticVerdict {
            evaluation_score: 7.0,
            issues_identified: vec!["Too vague".to_string()],
            improvement_reasoning: "Needs structure".to_string(),
            improved_prompt: "Be precise.".to_string(),
            expected_improvements: vec![],
        };
        let mut evaluation = PromptEvaluation::pending(
            agent_type,
            "Be helpful.".to_string(),
            verdict,
            PerformanceSnapshot::default(),
        );
        evaluation.timestamp = Utc::now() - Duration::minutes(minutes_ago);
        evaluation.evaluation_id = PromptEvaluation::make_id(agent_type, evaluation.timestamp);
        evaluation
    }

    #[tokio::test]
    async fn test_file_roundtrip_and_filters() {
        let tmp = TempDir::new().unwrap();
        let repo = FileEvaluationRepository::new(tmp.path().join("evaluations"));

        let older = evaluation(AgentType::HrChat, 10);
        let newer = evaluation(AgentType::HrChat, 1);
        let mut other = evaluation(AgentType::Interview, 5);
        other.reject(Some("Not aligned".to_string()));
        for e in [&older, &newer, &other] {
            repo.save(e).await.unwrap();
        }

        let path = tmp.path().join("evaluations").join(format!("{}.json", newer.evaluation_id));
        assert!(path.exists());

        let found = repo.find_by_id(&newer.evaluation_id).await.unwrap().unwrap();
        assert_eq!(found, newer);

        let chat = repo.list(Some(AgentType::HrChat), None).await.unwrap();
        assert_eq!(chat.len(), 2);
        assert_eq!(chat[0].evaluation_id, newer.evaluation_id);

        let rejected = repo.list(None, Some(EvaluationStatus::Rejected)).await.unwrap();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].agent_type, AgentType::Interview);
    }

    #[tokio::test]
    async fn test_review_overwrites_in_place() {
        let tmp = TempDir::new().unwrap();
        let repo = FileEvaluationRepository::new(tmp.path());
        let mut e = evaluation(AgentType::CvShortlisting, 0);
        repo.save(&e).await.unwrap();

        e.approve();
        repo.save(&e).await.unwrap();

        let all = repo.list(None, None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, EvaluationStatus::Approved);
    }

    #[tokio::test]
    async fn test_missing_dir_and_traversal_ids() {
        let tmp = TempDir::new().unwrap();
        let repo = FileEvaluationRepository::new(tmp.path().join("absent"));
        assert!(repo.list(None, None).await.unwrap().is_empty());
        assert!(repo.find_by_id("hr_chat_20260101_000000").await.unwrap().is_none());
        assert!(repo.find_by_id("../../etc/passwd").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreadable_files_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let repo = FileEvaluationRepository::new(tmp.path());
        repo.save(&evaluation(AgentType::HrChat, 0)).await.unwrap();
        std::fs::write(tmp.path().join("garbage.json"), b"{not json").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"hello").unwrap();

        assert_eq!(repo.list(None, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_in_memory_newest_first() {
        let repo = InMemoryEvaluationRepository::new();
        repo.save(&evaluation(AgentType::HrChat, 30)).await.unwrap();
        let newest = evaluation(AgentType::HrChat, 2);
        repo.save(&newest).await.unwrap();

        let all = repo.list(Some(AgentType::HrChat), Some(EvaluationStatus::PendingReview)).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].evaluation_id, newest.evaluation_id);
    }
}
