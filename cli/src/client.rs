// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0

//! HTTP client for a running Ruya API server

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Map, Value};
use std::time::Duration;

/// Critic evaluations wait on the LLM, so the client timeout covers a slow model.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        Self::with_base_url(format!("http://{}:{}", host, port))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<Value> {
        self.send(self.client.get(self.url("/health")), "check server health").await
    }

    pub async fn metrics(&self, agent_type: Option<&str>) -> Result<Value> {
        let path = match agent_type {
            Some(agent) => format!("/learning/metrics/{}", agent),
            None => "/learning/metrics".to_string(),
        };
        self.send(self.client.get(self.url(&path)), "fetch metrics").await
    }

    pub async fn insights(&self, agent_type: &str) -> Result<Value> {
        let path = format!("/learning/insights/{}", agent_type);
        self.send(self.client.get(self.url(&path)), "fetch insights").await
    }

    pub async fn learning_state(&self, agent_type: &str) -> Result<Value> {
        let path = format!("/learning/state/{}", agent_type);
        self.send(self.client.get(self.url(&path)), "fetch learning state").await
    }

    pub async fn update_learning_state(
        &self,
        agent_type: &str,
        learning_enabled: Option<bool>,
        auto_adapt: Option<bool>,
        exploration_rate: Option<f64>,
    ) -> Result<Value> {
        let mut update = Map::new();
        if let Some(enabled) = learning_enabled {
            update.insert("learning_enabled".to_string(), json!(enabled));
        }
        if let Some(adapt) = auto_adapt {
            update.insert("auto_adapt".to_string(), json!(adapt));
        }
        if let Some(rate) = exploration_rate {
            update.insert("exploration_rate".to_string(), json!(rate));
        }

        let path = format!("/learning/state/{}", agent_type);
        self.send(
            self.client.put(self.url(&path)).json(&Value::Object(update)),
            "update learning state",
        )
        .await
    }

    pub async fn evaluate(&self, agent_type: &str, limit_samples: Option<usize>) -> Result<Value> {
        let body = json!({ "agent_type": agent_type, "limit_samples": limit_samples });
        self.send(
            self.client.post(self.url("/critic/evaluate")).json(&body),
            "run critic evaluation",
        )
        .await
    }

    pub async fn list_evaluations(&self, agent_type: Option<&str>, status: Option<&str>) -> Result<Value> {
        let mut query = Vec::new();
        if let Some(agent) = agent_type {
            query.push(("agent_type", agent));
        }
        if let Some(status) = status {
            query.push(("status", status));
        }
        self.send(
            self.client.get(self.url("/critic/improvements")).query(&query),
            "list evaluations",
        )
        .await
    }

    pub async fn approve(&self, evaluation_id: &str) -> Result<Value> {
        let path = format!("/critic/improvements/{}/approve", evaluation_id);
        self.send(self.client.post(self.url(&path)), "approve evaluation").await
    }

    pub async fn reject(&self, evaluation_id: &str, reason: Option<&str>) -> Result<Value> {
        let path = format!("/critic/improvements/{}/reject", evaluation_id);
        self.send(
            self.client.post(self.url(&path)).json(&json!({ "reason": reason })),
            "reject evaluation",
        )
        .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> Result<Value> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to {} (is the server running at {}?)", action, self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(body);
            anyhow::bail!("Failed to {} ({}): {}", action, status, message);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response to {}", action))
    }
}
