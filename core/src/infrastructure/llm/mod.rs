// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0

// LLM Provider Infrastructure - Anti-Corruption Layer Implementations
//
// Each adapter translates between the domain `LLMProvider` port and one
// vendor chat API. Requests carry a bounded timeout and are never retried.

pub mod ollama;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::domain::llm::{LLMError, LLMProvider};
use crate::domain::service_config::{LLMConfig, LLMProviderKind};

pub use ollama::OllamaAdapter;
pub use openai::OpenAIAdapter;

/// Builds the provider selected by `config`. `api_key` is the resolved key
/// (see `ServiceConfigManifest::llm_api_key`).
pub fn create_provider(config: &LLMConfig, api_key: Option<String>) -> anyhow::Result<Arc<dyn LLMProvider>> {
    info!(
        provider = ?config.provider,
        model = %config.model,
        endpoint = %config.endpoint,
        "Initializing LLM provider"
    );

    let provider: Arc<dyn LLMProvider> = match config.provider {
        LLMProviderKind::Ollama => Arc::new(OllamaAdapter::new(
            config.endpoint.clone(),
            config.model.clone(),
            config.timeout_seconds,
        )?),
        LLMProviderKind::OpenAI => {
            let Some(api_key) = api_key else {
                anyhow::bail!("The openai provider requires spec.llm.api_key");
            };
            Arc::new(OpenAIAdapter::new(
                config.endpoint.clone(),
                api_key,
                config.model.clone(),
                config.timeout_seconds,
            )?)
        }
    };
    Ok(provider)
}

pub(crate) fn http_client(timeout_seconds: u64) -> Result<reqwest::Client, LLMError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .map_err(|e| LLMError::Provider(format!("Failed to build HTTP client: {}", e)))
}

pub(crate) fn send_error(err: reqwest::Error, timeout_seconds: u64) -> LLMError {
    if err.is_timeout() {
        LLMError::Timeout(timeout_seconds)
    } else {
        LLMError::Network(err.to_string())
    }
}
