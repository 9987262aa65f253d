// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0

// Ollama LLM Provider Adapter
//
// Anti-Corruption Layer for locally hosted Ollama models (the default critic
// backend). Uses the non-streaming `/api/chat` endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{http_client, send_error};
use crate::domain::llm::{
    ChatMessage, GenerationOptions, GenerationResponse, LLMError, LLMProvider, ProviderInfo,
};

pub struct OllamaAdapter {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    timeout_seconds: u64,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i32>,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[derive(Deserialize)]
struct OllamaMessage {
    content: String,
}

impl OllamaAdapter {
    pub fn new(endpoint: String, model: String, timeout_seconds: u64) -> Result<Self, LLMError> {
        Ok(Self {
            client: http_client(timeout_seconds)?,
            endpoint,
            model,
            timeout_seconds,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl LLMProvider for OllamaAdapter {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, LLMError> {
        if messages.is_empty() {
            return Err(LLMError::InvalidInput("No messages to send".to_string()));
        }

        let request = OllamaChatRequest {
            model: &self.model,
            messages,
            stream: false,
            format: options.json_mode.then_some("json"),
            options: OllamaOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens.map(|t| i32::try_from(t).unwrap_or(i32::MAX)),
            },
        };

        let response = self
            .client
            .post(self.url("/api/chat"))
            .json(&request)
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout_seconds))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            return Err(if status == 404 {
                LLMError::ModelNotFound(self.model.clone())
            } else {
                LLMError::Provider(format!("HTTP {}: {}", status, error_text))
            });
        }

        let chat: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| LLMError::Provider(format!("Failed to parse response: {}", e)))?;

        Ok(GenerationResponse {
            text: chat.message.content,
            provider: "ollama".to_string(),
            model: self.model.clone(),
        })
    }

    async fn health_check(&self) -> Result<(), LLMError> {
        // A running server answers the model listing.
        let response = self
            .client
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout_seconds))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(LLMError::Network(format!("HTTP {}", response.status())))
        }
    }

    fn describe(&self) -> ProviderInfo {
        ProviderInfo {
            provider: "ollama".to_string(),
            model: self.model.clone(),
            endpoint: self.endpoint.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_chat_request_shape() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::PartialJson(json!({
                "model": "ministral-3:3b",
                "stream": false,
                "format": "json",
                "messages": [
                    { "role": "system", "content": "critic" },
                    { "role": "user", "content": "evaluate" }
                ],
                "options": { "num_predict": 4096 }
            })))
            .with_status(200)
            .with_body(
                json!({ "model": "ministral-3:3b", "message": { "role": "assistant", "content": "{\"ok\":true}" }, "done": true })
                    .to_string(),
            )
            .create_async()
            .await;

        let adapter = OllamaAdapter::new(server.url(), "ministral-3:3b".to_string(), 5).unwrap();
        let options = GenerationOptions {
            json_mode: true,
            ..Default::default()
        };
        let response = adapter
            .generate(&[ChatMessage::system("critic"), ChatMessage::user("evaluate")], &options)
            .await
            .unwrap();

        assert_eq!(response.text, "{\"ok\":true}");
        assert_eq!(response.provider, "ollama");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_oversized_max_tokens_saturates() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::PartialJson(json!({
                "options": { "num_predict": i32::MAX }
            })))
            .with_status(200)
            .with_body(
                json!({ "model": "m", "message": { "role": "assistant", "content": "ok" }, "done": true })
                    .to_string(),
            )
            .create_async()
            .await;

        let adapter = OllamaAdapter::new(server.url(), "m".to_string(), 5).unwrap();
        let options = GenerationOptions {
            max_tokens: Some(u32::MAX),
            ..Default::default()
        };
        adapter.generate(&[ChatMessage::user("hi")], &options).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_model() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(404)
            .with_body("model not found")
            .create_async()
            .await;

        let adapter = OllamaAdapter::new(server.url(), "nope".to_string(), 5).unwrap();
        let err = adapter
            .generate(&[ChatMessage::user("hi")], &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::ModelNotFound(m) if m == "nope"));
    }

    #[tokio::test]
    async fn test_health_check() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models":[]}"#)
            .create_async()
            .await;

        let adapter = OllamaAdapter::new(server.url(), "ministral-3:3b".to_string(), 5).unwrap();
        assert!(adapter.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_conversation_rejected() {
        let adapter = OllamaAdapter::new("http://127.0.0.1:9".to_string(), "m".to_string(), 1).unwrap();
        let err = adapter.generate(&[], &GenerationOptions::default()).await.unwrap_err();
        assert!(matches!(err, LLMError::InvalidInput(_)));
    }
}
