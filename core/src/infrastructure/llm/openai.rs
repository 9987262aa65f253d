// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0

// OpenAI LLM Provider Adapter
//
// Anti-Corruption Layer for the OpenAI chat completions API. Also works with
// OpenAI-compatible servers (vLLM, LM Studio) that honour `response_format`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{http_client, send_error};
use crate::domain::llm::{
    ChatMessage, GenerationOptions, GenerationResponse, LLMError, LLMProvider, ProviderInfo,
};

pub struct OpenAIAdapter {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout_seconds: u64,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Deserialize)]
struct OpenAIMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAIAdapter {
    pub fn new(endpoint: String, api_key: String, model: String, timeout_seconds: u64) -> Result<Self, LLMError> {
        Ok(Self {
            client: http_client(timeout_seconds)?,
            endpoint,
            api_key,
            model,
            timeout_seconds,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl LLMProvider for OpenAIAdapter {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, LLMError> {
        if messages.is_empty() {
            return Err(LLMError::InvalidInput("No messages to send".to_string()));
        }

        let request = OpenAIRequest {
            model: &self.model,
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            response_format: options.json_mode.then_some(ResponseFormat { kind: "json_object" }),
        };

        let response = self
            .client
            .post(self.url("/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout_seconds))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            return Err(if status == 401 || status == 403 {
                LLMError::Authentication(error_text)
            } else if status == 429 {
                LLMError::RateLimit
            } else if status == 404 {
                LLMError::ModelNotFound(self.model.clone())
            } else {
                LLMError::Provider(format!("HTTP {}: {}", status, error_text))
            });
        }

        let completion: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| LLMError::Provider(format!("Failed to parse response: {}", e)))?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LLMError::Provider("No response from model".into()))?;

        Ok(GenerationResponse {
            text,
            provider: "openai".to_string(),
            model: self.model.clone(),
        })
    }

    async fn health_check(&self) -> Result<(), LLMError> {
        let response = self
            .client
            .get(self.url("/models"))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout_seconds))?;

        if response.status().is_success() {
            Ok(())
        } else if response.status() == 401 || response.status() == 403 {
            Err(LLMError::Authentication("Invalid API key".into()))
        } else {
            Err(LLMError::Network(format!("HTTP {}", response.status())))
        }
    }

    fn describe(&self) -> ProviderInfo {
        ProviderInfo {
            provider: "openai".to_string(),
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
    async fn test_json_mode_and_bearer_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4o-mini",
                "response_format": { "type": "json_object" }
            })))
            .with_status(200)
            .with_body(
                json!({ "choices": [ { "index": 0, "message": { "role": "assistant", "content": "{}" } } ] })
                    .to_string(),
            )
            .create_async()
            .await;

        let adapter =
            OpenAIAdapter::new(server.url(), "sk-test".to_string(), "gpt-4o-mini".to_string(), 5).unwrap();
        let options = GenerationOptions {
            json_mode: true,
            ..Default::default()
        };
        let response = adapter.generate(&[ChatMessage::user("hi")], &options).await.unwrap();
        assert_eq!(response.text, "{}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let mut server = mockito::Server::new_async().await;
        let adapter = OpenAIAdapter::new(server.url(), "bad".to_string(), "gpt-4o-mini".to_string(), 5).unwrap();
        let messages = [ChatMessage::user("hi")];

        let unauthorized = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("invalid key")
            .create_async()
            .await;
        let err = adapter.generate(&messages, &GenerationOptions::default()).await.unwrap_err();
        assert!(matches!(err, LLMError::Authentication(_)));
        unauthorized.remove_async().await;

        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .create_async()
            .await;
        let err = adapter.generate(&messages, &GenerationOptions::default()).await.unwrap_err();
        assert!(matches!(err, LLMError::RateLimit));
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let adapter = OpenAIAdapter::new(server.url(), "k".to_string(), "m".to_string(), 5).unwrap();
        let err = adapter
            .generate(&[ChatMessage::user("hi")], &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::Provider(_)));
    }
}
