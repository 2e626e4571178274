//! OpenAI assistant client implementation.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::{Value, json};
use tracing::debug;

use super::super::base::{AssistantError, AssistantReply, AssistantResult, BaseAssistant, ToolSelection};
use super::config::OpenAIAssistantConfig;
use super::messages::{ChatCompletionResponse, build_messages, pcm16_to_f32, tool_definitions};
use crate::core::call_log::Turn;
use crate::core::stt::openai::OpenAIErrorResponse;

/// Assistant backed by OpenAI chat completions and speech synthesis.
pub struct OpenAIAssistant {
    config: OpenAIAssistantConfig,
    http_client: Client,
}

impl OpenAIAssistant {
    pub fn new(config: OpenAIAssistantConfig) -> AssistantResult<Self> {
        config.validate()?;

        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| {
                AssistantError::InvalidConfiguration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &OpenAIAssistantConfig {
        &self.config
    }

    async fn complete(&self, messages: Vec<Value>) -> AssistantResult<AssistantReply> {
        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "tools": tool_definitions(),
        });
        if let Some(temp) = self.config.temperature {
            body["temperature"] = json!(temp);
        }

        let response = self.post_json(&self.config.chat_url(), &body).await?;
        let text = response
            .text()
            .await
            .map_err(|e| AssistantError::NetworkError(format!("Failed to read response: {e}")))?;

        let parsed: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| AssistantError::InvalidResponse(format!("Invalid completion: {e}")))?;
        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| AssistantError::InvalidResponse("completion had no choices".to_string()))?;

        let content = message
            .content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        let selected_tool = message
            .tool_calls
            .first()
            .map(|call| ToolSelection::from_name(&call.function.name));

        debug!(
            has_content = content.is_some(),
            tool = ?selected_tool,
            "Assistant completion received"
        );

        Ok(AssistantReply {
            content,
            selected_tool,
        })
    }

    async fn post_json(&self, url: &str, body: &Value) -> AssistantResult<Response> {
        let response = self
            .http_client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| AssistantError::NetworkError(format!("Request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let error_msg = match serde_json::from_str::<OpenAIErrorResponse>(&text) {
            Ok(error_response) => format!("OpenAI API error: {}", error_response.error),
            Err(_) => format!("OpenAI API error ({status}): {text}"),
        };
        Err(if status.as_u16() == 401 {
            AssistantError::AuthenticationFailed(error_msg)
        } else {
            AssistantError::ProviderError(error_msg)
        })
    }
}

#[async_trait]
impl BaseAssistant for OpenAIAssistant {
    async fn respond(&self, history: &[Turn]) -> AssistantResult<AssistantReply> {
        self.complete(build_messages(&self.config.instructions, history))
            .await
    }

    async fn synthesize(&self, text: &str) -> AssistantResult<Vec<f32>> {
        let mut body = json!({
            "model": self.config.tts_model,
            "input": text,
            "voice": self.config.voice,
            "response_format": "pcm",
        });
        // Add speed if not default (1.0)
        if (self.config.speed - 1.0).abs() > 0.001 {
            body["speed"] = json!(self.config.speed);
        }

        let response = self.post_json(&self.config.speech_url(), &body).await?;
        let audio = response
            .bytes()
            .await
            .map_err(|e| AssistantError::NetworkError(format!("Failed to read audio: {e}")))?;

        Ok(pcm16_to_f32(&audio))
    }

    async fn opening_line(&self) -> AssistantResult<String> {
        let mut messages = build_messages(&self.config.instructions, &[]);
        messages.push(json!({ "role": "user", "content": self.config.opening_prompt }));

        self.complete(messages)
            .await?
            .content
            .ok_or_else(|| AssistantError::InvalidResponse("empty opening line".to_string()))
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
