use crate::http::build_client;
use crate::llm::Generator;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub gateway_url: String,
    pub api_key: Option<String>,
    pub function_name: String,
    pub model: Option<String>,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("missing gateway url")]
    MissingGateway,
    #[error("http error: {0}")]
    Http(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct LlmMessage {
    pub role: String,
    pub content: String,
}

impl LlmMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    #[serde(default)]
    pub usage: Option<LlmUsage>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LlmUsage {
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
}

pub struct LlmClient {
    http: Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig, timeout: Duration, connect_timeout: Duration) -> Self {
        Self {
            http: build_client(timeout, connect_timeout),
            config,
        }
    }

    /// Runs one inference through the gateway. `model` overrides the
    /// configured model for this call only.
    pub async fn chat(
        &self,
        messages: &[LlmMessage],
        model: Option<&str>,
    ) -> Result<LlmResponse, LlmError> {
        let gateway = self.config.gateway_url.trim().trim_end_matches('/');
        if gateway.is_empty() {
            return Err(LlmError::MissingGateway);
        }

        let body = ChatRequest {
            function_name: self.config.function_name.clone(),
            model_name: model
                .or(self.config.model.as_deref())
                .map(|value| value.to_string()),
            input: ChatInput {
                messages: messages.to_vec(),
            },
        };

        let mut request = self.http.post(format!("{gateway}/inference")).json(&body);

        if let Some(key) = &self.config.api_key {
            request = request.header("X-API-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| LlmError::Http(err.to_string()))?;

        if !response.status().is_success() {
            return Err(LlmError::Http(format!("HTTP {}", response.status())));
        }

        let payload: TensorZeroResponse = response
            .json()
            .await
            .map_err(|err| LlmError::InvalidResponse(err.to_string()))?;

        let text = payload
            .content
            .into_iter()
            .find(|item| item.r#type == "text")
            .map(|item| item.text)
            .ok_or_else(|| LlmError::InvalidResponse("missing text".into()))?;

        Ok(LlmResponse {
            text,
            usage: payload.usage,
        })
    }
}

impl Generator for LlmClient {
    async fn generate(
        &self,
        system_message: &str,
        user_message: &str,
        model_hint: Option<&str>,
    ) -> Result<LlmResponse, LlmError> {
        let messages = [
            LlmMessage::system(system_message),
            LlmMessage::user(user_message),
        ];
        self.chat(&messages, model_hint).await
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    function_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_name: Option<String>,
    input: ChatInput,
}

#[derive(Debug, Serialize)]
struct ChatInput {
    messages: Vec<LlmMessage>,
}

#[derive(Debug, Deserialize)]
struct TensorZeroResponse {
    content: Vec<ResponseContent>,
    #[serde(default)]
    usage: Option<LlmUsage>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    r#type: String,
    #[serde(default)]
    text: String,
}
