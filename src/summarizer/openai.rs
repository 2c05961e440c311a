//! OpenAI-compatible chat completions (OpenAI, DeepSeek, Qwen)

use super::backend::{BackendError, GenerationParams, SubmitRequest, SummaryBackend};
use crate::config::{ModelType, SummaryConfig};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Speaks `POST {base}/chat/completions`
pub struct ChatCompletionsBackend {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    flavor: ModelType,
}

impl ChatCompletionsBackend {
    pub fn new(client: Client, config: &SummaryConfig) -> Self {
        let api_key = Some(config.api_key.trim().to_string()).filter(|k| !k.is_empty());
        Self {
            client,
            endpoint: format!("{}/chat/completions", config.endpoint()),
            api_key,
            model: config.model_name.clone(),
            flavor: config.model_type,
        }
    }
}

#[async_trait]
impl SummaryBackend for ChatCompletionsBackend {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn submit(
        &self,
        request: &SubmitRequest,
        params: &GenerationParams,
    ) -> Result<String, BackendError> {
        let deepseek = self.flavor == ModelType::DeepSeek;
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.instructions,
                },
                ChatMessage {
                    role: "user",
                    content: &request.text,
                },
            ],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: deepseek.then_some(params.top_k),
            frequency_penalty: deepseek.then_some(params.frequency_penalty),
            stream: false,
        };

        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status, &text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::malformed(format!("unparsable response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.and_then(|m| m.content).or(choice.text))
            .ok_or_else(|| BackendError::malformed("response has no choices"))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<AssistantMessage>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}
