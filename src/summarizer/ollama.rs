//! Ollama's native chat API

use super::backend::{BackendError, GenerationParams, SubmitRequest, SummaryBackend};
use crate::config::SummaryConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Speaks `POST {base}/api/chat` with streaming disabled
pub struct OllamaBackend {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaBackend {
    pub fn new(client: Client, config: &SummaryConfig) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/chat", config.endpoint()),
            model: config.model_name.clone(),
        }
    }
}

#[async_trait]
impl SummaryBackend for OllamaBackend {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn submit(
        &self,
        request: &SubmitRequest,
        params: &GenerationParams,
    ) -> Result<String, BackendError> {
        let body = OllamaChatRequest {
            model: &self.model,
            messages: vec![
                OllamaMessage {
                    role: "system",
                    content: &request.instructions,
                },
                OllamaMessage {
                    role: "user",
                    content: &request.text,
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: params.temperature,
                top_p: params.top_p,
                top_k: params.top_k,
                num_predict: params.max_tokens,
            },
        };

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status, &text));
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::malformed(format!("unparsable response: {}", e)))?;

        parsed
            .message
            .map(|m| m.content)
            .or(parsed.response)
            .ok_or_else(|| BackendError::malformed("response has neither message nor response"))
    }
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaReply>,
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaReply {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelType;
    use crate::summarizer::backend::BackendErrorKind;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> OllamaBackend {
        let config = SummaryConfig {
            model_type: ModelType::Ollama,
            api_base: server.uri(),
            model_name: "qwen2:7b".to_string(),
            ..SummaryConfig::default()
        };
        OllamaBackend::new(Client::new(), &config)
    }

    fn request() -> SubmitRequest {
        SubmitRequest {
            instructions: "Summarize.".to_string(),
            text: "Page text".to_string(),
        }
    }

    #[tokio::test]
    async fn test_chat_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "model": "qwen2:7b",
                "stream": false,
                "options": {"num_predict": 1000, "top_k": 50}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": {"role": "assistant", "content": "Local summary"},
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let params = GenerationParams::from(&SummaryConfig::default());
        let text = backend(&server).submit(&request(), &params).await.unwrap();
        assert_eq!(text, "Local summary");
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let params = GenerationParams::from(&SummaryConfig::default());
        let err = backend(&server).submit(&request(), &params).await.unwrap_err();
        assert_eq!(err.kind, BackendErrorKind::Transient);
    }
}
