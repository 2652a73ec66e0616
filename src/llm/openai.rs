//! OpenAI-compatible chat completions backend.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionBackend, CompletionRequest, CompletionResponse, Role};

const PROVIDER: &str = "openai";

/// Backend speaking the standard `/v1/chat/completions` protocol with API
/// key auth.
pub struct OpenAiBackend {
    client: Client,
    base_url: String,
    api_key: Option<secrecy::SecretString>,
    default_model: String,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiBackend {
    /// Create a backend from settings.
    pub fn new(settings: &Settings) -> Result<Self, LlmError> {
        if settings.api_key.is_none() {
            return Err(LlmError::AuthFailed {
                provider: PROVIDER.to_string(),
            });
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
            default_model: settings.model.clone(),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn api_key(&self) -> String {
        self.api_key
            .as_ref()
            .map(|k| k.expose_secret().to_string())
            .unwrap_or_default()
    }

    async fn send_request<T: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        body: &T,
    ) -> Result<R, LlmError> {
        let url = self.api_url("chat/completions");

        tracing::debug!("sending completion request to {url}");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key()))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("completion request failed: {e}");
                LlmError::RequestFailed {
                    provider: PROVIDER.to_string(),
                    reason: e.to_string(),
                }
            })?;

        let status = response.status();
        let response_text = response.text().await.unwrap_or_default();

        tracing::debug!("completion response status: {status}");

        if !status.is_success() {
            if status.as_u16() == 401 {
                return Err(LlmError::AuthFailed {
                    provider: PROVIDER.to_string(),
                });
            }
            if status.as_u16() == 429 {
                return Err(LlmError::RateLimited {
                    provider: PROVIDER.to_string(),
                    retry_after: None,
                });
            }
            return Err(LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("HTTP {status}: {response_text}"),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: format!("JSON parse error: {e}. Raw: {response_text}"),
        })
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let model = request
            .params
            .model
            .as_deref()
            .unwrap_or(&self.default_model);

        let wire = WireRequest {
            model,
            messages: &request.messages,
            temperature: request.params.temperature,
            max_tokens: request.params.max_tokens,
        };

        let response: WireResponse = self.send_request(&wire).await?;
        if response.choices.is_empty() {
            return Err(LlmError::NoChoices {
                provider: PROVIDER.to_string(),
            });
        }

        Ok(CompletionResponse {
            choices: response
                .choices
                .into_iter()
                .map(|c| ChatMessage {
                    role: Role::Assistant,
                    content: c.message.content.unwrap_or_default(),
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GenerationParams;

    #[test]
    fn unset_params_are_not_serialized() {
        let wire = WireRequest {
            model: "gpt-4-turbo-preview",
            messages: &[ChatMessage::user("hi")],
            temperature: None,
            max_tokens: None,
        };
        let json = serde_json::to_string(&wire).unwrap();
        assert!(!json.contains("temperature"));
        assert!(!json.contains("max_tokens"));

        let wire = WireRequest {
            model: "gpt-4-turbo-preview",
            messages: &[],
            temperature: Some(0.2),
            max_tokens: Some(512),
        };
        let json = serde_json::to_string(&wire).unwrap();
        assert!(json.contains("\"temperature\":0.2"));
        assert!(json.contains("\"max_tokens\":512"));
    }

    #[test]
    fn backend_requires_an_api_key() {
        let settings = Settings::default();
        assert!(matches!(
            OpenAiBackend::new(&settings),
            Err(LlmError::AuthFailed { .. })
        ));
    }

    #[test]
    fn generation_params_default_to_unset() {
        let params = GenerationParams::default();
        assert!(params.model.is_none());
        assert!(params.temperature.is_none());
    }
}
