//! OpenAI-compatible chat-completions client.

use crate::config::LlmConfig;
use crate::error::{LlmError, Result};
use crate::llm::{LlmClient, Persona};
use anyhow::Context as _;
use serde::{Deserialize, Serialize};

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiClient {
    config: LlmConfig,
    http_client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: LlmConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .with_context(|| "failed to build HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn model_for(&self, persona: Persona) -> &str {
        match persona {
            Persona::Rooivalk => &self.config.model,
            Persona::Learn => &self.config.learn_model,
        }
    }
}

impl LlmClient for OpenAiClient {
    async fn create_response(&self, persona: Persona, prompt: &str) -> Result<Option<String>> {
        let model = self.model_for(persona);
        let request = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: persona.instructions(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::ProviderRequest(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ProviderStatus {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::CompletionFailed(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty());

        tracing::debug!(%persona, model, answered = text.is_some(), "completion finished");
        Ok(text)
    }
}
