//! Language model client for answer generation

use crate::config::{parse_base_url, GenerationConfig};
use crate::error::{truncate_message, Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Longest wait between two generation attempts
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Delay before retry number `attempt` (0-based): doubles from `base`, capped
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    2u32.checked_pow(attempt)
        .and_then(|factor| base.checked_mul(factor))
        .map_or(MAX_RETRY_DELAY, |delay| delay.min(MAX_RETRY_DELAY))
}

/// Single-shot text generation
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for one prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Generator for OpenAI-compatible `/v1/chat/completions` endpoints
pub struct ChatCompletionsGenerator {
    client: Client,
    base_url: Url,
    api_key: String,
    model: String,
    temperature: f32,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl ChatCompletionsGenerator {
    pub fn new(config: &GenerationConfig, api_key: String) -> Result<Self> {
        let base_url = parse_base_url(&config.base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(500),
        })
    }

    /// Override the first retry delay (doubles on each attempt)
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    async fn send_once(&self, url: Url, body: &ChatRequest<'_>) -> Result<String> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| Error::Generation("model returned an empty answer".to_string()))
    }
}

#[async_trait]
impl Generator for ChatCompletionsGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = self
            .base_url
            .join("v1/chat/completions")
            .map_err(|e| Error::Config(format!("Invalid generation API URL: {}", e)))?;
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut attempt = 0;
        loop {
            match self.send_once(url.clone(), &body).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = backoff_delay(self.retry_base_delay, attempt);
                    tracing::warn!(
                        "Generation attempt {} failed ({}), retrying in {:?}",
                        attempt + 1,
                        truncate_message(&e.to_string(), 200),
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e @ Error::Generation(_)) => return Err(e),
                Err(e) => {
                    return Err(Error::Generation(truncate_message(&e.to_string(), 300)));
                }
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
