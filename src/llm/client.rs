use crate::error::RecommendationError;
use crate::llm::config::{LlmConfig, LlmProvider};
use crate::recommend::{AnalysisSummary, RecommendationProvider};
use futures::future::BoxFuture;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

/// Chat-completion client that turns analysis summaries into advice.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
    base_url: String,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        let base_url = match config.provider {
            LlmProvider::OpenAi => OPENAI_BASE_URL,
            LlmProvider::Anthropic => ANTHROPIC_BASE_URL,
        };
        Self {
            client: Client::new(),
            config,
            base_url: base_url.to_string(),
        }
    }

    /// Points the client at a compatible endpoint (proxies, local gateways).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn from_env() -> Option<Self> {
        LlmConfig::from_env().map(Self::new)
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, RecommendationError> {
        let text = match self.config.provider {
            LlmProvider::OpenAi => self.openai_complete(prompt).await?,
            LlmProvider::Anthropic => self.anthropic_complete(prompt).await?,
        };

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(RecommendationError::EmptyResponse);
        }
        Ok(text)
    }

    async fn openai_complete(&self, prompt: &str) -> Result<String, RecommendationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = OpenAiRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(http_failure(status.as_u16(), res.text().await));
        }

        let body: OpenAiResponse = res.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(RecommendationError::EmptyResponse)
    }

    async fn anthropic_complete(&self, prompt: &str) -> Result<String, RecommendationError> {
        let url = format!("{}/messages", self.base_url);
        let payload = AnthropicRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let res = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(http_failure(status.as_u16(), res.text().await));
        }

        let body: AnthropicResponse = res.json().await?;
        Ok(anthropic_text(body))
    }
}

fn http_failure<E: std::fmt::Display>(
    status: u16,
    body: std::result::Result<String, E>,
) -> RecommendationError {
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            debug!("Could not read error body for status {}: {}", status, e);
            String::new()
        }
    };
    RecommendationError::Http { status, body }
}

// Concatenates the text blocks of a messages reply, skipping tool and other blocks
fn anthropic_text(response: AnthropicResponse) -> String {
    response
        .content
        .into_iter()
        .filter(|b| b.kind == "text")
        .filter_map(|b| b.text)
        .collect()
}

impl RecommendationProvider for LlmClient {
    fn name(&self) -> &str {
        match self.config.provider {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Anthropic => "anthropic",
        }
    }

    fn recommend<'a>(
        &'a self,
        summary: &'a AnalysisSummary,
    ) -> BoxFuture<'a, Result<String, RecommendationError>> {
        Box::pin(async move {
            let prompt = summary.to_prompt();
            self.complete(&prompt).await
        })
    }
}
