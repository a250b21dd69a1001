//! OpenRouter API client (OpenAI-compatible chat completions)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

use super::traits::{
    CompletionRequest, CompletionResponse, LLMProvider, Message, ModelDetails, Pricing,
    ProviderError, ProviderResult,
};
use crate::config::Config;
use crate::runner::rate_limiter::RateLimiter;

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// OpenRouter API client
pub struct OpenRouterClient {
    api_key: String,
    base_url: String,
    http_client: Client,
    rate_limiter: Arc<RateLimiter>,
    /// Model catalogue, fetched once on first lookup
    catalogue: OnceCell<Vec<ModelDetails>>,
}

impl OpenRouterClient {
    /// Create a new OpenRouter client
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http_client: Client::new(),
            rate_limiter: Arc::new(RateLimiter::new(60, 100_000)),
            catalogue: OnceCell::new(),
        }
    }

    /// Create from environment variable
    pub fn from_env() -> ProviderResult<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| ProviderError::Config(format!("{} not set", API_KEY_ENV)))?;
        Ok(Self::new(api_key))
    }

    /// Create from the `[provider]` section of the configuration
    pub fn from_config(config: &Config) -> ProviderResult<Self> {
        let api_key = config
            .api_key()
            .map_err(|e| ProviderError::Config(e.to_string()))?;
        Ok(Self::new(api_key)
            .with_base_url(config.provider.base_url.trim_end_matches('/'))
            .with_rate_limits(config.provider.rpm, config.provider.tpm))
    }

    /// Set custom base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set custom rate limits
    pub fn with_rate_limits(mut self, rpm: u32, tpm: u32) -> Self {
        self.rate_limiter = Arc::new(RateLimiter::new(rpm, tpm));
        self
    }

    fn build_body(&self, request: &CompletionRequest) -> ChatRequest {
        let mut messages: Vec<WireMessage> = Vec::new();

        if let Some(system) = &request.system_prompt {
            messages.push(WireMessage {
                role: "system".to_string(),
                content: Some(system.clone()),
            });
        }

        for msg in &request.messages {
            messages.push(msg.into());
        }

        let generation = &request.generation;
        ChatRequest {
            model: request.model.clone(),
            messages,
            temperature: generation.temperature,
            max_tokens: generation.max_tokens,
            top_p: generation.top_p,
            frequency_penalty: generation.frequency_penalty,
            presence_penalty: generation.presence_penalty,
            seed: generation.seed,
            stop: generation.stop.clone(),
            response_format: generation.response_format.clone(),
            extra: generation.extra_body.clone().unwrap_or_default(),
        }
    }

    async fn fetch_catalogue(&self) -> ProviderResult<Vec<ModelDetails>> {
        let response = self
            .http_client
            .get(format!("{}/models", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: error_message(status.as_u16(), &body),
            });
        }

        let models = parse_models(&body)?;
        tracing::debug!("Fetched {} models from {}", models.len(), self.base_url);
        Ok(models)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
    /// Provider-specific fields, merged into the top level of the body
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    /// Null when the model returns only tool calls or refuses
    content: Option<String>,
}

impl From<&Message> for WireMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.clone(),
            content: Some(msg.content.clone()),
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<WireModel>,
}

#[derive(Deserialize)]
struct WireModel {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    context_length: Option<u64>,
    #[serde(default)]
    pricing: Option<WirePricing>,
}

/// Prices arrive as decimal strings ("0.000001"), occasionally as numbers
#[derive(Deserialize)]
struct WirePricing {
    #[serde(default)]
    prompt: Option<serde_json::Value>,
    #[serde(default)]
    completion: Option<serde_json::Value>,
}

fn price_of(value: Option<&serde_json::Value>) -> f64 {
    match value {
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Parse a `GET /models` body into catalogue entries
fn parse_models(body: &str) -> ProviderResult<Vec<ModelDetails>> {
    let list: ModelList =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    Ok(list
        .data
        .into_iter()
        .map(|m| {
            let pricing = m
                .pricing
                .map(|p| Pricing {
                    prompt: price_of(p.prompt.as_ref()),
                    completion: price_of(p.completion.as_ref()),
                })
                .unwrap_or_default();
            ModelDetails {
                name: m.name.unwrap_or_else(|| m.id.clone()),
                id: m.id,
                context_length: m.context_length,
                pricing,
            }
        })
        .collect())
}

fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ApiError>(body) {
        Ok(error) => error.error.message,
        Err(_) => format!("HTTP {}: {}", status, body),
    }
}

#[async_trait]
impl LLMProvider for OpenRouterClient {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn complete(&self, request: &CompletionRequest) -> ProviderResult<CompletionResponse> {
        let _guard = self.rate_limiter.acquire().await;

        let start = Instant::now();
        let body = self.build_body(request);

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let status = response.status();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60)
                * 1000;

            return Err(ProviderError::RateLimited {
                retry_after_ms: retry_after,
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(status.as_u16(), &body);

            // 401/402/403: bad key or no credits, retrying will not help
            if status == 401 || status == 402 || status == 403 {
                return Err(ProviderError::Config(format!(
                    "OpenRouter auth error ({}): {}",
                    status.as_u16(),
                    message
                )));
            }

            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let api_response: ChatResponse = response.json().await?;
        let usage = api_response.usage.unwrap_or_default();

        self.rate_limiter
            .record_tokens(usage.prompt_tokens + usage.completion_tokens)
            .await;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Parse("No choices in response".to_string()))?;

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            model: api_response.model.unwrap_or_else(|| request.model.clone()),
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            finish_reason: choice.finish_reason.unwrap_or_else(|| "unknown".to_string()),
            latency_ms,
        })
    }

    async fn model_details(&self, model: &str) -> ProviderResult<ModelDetails> {
        let catalogue = self
            .catalogue
            .get_or_try_init(|| self.fetch_catalogue())
            .await?;

        catalogue
            .iter()
            .find(|m| m.id == model)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownModel(model.to_string()))
    }
}
