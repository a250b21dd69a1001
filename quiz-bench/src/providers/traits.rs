//! Provider trait definitions for model API clients

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

/// Request for a completion from a provider
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub system_prompt: Option<String>,
    pub generation: GenerationConfig,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            system_prompt: None,
            generation: GenerationConfig::default(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system_prompt = Some(system.into());
        self
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.generation.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.generation.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from a provider
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: String,
    pub latency_ms: u64,
}

/// Per-token USD pricing of a model
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub prompt: f64,
    pub completion: f64,
}

impl Pricing {
    /// Cost of one exchange in USD
    pub fn cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        self.prompt * input_tokens as f64 + self.completion * output_tokens as f64
    }
}

/// Catalogue entry for a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDetails {
    pub id: String,
    pub name: String,
    pub context_length: Option<u64>,
    pub pricing: Pricing,
}

/// Error types for provider operations
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),
}

impl ProviderError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Http(_)
            | ProviderError::RateLimited { .. }
            | ProviderError::Timeout { .. } => true,
            ProviderError::Api { status, .. } => *status >= 500,
            ProviderError::Parse(_)
            | ProviderError::Config(_)
            | ProviderError::UnknownModel(_) => false,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Trait for model providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Get the provider name (e.g., "openrouter")
    fn name(&self) -> &str;

    /// Send a completion request
    async fn complete(&self, request: &CompletionRequest) -> ProviderResult<CompletionResponse>;

    /// Look up a model in the provider's catalogue
    async fn model_details(&self, model: &str) -> ProviderResult<ModelDetails>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = CompletionRequest::new("mistralai/codestral-2508", vec![Message::user("2+2?")])
            .with_system("You are a calculator")
            .with_temperature(0.0)
            .with_max_tokens(16);
        assert_eq!(request.model, "mistralai/codestral-2508");
        assert_eq!(request.system_prompt.as_deref(), Some("You are a calculator"));
        assert_eq!(request.generation.temperature, Some(0.0));
        assert_eq!(request.generation.max_tokens, Some(16));
        assert_eq!(request.messages[0].role, "user");
    }

    #[test]
    fn test_pricing_cost() {
        let pricing = Pricing {
            prompt: 0.000001,
            completion: 0.000002,
        };
        let cost = pricing.cost(1000, 500);
        assert!((cost - 0.002).abs() < 1e-12);
        assert_eq!(Pricing::default().cost(10, 10), 0.0);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(ProviderError::RateLimited { retry_after_ms: 10 }.is_retryable());
        assert!(ProviderError::Timeout { timeout_ms: 10 }.is_retryable());
        assert!(ProviderError::Api { status: 502, message: String::new() }.is_retryable());
        assert!(!ProviderError::Api { status: 400, message: String::new() }.is_retryable());
        assert!(!ProviderError::Config("no key".into()).is_retryable());
        assert!(!ProviderError::UnknownModel("x".into()).is_retryable());
    }
}
