//! Model provider implementations

pub mod openrouter;
pub mod traits;

#[cfg(test)]
pub(crate) mod scripted;

pub use openrouter::OpenRouterClient;
pub use traits::{
    CompletionRequest, CompletionResponse, LLMProvider, Message, ModelDetails, Pricing,
    ProviderError, ProviderResult,
};

use crate::config::Config;
use std::sync::Arc;

/// Create the provider named in the configuration
pub fn create_provider(config: &Config) -> ProviderResult<Arc<dyn LLMProvider + Send + Sync>> {
    match config.provider.name.to_lowercase().as_str() {
        "openrouter" => Ok(Arc::new(OpenRouterClient::from_config(config)?)),
        other => Err(ProviderError::Config(format!("Unknown provider: {}", other))),
    }
}
