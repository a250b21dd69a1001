//! In-process provider for tests: replies come from a closure

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::traits::{
    CompletionRequest, CompletionResponse, LLMProvider, ModelDetails, Pricing, ProviderError,
    ProviderResult,
};

type Script = dyn Fn(&CompletionRequest) -> ProviderResult<String> + Send + Sync;

pub struct ScriptedProvider {
    script: Box<Script>,
    delay: Duration,
    pricing: Pricing,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(
        script: impl Fn(&CompletionRequest) -> ProviderResult<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            delay: Duration::ZERO,
            pricing: Pricing {
                prompt: 0.000001,
                completion: 0.000002,
            },
            calls: AtomicUsize::new(0),
        }
    }

    /// Reply with `reply` to every request
    pub fn constant(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::new(move |_| Ok(reply.clone()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> ProviderResult<CompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let content = (self.script)(request)?;
        Ok(CompletionResponse {
            content,
            model: request.model.clone(),
            input_tokens: 100,
            output_tokens: 10,
            finish_reason: "stop".to_string(),
            latency_ms: self.delay.as_millis() as u64,
        })
    }

    async fn model_details(&self, model: &str) -> ProviderResult<ModelDetails> {
        if model.starts_with("missing/") {
            return Err(ProviderError::UnknownModel(model.to_string()));
        }
        Ok(ModelDetails {
            id: model.to_string(),
            name: model.to_string(),
            context_length: Some(8192),
            pricing: self.pricing,
        })
    }
}
