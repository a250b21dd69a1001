//! Semantic judge backed by a model provider
//!
//! [`ProviderJudge`] asks a model whether two answers mean the same thing.
//! The grading engine is synchronous, so the judge blocks on a captured Tokio
//! runtime handle. It must be called from a blocking thread (for example
//! inside `spawn_blocking`), never from an async task.

use std::sync::Arc;
use std::time::Duration;

use grader::{is_similar, SemanticJudge};
use tokio::runtime::Handle;

use crate::config::{JudgeConfig, JudgeFailureMode};
use crate::providers::{CompletionRequest, LLMProvider, Message, ProviderError};

const JUDGE_SYSTEM_PROMPT: &str = "You grade answers to quiz questions. \
Decide whether the candidate answer means the same as the reference answer. \
Ignore differences in wording, formatting, letter case and language. \
Reply with a single word: yes or no.";

/// Verdict used when the judge model gives no usable answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JudgeFallback {
    /// Not equivalent
    #[default]
    Reject,
    /// Fuzzy similarity at the given threshold
    Similarity(u8),
}

impl JudgeFallback {
    pub fn from_config(config: &JudgeConfig) -> Self {
        match config.on_failure {
            JudgeFailureMode::Reject => JudgeFallback::Reject,
            JudgeFailureMode::Similarity => JudgeFallback::Similarity(config.fallback_threshold),
        }
    }

    pub fn resolve(&self, reference: &str, candidate: &str) -> bool {
        match self {
            JudgeFallback::Reject => false,
            JudgeFallback::Similarity(threshold) => is_similar(reference, candidate, *threshold),
        }
    }
}

/// Read a yes/no verdict from the first word of a judge reply
pub fn parse_verdict(reply: &str) -> Option<bool> {
    let word: String = reply
        .trim()
        .chars()
        .skip_while(|c| !c.is_alphanumeric())
        .take_while(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase();

    match word.as_str() {
        "yes" | "да" | "true" => Some(true),
        "no" | "нет" | "false" => Some(false),
        _ => None,
    }
}

/// Judge that asks a model through an [`LLMProvider`]
#[derive(Clone)]
pub struct ProviderJudge {
    provider: Arc<dyn LLMProvider + Send + Sync>,
    model: String,
    handle: Handle,
    timeout: Duration,
    fallback: JudgeFallback,
    question: Option<String>,
}

impl ProviderJudge {
    pub fn new(
        provider: Arc<dyn LLMProvider + Send + Sync>,
        model: impl Into<String>,
        handle: Handle,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            handle,
            timeout: Duration::from_secs(60),
            fallback: JudgeFallback::Reject,
            question: None,
        }
    }

    /// Build from the `[judge]` section; `default_model` is used when no
    /// judge model is configured
    pub fn from_config(
        provider: Arc<dyn LLMProvider + Send + Sync>,
        config: &JudgeConfig,
        default_model: &str,
        handle: Handle,
    ) -> Self {
        let model = config.model.clone().unwrap_or_else(|| default_model.to_string());
        Self::new(provider, model, handle)
            .with_timeout(Duration::from_millis(config.timeout_ms))
            .with_fallback(JudgeFallback::from_config(config))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_fallback(mut self, fallback: JudgeFallback) -> Self {
        self.fallback = fallback;
        self
    }

    /// Give the judge the question both answers respond to
    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, reference: &str, candidate: &str) -> CompletionRequest {
        let mut prompt = String::new();
        if let Some(question) = &self.question {
            prompt.push_str(&format!("Question:\n{}\n\n", question));
        }
        prompt.push_str(&format!(
            "Reference answer:\n{}\n\nCandidate answer:\n{}\n\nDo the answers mean the same? Reply yes or no.",
            reference, candidate
        ));

        CompletionRequest::new(self.model.clone(), vec![Message::user(prompt)])
            .with_system(JUDGE_SYSTEM_PROMPT)
            .with_temperature(0.0)
            .with_max_tokens(16)
    }

    fn ask(&self, reference: &str, candidate: &str) -> Result<bool, ProviderError> {
        let request = self.build_request(reference, candidate);
        let provider = Arc::clone(&self.provider);
        let timeout = self.timeout;

        let response = self.handle.block_on(async move {
            match tokio::time::timeout(timeout, provider.complete(&request)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                }),
            }
        })?;

        parse_verdict(&response.content).ok_or_else(|| {
            ProviderError::Parse(format!("unrecognised verdict {:?}", response.content))
        })
    }
}

impl SemanticJudge for ProviderJudge {
    fn name(&self) -> &str {
        "provider"
    }

    fn equivalent(&self, reference: &str, candidate: &str) -> bool {
        match self.ask(reference, candidate) {
            Ok(verdict) => {
                tracing::debug!("Judge {} verdict for {:?} vs {:?}: {}", self.model, reference, candidate, verdict);
                verdict
            }
            Err(e) => {
                let verdict = self.fallback.resolve(reference, candidate);
                tracing::warn!(
                    "Judge {} failed ({}), falling back to {:?}: {}",
                    self.model,
                    e,
                    self.fallback,
                    verdict
                );
                verdict
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::scripted::ScriptedProvider;
    use std::sync::Mutex;

    #[test]
    fn test_parse_verdict() {
        assert_eq!(parse_verdict("Yes"), Some(true));
        assert_eq!(parse_verdict("yes."), Some(true));
        assert_eq!(parse_verdict("  **Да**, ответы совпадают"), Some(true));
        assert_eq!(parse_verdict("TRUE"), Some(true));
        assert_eq!(parse_verdict("No, they differ"), Some(false));
        assert_eq!(parse_verdict("Нет"), Some(false));
        assert_eq!(parse_verdict("false"), Some(false));
        assert_eq!(parse_verdict("maybe"), None);
        assert_eq!(parse_verdict(""), None);
        assert_eq!(parse_verdict("yesterday"), None);
    }

    #[test]
    fn test_fallback_resolution() {
        assert!(!JudgeFallback::Reject.resolve("Paris", "Paris"));
        assert!(JudgeFallback::Similarity(75).resolve("Paris", "paris"));
        assert!(!JudgeFallback::Similarity(75).resolve("Paris", "Berlin"));

        let mut config = JudgeConfig::default();
        assert_eq!(JudgeFallback::from_config(&config), JudgeFallback::Reject);
        config.on_failure = JudgeFailureMode::Similarity;
        config.fallback_threshold = 60;
        assert_eq!(JudgeFallback::from_config(&config), JudgeFallback::Similarity(60));
    }

    async fn judge_on_blocking_thread(judge: ProviderJudge, reference: &str, candidate: &str) -> bool {
        let (reference, candidate) = (reference.to_string(), candidate.to_string());
        tokio::task::spawn_blocking(move || judge.equivalent(&reference, &candidate))
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_judge_asks_provider() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let provider = Arc::new(ScriptedProvider::new(move |request| {
            recorder.lock().unwrap().push(request.clone());
            Ok("Yes".to_string())
        }));
        let judge = ProviderJudge::new(provider.clone(), "judge/model", Handle::current())
            .with_question("Capital of France?");

        assert!(judge_on_blocking_thread(judge, "Paris", "The city of Paris").await);
        assert_eq!(provider.calls(), 1);

        let requests = seen.lock().unwrap();
        assert_eq!(requests[0].model, "judge/model");
        assert_eq!(requests[0].generation.temperature, Some(0.0));
        let prompt = &requests[0].messages[0].content;
        assert!(prompt.contains("Capital of France?"));
        assert!(prompt.contains("Reference answer:\nParis"));
        assert!(prompt.contains("Candidate answer:\nThe city of Paris"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_negative_verdict() {
        let provider = Arc::new(ScriptedProvider::constant("no"));
        let judge = ProviderJudge::new(provider, "m", Handle::current())
            .with_fallback(JudgeFallback::Similarity(0));
        // A clear "no" is not overridden by the fallback
        assert!(!judge_on_blocking_thread(judge, "Paris", "Paris").await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unparseable_reply_uses_fallback() {
        let provider = Arc::new(ScriptedProvider::constant("I cannot decide"));
        let reject = ProviderJudge::new(provider.clone(), "m", Handle::current());
        assert!(!judge_on_blocking_thread(reject, "Paris", "paris").await);

        let similar = ProviderJudge::new(provider, "m", Handle::current())
            .with_fallback(JudgeFallback::Similarity(75));
        assert!(judge_on_blocking_thread(similar, "Paris", "paris").await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_provider_error_uses_fallback() {
        let provider = Arc::new(ScriptedProvider::new(|_| {
            Err(ProviderError::Api { status: 500, message: "boom".into() })
        }));
        let judge = ProviderJudge::new(provider, "m", Handle::current())
            .with_fallback(JudgeFallback::Similarity(75));
        assert!(judge_on_blocking_thread(judge, "Moscow", "moscow").await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timeout_uses_fallback() {
        let provider = Arc::new(ScriptedProvider::constant("yes").with_delay(Duration::from_secs(5)));
        let judge = ProviderJudge::new(provider, "m", Handle::current())
            .with_timeout(Duration::from_millis(50));
        assert!(!judge_on_blocking_thread(judge, "Paris", "Paris").await);
    }

    #[test]
    fn test_from_config_defaults_model() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let provider = Arc::new(ScriptedProvider::constant("yes"));
        let judge = ProviderJudge::from_config(
            provider.clone(),
            &JudgeConfig::default(),
            "model/under-test",
            runtime.handle().clone(),
        );
        assert_eq!(judge.model(), "model/under-test");

        let config = JudgeConfig {
            model: Some("judge/model".into()),
            ..JudgeConfig::default()
        };
        let judge = ProviderJudge::from_config(provider, &config, "x", runtime.handle().clone());
        assert_eq!(judge.model(), "judge/model");
        // Called off the runtime, block_on drives the request itself
        assert!(judge.equivalent("a", "b"));
    }
}
