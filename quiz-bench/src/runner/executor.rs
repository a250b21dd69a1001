//! Async executor for running a test suite against a model

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::time::sleep;

use super::grading::{grade_answer, judge_for_question};
use crate::analysis::{QuestionOutcome, SuiteReport, Verdict};
use crate::config::{BenchmarkConfig, GenerationConfig, JudgeConfig};
use crate::providers::{
    CompletionRequest, CompletionResponse, LLMProvider, Message, Pricing, ProviderError,
    ProviderResult,
};
use crate::tasks::{Question, TestSuite};

/// Configuration for the executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Questions of one suite in flight at once
    pub parallel_requests: usize,
    /// Number of retries on failure
    pub retry_count: u32,
    /// Initial retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds
    pub max_retry_delay_ms: u64,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::from(&BenchmarkConfig::default())
    }
}

impl From<&BenchmarkConfig> for ExecutorConfig {
    fn from(config: &BenchmarkConfig) -> Self {
        Self {
            parallel_requests: config.parallel_requests.max(1),
            retry_count: config.retry_count,
            retry_delay_ms: config.retry_delay_ms,
            max_retry_delay_ms: config.max_retry_delay_ms,
            timeout_ms: config.timeout_ms,
        }
    }
}

/// Executor for running test suites
#[derive(Clone)]
pub struct Executor {
    config: ExecutorConfig,
    provider: Arc<dyn LLMProvider + Send + Sync>,
    generation: GenerationConfig,
    judge: JudgeConfig,
    progress: Arc<dyn ProgressCallback>,
}

impl Executor {
    /// Create a new executor
    pub fn new(provider: Arc<dyn LLMProvider + Send + Sync>, config: ExecutorConfig) -> Self {
        Self {
            config,
            provider,
            generation: GenerationConfig::default(),
            judge: JudgeConfig::default(),
            progress: Arc::new(NoOpProgress),
        }
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_judge(mut self, judge: JudgeConfig) -> Self {
        self.judge = judge;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Run every question of `suite` against `model`.
    ///
    /// Fails only when the model cannot be looked up; request failures become
    /// error outcomes. Outcomes are ordered by question number.
    pub async fn run_suite(&self, model: &str, suite: &TestSuite) -> ProviderResult<SuiteReport> {
        let details = self.provider.model_details(model).await?;
        let started_at = Utc::now();
        let start = Instant::now();

        tracing::info!(
            "Running test '{}' ({} questions) on {}",
            suite.name,
            suite.len(),
            model
        );

        let semaphore = Arc::new(Semaphore::new(self.config.parallel_requests.max(1)));
        let suite = Arc::new(suite.clone());
        let mut handles = Vec::new();

        for question in suite.questions.iter().cloned() {
            let executor = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let suite = Arc::clone(&suite);
            let model = model.to_string();
            let pricing = details.pricing;

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let outcome = executor.run_question(&model, &suite, &question, pricing).await;
                executor.progress.on_question_complete(&model, &suite.name, &outcome);
                outcome
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!("Question task panicked: {}", e),
            }
        }
        outcomes.sort_by_key(|o| o.number);

        Ok(SuiteReport {
            model: model.to_string(),
            test: suite.name.clone(),
            description: suite.description.clone(),
            started_at,
            pricing: details.pricing,
            outcomes,
            wall_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn run_question(
        &self,
        model: &str,
        suite: &TestSuite,
        question: &Question,
        pricing: Pricing,
    ) -> QuestionOutcome {
        let request = self.build_request(model, suite, question);

        let (response, latency_ms, attempts) = match self.request_with_retry(&request, question.number).await {
            Ok(ok) => ok,
            Err((e, attempts)) => {
                tracing::warn!("Question {} of '{}' failed on {}: {}", question.number, suite.name, model, e);
                return QuestionOutcome::failed(
                    question.number,
                    &question.text,
                    &question.answer,
                    e.to_string(),
                    attempts,
                );
            }
        };

        let judge = judge_for_question(
            &self.judge,
            &self.provider,
            model,
            &question.text,
            Handle::current(),
        );
        let settings = suite.settings;
        let reference = question.answer.clone();
        let answer = response.content.clone();

        // The judge may block on the runtime, so grading leaves the async workers
        let correct = tokio::task::spawn_blocking(move || {
            grade_answer(&reference, &answer, &settings, judge.as_ref())
        })
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Grading of question {} panicked: {}", question.number, e);
            false
        });

        QuestionOutcome {
            number: question.number,
            question: question.text.clone(),
            reference: question.answer.clone(),
            answer: Some(response.content),
            verdict: if correct { Verdict::Correct } else { Verdict::Incorrect },
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
            cost: pricing.cost(response.input_tokens, response.output_tokens),
            latency_ms,
            attempts,
        }
    }

    fn build_request(&self, model: &str, suite: &TestSuite, question: &Question) -> CompletionRequest {
        let mut request = CompletionRequest::new(model, vec![Message::user(suite.user_prompt(question))])
            .with_generation(self.generation.clone());
        if !suite.role.is_empty() {
            request = request.with_system(&suite.role);
        }
        request
    }

    /// Send `request`, retrying with exponential backoff.
    ///
    /// Returns the response, the latency of the successful attempt and the
    /// number of attempts made.
    async fn request_with_retry(
        &self,
        request: &CompletionRequest,
        number: usize,
    ) -> Result<(CompletionResponse, u64, u32), (ProviderError, u32)> {
        let mut delay = self.config.retry_delay_ms;
        let mut attempts = 0;

        loop {
            attempts += 1;
            let start = Instant::now();
            let error = match self.try_execute(request).await {
                Ok(response) => return Ok((response, start.elapsed().as_millis() as u64, attempts)),
                Err(e) => e,
            };

            if attempts > self.config.retry_count || !error.is_retryable() {
                return Err((error, attempts));
            }

            match &error {
                ProviderError::RateLimited { retry_after_ms } => {
                    tracing::warn!(
                        "Rate limited on {} for question {}, waiting {}ms",
                        self.provider.name(),
                        number,
                        retry_after_ms
                    );
                    sleep(Duration::from_millis(*retry_after_ms)).await;
                }
                e => {
                    tracing::info!("Retry {} for question {} after error: {}", attempts, number, e);
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(self.config.max_retry_delay_ms);
                }
            }
        }
    }

    /// Try to execute a request (single attempt)
    async fn try_execute(&self, request: &CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let timeout = Duration::from_millis(self.config.timeout_ms);

        match tokio::time::timeout(timeout, self.provider.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                timeout_ms: self.config.timeout_ms,
            }),
        }
    }
}

/// Progress callback for tracking execution
pub trait ProgressCallback: Send + Sync {
    fn on_question_complete(&self, model: &str, test: &str, outcome: &QuestionOutcome);
}

/// Default no-op progress callback
pub struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_question_complete(&self, _model: &str, _test: &str, _outcome: &QuestionOutcome) {}
}

/// Console progress callback
pub struct ConsoleProgress;

impl ProgressCallback for ConsoleProgress {
    fn on_question_complete(&self, _model: &str, _test: &str, outcome: &QuestionOutcome) {
        match &outcome.verdict {
            Verdict::Error(e) => println!("  Question {} - {}: {}", outcome.number, outcome.verdict.label(), e),
            verdict => println!(
                "  Question {} - {} ({:.2}s)",
                outcome.number,
                verdict.label(),
                outcome.latency_ms as f64 / 1000.0
            ),
        }
    }
}
