//! Quiz Benchmark
//!
//! Runs markdown question suites against LLMs served through an
//! OpenAI-compatible gateway and grades every answer structurally with the
//! [`grader`] crate.
//!
//! # Features
//!
//! - Markdown test suites with per-suite grading overrides
//! - Bounded-parallel execution with retries, timeouts and rate limiting
//! - Optional model-backed semantic judge for free-text fields
//! - Per-model transcripts and an append-only JSONL ledger
//!
//! # Example
//!
//! ```no_run
//! use quiz_bench::{
//!     config::Config,
//!     providers::create_provider,
//!     runner::{Executor, ExecutorConfig},
//!     tasks::load_suite_from_file,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_or_default();
//!     let provider = create_provider(&config)?;
//!     let executor = Executor::new(provider, ExecutorConfig::from(&config.benchmark));
//!
//!     let suite = load_suite_from_file("tests/capitals.md")?;
//!     let report = executor.run_suite("openai/gpt-4o-mini", &suite).await?;
//!     println!("{}% correct", report.percent_correct());
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod providers;
pub mod reporting;
pub mod runner;
pub mod tasks;

pub use config::Config;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::analysis::{aggregate, ModelSummary, QuestionOutcome, SuiteReport, Verdict};
    pub use crate::config::Config;
    pub use crate::providers::{
        create_provider, CompletionRequest, CompletionResponse, LLMProvider, Message,
        ProviderError, ProviderResult,
    };
    pub use crate::reporting::{print_rankings, print_suite_report, RunRecord};
    pub use crate::runner::{grade_answer, Executor, ExecutorConfig};
    pub use crate::tasks::{load_suite_from_file, Question, TestSuite};
}
