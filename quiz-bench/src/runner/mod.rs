//! Benchmark execution engine

pub mod executor;
pub mod grading;
pub mod judge;
pub mod rate_limiter;

pub use executor::{ConsoleProgress, Executor, ExecutorConfig, NoOpProgress, ProgressCallback};
pub use grading::{grade_answer, judge_for_question};
pub use judge::{parse_verdict, JudgeFallback, ProviderJudge};
pub use rate_limiter::RateLimiter;
