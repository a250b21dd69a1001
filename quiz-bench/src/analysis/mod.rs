//! Run statistics and cross-model aggregation

pub mod aggregate;
pub mod outcome;

pub use aggregate::{aggregate, ModelSummary};
pub use outcome::{format_price, median_ms, QuestionOutcome, SuiteReport, Verdict};
