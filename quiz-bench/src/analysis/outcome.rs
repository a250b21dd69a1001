//! Per-question outcomes and per-suite statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::providers::Pricing;

/// Result of grading one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    Incorrect,
    /// The provider never produced an answer
    Error(String),
}

impl Verdict {
    pub fn is_correct(&self) -> bool {
        matches!(self, Verdict::Correct)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Verdict::Error(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Correct => "CORRECT",
            Verdict::Incorrect => "WRONG",
            Verdict::Error(_) => "API ERROR",
        }
    }
}

/// One executed question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub number: usize,
    pub question: String,
    pub reference: String,
    /// Model answer; `None` when the request failed
    pub answer: Option<String>,
    pub verdict: Verdict,
    pub input_tokens: u32,
    pub output_tokens: u32,
    /// USD
    pub cost: f64,
    /// Wall time of the successful request
    pub latency_ms: u64,
    pub attempts: u32,
}

impl QuestionOutcome {
    /// Outcome for a question whose request failed after all retries
    pub fn failed(number: usize, question: &str, reference: &str, error: impl Into<String>, attempts: u32) -> Self {
        Self {
            number,
            question: question.to_string(),
            reference: reference.to_string(),
            answer: None,
            verdict: Verdict::Error(error.into()),
            input_tokens: 0,
            output_tokens: 0,
            cost: 0.0,
            latency_ms: 0,
            attempts,
        }
    }
}

/// All outcomes of one (model, test) run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub model: String,
    pub test: String,
    pub description: String,
    pub started_at: DateTime<Utc>,
    pub pricing: Pricing,
    /// Ordered by question number
    pub outcomes: Vec<QuestionOutcome>,
    pub wall_time_ms: u64,
}

impl SuiteReport {
    /// Questions attempted, including failed requests
    pub fn executed(&self) -> usize {
        self.outcomes.len()
    }

    pub fn correct(&self) -> usize {
        self.outcomes.iter().filter(|o| o.verdict.is_correct()).count()
    }

    pub fn errors(&self) -> usize {
        self.outcomes.iter().filter(|o| o.verdict.is_error()).count()
    }

    /// Integer percentage of correct answers, rounded down
    pub fn percent_correct(&self) -> u32 {
        percent(self.correct(), self.executed())
    }

    /// Median latency in seconds over answered questions
    pub fn median_latency_secs(&self) -> f64 {
        let latencies: Vec<u64> = self
            .outcomes
            .iter()
            .filter(|o| !o.verdict.is_error())
            .map(|o| o.latency_ms)
            .collect();
        median_ms(&latencies) / 1000.0
    }

    pub fn input_tokens(&self) -> u64 {
        self.outcomes.iter().map(|o| u64::from(o.input_tokens)).sum()
    }

    pub fn output_tokens(&self) -> u64 {
        self.outcomes.iter().map(|o| u64::from(o.output_tokens)).sum()
    }

    pub fn total_cost(&self) -> f64 {
        self.outcomes.iter().map(|o| o.cost).sum()
    }
}

pub(crate) fn percent(correct: usize, executed: usize) -> u32 {
    if executed == 0 {
        0
    } else {
        (correct * 100 / executed) as u32
    }
}

/// Median of millisecond samples; 0 for no samples
pub fn median_ms(samples: &[u64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
    } else {
        sorted[mid] as f64
    }
}

/// Format a USD amount without trailing zeros
pub fn format_price(price: f64) -> String {
    let text = format!("{:.10}", price);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-" {
        "0".to_string()
    } else {
        text.to_string()
    }
}
