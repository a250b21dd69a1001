//! Cross-suite aggregation per model

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::outcome::{median_ms, percent, SuiteReport};

/// Totals for one model over every suite it ran
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub model: String,
    pub tests: usize,
    pub executed: usize,
    pub correct: usize,
    pub errors: usize,
    pub percent_correct: u32,
    /// Median over all answered questions, in seconds
    pub median_latency_secs: f64,
    pub total_cost: f64,
}

/// Summarize reports per model, best percentage first.
///
/// Ties keep the order in which models first appear.
pub fn aggregate(reports: &[SuiteReport]) -> Vec<ModelSummary> {
    let mut by_model: IndexMap<&str, Vec<&SuiteReport>> = IndexMap::new();
    for report in reports {
        by_model.entry(report.model.as_str()).or_default().push(report);
    }

    let mut summaries: Vec<ModelSummary> = by_model
        .into_iter()
        .map(|(model, reports)| {
            let executed: usize = reports.iter().map(|r| r.executed()).sum();
            let correct: usize = reports.iter().map(|r| r.correct()).sum();
            let latencies: Vec<u64> = reports
                .iter()
                .flat_map(|r| r.outcomes.iter())
                .filter(|o| !o.verdict.is_error())
                .map(|o| o.latency_ms)
                .collect();

            ModelSummary {
                model: model.to_string(),
                tests: reports.len(),
                executed,
                correct,
                errors: reports.iter().map(|r| r.errors()).sum(),
                percent_correct: percent(correct, executed),
                median_latency_secs: median_ms(&latencies) / 1000.0,
                total_cost: reports.iter().map(|r| r.total_cost()).sum(),
            }
        })
        .collect();

    summaries.sort_by(|a, b| b.percent_correct.cmp(&a.percent_correct));
    summaries
}
