//! Append-only run ledger, one JSON object per line

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::SuiteReport;

/// Summary of one (model, test) run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub test: String,
    pub executed: usize,
    pub correct: usize,
    pub errors: usize,
    pub percent_correct: u32,
    pub median_latency_secs: f64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// USD
    pub price: f64,
}

impl From<&SuiteReport> for RunRecord {
    fn from(report: &SuiteReport) -> Self {
        Self {
            timestamp: report.started_at,
            model: report.model.clone(),
            test: report.test.clone(),
            executed: report.executed(),
            correct: report.correct(),
            errors: report.errors(),
            percent_correct: report.percent_correct(),
            median_latency_secs: report.median_latency_secs(),
            input_tokens: report.input_tokens(),
            output_tokens: report.output_tokens(),
            price: report.total_cost(),
        }
    }
}

/// Append `record` to the ledger at `path`, creating parent directories
pub fn append_record(path: impl AsRef<Path>, record: &RunRecord) -> std::io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let line = serde_json::to_string(record)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}

/// Read every record of the ledger. Blank lines are skipped; unparseable
/// lines are logged and skipped.
pub fn read_records(path: impl AsRef<Path>) -> std::io::Result<Vec<RunRecord>> {
    let file = std::fs::File::open(path)?;
    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<RunRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!("Skipping ledger line {}: {}", index + 1, e),
        }
    }
    Ok(records)
}
