//! Results reporting

pub mod ledger;
pub mod transcript;

pub use ledger::{append_record, read_records, RunRecord};
pub use transcript::{append_transcript, render_table, render_transcript, transcript_path};

use crate::analysis::{format_price, ModelSummary, SuiteReport};

/// Print the summary of one suite run
pub fn print_suite_report(report: &SuiteReport) {
    println!("\nResults for test '{}' on '{}':", report.test, report.model);
    println!("{:-<50}", "");
    println!("  Questions:        {}", report.executed());
    println!("  Correct:          {}", report.correct());
    if report.errors() > 0 {
        println!("  API errors:       {}", report.errors());
    }
    println!("  Percent correct:  {}", report.percent_correct());
    println!("  Median latency:   {:.2}s", report.median_latency_secs());
    println!("  Price:            {}$", format_price(report.total_cost()));
}

/// Print per-model rankings across all suites of a run
pub fn print_rankings(summaries: &[ModelSummary]) {
    println!("\n=== Quiz Benchmark Results ===\n");
    println!("Model Rankings:");
    println!("{:-<50}", "");

    for (i, summary) in summaries.iter().enumerate() {
        println!(
            "  {}. {} - {}% correct ({}/{}), {} tests, median {:.2}s, {}$",
            i + 1,
            summary.model,
            summary.percent_correct,
            summary.correct,
            summary.executed,
            summary.tests,
            summary.median_latency_secs,
            format_price(summary.total_cost)
        );
    }

    let total: f64 = summaries.iter().map(|s| s.total_cost).sum();
    println!("\nTotal price: {}$", format_price(total));
    println!("{:=<50}", "");
}

/// Print ledger records, oldest first
pub fn print_history(records: &[RunRecord]) {
    println!(
        "{:<20} {:<40} {:<24} {:>8} {:>9} {:>12}",
        "Date", "Model", "Test", "Correct", "Latency", "Price"
    );
    println!("{:-<118}", "");
    for record in records {
        println!(
            "{:<20} {:<40} {:<24} {:>7}% {:>8.2}s {:>11}$",
            record.timestamp.format("%d.%m.%Y %H:%M:%S").to_string(),
            record.model,
            record.test,
            record.percent_correct,
            record.median_latency_secs,
            format_price(record.price)
        );
    }
}
