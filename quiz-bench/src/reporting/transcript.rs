//! Human-readable per-model transcript
//!
//! One text file per model, appended on every run: a header table, then each
//! question with the model answer, the reference answer and a verdict table,
//! then a totals table.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::analysis::{format_price, QuestionOutcome, SuiteReport, Verdict};

const RUN_SEPARATOR: &str = "/\\";

/// Transcript file for `model` inside `output_dir`
pub fn transcript_path(output_dir: impl AsRef<Path>, model: &str) -> PathBuf {
    output_dir.as_ref().join(format!("{}.txt", model.replace('/', "_")))
}

/// Render a two-column table with an outline border
pub fn render_table(rows: &[(&str, String)]) -> String {
    let key_width = rows.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
    let value_width = rows
        .iter()
        .flat_map(|(_, v)| v.lines())
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0);
    let border = format!("+{}+{}+", "-".repeat(key_width + 2), "-".repeat(value_width + 2));

    let mut out = String::new();
    out.push_str(&border);
    out.push('\n');
    for (key, value) in rows {
        let mut lines = value.lines();
        let first = lines.next().unwrap_or_default();
        out.push_str(&format!("| {} | {} |\n", pad(key, key_width), pad(first, value_width)));
        for line in lines {
            out.push_str(&format!("| {} | {} |\n", pad("", key_width), pad(line, value_width)));
        }
    }
    out.push_str(&border);
    out
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{}{}", text, " ".repeat(width.saturating_sub(len)))
}

fn render_header(report: &SuiteReport) -> String {
    render_table(&[
        ("Date", report.started_at.format("%d.%m.%Y %H:%M:%S").to_string()),
        ("Model", report.model.clone()),
        ("Input", format!("{:.2}$ per 1M", report.pricing.prompt * 1_000_000.0)),
        ("Output", format!("{:.2}$ per 1M", report.pricing.completion * 1_000_000.0)),
        ("Test", report.test.clone()),
        ("Description", report.description.clone()),
    ])
}

/// Pretty-print JSON answers; anything else verbatim
fn display_answer(answer: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(answer.trim()) {
        Ok(value) if value.is_object() || value.is_array() => {
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| answer.to_string())
        }
        _ => answer.to_string(),
    }
}

fn render_outcome(outcome: &QuestionOutcome) -> String {
    let mut text = format!("Question {}:\n{}\n", outcome.number, outcome.question);

    if let Verdict::Error(e) = &outcome.verdict {
        text.push_str(&format!("\nAPI ERROR: {}\n", e));
        return text;
    }

    text.push_str("Model answer:\n");
    text.push_str(&display_answer(outcome.answer.as_deref().unwrap_or_default()));
    text.push_str("\nReference answer:\n");
    text.push_str(&outcome.reference);
    text.push('\n');
    text.push_str(&render_table(&[
        ("Verdict", outcome.verdict.label().to_string()),
        ("Input tokens", outcome.input_tokens.to_string()),
        ("Output tokens", outcome.output_tokens.to_string()),
        ("Request price", format_price(outcome.cost)),
        ("Latency", format!("{:.2}", outcome.latency_ms as f64 / 1000.0)),
    ]));
    text.push('\n');
    text
}

fn render_totals(report: &SuiteReport) -> String {
    let table = render_table(&[
        ("Questions", report.executed().to_string()),
        ("Correct answers", report.correct().to_string()),
        ("API errors", report.errors().to_string()),
        ("Percent correct", report.percent_correct().to_string()),
        ("Median latency", format!("{:.2}", report.median_latency_secs())),
        ("Input tokens", report.input_tokens().to_string()),
        ("Output tokens", report.output_tokens().to_string()),
        ("Price", format_price(report.total_cost())),
        ("Wall time", format!("{:.2}", report.wall_time_ms as f64 / 1000.0)),
    ]);
    format!("\nTOTAL:\n{}\n{}\n", table, RUN_SEPARATOR.repeat(40))
}

/// Full transcript section for one suite run
pub fn render_transcript(report: &SuiteReport) -> String {
    let mut text = render_header(report);
    text.push('\n');
    for outcome in &report.outcomes {
        text.push_str(&render_outcome(outcome));
    }
    text.push_str(&render_totals(report));
    text
}

/// Append the transcript of `report` to the model's file, creating the
/// directory as needed. Returns the file path.
pub fn append_transcript(output_dir: impl AsRef<Path>, report: &SuiteReport) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(output_dir.as_ref())?;
    let path = transcript_path(output_dir, &report.model);
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    file.write_all(render_transcript(report).as_bytes())?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Pricing;
    use chrono::Utc;

    fn report() -> SuiteReport {
        SuiteReport {
            model: "mistralai/codestral-2508".into(),
            test: "metadata".into(),
            description: "Extract metadata".into(),
            started_at: Utc::now(),
            pricing: Pricing {
                prompt: 0.0000003,
                completion: 0.0000009,
            },
            outcomes: vec![
                QuestionOutcome {
                    number: 1,
                    question: "War and Peace".into(),
                    reference: r#"{"year": 1869}"#.into(),
                    answer: Some(r#"{"year": 1869}"#.into()),
                    verdict: Verdict::Correct,
                    input_tokens: 120,
                    output_tokens: 8,
                    cost: 0.0000432,
                    latency_ms: 1250,
                    attempts: 1,
                },
                QuestionOutcome::failed(2, "Anna Karenina", "{}", "HTTP 502", 4),
            ],
            wall_time_ms: 3000,
        }
    }

    #[test]
    fn test_transcript_path() {
        let path = transcript_path("result", "mistralai/codestral-2508");
        assert_eq!(path, Path::new("result").join("mistralai_codestral-2508.txt"));
    }

    #[test]
    fn test_render_table() {
        let table = render_table(&[("Key", "v".into()), ("Longer key", "value".into())]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "+------------+-------+");
        assert_eq!(lines[1], "| Key        | v     |");
        assert_eq!(lines[2], "| Longer key | value |");
        assert_eq!(lines[3], lines[0]);
    }

    #[test]
    fn test_render_table_multiline_and_unicode() {
        let table = render_table(&[("Ключ", "две\nстроки".into())]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[1], "| Ключ | две    |");
        assert_eq!(lines[2], "|      | строки |");
    }

    #[test]
    fn test_render_transcript() {
        let text = render_transcript(&report());
        assert!(text.contains("| Model       | mistralai/codestral-2508 |"));
        assert!(text.contains("0.30$ per 1M"));
        assert!(text.contains("Model answer:\n{\n  \"year\": 1869\n}"));
        assert!(text.contains("| Verdict       | CORRECT   |"));
        assert!(text.contains("Question 2:\nAnna Karenina\n\nAPI ERROR: HTTP 502"));
        assert!(text.contains("| Percent correct | 50"));
        assert!(text.trim_end().ends_with(&RUN_SEPARATOR.repeat(40)));
    }

    #[test]
    fn test_append_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("result");
        let path = append_transcript(&out, &report()).unwrap();
        append_transcript(&out, &report()).unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.matches("TOTAL:").count(), 2);
    }
}
