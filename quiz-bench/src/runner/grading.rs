//! Turning raw answers into a verdict

use std::sync::Arc;

use grader::{compare_with_judge, ComparisonSettings, ComparisonValue, SemanticJudge, SimilarityJudge};
use tokio::runtime::Handle;

use super::judge::ProviderJudge;
use crate::config::JudgeConfig;
use crate::providers::LLMProvider;

/// Grade a raw model answer against a raw reference answer.
///
/// Whether the reference is valid JSON decides how both sides are read. A
/// JSON reference (object, array, number, quoted string...) parses the answer
/// with the same JSON-or-text rule; a reference that is not JSON compares the
/// answer as trimmed text, even when the answer happens to be valid JSON.
pub fn grade_answer(
    reference: &str,
    answer: &str,
    settings: &ComparisonSettings,
    judge: &dyn SemanticJudge,
) -> bool {
    let (reference, candidate) = match ComparisonValue::from_json_str(reference) {
        Ok(reference) => (reference, ComparisonValue::parse(answer)),
        Err(_) => (
            ComparisonValue::Text(reference.trim().to_string()),
            ComparisonValue::Text(answer.trim().to_string()),
        ),
    };
    compare_with_judge(&reference, &candidate, settings, judge)
}

/// Judge for one question: a model judge when enabled, the similarity
/// stand-in otherwise
pub fn judge_for_question(
    config: &JudgeConfig,
    provider: &Arc<dyn LLMProvider + Send + Sync>,
    model: &str,
    question: &str,
    handle: Handle,
) -> Arc<dyn SemanticJudge> {
    if config.enabled {
        Arc::new(
            ProviderJudge::from_config(Arc::clone(provider), config, model, handle)
                .with_question(question),
        )
    } else {
        Arc::new(SimilarityJudge::with_threshold(config.fallback_threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grader::StringPolicy;

    #[test]
    fn test_structured_reference() {
        let s = ComparisonSettings::default();
        let judge = SimilarityJudge::new();
        assert!(grade_answer(
            r#"{"title": "War and Peace", "year": 1869}"#,
            r#"{"year": 1869, "title": "war and peace", "author": "Tolstoy"}"#,
            &s,
            &judge
        ));
        assert!(!grade_answer(r#"{"year": 1869}"#, "The year is 1869", &s, &judge));
        assert!(grade_answer("[1, 2, 3]", " [3, 2, 1]\n", &s, &judge));
    }

    #[test]
    fn test_numeric_reference() {
        let s = ComparisonSettings::default();
        let judge = SimilarityJudge::new();
        assert!(grade_answer("3.14", "3.141", &s, &judge));
        assert!(!grade_answer("3.14", "pi", &s, &judge));
    }

    #[test]
    fn test_text_reference_keeps_answer_as_text() {
        let s = ComparisonSettings::default().with_text(StringPolicy::similarity(100));
        let judge = SimilarityJudge::new();
        assert!(grade_answer("Paris", "  paris ", &s, &judge));
        // A JSON-looking answer is still compared as text
        assert!(grade_answer("[draft]", "[draft]", &s, &judge));
        assert!(!grade_answer("Paris", "\"Paris\"", &s, &judge));
    }

    #[test]
    fn test_quoted_string_reference_parses_answer() {
        let s = ComparisonSettings::default().with_text(StringPolicy::similarity(100));
        let judge = SimilarityJudge::new();
        assert!(grade_answer("\"Paris\"", "\"Paris\"", &s, &judge));
        assert!(grade_answer("\"Paris\"", " \"paris\"\n", &s, &judge));
        // A bare answer falls back to text and still matches
        assert!(grade_answer("\"Paris\"", "Paris", &s, &judge));
        assert!(!grade_answer("\"Paris\"", "\"Berlin\"", &s, &judge));
    }

    #[test]
    fn test_disabled_judge_is_similarity() {
        let provider: Arc<dyn LLMProvider + Send + Sync> =
            Arc::new(crate::providers::scripted::ScriptedProvider::constant("no"));
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let judge = judge_for_question(
            &JudgeConfig::default(),
            &provider,
            "m",
            "q",
            runtime.handle().clone(),
        );
        assert_eq!(judge.name(), "similarity-fallback");
        assert!(judge.equivalent("Paris", "paris"));
    }
}
