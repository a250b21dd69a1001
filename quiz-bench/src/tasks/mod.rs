//! Test suite definitions and loading
//!
//! A test suite is one markdown file: a description, a system role, a prompt
//! shared by every question, optional grading overrides and numbered
//! question/answer pairs.

pub mod loader;
pub mod sections;

pub use loader::{
    list_suites, load_suite_from_file, load_suite_from_str, suite_path, LoadError,
};
pub use sections::{get_any_section, get_section};

use grader::{ComparisonSettings, SettingsOverrides};
use serde::{Deserialize, Serialize};

/// Separator between the shared prompt and the question text
pub const QUESTION_SEPARATOR: &str = "\nВопрос:\n";

/// One question with its reference answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// 1-based position in the file
    pub number: usize,
    pub text: String,
    /// Raw reference answer, JSON or free text
    pub answer: String,
}

/// A loaded test file
#[derive(Debug, Clone)]
pub struct TestSuite {
    /// File stem, used as the test name in reports
    pub name: String,
    pub description: String,
    /// System message
    pub role: String,
    pub prompt: String,
    pub overrides: SettingsOverrides,
    /// Defaults with `overrides` applied
    pub settings: ComparisonSettings,
    pub questions: Vec<Question>,
}

impl TestSuite {
    /// User message for `question`: the shared prompt followed by the question
    pub fn user_prompt(&self, question: &Question) -> String {
        format!("{}{}{}", self.prompt, QUESTION_SEPARATOR, question.text)
    }

    pub fn question(&self, number: usize) -> Option<&Question> {
        self.questions.iter().find(|q| q.number == number)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suite() -> TestSuite {
        TestSuite {
            name: "arith".into(),
            description: "Arithmetic".into(),
            role: "You are a calculator".into(),
            prompt: "Answer with a number.".into(),
            overrides: SettingsOverrides::default(),
            settings: ComparisonSettings::default(),
            questions: vec![
                Question { number: 1, text: "2+2".into(), answer: "4".into() },
                Question { number: 2, text: "3*3".into(), answer: "9".into() },
            ],
        }
    }

    #[test]
    fn test_user_prompt_layout() {
        let suite = suite();
        assert_eq!(
            suite.user_prompt(&suite.questions[0]),
            "Answer with a number.\nВопрос:\n2+2"
        );
    }

    #[test]
    fn test_question_lookup() {
        let suite = suite();
        assert_eq!(suite.question(2).map(|q| q.answer.as_str()), Some("9"));
        assert!(suite.question(3).is_none());
        assert_eq!(suite.len(), 2);
        assert!(!suite.is_empty());
    }
}
