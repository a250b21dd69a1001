//! Test suite loading from markdown files
//!
//! Headings may be written in Russian or English:
//!
//! ```text
//! # Описание / # Description
//! # Роль / # Role
//! # Промпт / # Prompt
//! # Настройки / # Settings            (optional)
//! ## Допуск при сравнении чисел / ## Numeric tolerance
//! ## Сравнение ответа модели текстом / ## Text answer comparison
//! ## Сравнение строк в словаре / ## Dictionary string comparison
//! ## Сравнение строк в списке / ## List string comparison
//! ## Сопоставление списков / ## List matching
//! # Тесты / # Tests
//! ## Вопрос 1 / ## Question 1
//! ## Ответ 1 / ## Answer 1
//! ```

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use grader::{ComparisonSettings, SettingsOverrides};
use regex::Regex;

use super::sections::get_any_section;
use super::{Question, TestSuite};

const DESCRIPTION: &[&str] = &["Описание", "Description"];
const ROLE: &[&str] = &["Роль", "Role"];
const PROMPT: &[&str] = &["Промпт", "Prompt"];
const SETTINGS: &[&str] = &["Настройки", "Settings"];
const TESTS: &[&str] = &["Тесты", "Tests"];

const NUM_TOLERANCE: &[&str] = &["Допуск при сравнении чисел", "Numeric tolerance"];
const TEXT_POLICY: &[&str] = &["Сравнение ответа модели текстом", "Text answer comparison"];
const MAPPING_POLICY: &[&str] = &["Сравнение строк в словаре", "Dictionary string comparison"];
const SEQUENCE_POLICY: &[&str] = &["Сравнение строк в списке", "List string comparison"];
const SEQUENCE_MATCHING: &[&str] = &["Сопоставление списков", "List matching"];

/// Error type for suite loading
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Test '{suite}' has no '{section}' section")]
    MissingSection { suite: String, section: String },

    #[error("Test '{0}' contains no questions")]
    NoQuestions(String),
}

/// Path of the test file named `name` inside `dir`
pub fn suite_path(dir: impl AsRef<Path>, name: &str) -> PathBuf {
    dir.as_ref().join(format!("{}.md", name))
}

/// Names (file stems) of all markdown test files in `dir`, sorted
pub fn list_suites(dir: impl AsRef<Path>) -> Result<Vec<String>, LoadError> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("md") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Load a test suite from a markdown file. The file stem becomes the name.
pub fn load_suite_from_file(path: impl AsRef<Path>) -> Result<TestSuite, LoadError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    load_suite_from_str(&name, &content)
}

/// Load a test suite from markdown text
pub fn load_suite_from_str(name: &str, content: &str) -> Result<TestSuite, LoadError> {
    let prompt = get_any_section(content, PROMPT, 1).ok_or_else(|| LoadError::MissingSection {
        suite: name.to_string(),
        section: PROMPT[0].to_string(),
    })?;
    let description = get_any_section(content, DESCRIPTION, 1).unwrap_or_default();
    let role = get_any_section(content, ROLE, 1).unwrap_or_default();

    let overrides = get_any_section(content, SETTINGS, 1)
        .map(|settings| parse_overrides(&settings))
        .unwrap_or_default();
    let settings = ComparisonSettings::from_overrides(&overrides);

    let tests = get_any_section(content, TESTS, 1)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| LoadError::NoQuestions(name.to_string()))?;
    let questions = parse_questions(name, &tests);
    if questions.is_empty() {
        return Err(LoadError::NoQuestions(name.to_string()));
    }

    tracing::debug!(
        "Loaded test '{}' with {} questions, settings: {:?}",
        name,
        questions.len(),
        settings
    );

    Ok(TestSuite {
        name: name.to_string(),
        description: description.trim().to_string(),
        role: role.trim().to_string(),
        prompt: prompt.trim().to_string(),
        overrides,
        settings,
        questions,
    })
}

/// Collect the level-2 override subsections of a settings section
fn parse_overrides(settings: &str) -> SettingsOverrides {
    let field = |headings: &[&str]| {
        get_any_section(settings, headings, 2)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
    };

    SettingsOverrides {
        num_tolerance: field(NUM_TOLERANCE),
        text: field(TEXT_POLICY),
        mapping: field(MAPPING_POLICY),
        sequence: field(SEQUENCE_POLICY),
        sequence_matching: field(SEQUENCE_MATCHING),
    }
}

fn question_heading() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^## +(?:Вопрос|Question) +(\d+)\s*$").ok())
        .as_ref()
}

/// Read questions numbered from 1, stopping at the first missing number
fn parse_questions(suite: &str, tests: &str) -> Vec<Question> {
    let mut questions = Vec::new();

    for number in 1.. {
        let question_headings = [format!("Вопрос {}", number), format!("Question {}", number)];
        let answer_headings = [format!("Ответ {}", number), format!("Answer {}", number)];

        let text = get_any_section(tests, &[question_headings[0].as_str(), question_headings[1].as_str()], 2);
        let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
            break;
        };
        let answer = get_any_section(tests, &[answer_headings[0].as_str(), answer_headings[1].as_str()], 2)
            .unwrap_or_else(|| {
                tracing::warn!("Test '{}': question {} has no answer", suite, number);
                String::new()
            });
        questions.push(Question {
            number,
            text: text.trim().to_string(),
            answer: answer.trim().to_string(),
        });
    }

    let skipped: Vec<usize> = question_heading()
        .map(|re| {
            re.captures_iter(tests)
                .filter_map(|c| c[1].parse::<usize>().ok())
                .filter(|&n| n > questions.len() + 1)
                .collect()
        })
        .unwrap_or_default();
    if !skipped.is_empty() {
        tracing::warn!(
            "Test '{}': question {} is missing, ignoring questions {:?}",
            suite,
            questions.len() + 1,
            skipped
        );
    }

    questions
}
