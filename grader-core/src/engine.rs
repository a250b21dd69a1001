//! Structural equivalence engine
//!
//! [`Comparator::equivalent`] dispatches on the shape of the reference value.
//! Containers recurse through the matchers in [`crate::matchers`] with an
//! updated [`Context`]; leaves go to the scalar comparators or the semantic
//! judge. The engine holds no mutable state, so one comparator can be shared
//! freely and separate `compare` calls never interact.

use std::fmt;

use crate::judge::{SemanticJudge, SimilarityJudge};
use crate::settings::{ComparisonSettings, StringMethod, StringPolicy};
use crate::similarity::{is_similar, within_tolerance};
use crate::value::ComparisonValue;

/// Nearest structural container of the value being compared.
///
/// Selects which string policy applies. Nesting does not accumulate: text two
/// mappings deep is still compared under [`Context::InMapping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    /// Top-level free-text answer
    Text,
    /// Value of a mapping entry
    InMapping,
    /// Element of a sequence
    InSequence,
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::Text => write!(f, "text"),
            Context::InMapping => write!(f, "mapping"),
            Context::InSequence => write!(f, "sequence"),
        }
    }
}

static FALLBACK_JUDGE: SimilarityJudge = SimilarityJudge::new();

/// Recursive comparator bound to one settings value and one judge
#[derive(Clone, Copy)]
pub struct Comparator<'a> {
    pub(crate) settings: &'a ComparisonSettings,
    judge: &'a dyn SemanticJudge,
}

impl<'a> Comparator<'a> {
    /// Comparator using the similarity fallback for model-judged text
    pub fn new(settings: &'a ComparisonSettings) -> Self {
        Self {
            settings,
            judge: &FALLBACK_JUDGE,
        }
    }

    /// Use `judge` for text compared under [`StringMethod::Model`]
    pub fn with_judge(mut self, judge: &'a dyn SemanticJudge) -> Self {
        self.judge = judge;
        self
    }

    pub fn settings(&self) -> &ComparisonSettings {
        self.settings
    }

    /// Compare two answers, starting in the top-level text context
    pub fn compare(&self, reference: &ComparisonValue, candidate: &ComparisonValue) -> bool {
        self.equivalent(reference, candidate, Context::Text)
    }

    /// Decide whether `candidate` is an acceptable rendition of `reference`
    pub fn equivalent(
        &self,
        reference: &ComparisonValue,
        candidate: &ComparisonValue,
        context: Context,
    ) -> bool {
        match (reference, candidate) {
            (ComparisonValue::Mapping(r), ComparisonValue::Mapping(c)) => {
                self.match_mappings(r, c)
            }
            (ComparisonValue::Sequence(r), ComparisonValue::Sequence(c)) => {
                self.match_sequences(r, c)
            }
            (ComparisonValue::Number(r), ComparisonValue::Number(c)) => {
                within_tolerance(*r, *c, self.settings.num_tolerance)
            }
            (ComparisonValue::Text(r), ComparisonValue::Text(c)) => self.compare_text(r, c, context),
            (ComparisonValue::Bool(r), ComparisonValue::Bool(c)) => r == c,
            (ComparisonValue::Null, ComparisonValue::Null) => true,
            (r, c) => {
                tracing::trace!("Shape mismatch in {} context: {} vs {}", context, r.kind(), c.kind());
                false
            }
        }
    }

    /// String policy for the given context
    pub fn policy_for(&self, context: Context) -> StringPolicy {
        match context {
            Context::Text => self.settings.text,
            Context::InMapping => self.settings.mapping,
            Context::InSequence => self.settings.sequence,
        }
    }

    fn compare_text(&self, reference: &str, candidate: &str, context: Context) -> bool {
        let policy = self.policy_for(context);
        let verdict = match policy.method {
            StringMethod::Similarity => is_similar(reference, candidate, policy.threshold),
            StringMethod::Model => self.judge.equivalent(reference, candidate),
        };
        tracing::trace!(
            "Text in {} context via {}: {:?} vs {:?} -> {}",
            context,
            match policy.method {
                StringMethod::Similarity => "similarity",
                StringMethod::Model => self.judge.name(),
            },
            reference,
            candidate,
            verdict
        );
        verdict
    }
}

impl fmt::Debug for Comparator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Comparator")
            .field("settings", self.settings)
            .field("judge", &self.judge.name())
            .finish()
    }
}

/// Grade `candidate` against `reference`.
///
/// Text judged by model goes to the similarity fallback; use
/// [`compare_with_judge`] to plug in a real judge.
///
/// ```
/// use grader::{compare, ComparisonSettings, ComparisonValue};
///
/// let reference = ComparisonValue::parse(r#"{"city": "Paris", "population": 2.1}"#);
/// let candidate = ComparisonValue::parse(r#"{"city": "paris", "population": 2.105, "country": "FR"}"#);
/// assert!(compare(&reference, &candidate, &ComparisonSettings::default()));
/// ```
pub fn compare(
    reference: &ComparisonValue,
    candidate: &ComparisonValue,
    settings: &ComparisonSettings,
) -> bool {
    Comparator::new(settings).compare(reference, candidate)
}

/// Grade `candidate` against `reference`, delegating model-judged text to `judge`
pub fn compare_with_judge(
    reference: &ComparisonValue,
    candidate: &ComparisonValue,
    settings: &ComparisonSettings,
    judge: &dyn SemanticJudge,
) -> bool {
    Comparator::new(settings)
        .with_judge(judge)
        .compare(reference, candidate)
}
