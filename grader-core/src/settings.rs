//! Comparison settings and test-level overrides
//!
//! A [`ComparisonSettings`] value is built once per test file and then only
//! read. Overrides come from the optional settings section of a test file as
//! raw strings; each one is parsed on its own and a malformed value leaves the
//! previous setting in place.

use std::fmt;

use crate::error::SettingsError;

/// Default absolute tolerance for numeric equality
pub const DEFAULT_NUM_TOLERANCE: f64 = 0.01;

/// Threshold used by the similarity fallback when no semantic judge is configured
pub const FALLBACK_JUDGE_THRESHOLD: u8 = 75;

/// How text values are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringMethod {
    /// Case-insensitive edit-distance percentage against a threshold
    Similarity,
    /// Delegated to a semantic judge
    Model,
}

impl fmt::Display for StringMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringMethod::Similarity => write!(f, "similarity"),
            StringMethod::Model => write!(f, "model"),
        }
    }
}

/// String comparison policy for one structural context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StringPolicy {
    pub method: StringMethod,
    /// Minimum similarity percentage, 0..=100. Unused with [`StringMethod::Model`].
    pub threshold: u8,
}

impl StringPolicy {
    pub fn similarity(threshold: u8) -> Self {
        Self {
            method: StringMethod::Similarity,
            threshold: threshold.min(100),
        }
    }

    pub fn model(threshold: u8) -> Self {
        Self {
            method: StringMethod::Model,
            threshold: threshold.min(100),
        }
    }
}

impl fmt::Display for StringPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.method {
            StringMethod::Similarity => write!(f, "similarity {}", self.threshold),
            StringMethod::Model => write!(f, "model"),
        }
    }
}

/// Matching algorithm for sequence (bag) comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SequenceMatching {
    /// First-fit greedy pairing. Can miss a valid assignment under fuzzy thresholds.
    #[default]
    Greedy,
    /// Maximum-cardinality bipartite matching. Pairs are compared lazily;
    /// a shuffled candidate can need up to n² comparisons (judge calls under
    /// a model policy) where greedy needs at most n(n+1)/2.
    Optimal,
}

impl fmt::Display for SequenceMatching {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceMatching::Greedy => write!(f, "greedy"),
            SequenceMatching::Optimal => write!(f, "optimal"),
        }
    }
}

// =============================================================================
// ComparisonSettings
// =============================================================================

/// Per-run grading configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonSettings {
    /// Max absolute difference for numbers to be equal
    pub num_tolerance: f64,
    /// Policy for a top-level free-text answer
    pub text: StringPolicy,
    /// Policy for text found inside a mapping
    pub mapping: StringPolicy,
    /// Policy for text found inside a sequence
    pub sequence: StringPolicy,
    pub sequence_matching: SequenceMatching,
}

impl Default for ComparisonSettings {
    fn default() -> Self {
        Self {
            num_tolerance: DEFAULT_NUM_TOLERANCE,
            text: StringPolicy::model(FALLBACK_JUDGE_THRESHOLD),
            mapping: StringPolicy::similarity(75),
            sequence: StringPolicy::similarity(100),
            sequence_matching: SequenceMatching::Greedy,
        }
    }
}

impl ComparisonSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build settings from defaults plus the given overrides
    pub fn from_overrides(overrides: &SettingsOverrides) -> Self {
        Self::default().with_overrides(overrides)
    }

    pub fn with_num_tolerance(mut self, tolerance: f64) -> Self {
        self.num_tolerance = tolerance;
        self
    }

    pub fn with_text(mut self, policy: StringPolicy) -> Self {
        self.text = policy;
        self
    }

    pub fn with_mapping(mut self, policy: StringPolicy) -> Self {
        self.mapping = policy;
        self
    }

    pub fn with_sequence(mut self, policy: StringPolicy) -> Self {
        self.sequence = policy;
        self
    }

    pub fn with_sequence_matching(mut self, matching: SequenceMatching) -> Self {
        self.sequence_matching = matching;
        self
    }

    /// Overlay raw overrides on these settings.
    ///
    /// Only present, non-empty fields are considered. A value that fails to
    /// parse is logged at debug level and the current value is kept.
    pub fn with_overrides(mut self, overrides: &SettingsOverrides) -> Self {
        if let Some(raw) = overrides.num_tolerance.as_deref() {
            apply(&mut self.num_tolerance, "numeric tolerance", raw, parse_tolerance);
        }
        if let Some(raw) = overrides.text.as_deref() {
            let current = self.text;
            apply(&mut self.text, "text comparison", raw, |r| parse_policy(r, current));
        }
        if let Some(raw) = overrides.mapping.as_deref() {
            let current = self.mapping;
            apply(&mut self.mapping, "mapping string comparison", raw, |r| {
                parse_policy(r, current)
            });
        }
        if let Some(raw) = overrides.sequence.as_deref() {
            let current = self.sequence;
            apply(&mut self.sequence, "sequence string comparison", raw, |r| {
                parse_policy(r, current)
            });
        }
        if let Some(raw) = overrides.sequence_matching.as_deref() {
            apply(&mut self.sequence_matching, "sequence matching", raw, parse_sequence_matching);
        }
        self
    }

    /// Check the invariants: tolerance finite and non-negative, thresholds in 0..=100
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.num_tolerance.is_finite() || self.num_tolerance < 0.0 {
            return Err(SettingsError::InvalidTolerance(self.num_tolerance.to_string()));
        }
        for policy in [self.text, self.mapping, self.sequence] {
            if policy.threshold > 100 {
                return Err(SettingsError::ThresholdOutOfRange(i64::from(policy.threshold)));
            }
        }
        Ok(())
    }
}

fn apply<T, F>(slot: &mut T, field: &str, raw: &str, parse: F)
where
    F: FnOnce(&str) -> Result<T, SettingsError>,
{
    let raw = raw.trim();
    if raw.is_empty() {
        return;
    }
    match parse(raw) {
        Ok(value) => *slot = value,
        Err(e) => {
            tracing::debug!("Ignoring {} override {:?}: {}", field, raw, e);
        }
    }
}

// =============================================================================
// Overrides
// =============================================================================

/// Raw override strings taken from a test file's settings section.
///
/// `None` means the field was not given. Values are parsed by
/// [`ComparisonSettings::with_overrides`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    pub num_tolerance: Option<String>,
    pub text: Option<String>,
    pub mapping: Option<String>,
    pub sequence: Option<String>,
    pub sequence_matching: Option<String>,
}

impl SettingsOverrides {
    pub fn is_empty(&self) -> bool {
        self.num_tolerance.is_none()
            && self.text.is_none()
            && self.mapping.is_none()
            && self.sequence.is_none()
            && self.sequence_matching.is_none()
    }
}

/// Parse a numeric tolerance override such as `0.5`
pub fn parse_tolerance(raw: &str) -> Result<f64, SettingsError> {
    let raw = raw.trim();
    let value: f64 = raw
        .parse()
        .map_err(|_| SettingsError::InvalidTolerance(raw.to_string()))?;
    if !value.is_finite() || value < 0.0 {
        return Err(SettingsError::InvalidTolerance(raw.to_string()));
    }
    Ok(value)
}

/// Parse a string policy override.
///
/// `модель` / `model` selects the semantic judge and keeps the current
/// threshold. Otherwise the value must be `<word> <threshold>`, e.g.
/// `похожесть 80`.
pub fn parse_policy(raw: &str, current: StringPolicy) -> Result<StringPolicy, SettingsError> {
    let raw = raw.trim();
    let lowered = raw.to_lowercase();
    if lowered == "модель" || lowered == "model" {
        return Ok(StringPolicy {
            method: StringMethod::Model,
            threshold: current.threshold,
        });
    }

    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let [_, threshold] = tokens.as_slice() else {
        return Err(SettingsError::MalformedPolicy(raw.to_string()));
    };
    let threshold: i64 = threshold
        .parse()
        .map_err(|_| SettingsError::MalformedPolicy(raw.to_string()))?;
    if !(0..=100).contains(&threshold) {
        return Err(SettingsError::ThresholdOutOfRange(threshold));
    }
    Ok(StringPolicy::similarity(threshold as u8))
}

/// Parse a sequence matching override (`greedy` or `optimal`)
pub fn parse_sequence_matching(raw: &str) -> Result<SequenceMatching, SettingsError> {
    match raw.trim().to_lowercase().as_str() {
        "greedy" | "жадный" | "жадное" => Ok(SequenceMatching::Greedy),
        "optimal" | "оптимальный" | "оптимальное" => Ok(SequenceMatching::Optimal),
        other => Err(SettingsError::UnknownMatching(other.to_string())),
    }
}
