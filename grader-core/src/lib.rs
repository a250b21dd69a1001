//! Grader - structural equivalence for model answers
//!
//! Decides whether a model's answer is close enough to a reference answer.
//! Both are coerced into a [`ComparisonValue`] tree and compared recursively:
//!
//! - shapes must match exactly (a number never equals a string);
//! - numbers are equal within an absolute tolerance;
//! - text is compared by case-insensitive edit-distance similarity or handed
//!   to a [`SemanticJudge`], depending on whether it sits at the top level,
//!   inside a mapping, or inside a sequence;
//! - mappings use a subset rule (extra candidate keys are fine);
//! - sequences are compared as bags, ignoring order.
//!
//! # Example
//!
//! ```rust
//! use grader::{compare, ComparisonSettings, ComparisonValue, SettingsOverrides};
//!
//! let settings = ComparisonSettings::from_overrides(&SettingsOverrides {
//!     sequence: Some("similarity 80".to_string()),
//!     ..Default::default()
//! });
//!
//! let reference = ComparisonValue::parse(r#"{"colors": ["red", "green"], "count": 2}"#);
//! let candidate = ComparisonValue::parse(r#"{"count": 2.001, "colors": ["Green", "red"]}"#);
//! assert!(compare(&reference, &candidate, &settings));
//! ```

mod engine;
mod error;
mod judge;
mod matchers;
mod settings;
mod similarity;
mod value;

pub use engine::{compare, compare_with_judge, Comparator, Context};
pub use error::SettingsError;
pub use judge::{SemanticJudge, SimilarityJudge};
pub use settings::{
    parse_policy, parse_sequence_matching, parse_tolerance, ComparisonSettings, SequenceMatching,
    SettingsOverrides, StringMethod, StringPolicy, DEFAULT_NUM_TOLERANCE,
    FALLBACK_JUDGE_THRESHOLD,
};
pub use similarity::{indel_distance, is_similar, similarity_ratio, within_tolerance};
pub use value::{ComparisonValue, Mapping, ValueKind};
