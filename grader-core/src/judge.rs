//! Semantic judge seam
//!
//! Text compared under [`StringMethod::Model`](crate::StringMethod::Model) is
//! handed to a [`SemanticJudge`]. The trait is infallible: an adapter that
//! talks to a network service resolves timeouts and transport errors into a
//! verdict itself, so no failure reaches the engine.

use crate::settings::FALLBACK_JUDGE_THRESHOLD;
use crate::similarity::is_similar;

/// Decides whether two free-text answers mean the same thing
pub trait SemanticJudge: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Return true when `candidate` is equivalent in meaning to `reference`
    fn equivalent(&self, reference: &str, candidate: &str) -> bool;
}

impl<J: SemanticJudge + ?Sized> SemanticJudge for std::sync::Arc<J> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn equivalent(&self, reference: &str, candidate: &str) -> bool {
        (**self).equivalent(reference, candidate)
    }
}

/// Stand-in used when no real judge is configured.
///
/// Falls back to fuzzy similarity at a fixed threshold and logs a warning on
/// every call so the substitution is visible in run logs.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityJudge {
    threshold: u8,
}

impl SimilarityJudge {
    pub const fn new() -> Self {
        Self {
            threshold: FALLBACK_JUDGE_THRESHOLD,
        }
    }

    pub fn with_threshold(threshold: u8) -> Self {
        Self {
            threshold: threshold.min(100),
        }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }
}

impl Default for SimilarityJudge {
    fn default() -> Self {
        Self::new()
    }
}

impl SemanticJudge for SimilarityJudge {
    fn name(&self) -> &str {
        "similarity-fallback"
    }

    fn equivalent(&self, reference: &str, candidate: &str) -> bool {
        tracing::warn!(
            "No semantic judge configured, using similarity comparison at {}%",
            self.threshold
        );
        is_similar(reference, candidate, self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_uses_fixed_threshold() {
        let judge = SimilarityJudge::new();
        assert_eq!(judge.threshold(), 75);
        assert!(judge.equivalent("The capital is Paris", "the capital is paris"));
        assert!(!judge.equivalent("Paris", "Berlin"));
    }

    #[test]
    fn test_judge_through_reference() {
        let judge = SimilarityJudge::with_threshold(0);
        let by_ref: &dyn SemanticJudge = &judge;
        assert!(by_ref.equivalent("a", "zzz"));
        assert_eq!(by_ref.name(), "similarity-fallback");
    }
}
