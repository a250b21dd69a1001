//! Mapping and sequence matchers
//!
//! Both recurse into [`Comparator::equivalent`] with the container's context.

use crate::engine::{Comparator, Context};
use crate::settings::SequenceMatching;
use crate::value::{ComparisonValue, Mapping};

impl Comparator<'_> {
    /// Subset rule: every reference key must be present in the candidate with
    /// an equivalent value. Extra candidate keys are ignored.
    pub fn match_mappings(&self, reference: &Mapping, candidate: &Mapping) -> bool {
        reference.iter().all(|(key, expected)| match candidate.get(key) {
            Some(actual) => self.equivalent(expected, actual, Context::InMapping),
            None => {
                tracing::trace!("Candidate mapping is missing key {:?}", key);
                false
            }
        })
    }

    /// Bag rule: same length, and every reference element pairs with a
    /// distinct equivalent candidate element. Order is irrelevant.
    pub fn match_sequences(&self, reference: &[ComparisonValue], candidate: &[ComparisonValue]) -> bool {
        if reference.len() != candidate.len() {
            tracing::trace!(
                "Sequence length mismatch: {} vs {}",
                reference.len(),
                candidate.len()
            );
            return false;
        }
        match self.settings.sequence_matching {
            SequenceMatching::Greedy => self.match_greedy(reference, candidate),
            SequenceMatching::Optimal => self.match_optimal(reference, candidate),
        }
    }

    /// First-fit pairing in reference order.
    ///
    /// Each reference element takes the first unconsumed candidate it is
    /// equivalent to. This is not a maximum matching: an early element can
    /// consume the only partner of a later one, giving a false negative.
    fn match_greedy(&self, reference: &[ComparisonValue], candidate: &[ComparisonValue]) -> bool {
        let mut consumed = vec![false; candidate.len()];

        for (i, expected) in reference.iter().enumerate() {
            let found = candidate.iter().enumerate().position(|(j, actual)| {
                !consumed[j] && self.equivalent(expected, actual, Context::InSequence)
            });
            match found {
                Some(j) => consumed[j] = true,
                None => {
                    tracing::trace!("No candidate element matches reference element {}", i);
                    return false;
                }
            }
        }
        true
    }

    /// Maximum-cardinality bipartite matching (Kuhn's augmenting paths).
    ///
    /// Pairwise equivalence is evaluated only when a search reaches the pair,
    /// and at most once per pair. An already ordered candidate costs
    /// n(n+1)/2 comparisons like greedy; the worst case is n².
    fn match_optimal(&self, reference: &[ComparisonValue], candidate: &[ComparisonValue]) -> bool {
        let mut edges = LazyEdges {
            comparator: self,
            reference,
            candidate,
            known: vec![vec![None; candidate.len()]; reference.len()],
        };

        // owner[j] = reference index currently paired with candidate j
        let mut owner: Vec<Option<usize>> = vec![None; candidate.len()];
        for i in 0..reference.len() {
            let mut visited = vec![false; candidate.len()];
            if !augment(i, &mut edges, &mut owner, &mut visited) {
                tracing::trace!("No augmenting path for reference element {}", i);
                return false;
            }
        }
        true
    }
}

/// Memoized equivalence matrix, filled on demand
struct LazyEdges<'c, 'v> {
    comparator: &'c Comparator<'c>,
    reference: &'v [ComparisonValue],
    candidate: &'v [ComparisonValue],
    known: Vec<Vec<Option<bool>>>,
}

impl LazyEdges<'_, '_> {
    fn edge(&mut self, i: usize, j: usize) -> bool {
        if let Some(known) = self.known[i][j] {
            return known;
        }
        let result = self
            .comparator
            .equivalent(&self.reference[i], &self.candidate[j], Context::InSequence);
        self.known[i][j] = Some(result);
        result
    }
}

fn augment(
    i: usize,
    edges: &mut LazyEdges<'_, '_>,
    owner: &mut [Option<usize>],
    visited: &mut [bool],
) -> bool {
    for j in 0..owner.len() {
        if visited[j] || !edges.edge(i, j) {
            continue;
        }
        visited[j] = true;
        let free = match owner[j] {
            None => true,
            Some(other) => augment(other, edges, owner, visited),
        };
        if free {
            owner[j] = Some(i);
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use crate::engine::{compare, compare_with_judge, Comparator, Context};
    use crate::judge::SemanticJudge;
    use crate::settings::{ComparisonSettings, SequenceMatching, StringPolicy};
    use crate::value::ComparisonValue;
    use serde_json::json;

    fn v(json: serde_json::Value) -> ComparisonValue {
        ComparisonValue::from(json)
    }

    #[test]
    fn test_mapping_subset_rule() {
        let s = ComparisonSettings::default();
        assert!(compare(&v(json!({"a": 1, "b": 2})), &v(json!({"a": 1, "b": 2, "c": 99})), &s));
        assert!(!compare(&v(json!({"a": 1, "b": 2})), &v(json!({"a": 1})), &s));
        assert!(!compare(&v(json!({"a": 1, "b": 2})), &v(json!({"a": 1, "b": 3})), &s));
    }

    #[test]
    fn test_mapping_key_order_irrelevant() {
        let s = ComparisonSettings::default();
        assert!(compare(&v(json!({"a": 1, "b": "x"})), &v(json!({"b": "x", "a": 1})), &s));
    }

    #[test]
    fn test_empty_containers() {
        let s = ComparisonSettings::default();
        assert!(compare(&v(json!({})), &v(json!({"extra": true})), &s));
        assert!(compare(&v(json!([])), &v(json!([])), &s));
        assert!(!compare(&v(json!([])), &v(json!([1])), &s));
    }

    #[test]
    fn test_sequence_bag_equality() {
        let s = ComparisonSettings::default();
        assert!(compare(&v(json!([1, 2, 3])), &v(json!([3, 1, 2])), &s));
        assert!(!compare(&v(json!([1, 1, 2])), &v(json!([1, 2, 2])), &s));
        assert!(!compare(&v(json!([1, 2])), &v(json!([1, 2, 3])), &s));
    }

    #[test]
    fn test_sequence_of_mappings() {
        let s = ComparisonSettings::default();
        let reference = v(json!([{"id": 1, "name": "Bob"}, {"id": 2, "name": "Alice"}]));
        let candidate = v(json!([{"id": 2, "name": "alice"}, {"id": 1, "name": "bob", "age": 30}]));
        assert!(compare(&reference, &candidate, &s));
    }

    /// "aab" scores 67 against both candidates, "bbb" scores 67 against "abb"
    /// and 0 against "aaa". Listing "abb" first lets greedy hand it to "aab".
    fn adversarial_pair() -> (ComparisonValue, ComparisonValue) {
        (v(json!(["aab", "bbb"])), v(json!(["abb", "aaa"])))
    }

    #[test]
    fn test_greedy_false_negative() {
        let settings = ComparisonSettings::default().with_sequence(StringPolicy::similarity(60));
        let (reference, candidate) = adversarial_pair();
        assert!(!compare(&reference, &candidate, &settings));

        // The same elements in the other order are found
        let reordered = v(json!(["aaa", "abb"]));
        assert!(compare(&reference, &reordered, &settings));
    }

    #[test]
    fn test_optimal_matching_finds_assignment() {
        let settings = ComparisonSettings::default()
            .with_sequence(StringPolicy::similarity(60))
            .with_sequence_matching(SequenceMatching::Optimal);
        let (reference, candidate) = adversarial_pair();
        assert!(compare(&reference, &candidate, &settings));
    }

    #[test]
    fn test_optimal_matching_flag() {
        let settings = ComparisonSettings::default()
            .with_sequence_matching(SequenceMatching::Optimal);
        let comparator = Comparator::new(&settings);
        assert!(comparator.equivalent(&v(json!([1, 2, 3])), &v(json!([3, 2, 1])), Context::Text));
        assert!(!comparator.equivalent(&v(json!([1, 1])), &v(json!([1, 2])), Context::Text));
    }

    /// Exact-match judge that counts its calls
    #[derive(Default)]
    struct CountingJudge {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl SemanticJudge for CountingJudge {
        fn name(&self) -> &str {
            "counting"
        }

        fn equivalent(&self, reference: &str, candidate: &str) -> bool {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            reference == candidate
        }
    }

    #[test]
    fn test_optimal_matching_evaluates_pairs_lazily() {
        let settings = ComparisonSettings::default()
            .with_sequence(StringPolicy::model(75))
            .with_sequence_matching(SequenceMatching::Optimal);

        let judge = CountingJudge::default();
        let ordered = v(json!(["a", "b", "c"]));
        assert!(compare_with_judge(&ordered, &ordered, &settings, &judge));
        // Same cost as greedy, not the full 3x3 matrix
        assert_eq!(judge.calls.load(std::sync::atomic::Ordering::SeqCst), 6);

        let judge = CountingJudge::default();
        let reversed = v(json!(["c", "b", "a"]));
        assert!(compare_with_judge(&ordered, &reversed, &settings, &judge));
        assert!(judge.calls.load(std::sync::atomic::Ordering::SeqCst) <= 9);
    }
}
