//! Scalar comparators: fuzzy text similarity and numeric tolerance

/// Insertion/deletion edit distance over Unicode scalar values.
///
/// A substitution costs 2 (one deletion plus one insertion), so the distance
/// equals `len(a) + len(b) - 2 * lcs(a, b)`.
pub fn indel_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two-row dynamic programming table
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + if ca == cb { 0 } else { 2 };
            let deletion = prev[j + 1] + 1;
            let insertion = curr[j] + 1;
            curr[j + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Case-insensitive similarity score in `0..=100`.
///
/// `round(100 * (1 - distance / (len_a + len_b)))` with the indel distance;
/// two empty strings score 100.
pub fn similarity_ratio(a: &str, b: &str) -> u8 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 100;
    }
    let distance = indel_distance(&a, &b);
    let score = 100.0 * (1.0 - distance as f64 / total as f64);
    score.round().clamp(0.0, 100.0) as u8
}

/// True when the similarity of `a` and `b` reaches `threshold` percent
pub fn is_similar(a: &str, b: &str, threshold: u8) -> bool {
    similarity_ratio(a, b) >= threshold
}

/// Absolute-difference numeric equality
pub fn within_tolerance(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indel_distance() {
        assert_eq!(indel_distance("", ""), 0);
        assert_eq!(indel_distance("abc", ""), 3);
        assert_eq!(indel_distance("kitten", "sitting"), 5);
        assert_eq!(indel_distance("Hello Wrold", "Hello World"), 2);
        // A substitution is a deletion plus an insertion
        assert_eq!(indel_distance("cat", "cut"), 2);
        // Counted in characters, not bytes
        assert_eq!(indel_distance("ёлка", "елка"), 2);
    }

    #[test]
    fn test_ratio_is_case_insensitive() {
        assert_eq!(similarity_ratio("Hello World", "hello world"), 100);
        assert_eq!(similarity_ratio("МОСКВА", "москва"), 100);
    }

    #[test]
    fn test_ratio_bounds() {
        assert_eq!(similarity_ratio("", ""), 100);
        assert_eq!(similarity_ratio("abc", ""), 0);
        assert_eq!(similarity_ratio("ab", "ac"), 50);
        assert_eq!(similarity_ratio("Hello Wrold", "Hello World"), 91);
    }

    #[test]
    fn test_unrelated_strings_score_zero() {
        assert_eq!(similarity_ratio("abc", "xyz"), 0);
        assert_eq!(similarity_ratio("Paris", "Tokyo"), 0);
        assert!(!is_similar("Paris", "Tokyo", 50));
    }

    #[test]
    fn test_score_is_rounded() {
        // 100 * (1 - 2/6) = 66.67
        assert_eq!(similarity_ratio("cat", "cut"), 67);
        assert!(!is_similar("cat", "cut", 75));
        assert!(is_similar("cat", "cut", 67));
        assert!(!is_similar("cat", "cut", 68));
    }

    #[test]
    fn test_is_similar_threshold() {
        assert!(is_similar("Hello World", "hello world", 100));
        assert!(is_similar("Hello Wrold", "Hello World", 50));
        assert!(!is_similar("Hello Wrold", "Hello World", 100));
        assert!(is_similar("anything", "different", 0));
    }

    #[test]
    fn test_within_tolerance() {
        assert!(within_tolerance(1.0, 1.005, 0.01));
        assert!(!within_tolerance(1.0, 1.02, 0.01));
        assert!(within_tolerance(1_000_000.0, 1_000_000.5, 1.0));
        assert!(!within_tolerance(0.001, 0.1, 0.01));
    }
}
