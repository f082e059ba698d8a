// ==========================================
// Layout Exporter - string similarity
// ==========================================
// Pure scoring half of the fuzzy resolver. Ratio over the longest common
// subsequence: 2*lcs / (len_a + len_b), in [0, 1].
// ==========================================

/// Similarity ratio between two strings, 1.0 for identical inputs.
///
/// Two empty strings compare as identical. The score alone never binds a
/// sheet to a table; the schema-overlap validation is the gate.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let lcs = lcs_length(&a, &b);
    (2.0 * lcs as f64) / ((a.len() + b.len()) as f64)
}

/// Longest common subsequence length, two-row dynamic programming.
fn lcs_length(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_and_disjoint() {
        assert_eq!(ratio("DADOS_GERAIS", "DADOS_GERAIS"), 1.0);
        assert_eq!(ratio("ABC", "XYZ"), 0.0);
        assert_eq!(ratio("", ""), 1.0);
        assert_eq!(ratio("ABC", ""), 0.0);
    }

    #[test]
    fn test_abbreviated_name_scores_above_threshold() {
        // "DADOS_GER" vs "DADOS_GERAIS": lcs = 9 -> 18/21
        let score = ratio("DADOS_GER", "DADOS_GERAIS");
        assert!(score >= 0.60, "score = {}", score);
    }

    #[test]
    fn test_unrelated_name_scores_below_threshold() {
        let score = ratio("CLASSIFICACAO", "DADOS_GERAIS");
        assert!(score < 0.60, "score = {}", score);
    }
}
