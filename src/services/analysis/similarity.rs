// Similarity Scorer
// TF-IDF cosine similarity between a fragment and an evidence snippet

use std::collections::HashMap;

use crate::services::text_processor::tokenize_terms;

/// Score textual similarity between two short texts as a percent in
/// [0, 100], rounded to 2 decimals.
///
/// TF-IDF is built over the two-document corpus {fragment, candidate} with
/// smoothed idf `ln((1 + n) / (1 + df)) + 1` and L2-normalized weights, so
/// identical texts score 100 and texts with no shared vocabulary score 0.
/// Degenerate inputs (nothing tokenizes) yield 0.0, never an error.
pub fn similarity_percent(fragment_text: &str, candidate_text: &str) -> f64 {
    let terms_a = tokenize_terms(fragment_text);
    let terms_b = tokenize_terms(candidate_text);
    if terms_a.is_empty() || terms_b.is_empty() {
        return 0.0;
    }

    let tf_a = term_frequencies(&terms_a);
    let tf_b = term_frequencies(&terms_b);

    // Smoothed idf over the two-document corpus (n = 2).
    let n = 2.0f64;
    let idf = |term: &str| {
        let df = tf_a.contains_key(term) as u32 + tf_b.contains_key(term) as u32;
        ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0
    };

    let mut wa: HashMap<&str, f64> = HashMap::new();
    for (&term, &count) in &tf_a {
        wa.insert(term, count as f64 * idf(term));
    }
    let mut wb: HashMap<&str, f64> = HashMap::new();
    for (&term, &count) in &tf_b {
        wb.insert(term, count as f64 * idf(term));
    }

    let norm_a = wa.values().map(|w| w * w).sum::<f64>().sqrt();
    let norm_b = wb.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let dot: f64 = wa
        .iter()
        .filter_map(|(t, w)| wb.get(t).map(|v| w * v))
        .sum();

    let cosine = (dot / (norm_a * norm_b)).clamp(0.0, 1.0);
    (cosine * 100.0 * 100.0).round() / 100.0
}

fn term_frequencies(terms: &[String]) -> HashMap<&str, usize> {
    let mut tf: HashMap<&str, usize> = HashMap::new();
    for term in terms {
        *tf.entry(term.as_str()).or_insert(0) += 1;
    }
    tf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_texts_score_100() {
        let text = "the quick brown fox jumps over the lazy dog";
        assert_eq!(similarity_percent(text, text), 100.0);
    }

    #[test]
    fn test_disjoint_vocabulary_scores_0() {
        let a = "alpha beta gamma delta epsilon";
        let b = "uno dos tres cuatro cinco";
        assert_eq!(similarity_percent(a, b), 0.0);
    }

    #[test]
    fn test_self_similarity_dominates_unrelated() {
        let a = "students submitted their research reports before the deadline";
        let b = "quantum chromodynamics predicts gluon confinement";
        let self_score = similarity_percent(a, a);
        let cross_score = similarity_percent(a, b);
        assert!(self_score >= cross_score);
        assert_eq!(self_score, 100.0);
        assert_eq!(cross_score, 0.0);
    }

    #[test]
    fn test_partial_overlap_scores_between_bounds() {
        let a = "climate change affects coastal cities worldwide";
        let b = "climate change affects mountain villages severely";
        let score = similarity_percent(a, b);
        assert!(score > 0.0 && score < 100.0, "score was {}", score);
    }

    #[test]
    fn test_score_is_symmetric() {
        let a = "machine learning models require labeled training data";
        let b = "training data for machine learning is often labeled manually";
        assert_eq!(similarity_percent(a, b), similarity_percent(b, a));
    }

    #[test]
    fn test_degenerate_inputs_yield_zero() {
        assert_eq!(similarity_percent("", "some text here"), 0.0);
        assert_eq!(similarity_percent("some text here", ""), 0.0);
        assert_eq!(similarity_percent("!!! ...", "some text here"), 0.0);
        assert_eq!(similarity_percent("", ""), 0.0);
    }

    #[test]
    fn test_result_is_rounded_to_two_decimals() {
        let a = "one two three four five six";
        let b = "one two three seven eight nine";
        let score = similarity_percent(a, b);
        assert_eq!(score, (score * 100.0).round() / 100.0);
    }
}
