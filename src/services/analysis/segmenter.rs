// Fragment Segmenter
// Splits a document into overlapping word windows for evidence lookup

use crate::models::Fragment;
use crate::services::text_processor::split_words;

/// Segment text into word windows starting every `step` words.
///
/// Windows shorter than `min_words` (the trailing remainder) are dropped.
/// Deterministic: the same text always yields the same fragment sequence.
pub fn segment_fragments(
    text: &str,
    window: usize,
    step: usize,
    min_words: usize,
) -> Vec<Fragment> {
    let words = split_words(text);
    let mut fragments = Vec::new();
    if words.is_empty() || window == 0 || step == 0 {
        return fragments;
    }

    let mut ordinal = 0;
    let mut start = 0;
    while start < words.len() {
        let end = (start + window).min(words.len());
        let span = &words[start..end];
        if span.len() >= min_words {
            fragments.push(Fragment {
                ordinal,
                start_word: start,
                word_count: span.len(),
                text: span.join(" "),
            });
            ordinal += 1;
        }
        start += step;
    }

    fragments
}
