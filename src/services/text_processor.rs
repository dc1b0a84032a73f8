// Text Processing Service
// Normalization and tokenization shared by the segmenter and similarity scorer

use regex::Regex;

/// Normalize whitespace and punctuation variants before analysis.
pub fn normalize_whitespace(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut s = text.to_string();

    // Replace smart quotes
    s = s.replace('\u{201c}', "\"")
         .replace('\u{201d}', "\"")
         .replace('\u{2018}', "'")
         .replace('\u{2019}', "'");

    // Replace em dash
    s = s.replace('\u{2014}', "-");

    // Replace ideographic space and non-breaking space
    let space_re = Regex::new(r"[\u{3000}\u{00A0}]").unwrap();
    s = space_re.replace_all(&s, " ").to_string();

    // Normalize line endings
    s = s.replace("\r\n", "\n").replace('\r', "\n");

    // Collapse horizontal whitespace
    let ws_re = Regex::new(r"[ \t\x0C\x0B]+").unwrap();
    s = ws_re.replace_all(&s, " ").to_string();

    // Strip each line
    s = s.lines()
         .map(|ln| ln.trim())
         .collect::<Vec<_>>()
         .join("\n");

    s.trim().to_string()
}

/// Split text into words on whitespace (segmenter input).
pub fn split_words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Lowercased alphanumeric terms of length >= 2 (vectorizer token pattern).
pub fn tokenize_terms(text: &str) -> Vec<String> {
    if text.is_empty() {
        return vec![];
    }

    let re = Regex::new(r"\b\w\w+\b").unwrap();
    re.find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}
