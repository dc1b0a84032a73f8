// Veritext Data Models
// Shared records for the originality analysis pipeline

use serde::{Deserialize, Serialize};

// ============ Analysis Options ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOptions {
    /// Words per fragment window.
    #[serde(default = "default_fragment_window")]
    pub fragment_window: usize,
    /// Words between consecutive window starts.
    #[serde(default = "default_fragment_step")]
    pub fragment_step: usize,
    /// Windows shorter than this (trailing remainder) are dropped.
    #[serde(default = "default_min_fragment_words")]
    pub min_fragment_words: usize,
    /// Best-candidate similarity (percent) required to record a match.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// Evidence candidates requested per fragment.
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
    /// Concurrent in-flight fragment lookups.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Deadline for one whole analysis run, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            fragment_window: 25,
            fragment_step: 20,
            min_fragment_words: 10,
            similarity_threshold: 60.0,
            result_limit: 5,
            max_concurrency: 4,
            timeout_secs: 120,
        }
    }
}

// ============ Fragments & Evidence ============

/// One overlapping word-window extracted from a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    /// Position among kept fragments (document order).
    pub ordinal: usize,
    /// Index of the first word in the document word sequence.
    pub start_word: usize,
    pub word_count: usize,
    pub text: String,
}

/// One external search result considered as possible source material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceCandidate {
    pub title: Option<String>,
    pub url: Option<String>,
    pub snippet: Option<String>,
}

/// Best evidence candidate for a fragment that cleared the similarity threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentMatch {
    pub fragment: String,
    pub similarity_percent: f64,
    pub url: Option<String>,
    pub title: Option<String>,
    pub snippet: Option<String>,
}

// ============ Analysis Report ============

/// Aggregate result of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub request_id: String,
    pub originality_percent: f64,
    pub ai_generated_percent: f64,
    /// Accepted matches in ascending fragment order.
    pub matches: Vec<FragmentMatch>,
    pub fragments_total: usize,
    /// Fragments whose retrieval completed without error before the deadline.
    pub fragments_checked: usize,
    pub plagiarism_hits: usize,
    pub elapsed_ms: i64,
}

// ============ Default Value Functions ============

fn default_fragment_window() -> usize { 25 }
fn default_fragment_step() -> usize { 20 }
fn default_min_fragment_words() -> usize { 10 }
fn default_similarity_threshold() -> f64 { 60.0 }
fn default_result_limit() -> usize { 5 }
fn default_max_concurrency() -> usize { 4 }
fn default_timeout_secs() -> u64 { 120 }
