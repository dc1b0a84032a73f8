// Analysis Pipeline
// Drives one originality analysis run end to end: segment the document,
// retrieve evidence per fragment, score similarity, aggregate, AI-score.

use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{AnalysisOptions, AnalysisReport, Fragment, FragmentMatch};
use crate::services::ai_detector::AiLikelihoodScorer;
use crate::services::analysis::segmenter::segment_fragments;
use crate::services::analysis::similarity::similarity_percent;
use crate::services::config_store::AppConfig;
use crate::services::providers::{GoogleSearchClient, SaplingClassifier, TextClassifier};
use crate::services::retriever::EvidenceRetriever;
use crate::services::search_cache::SearchCache;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("document text is empty")]
    EmptyInput,
}

/// Per-fragment processing outcome. A retrieval error skips the fragment
/// entirely so one bad fragment cannot corrupt the aggregate.
enum FragmentOutcome {
    Checked {
        ordinal: usize,
        best: Option<FragmentMatch>,
    },
    Skipped {
        ordinal: usize,
    },
}

impl FragmentOutcome {
    fn ordinal(&self) -> usize {
        match self {
            FragmentOutcome::Checked { ordinal, .. } => *ordinal,
            FragmentOutcome::Skipped { ordinal } => *ordinal,
        }
    }
}

pub struct AnalysisEngine {
    retriever: Arc<EvidenceRetriever>,
    scorer: AiLikelihoodScorer,
    options: AnalysisOptions,
}

impl AnalysisEngine {
    pub fn new(
        retriever: Arc<EvidenceRetriever>,
        classifier: Arc<dyn TextClassifier>,
        options: AnalysisOptions,
    ) -> Self {
        Self {
            retriever,
            scorer: AiLikelihoodScorer::new(classifier),
            options,
        }
    }

    /// Wire Google search, the Sapling classifier and the file cache from
    /// configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let cache_file = config
            .cache
            .file
            .clone()
            .or_else(SearchCache::default_cache_file)
            .unwrap_or_else(|| std::path::PathBuf::from("search_cache.json"));
        let cache = Arc::new(SearchCache::new(cache_file, config.cache.expiration_hours));

        let retriever = Arc::new(EvidenceRetriever::new(
            Arc::new(GoogleSearchClient::from_config(config)),
            cache,
            config.analysis.result_limit,
        ));

        Self::new(
            retriever,
            Arc::new(SaplingClassifier::from_config(config)),
            config.analysis.clone(),
        )
    }

    /// Run one analysis over the document text.
    ///
    /// The only fatal error is empty input. Dependency failures (search,
    /// classifier, cache) are isolated: a failing fragment is excluded from
    /// both counters and a failing classifier yields 0.0.
    pub async fn analyze(&self, document_text: &str) -> Result<AnalysisReport, AnalysisError> {
        let text = document_text.trim();
        if text.is_empty() {
            return Err(AnalysisError::EmptyInput);
        }

        let started = Instant::now();
        let fragments = segment_fragments(
            text,
            self.options.fragment_window,
            self.options.fragment_step,
            self.options.min_fragment_words,
        );
        info!(fragments = fragments.len(), "starting originality analysis");

        // AI scoring has no ordering dependency on fragment processing; run
        // it alongside the fragment fan-out.
        let ai_task = {
            let scorer = self.scorer.clone();
            let text = text.to_string();
            tokio::spawn(async move { scorer.score(&text).await })
        };

        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrency.max(1)));
        let mut join_set: JoinSet<FragmentOutcome> = JoinSet::new();
        for fragment in &fragments {
            let retriever = self.retriever.clone();
            let semaphore = semaphore.clone();
            let threshold = self.options.similarity_threshold;
            let fragment = fragment.clone();
            join_set.spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return FragmentOutcome::Skipped {
                            ordinal: fragment.ordinal,
                        }
                    }
                };
                check_fragment(&retriever, &fragment, threshold).await
            });
        }

        // Fragment-indexed slots keep document order regardless of the order
        // in which workers complete.
        let mut outcomes: Vec<Option<FragmentOutcome>> = Vec::new();
        outcomes.resize_with(fragments.len(), || None);

        let deadline = tokio::time::Instant::now()
            + std::time::Duration::from_secs(self.options.timeout_secs);
        loop {
            match tokio::time::timeout_at(deadline, join_set.join_next()).await {
                Ok(Some(Ok(outcome))) => {
                    let slot = outcome.ordinal();
                    outcomes[slot] = Some(outcome);
                }
                Ok(Some(Err(e))) => warn!("fragment task failed: {}", e),
                Ok(None) => break,
                Err(_) => {
                    // Fragments still pending at the deadline count as not
                    // checked, same as a per-fragment retrieval failure.
                    warn!(
                        pending = join_set.len(),
                        timeout_secs = self.options.timeout_secs,
                        "analysis deadline exceeded, aborting pending fragments"
                    );
                    join_set.abort_all();
                    break;
                }
            }
        }

        let mut total_checked = 0usize;
        let mut plagiarism_hits = 0usize;
        let mut matches = Vec::new();
        for outcome in outcomes.into_iter().flatten() {
            if let FragmentOutcome::Checked { best, .. } = outcome {
                total_checked += 1;
                if let Some(matched) = best {
                    plagiarism_hits += 1;
                    matches.push(matched);
                }
            }
        }

        let originality_percent = if total_checked == 0 {
            100.0
        } else {
            (100.0 - (plagiarism_hits as f64 / total_checked as f64) * 100.0).max(0.0)
        };

        let ai_generated_percent = match ai_task.await {
            Ok(Ok(score)) => score,
            Ok(Err(e)) => {
                warn!("AI classification failed, scoring 0.0: {}", e);
                0.0
            }
            Err(e) => {
                warn!("AI classification task failed, scoring 0.0: {}", e);
                0.0
            }
        };

        let report = AnalysisReport {
            request_id: Uuid::new_v4().to_string(),
            originality_percent: (originality_percent * 100.0).round() / 100.0,
            ai_generated_percent: (ai_generated_percent * 100.0).round() / 100.0,
            matches,
            fragments_total: fragments.len(),
            fragments_checked: total_checked,
            plagiarism_hits,
            elapsed_ms: started.elapsed().as_millis() as i64,
        };
        info!(
            originality = report.originality_percent,
            ai_generated = report.ai_generated_percent,
            checked = report.fragments_checked,
            hits = report.plagiarism_hits,
            elapsed_ms = report.elapsed_ms,
            "analysis complete"
        );
        Ok(report)
    }
}

/// Retrieve evidence for one fragment and score every candidate snippet,
/// keeping the best. The best candidate becomes a match only when it clears
/// the similarity threshold.
async fn check_fragment(
    retriever: &EvidenceRetriever,
    fragment: &Fragment,
    threshold: f64,
) -> FragmentOutcome {
    let candidates = match retriever.retrieve(&fragment.text).await {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!(ordinal = fragment.ordinal, "evidence retrieval failed: {}", e);
            return FragmentOutcome::Skipped {
                ordinal: fragment.ordinal,
            };
        }
    };

    let mut best: Option<FragmentMatch> = None;
    let mut best_score = 0.0f64;
    for candidate in &candidates {
        let snippet = candidate.snippet.as_deref().unwrap_or("");
        let score = similarity_percent(&fragment.text, snippet);
        if score > best_score {
            best_score = score;
            best = Some(FragmentMatch {
                fragment: fragment.text.clone(),
                similarity_percent: score,
                url: candidate.url.clone(),
                title: candidate.title.clone(),
                snippet: candidate.snippet.clone(),
            });
        }
    }

    FragmentOutcome::Checked {
        ordinal: fragment.ordinal,
        best: if best_score >= threshold { best } else { None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EvidenceCandidate;
    use crate::services::providers::{ClassifierError, RetrievalError, SearchProvider};
    use async_trait::async_trait;

    /// Behavior is keyed on marker words so it is independent of call order:
    /// a query containing `fail_on` errors, one containing `hit_on` gets a
    /// snippet equal to the query (similarity 100), one containing `slow_on`
    /// answers only after a delay. Everything else gets no candidates.
    #[derive(Default)]
    struct ScriptedProvider {
        hit_on: Option<&'static str>,
        fail_on: Option<&'static str>,
        slow_on: Option<&'static str>,
        delay_ms: u64,
        hit_all: bool,
    }

    #[async_trait]
    impl SearchProvider for ScriptedProvider {
        async fn search(
            &self,
            query: &str,
            _limit: usize,
        ) -> Result<Vec<EvidenceCandidate>, RetrievalError> {
            if let Some(marker) = self.slow_on {
                if query.contains(marker) {
                    tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
                }
            }
            if let Some(marker) = self.fail_on {
                if query.contains(marker) {
                    return Err(RetrievalError::RateLimited);
                }
            }
            let hit = self.hit_all || self.hit_on.map_or(false, |m| query.contains(m));
            if hit {
                Ok(vec![EvidenceCandidate {
                    title: Some("Source".to_string()),
                    url: Some("http://example.com/source".to_string()),
                    snippet: Some(query.to_string()),
                }])
            } else {
                Ok(vec![])
            }
        }
    }

    struct FixedClassifier(f64);

    #[async_trait]
    impl TextClassifier for FixedClassifier {
        async fn classify(&self, _text: &str) -> Result<f64, ClassifierError> {
            Ok(self.0)
        }
    }

    struct FailingClassifier;

    #[async_trait]
    impl TextClassifier for FailingClassifier {
        async fn classify(&self, _text: &str) -> Result<f64, ClassifierError> {
            Err(ClassifierError::MissingApiKey)
        }
    }

    fn numbered_words(n: usize) -> String {
        (0..n).map(|i| format!("w{:03}", i)).collect::<Vec<_>>().join(" ")
    }

    fn engine(
        dir: &tempfile::TempDir,
        provider: ScriptedProvider,
        classifier: Arc<dyn TextClassifier>,
        options: AnalysisOptions,
    ) -> AnalysisEngine {
        let cache = Arc::new(SearchCache::new(dir.path().join("cache.json"), 24));
        let retriever = Arc::new(EvidenceRetriever::new(
            Arc::new(provider),
            cache,
            options.result_limit,
        ));
        AnalysisEngine::new(retriever, classifier, options)
    }

    #[tokio::test]
    async fn test_empty_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(
            &dir,
            ScriptedProvider::default(),
            Arc::new(FixedClassifier(0.5)),
            AnalysisOptions::default(),
        );
        assert!(matches!(
            engine.analyze("").await,
            Err(AnalysisError::EmptyInput)
        ));
        assert!(matches!(
            engine.analyze("   \n\t  ").await,
            Err(AnalysisError::EmptyInput)
        ));
    }

    #[tokio::test]
    async fn test_one_hit_in_four_fragments_scores_75() {
        // 85 words: windows at 0, 20, 40, 60 are kept, the 5-word tail at 80
        // is dropped. Only the first fragment contains w000.
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(
            &dir,
            ScriptedProvider {
                hit_on: Some("w000"),
                ..ScriptedProvider::default()
            },
            Arc::new(FixedClassifier(0.42)),
            AnalysisOptions::default(),
        );

        let report = engine.analyze(&numbered_words(85)).await.unwrap();
        assert_eq!(report.fragments_total, 4);
        assert_eq!(report.fragments_checked, 4);
        assert_eq!(report.plagiarism_hits, 1);
        assert_eq!(report.originality_percent, 75.0);
        assert_eq!(report.ai_generated_percent, 42.0);
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].similarity_percent, 100.0);
        assert!(report.matches[0].fragment.starts_with("w000"));
    }

    #[tokio::test]
    async fn test_retrieval_failure_skips_only_that_fragment() {
        // 50 words: fragments start at 0, 20, 40. Words w025..w039 appear
        // only in the middle fragment, so failing on w030 isolates it.
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(
            &dir,
            ScriptedProvider {
                fail_on: Some("w030"),
                ..ScriptedProvider::default()
            },
            Arc::new(FixedClassifier(0.1)),
            AnalysisOptions::default(),
        );

        let report = engine.analyze(&numbered_words(50)).await.unwrap();
        assert_eq!(report.fragments_total, 3);
        assert_eq!(report.fragments_checked, 2);
        assert_eq!(report.plagiarism_hits, 0);
        assert_eq!(report.originality_percent, 100.0);
        assert!(report.matches.is_empty());
    }

    #[tokio::test]
    async fn test_matches_preserve_fragment_order() {
        // All three fragments hit; the first one is the slowest to complete.
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(
            &dir,
            ScriptedProvider {
                hit_all: true,
                slow_on: Some("w000"),
                delay_ms: 200,
                ..ScriptedProvider::default()
            },
            Arc::new(FixedClassifier(0.0)),
            AnalysisOptions::default(),
        );

        let report = engine.analyze(&numbered_words(50)).await.unwrap();
        assert_eq!(report.matches.len(), 3);
        assert!(report.matches[0].fragment.starts_with("w000"));
        assert!(report.matches[1].fragment.starts_with("w020"));
        assert!(report.matches[2].fragment.starts_with("w040"));
        assert_eq!(report.originality_percent, 0.0);
    }

    #[tokio::test]
    async fn test_deadline_marks_pending_fragments_unchecked() {
        let dir = tempfile::tempdir().unwrap();
        let options = AnalysisOptions {
            timeout_secs: 1,
            ..AnalysisOptions::default()
        };
        let engine = engine(
            &dir,
            ScriptedProvider {
                hit_all: true,
                slow_on: Some("w0"),
                delay_ms: 10_000,
                ..ScriptedProvider::default()
            },
            Arc::new(FixedClassifier(0.3)),
            options,
        );

        let report = engine.analyze(&numbered_words(25)).await.unwrap();
        assert_eq!(report.fragments_total, 1);
        assert_eq!(report.fragments_checked, 0);
        assert_eq!(report.originality_percent, 100.0);
        assert!(report.matches.is_empty());
        // The concurrent AI score still lands.
        assert_eq!(report.ai_generated_percent, 30.0);
    }

    #[tokio::test]
    async fn test_classifier_failure_downgrades_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(
            &dir,
            ScriptedProvider::default(),
            Arc::new(FailingClassifier),
            AnalysisOptions::default(),
        );

        let report = engine.analyze(&numbered_words(25)).await.unwrap();
        assert_eq!(report.ai_generated_percent, 0.0);
        // Fragment processing was unaffected.
        assert_eq!(report.fragments_checked, 1);
        assert_eq!(report.originality_percent, 100.0);
    }

    #[tokio::test]
    async fn test_short_document_yields_no_fragments_and_full_originality() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(
            &dir,
            ScriptedProvider {
                hit_all: true,
                ..ScriptedProvider::default()
            },
            Arc::new(FixedClassifier(0.2)),
            AnalysisOptions::default(),
        );

        let report = engine.analyze("only five words right here").await.unwrap();
        assert_eq!(report.fragments_total, 0);
        assert_eq!(report.fragments_checked, 0);
        assert_eq!(report.originality_percent, 100.0);
        assert_eq!(report.ai_generated_percent, 20.0);
    }

    #[tokio::test]
    async fn test_percentages_stay_in_range() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(
            &dir,
            ScriptedProvider {
                hit_all: true,
                ..ScriptedProvider::default()
            },
            Arc::new(FixedClassifier(1.0)),
            AnalysisOptions::default(),
        );

        let report = engine.analyze(&numbered_words(200)).await.unwrap();
        assert!((0.0..=100.0).contains(&report.originality_percent));
        assert!((0.0..=100.0).contains(&report.ai_generated_percent));
    }
}
