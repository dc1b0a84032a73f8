// AI Likelihood Scorer
// Whole-document machine-text probability via the classification capability

use std::sync::Arc;
use tracing::debug;

use crate::services::providers::{ClassifierError, TextClassifier};

/// Maximum input accepted by the classification API, in Unicode scalars.
const CLASSIFIER_MAX_CHARS: usize = 8000;

#[derive(Clone)]
pub struct AiLikelihoodScorer {
    classifier: Arc<dyn TextClassifier>,
}

impl AiLikelihoodScorer {
    pub fn new(classifier: Arc<dyn TextClassifier>) -> Self {
        Self { classifier }
    }

    /// Score the text as a percent in [0, 100], rounded to 2 decimals.
    ///
    /// Input longer than the classifier's maximum is truncated to its leading
    /// window. Errors propagate typed; the orchestrator downgrades them to 0.0
    /// so AI scoring never aborts an analysis.
    pub async fn score(&self, text: &str) -> Result<f64, ClassifierError> {
        let window: String = text.chars().take(CLASSIFIER_MAX_CHARS).collect();
        if window.len() < text.len() {
            debug!(
                original_chars = text.chars().count(),
                window_chars = CLASSIFIER_MAX_CHARS,
                "classifier input truncated"
            );
        }

        let prob = self.classifier.classify(&window).await?;
        Ok((prob.clamp(0.0, 1.0) * 100.0 * 100.0).round() / 100.0)
    }
}
