// Evidence Retriever
// Cache-or-fetch lookup of external search evidence for a fragment

use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::EvidenceCandidate;
use crate::services::providers::{RetrievalError, SearchProvider};
use crate::services::search_cache::SearchCache;

pub struct EvidenceRetriever {
    provider: Arc<dyn SearchProvider>,
    cache: Arc<SearchCache>,
    result_limit: usize,
}

impl EvidenceRetriever {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        cache: Arc<SearchCache>,
        result_limit: usize,
    ) -> Self {
        Self {
            provider,
            cache,
            result_limit,
        }
    }

    /// Return evidence candidates for the query, relevance-ordered.
    ///
    /// A fresh cache hit is returned verbatim with no network call. Provider
    /// errors propagate typed to the caller and are never cached, so a
    /// transient miss does not become a permanent empty result.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<EvidenceCandidate>, RetrievalError> {
        if let Some(hit) = self.cache.get(query) {
            debug!(results = hit.len(), "search cache hit");
            return Ok(hit);
        }

        let results = self.provider.search(query, self.result_limit).await?;

        if let Err(e) = self.cache.set(query, &results) {
            // Retrieval still succeeded; the result just stays uncached.
            warn!("search cache write failed: {}", e);
        }

        debug!(results = results.len(), "search results retrieved");
        Ok(results)
    }
}
