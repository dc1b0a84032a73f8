// External Capability Providers
// Google Custom Search retrieval and Sapling-style AI-text classification

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::env;
use thiserror::Error;

use crate::models::EvidenceCandidate;
use crate::services::config_store::AppConfig;

const SEARCH_DEFAULT_URL: &str = "https://www.googleapis.com/customsearch/v1";
const AIDETECT_DEFAULT_URL: &str = "https://api.sapling.ai/api/v1/aidetect";

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("search API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("search rate limit exceeded (HTTP 429)")]
    RateLimited,
    #[error("search credentials not configured")]
    MissingCredentials,
}

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("classifier API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("classifier API key not configured")]
    MissingApiKey,
    #[error("malformed classifier response: {0}")]
    InvalidResponse(String),
}

/// External web-search capability consumed by the evidence retriever.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<EvidenceCandidate>, RetrievalError>;
}

/// External machine-text classification capability.
/// Returns the probability in [0, 1] that the text is machine-generated.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<f64, ClassifierError>;
}

fn http_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .unwrap_or_default()
}

// ============ Google Custom Search ============

pub struct GoogleSearchClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    engine_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
}

impl GoogleSearchClient {
    pub fn new(api_key: Option<String>, engine_id: Option<String>) -> Self {
        let endpoint =
            env::var("VERITEXT_SEARCH_URL").unwrap_or_else(|_| SEARCH_DEFAULT_URL.to_string());
        Self {
            client: http_client(),
            endpoint,
            api_key,
            engine_id,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let api_key =
            get_api_key("google").or_else(|| config.api_keys.get("google").cloned());
        let engine_id = env::var("GOOGLE_CSE_ID")
            .or_else(|_| env::var("VERITEXT_GOOGLE_CSE_ID"))
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| config.search.engine_id.clone());

        let mut client = Self::new(api_key, engine_id);
        if let Some(ref endpoint) = config.search.endpoint {
            client.endpoint = endpoint.clone();
        }
        client
    }
}

#[async_trait]
impl SearchProvider for GoogleSearchClient {
    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<EvidenceCandidate>, RetrievalError> {
        let (api_key, engine_id) = match (&self.api_key, &self.engine_id) {
            (Some(k), Some(cx)) => (k, cx),
            _ => return Err(RetrievalError::MissingCredentials),
        };

        let num = limit.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", api_key.as_str()),
                ("cx", engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(RetrievalError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: SearchResponse = response.json().await?;

        let results = data
            .items
            .into_iter()
            .map(|item| EvidenceCandidate {
                title: item.title,
                url: item.link,
                snippet: item.snippet,
            })
            .collect();

        Ok(results)
    }
}

// ============ Sapling AI Detection ============

pub struct SaplingClassifier {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AiDetectResponse {
    #[serde(default)]
    ai_probability: Option<f64>,
}

impl SaplingClassifier {
    pub fn new(api_key: Option<String>) -> Self {
        let endpoint =
            env::var("VERITEXT_AIDETECT_URL").unwrap_or_else(|_| AIDETECT_DEFAULT_URL.to_string());
        Self {
            client: http_client(),
            endpoint,
            api_key,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let api_key =
            get_api_key("sapling").or_else(|| config.api_keys.get("sapling").cloned());
        let mut client = Self::new(api_key);
        if let Some(ref endpoint) = config.classifier.endpoint {
            client.endpoint = endpoint.clone();
        }
        client
    }
}

#[async_trait]
impl TextClassifier for SaplingClassifier {
    async fn classify(&self, text: &str) -> Result<f64, ClassifierError> {
        let api_key = self.api_key.as_ref().ok_or(ClassifierError::MissingApiKey)?;

        let payload = serde_json::json!({
            "key": api_key,
            "text": text,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: AiDetectResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::InvalidResponse(e.to_string()))?;

        let prob = data.ai_probability.unwrap_or(0.0);
        Ok(prob.clamp(0.0, 1.0))
    }
}

/// Get API key from environment or config file
pub fn get_api_key(provider: &str) -> Option<String> {
    // Try environment variables first
    let env_keys = match provider {
        "google" => vec!["GOOGLE_API_KEY", "VERITEXT_GOOGLE_API_KEY"],
        "sapling" => vec!["SAPLING_API_KEY", "VERITEXT_SAPLING_API_KEY"],
        _ => vec![],
    };

    for key in env_keys {
        if let Ok(val) = env::var(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }

    // Try config file
    if let Some(config_dir) = super::ConfigStore::default_config_dir() {
        let store = super::ConfigStore::new(config_dir);
        if let Ok(Some(key)) = store.get_api_key(provider) {
            return Some(key);
        }
    }

    None
}
