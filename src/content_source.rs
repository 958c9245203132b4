/*!
 * Access to the external translation content store.
 *
 * The store exposes a translations collection with two operations:
 * - `GET {collection}/all` returns every translation record
 * - `PUT {collection}/{id}` accepts a partial update of one record
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;
use url::Url;

use crate::app_config::ContentConfig;
use crate::errors::ContentSourceError;
use crate::quality::{Issue, QualityAnalysis, TranslationRecord};

/// Timeout for fetching the full collection
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for a single record update
pub const UPDATE_TIMEOUT: Duration = Duration::from_secs(15);

/// Partial update written back after a failing assessment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranslationUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sinhala: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tamil: Option<String>,
    pub quality_score: f64,
    pub quality_issues: Vec<Issue>,
    pub last_quality_check: DateTime<Utc>,
    pub auto_enhanced: bool,
}

impl TranslationUpdate {
    /// Build the write-back payload from an analysis; blank enhanced texts are left out
    pub fn from_analysis(analysis: &QualityAnalysis) -> Self {
        let keep = |text: &Option<String>| text.clone().filter(|t| !t.trim().is_empty());
        Self {
            sinhala: keep(&analysis.enhanced_translation.sinhala),
            tamil: keep(&analysis.enhanced_translation.tamil),
            quality_score: analysis.quality_score,
            quality_issues: analysis.issues.clone(),
            last_quality_check: Utc::now(),
            auto_enhanced: true,
        }
    }
}

/// Source of translation records and sink for corrections
#[async_trait]
pub trait ContentSource: Send + Sync + Debug {
    /// Fetch every translation record
    async fn fetch_all(&self) -> Result<Vec<TranslationRecord>, ContentSourceError>;

    /// Apply a partial update to one record
    async fn update(&self, id: &str, update: &TranslationUpdate) -> Result<(), ContentSourceError>;
}

/// Collection payloads seen in the wild: a bare array or an envelope
#[derive(Deserialize)]
#[serde(untagged)]
enum CollectionPayload {
    Bare(Vec<TranslationRecord>),
    Translations { translations: Vec<TranslationRecord> },
    Data { data: Vec<TranslationRecord> },
}

impl CollectionPayload {
    fn into_records(self) -> Vec<TranslationRecord> {
        match self {
            Self::Bare(records) => records,
            Self::Translations { translations } => translations,
            Self::Data { data } => data,
        }
    }
}

/// REST client for the content store
#[derive(Debug, Clone)]
pub struct HttpContentSource {
    client: Client,
    collection_url: Url,
    fetch_timeout: Duration,
    update_timeout: Duration,
}

impl HttpContentSource {
    /// Create a client for `{base_url}{endpoint}`
    pub fn new(base_url: &str, endpoint: &str) -> Result<Self, ContentSourceError> {
        let joined = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );
        let collection_url = Url::parse(joined.trim_end_matches('/'))
            .map_err(|e| ContentSourceError::InvalidUrl(format!("{}: {}", joined, e)))?;
        if collection_url.cannot_be_a_base() {
            return Err(ContentSourceError::InvalidUrl(joined));
        }

        Ok(Self {
            client: Client::builder()
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .unwrap_or_default(),
            collection_url,
            fetch_timeout: FETCH_TIMEOUT,
            update_timeout: UPDATE_TIMEOUT,
        })
    }

    pub fn from_config(config: &ContentConfig) -> Result<Self, ContentSourceError> {
        Self::new(&config.base_url, &config.endpoint)
    }

    /// Override the per-call timeouts
    pub fn with_timeouts(mut self, fetch: Duration, update: Duration) -> Self {
        self.fetch_timeout = fetch;
        self.update_timeout = update;
        self
    }

    pub fn collection_url(&self) -> &Url {
        &self.collection_url
    }

    /// URL of a child resource of the collection, with the segment percent-encoded
    pub fn child_url(&self, segment: &str) -> Result<Url, ContentSourceError> {
        let mut url = self.collection_url.clone();
        url.path_segments_mut()
            .map_err(|_| ContentSourceError::InvalidUrl(self.collection_url.to_string()))?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }

    async fn error_for_status(response: reqwest::Response) -> ContentSourceError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        ContentSourceError::Status {
            status,
            body: body.chars().take(500).collect(),
        }
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn fetch_all(&self) -> Result<Vec<TranslationRecord>, ContentSourceError> {
        let url = self.child_url("all")?;
        debug!("Fetching translations from {}", url);

        let response = self.client.get(url)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| ContentSourceError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_for_status(response).await);
        }

        let payload = response.json::<CollectionPayload>().await
            .map_err(|e| ContentSourceError::Decode(e.to_string()))?;
        let records = payload.into_records();
        info!("Fetched {} translation record(s)", records.len());
        Ok(records)
    }

    async fn update(&self, id: &str, update: &TranslationUpdate) -> Result<(), ContentSourceError> {
        let url = self.child_url(id)?;
        debug!("Writing enhanced translation to {}", url);

        let response = self.client.put(url)
            .timeout(self.update_timeout)
            .json(update)
            .send()
            .await
            .map_err(|e| ContentSourceError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_for_status(response).await);
        }
        Ok(())
    }
}
