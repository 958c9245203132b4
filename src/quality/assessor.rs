/*!
 * The quality assessor: one rate-limited provider call per translation record.
 *
 * `assess` never returns an error. Transport failures, unusable replies and
 * throttling all come back as an `AssessmentResult` with `success: false`, so
 * callers can fan out over many records without error plumbing.
 */

use chrono::Utc;
use log::{debug, error, warn};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::app_config::Config;
use crate::concurrency::process_in_chunks;
use crate::errors::AssessmentError;
use crate::providers::{CompletionRequest, Provider};
use crate::rate_limiter::RateLimiter;

use super::extract::parse_analysis;
use super::model::{AssessmentMetadata, AssessmentResult, TranslationRecord};
use super::prompts::{build_user_message, QUALITY_REVIEWER};
use super::stats::AssessorStats;

static RATE_LIMIT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b429\b|rate[ _-]?limit|too many requests|quota|resource has been exhausted")
        .expect("rate limit pattern is valid")
});

/// Whether an error message reads like provider throttling
pub fn looks_like_rate_limit(message: &str) -> bool {
    RATE_LIMIT_PATTERN.is_match(message)
}

/// Tunables for the assessor
#[derive(Debug, Clone)]
pub struct AssessorSettings {
    /// Provider calls allowed per window
    pub requests_per_window: u32,
    pub rate_window: Duration,
    /// Sleep after a throttling error before reporting the failure
    pub rate_limit_backoff: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Records assessed together by `assess_batch`
    pub batch_size: usize,
    /// Pause between `assess_batch` chunks
    pub batch_delay: Duration,
}

impl Default for AssessorSettings {
    fn default() -> Self {
        Self {
            requests_per_window: 15,
            rate_window: Duration::from_secs(60),
            rate_limit_backoff: Duration::from_secs(60),
            max_tokens: 2048,
            temperature: 0.2,
            batch_size: 3,
            batch_delay: Duration::from_secs(1),
        }
    }
}

impl AssessorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            requests_per_window: config.llm.requests_per_window,
            rate_window: config.llm.rate_window(),
            rate_limit_backoff: config.llm.rate_limit_backoff(),
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
            batch_size: config.agent.max_concurrent_checks,
            batch_delay: config.agent.chunk_delay(),
        }
    }
}

/// Rate-limited translation quality assessor
#[derive(Debug)]
pub struct QualityAssessor {
    provider: Arc<dyn Provider>,
    limiter: RateLimiter,
    stats: Mutex<AssessorStats>,
    settings: AssessorSettings,
}

impl QualityAssessor {
    pub fn new(provider: Arc<dyn Provider>, settings: AssessorSettings) -> Self {
        Self {
            limiter: RateLimiter::new(settings.requests_per_window, settings.rate_window),
            provider,
            stats: Mutex::new(AssessorStats::default()),
            settings,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Model identifier of the underlying provider
    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Copy of the call counters
    pub fn stats(&self) -> AssessorStats {
        self.stats.lock().clone()
    }

    pub fn settings(&self) -> &AssessorSettings {
        &self.settings
    }

    /// Assess one translation. Empty texts are forwarded as-is.
    pub async fn assess(
        &self,
        english: &str,
        sinhala: &str,
        tamil: &str,
        context: Option<&str>,
    ) -> AssessmentResult {
        self.limiter.acquire().await;
        self.stats.lock().record_attempt();

        let request = CompletionRequest::new(QUALITY_REVIEWER, build_user_message(english, sinhala, tamil, context))
            .max_tokens(self.settings.max_tokens)
            .temperature(self.settings.temperature);

        let started = Instant::now();
        let outcome = match self.provider.complete(request).await {
            Ok(response) => parse_analysis(&response.text).map(|analysis| (analysis, response.model)),
            Err(e) => Err(AssessmentError::from(e)),
        };
        let response_time = started.elapsed().as_millis() as u64;

        self.stats.lock().record_outcome(outcome.is_ok(), response_time);

        match outcome {
            Ok((analysis, model)) => {
                debug!(
                    "Assessed '{}' in {}ms: score {}, {} issue(s)",
                    truncate(english, 40),
                    response_time,
                    analysis.quality_score,
                    analysis.issues.len()
                );
                AssessmentResult::succeeded(analysis, self.metadata(response_time, model))
            }
            Err(err) => {
                error!("Quality assessment failed for '{}': {}", truncate(english, 40), err);

                let throttled = match &err {
                    AssessmentError::Provider(provider_error) => provider_error.is_rate_limit(),
                    _ => false,
                };
                if throttled {
                    self.stats.lock().rate_limit_hits += 1;
                    warn!("Provider rate limit hit, backing off for {:?}", self.settings.rate_limit_backoff);
                    tokio::time::sleep(self.settings.rate_limit_backoff).await;
                }

                AssessmentResult::failed(err.to_string(), self.metadata(response_time, self.provider.model().to_string()))
            }
        }
    }

    /// Assess a stored record
    pub async fn assess_record(&self, record: &TranslationRecord) -> AssessmentResult {
        self.assess(&record.english, &record.sinhala, &record.tamil, record.context.as_deref())
            .await
    }

    /// Assess many records in fixed-size concurrent chunks; results keep input order
    pub async fn assess_batch(&self, records: Vec<TranslationRecord>) -> Vec<AssessmentResult> {
        let run = process_in_chunks(records, self.settings.batch_size, self.settings.batch_delay, |record| async move {
            self.assess_record(&record).await
        })
        .await;
        run.results
    }

    fn metadata(&self, response_time: u64, model: String) -> AssessmentMetadata {
        AssessmentMetadata {
            response_time,
            model,
            timestamp: Utc::now(),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}
