/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Always answers with a well-formed assessment
 * - `MockProvider::no_json()` - Answers with prose only
 * - `MockProvider::failing()` - Always fails with an API error
 * - `MockProvider::rate_limited()` - Always fails with a throttling error
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use super::{CompletionRequest, CompletionResponse, Provider};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with an assessment JSON
    Working,
    /// Succeeds but the reply carries no JSON object
    NoJson,
    /// Succeeds with JSON that lacks the enhanced translation
    MissingFields,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Always fails with a rate-limit error
    RateLimited,
    /// Simulates slow response
    Slow { delay_ms: u64 },
}

/// Mock provider for testing assessment behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Score reported by well-formed replies
    score: f64,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Last request received
    last_request: Arc<Mutex<Option<CompletionRequest>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&CompletionRequest) -> String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            score: 90.0,
            request_count: Arc::new(AtomicUsize::new(0)),
            last_request: Arc::new(Mutex::new(None)),
            custom_response: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a mock whose replies contain no JSON
    pub fn no_json() -> Self {
        Self::new(MockBehavior::NoJson)
    }

    /// Create a mock whose replies lack required fields
    pub fn missing_fields() -> Self {
        Self::new(MockBehavior::MissingFields)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that is always throttled
    pub fn rate_limited() -> Self {
        Self::new(MockBehavior::RateLimited)
    }

    /// Create a mock that answers after a delay
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Set the score reported by well-formed replies
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&CompletionRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of completions requested so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// The most recent request, if any
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().clone()
    }

    /// A well-formed assessment reply wrapped in a little prose, the way models tend to answer
    pub fn assessment_reply(score: f64, sinhala: &str, tamil: &str) -> String {
        let body = json!({
            "qualityScore": score,
            "issues": [{
                "category": "terminology",
                "severity": "minor",
                "original": "කොරල්",
                "suggestion": "කොරල් පර",
                "explanation": "Use the full term for coral reef"
            }],
            "enhancedTranslation": { "sinhala": sinhala, "tamil": tamil },
            "summary": "Mostly accurate"
        });
        format!("Here is my assessment:\n```json\n{}\n```\nLet me know if you need more.", body)
    }

    fn reply(&self, request: &CompletionRequest) -> String {
        match self.custom_response {
            Some(generator) => generator(request),
            None => Self::assessment_reply(self.score, "සිංහල (වැඩිදියුණු කළ)", "தமிழ் (மேம்படுத்தப்பட்டது)"),
        }
    }

    fn ok(&self, text: String) -> Result<CompletionResponse, ProviderError> {
        Ok(CompletionResponse {
            text,
            model: "mock-model".to_string(),
            input_tokens: Some(10),
            output_tokens: Some(10),
        })
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            score: self.score,
            request_count: Arc::clone(&self.request_count),
            last_request: Arc::clone(&self.last_request),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock() = Some(request.clone());

        match self.behavior {
            MockBehavior::Working => self.ok(self.reply(&request)),

            MockBehavior::NoJson => self.ok("I could not assess this translation, sorry.".to_string()),

            MockBehavior::MissingFields => self.ok(r#"{"qualityScore": 70, "issues": []}"#.to_string()),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    self.ok(self.reply(&request))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::RateLimited => Err(ProviderError::RateLimitExceeded(
                "429 Too Many Requests".to_string(),
            )),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                self.ok(self.reply(&request))
            }
        }
    }
}
