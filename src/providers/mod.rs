/*!
 * Provider implementations for the generative-text endpoint.
 *
 * This module contains client implementations the quality assessor can talk to:
 * - Anthropic: Anthropic Messages API integration
 * - Mock: scripted provider for tests and dry runs
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// A single-turn completion request: one system instruction and one user message
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System instruction
    pub system: String,
    /// The user message
    pub user: String,
    /// Maximum number of tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Create a request with default generation settings
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 2048,
            temperature: None,
        }
    }

    /// Set the maximum tokens
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Free-text reply from a provider
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Concatenated text of the reply
    pub text: String,
    /// Model that produced the reply
    pub model: String,
    /// Prompt tokens, when reported
    pub input_tokens: Option<u64>,
    /// Completion tokens, when reported
    pub output_tokens: Option<u64>,
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably behind an `Arc<dyn Provider>`.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Short provider name for logs and metadata
    fn name(&self) -> &str;

    /// Model identifier used for requests
    fn model(&self) -> &str;

    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<CompletionResponse, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;
}

pub mod anthropic;
pub mod mock;
