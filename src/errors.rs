/*!
 * Error types for the tqagent application.
 *
 * This module contains custom error types for the different parts of the agent,
 * using the thiserror crate for ergonomic error definitions. HTTP-facing errors
 * live in `ApiError`, which knows how to render itself as a JSON response.
 */

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether this error means the provider is throttling us.
    ///
    /// Providers are not consistent about how they report throttling, so besides the
    /// dedicated variant the message text is checked for the usual wording.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code: 429, .. } => true,
            other => crate::quality::looks_like_rate_limit(&other.to_string()),
        }
    }
}

/// Errors raised while talking to the external translation content store
#[derive(Error, Debug)]
pub enum ContentSourceError {
    /// Transport-level failure (connect, timeout, TLS)
    #[error("Content source request failed: {0}")]
    Request(String),

    /// The content store answered with a non-success status
    #[error("Content source responded with {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// The response body was not the expected JSON
    #[error("Failed to decode content source response: {0}")]
    Decode(String),

    /// The configured base URL or endpoint could not be combined into a URL
    #[error("Invalid content source URL: {0}")]
    InvalidUrl(String),
}

/// Errors that make a single quality assessment unusable
#[derive(Error, Debug)]
pub enum AssessmentError {
    /// The model reply did not contain a JSON object
    #[error("No valid JSON found in response")]
    NoJsonFound,

    /// A JSON object was found but could not be decoded
    #[error("Invalid JSON in response: {0}")]
    InvalidJson(String),

    /// The decoded object lacks a required field
    #[error("Response is missing required field: {0}")]
    MissingField(&'static str),

    /// The provider call itself failed
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Invalid configuration values
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    /// A value could not be parsed from its textual form
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        /// Variable or field name
        key: String,
        /// Offending raw value
        value: String,
        /// What was expected
        reason: String,
    },

    /// A value parsed but is outside its allowed range
    #[error("{0}")]
    OutOfRange(String),
}

/// Errors surfaced at the HTTP control API boundary
#[derive(Error, Debug)]
pub enum ApiError {
    /// Input validation failed
    #[error("{0}")]
    BadRequest(String),

    /// No such route
    #[error("Not found")]
    NotFound,

    /// Request body exceeded the configured cap
    #[error("Request body too large")]
    PayloadTooLarge,

    /// Anything unexpected while serving the request
    #[error("{message}")]
    Internal {
        /// Raw error message
        message: String,
        /// Whether the raw message may be shown to the client
        expose: bool,
    },
}

/// Message returned for 500 responses when the raw error must not leak.
pub const GENERIC_INTERNAL_MESSAGE: &str = "Internal server error";

impl ApiError {
    /// Status code this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message to place in the response body
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal { expose: false, .. } => GENERIC_INTERNAL_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal { message, .. } = &self {
            log::error!("Request failed: {}", message);
        }
        let body = json!({ "success": false, "error": self.public_message() });
        (self.status(), Json(body)).into_response()
    }
}
