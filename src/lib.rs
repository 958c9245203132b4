/*!
 * # tqagent - Translation Quality Agent
 *
 * A background service that keeps the Sinhala and Tamil translations of a Sri
 * Lankan marine education website honest.
 *
 * ## Features
 *
 * - Periodically fetch every translation record from the content store
 * - Ask a generative-text model to score each English/Sinhala/Tamil triple
 * - Optionally write enhanced translations back when the score is too low
 * - Keep running statistics and a bounded history of batch runs
 * - Expose a small HTTP control API for health, stats and on-demand checks
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management (defaults, JSON file, environment)
 * - `logging`: stderr logger with an optional size-rotated log file
 * - `rate_limiter`: fixed-window request limiters
 * - `concurrency`: chunked concurrent processing
 * - `providers`: generative-text clients:
 *   - `providers::anthropic`: Anthropic Messages API client
 *   - `providers::mock`: scripted provider for tests
 * - `quality`: assessment model, reply parsing, prompts, stats and the assessor
 * - `content_source`: REST client for the translation content store
 * - `orchestrator`: batch runs over the whole content store
 * - `scheduler`: cron-driven periodic runs
 * - `server`: the HTTP control API
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod concurrency;
pub mod content_source;
pub mod errors;
pub mod logging;
pub mod orchestrator;
pub mod providers;
pub mod quality;
pub mod rate_limiter;
pub mod scheduler;
pub mod server;

// Re-export main types for easier usage
pub use app_config::Config;
pub use content_source::{ContentSource, HttpContentSource, TranslationUpdate};
pub use errors::{ApiError, AssessmentError, ContentSourceError, ProviderError};
pub use orchestrator::{BatchOrchestrator, OrchestratorSettings, RunOutcome};
pub use quality::{AssessmentResult, QualityAssessor, TranslationRecord};
pub use scheduler::Scheduler;
pub use server::{build_router, AppState};
