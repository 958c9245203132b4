use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;

/// Application configuration module
/// This module handles the agent configuration: defaults, an optional JSON file,
/// environment overrides and validation.
/// Represents the agent configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Generative-text provider settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// HTTP control API settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Quality check behaviour
    #[serde(default)]
    pub agent: AgentConfig,

    /// External translation content store
    #[serde(default)]
    pub content: ContentConfig,

    /// Logging
    #[serde(default)]
    pub log: LogConfig,

    /// What to do when a task panics
    #[serde(default)]
    pub fault_policy: FaultPolicy,
}

/// Provider configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmConfig {
    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Model name
    #[serde(default = "default_model")]
    pub model: String,

    // @field: Service URL
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    // @field: Calls allowed per rate window
    #[serde(default = "default_requests_per_window")]
    pub requests_per_window: u32,

    // @field: Rate window length in seconds
    #[serde(default = "default_rate_window_secs")]
    pub rate_window_secs: u64,

    // @field: Sleep after the provider reports throttling
    #[serde(default = "default_rate_limit_backoff_secs")]
    pub rate_limit_backoff_secs: u64,

    // @field: Max tokens in a reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    // @field: Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            endpoint: default_llm_endpoint(),
            requests_per_window: default_requests_per_window(),
            rate_window_secs: default_rate_window_secs(),
            rate_limit_backoff_secs: default_rate_limit_backoff_secs(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl LlmConfig {
    /// Length of the provider rate window
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }

    /// Sleep applied after a throttling error
    pub fn rate_limit_backoff(&self) -> Duration {
        Duration::from_secs(self.rate_limit_backoff_secs)
    }
}

/// Deployment mode, controls how much of an internal error reaches clients
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    #[default]
    Development,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            _ => Err("expected production or development".to_string()),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Development => write!(f, "development"),
        }
    }
}

/// HTTP control API configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub environment: Environment,

    /// The one origin allowed by CORS
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,

    /// Per-IP rate limit window in milliseconds
    #[serde(default = "default_rate_limit_window_ms")]
    pub rate_limit_window_ms: u64,

    /// Requests allowed per IP within one window
    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: u32,

    /// Maximum accepted JSON body size in bytes
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            environment: Environment::default(),
            cors_origin: default_cors_origin(),
            rate_limit_window_ms: default_rate_limit_window_ms(),
            rate_limit_max_requests: default_rate_limit_max_requests(),
            body_limit_bytes: default_body_limit_bytes(),
        }
    }
}

/// Quality check behaviour
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AgentConfig {
    /// Cron expression for periodic runs
    #[serde(default = "default_check_schedule")]
    pub check_schedule: String,

    /// Write enhanced translations back to the content store
    #[serde(default)]
    pub auto_update: bool,

    /// Scores strictly below this are considered failing (0-100)
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,

    /// Records checked together in one chunk
    #[serde(default = "default_max_concurrent_checks")]
    pub max_concurrent_checks: usize,

    /// Pause between chunks in milliseconds
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,

    /// Delay before the first scheduled run
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            check_schedule: default_check_schedule(),
            auto_update: false,
            quality_threshold: default_quality_threshold(),
            max_concurrent_checks: default_max_concurrent_checks(),
            chunk_delay_ms: default_chunk_delay_ms(),
            warmup_secs: default_warmup_secs(),
        }
    }
}

impl AgentConfig {
    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup_secs)
    }
}

/// External content store location
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContentConfig {
    #[serde(default = "default_content_base_url")]
    pub base_url: String,

    #[serde(default = "default_translations_endpoint")]
    pub endpoint: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            base_url: default_content_base_url(),
            endpoint: default_translations_endpoint(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err("expected error, warn, info, debug or trace".to_string()),
        }
    }
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,

    /// Optional log file, rotated by size
    #[serde(default)]
    pub file: Option<String>,

    #[serde(default = "default_log_max_size_mb")]
    pub max_size_mb: u64,

    #[serde(default = "default_log_max_files")]
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            file: None,
            max_size_mb: default_log_max_size_mb(),
            max_files: default_log_max_files(),
        }
    }
}

/// Reaction to a panic anywhere in the process
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FaultPolicy {
    /// Log and trigger a graceful shutdown
    #[default]
    Shutdown,
    /// Log and keep serving
    Continue,
}

impl FromStr for FaultPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shutdown" => Ok(Self::Shutdown),
            "continue" => Ok(Self::Continue),
            _ => Err("expected shutdown or continue".to_string()),
        }
    }
}

fn default_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_llm_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_requests_per_window() -> u32 {
    15
}

fn default_rate_window_secs() -> u64 {
    60
}

fn default_rate_limit_backoff_secs() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.2
}

fn default_port() -> u16 {
    3001
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_rate_limit_window_ms() -> u64 {
    15 * 60 * 1000
}

fn default_rate_limit_max_requests() -> u32 {
    100
}

fn default_body_limit_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_check_schedule() -> String {
    "*/30 * * * *".to_string()
}

fn default_quality_threshold() -> f64 {
    80.0
}

fn default_max_concurrent_checks() -> usize {
    3
}

fn default_chunk_delay_ms() -> u64 {
    1000
}

fn default_warmup_secs() -> u64 {
    30
}

fn default_content_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_translations_endpoint() -> String {
    "/api/translations".to_string()
}

fn default_log_max_size_mb() -> u64 {
    10
}

fn default_log_max_files() -> usize {
    5
}

fn parse_value<T: FromStr>(key: &str, value: &str, expected: &str) -> std::result::Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: expected.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> std::result::Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

fn parse_named<T: FromStr<Err = String>>(key: &str, value: &str) -> std::result::Result<T, ConfigError> {
    value.parse::<T>().map_err(|reason| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason,
    })
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults when the file is absent
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        if !path.exists() {
            log::warn!("Config file not found at '{}', using defaults.", path.display());
            return Ok(Self::default());
        }

        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Override fields from environment-style variables.
    ///
    /// `lookup` returns the raw value of a variable, or `None` when unset. Empty values
    /// count as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> std::result::Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("LLM_API_KEY") {
            self.llm.api_key = v;
        }
        if let Some(v) = get("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("LLM_ENDPOINT") {
            self.llm.endpoint = v;
        }
        if let Some(v) = get("LLM_RATE_LIMIT") {
            self.llm.requests_per_window = parse_value("LLM_RATE_LIMIT", &v, "expected a positive integer")?;
        }
        if let Some(v) = get("LLM_RATE_WINDOW_SECS") {
            self.llm.rate_window_secs = parse_value("LLM_RATE_WINDOW_SECS", &v, "expected seconds")?;
        }
        if let Some(v) = get("LLM_RATE_LIMIT_BACKOFF_SECS") {
            self.llm.rate_limit_backoff_secs = parse_value("LLM_RATE_LIMIT_BACKOFF_SECS", &v, "expected seconds")?;
        }

        if let Some(v) = get("PORT") {
            self.server.port = parse_value("PORT", &v, "expected a port number")?;
        }
        if let Some(v) = get("APP_ENV") {
            self.server.environment = parse_named("APP_ENV", &v)?;
        }
        if let Some(v) = get("CORS_ORIGIN") {
            self.server.cors_origin = v;
        }
        if let Some(v) = get("RATE_LIMIT_WINDOW_MS") {
            self.server.rate_limit_window_ms = parse_value("RATE_LIMIT_WINDOW_MS", &v, "expected milliseconds")?;
        }
        if let Some(v) = get("RATE_LIMIT_MAX_REQUESTS") {
            self.server.rate_limit_max_requests = parse_value("RATE_LIMIT_MAX_REQUESTS", &v, "expected a positive integer")?;
        }

        if let Some(v) = get("CHECK_SCHEDULE") {
            self.agent.check_schedule = v;
        }
        if let Some(v) = get("AUTO_UPDATE") {
            self.agent.auto_update = parse_bool("AUTO_UPDATE", &v)?;
        }
        if let Some(v) = get("QUALITY_THRESHOLD") {
            self.agent.quality_threshold = parse_value("QUALITY_THRESHOLD", &v, "expected a number between 0 and 100")?;
        }
        if let Some(v) = get("MAX_CONCURRENT_CHECKS") {
            self.agent.max_concurrent_checks = parse_value("MAX_CONCURRENT_CHECKS", &v, "expected a positive integer")?;
        }
        if let Some(v) = get("CHUNK_DELAY_MS") {
            self.agent.chunk_delay_ms = parse_value("CHUNK_DELAY_MS", &v, "expected milliseconds")?;
        }
        if let Some(v) = get("WARMUP_SECS") {
            self.agent.warmup_secs = parse_value("WARMUP_SECS", &v, "expected seconds")?;
        }

        if let Some(v) = get("CONTENT_API_URL") {
            self.content.base_url = v;
        }
        if let Some(v) = get("TRANSLATIONS_ENDPOINT") {
            self.content.endpoint = v;
        }

        if let Some(v) = get("LOG_LEVEL") {
            self.log.level = parse_named("LOG_LEVEL", &v)?;
        }
        if let Some(v) = get("LOG_FILE") {
            self.log.file = Some(v);
        }
        if let Some(v) = get("LOG_MAX_SIZE_MB") {
            self.log.max_size_mb = parse_value("LOG_MAX_SIZE_MB", &v, "expected megabytes")?;
        }
        if let Some(v) = get("LOG_MAX_FILES") {
            self.log.max_files = parse_value("LOG_MAX_FILES", &v, "expected a count")?;
        }

        if let Some(v) = get("FAULT_POLICY") {
            self.fault_policy = parse_named("FAULT_POLICY", &v)?;
        }

        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let threshold = self.agent.quality_threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ConfigError::OutOfRange(format!(
                "Quality threshold must be between 0 and 100, got {}",
                threshold
            )));
        }
        if self.agent.max_concurrent_checks == 0 {
            return Err(ConfigError::OutOfRange("Max concurrent checks must be at least 1".to_string()));
        }
        if self.llm.requests_per_window == 0 {
            return Err(ConfigError::OutOfRange("LLM rate limit must allow at least 1 request".to_string()));
        }
        if self.llm.rate_window_secs == 0 {
            return Err(ConfigError::OutOfRange("LLM rate window must be longer than zero".to_string()));
        }
        if self.server.rate_limit_max_requests == 0 || self.server.rate_limit_window_ms == 0 {
            return Err(ConfigError::OutOfRange("API rate limit window and request count must be positive".to_string()));
        }
        if url::Url::parse(&self.content.base_url).is_err() {
            return Err(ConfigError::InvalidValue {
                key: "CONTENT_API_URL".to_string(),
                value: self.content.base_url.clone(),
                reason: "expected an absolute URL".to_string(),
            });
        }
        Ok(())
    }

    /// Configuration as shown to API clients, with the credential masked
    pub fn redacted(&self) -> serde_json::Value {
        let mut copy = self.clone();
        if !copy.llm.api_key.is_empty() {
            copy.llm.api_key = "********".to_string();
        }
        serde_json::to_value(copy).unwrap_or(serde_json::Value::Null)
    }
}
