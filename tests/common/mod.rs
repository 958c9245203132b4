/*!
 * Common test utilities for the tqagent test suite
 */

use async_trait::async_trait;
use axum::Router;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tqagent::app_config::Config;
use tqagent::content_source::{ContentSource, TranslationUpdate};
use tqagent::errors::ContentSourceError;
use tqagent::orchestrator::{BatchOrchestrator, OrchestratorSettings};
use tqagent::providers::mock::MockProvider;
use tqagent::quality::{AssessorSettings, QualityAssessor, TranslationRecord};
use tqagent::scheduler::Scheduler;
use tqagent::server::AppState;

/// Cron expression that never fires during a test run
pub const DISTANT_SCHEDULE: &str = "0 0 1 1 *";

/// In-memory content store that counts every call
#[derive(Debug, Default)]
pub struct InMemorySource {
    records: Mutex<Vec<TranslationRecord>>,
    updates: Mutex<Vec<(String, TranslationUpdate)>>,
    fetch_calls: AtomicUsize,
    fail_fetch: bool,
    fail_update: bool,
    panic_on_fetch: bool,
    fetch_delay: Option<Duration>,
}

impl InMemorySource {
    pub fn with_records(records: Vec<TranslationRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    /// A store whose collection endpoint is down
    pub fn unreachable() -> Self {
        Self {
            fail_fetch: true,
            ..Default::default()
        }
    }

    /// A store that serves records but rejects every update
    pub fn rejecting_updates(records: Vec<TranslationRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            fail_update: true,
            ..Default::default()
        }
    }

    /// A store whose fetch panics, to exercise fault handling
    pub fn panicking() -> Self {
        Self {
            panic_on_fetch: true,
            ..Default::default()
        }
    }

    /// Delay every fetch, to keep a run in flight
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> Vec<(String, TranslationUpdate)> {
        self.updates.lock().clone()
    }
}

#[async_trait]
impl ContentSource for InMemorySource {
    async fn fetch_all(&self) -> Result<Vec<TranslationRecord>, ContentSourceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        if self.panic_on_fetch {
            panic!("content store client crashed");
        }
        if self.fail_fetch {
            return Err(ContentSourceError::Request("connection refused".to_string()));
        }
        Ok(self.records.lock().clone())
    }

    async fn update(&self, id: &str, update: &TranslationUpdate) -> Result<(), ContentSourceError> {
        if self.fail_update {
            return Err(ContentSourceError::Status { status: 500, body: format!("update of {} rejected", id) });
        }
        self.updates.lock().push((id.to_string(), update.clone()));
        Ok(())
    }
}

/// `count` marine-themed translation records with ids `t0`, `t1`, ...
pub fn marine_records(count: usize) -> Vec<TranslationRecord> {
    let samples = [
        ("Coral reef", "කොරල් පරය", "பவளப்பாறை"),
        ("Sea turtle", "මුහුදු කැස්බෑවා", "கடல் ஆமை"),
        ("Mangrove forest", "කඩොලාන වනාන්තරය", "சதுப்புநில காடு"),
        ("Blue whale", "නිල් තල්මසා", "நீலத் திமிங்கலம்"),
    ];
    (0..count)
        .map(|i| {
            let (english, sinhala, tamil) = samples[i % samples.len()];
            TranslationRecord::new(format!("t{}", i), english, sinhala, tamil).with_context("species-page")
        })
        .collect()
}

/// Assessor settings without pauses, for fast tests
pub fn fast_assessor_settings() -> AssessorSettings {
    AssessorSettings {
        requests_per_window: 1000,
        rate_window: Duration::from_secs(60),
        rate_limit_backoff: Duration::from_millis(10),
        batch_delay: Duration::ZERO,
        ..Default::default()
    }
}

pub fn assessor(provider: MockProvider) -> Arc<QualityAssessor> {
    Arc::new(QualityAssessor::new(Arc::new(provider), fast_assessor_settings()))
}

pub fn orchestrator_settings(auto_update: bool, quality_threshold: f64) -> OrchestratorSettings {
    OrchestratorSettings {
        auto_update,
        quality_threshold,
        max_concurrent: 3,
        chunk_delay: Duration::ZERO,
    }
}

pub fn orchestrator(
    provider: MockProvider,
    source: Arc<InMemorySource>,
    settings: OrchestratorSettings,
) -> Arc<BatchOrchestrator> {
    Arc::new(BatchOrchestrator::new(assessor(provider), source, settings))
}

/// Configuration used by the API tests
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.agent.check_schedule = DISTANT_SCHEDULE.to_string();
    config.server.rate_limit_max_requests = 1000;
    config
}

/// Application state around a mock provider and an in-memory store
pub fn app_state(provider: MockProvider, source: Arc<InMemorySource>, config: Config) -> AppState {
    let orchestrator = orchestrator(provider, source, orchestrator_settings(false, 80.0));
    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&orchestrator),
        config.agent.check_schedule.clone(),
        config.agent.warmup(),
    ));
    AppState::new(orchestrator, scheduler, Arc::new(config))
}

/// Serve `router` on an ephemeral local port
pub async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Route logger output through env_logger when RUST_LOG is set
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
