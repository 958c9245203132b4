/*!
 * Batch orchestration of quality checks.
 *
 * One batch run fetches every translation record from the content store, assesses
 * them in fixed-size concurrent chunks, folds the outcomes into the running stats,
 * optionally writes enhanced translations back, and records a run summary in the
 * bounded history. Only one run can be in flight at a time.
 */

use log::{error, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::app_config::Config;
use crate::concurrency::process_in_chunks;
use crate::content_source::{ContentSource, TranslationUpdate};
use crate::quality::{AgentStats, AssessmentResult, QualityAssessor, RunSummary, StatsSnapshot, TranslationRecord};

/// Per-record results returned to the caller of a run
pub const RESULTS_PREVIEW_LEN: usize = 10;

/// Orchestrator behaviour
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Write enhanced translations back to the content store
    pub auto_update: bool,
    /// Scores strictly below this trigger a write-back
    pub quality_threshold: f64,
    /// Records assessed together
    pub max_concurrent: usize,
    /// Pause between chunks
    pub chunk_delay: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            auto_update: false,
            quality_threshold: 80.0,
            max_concurrent: 3,
            chunk_delay: Duration::from_secs(1),
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            auto_update: config.agent.auto_update,
            quality_threshold: config.agent.quality_threshold,
            max_concurrent: config.agent.max_concurrent_checks,
            chunk_delay: config.agent.chunk_delay(),
        }
    }
}

/// Whether an assessment should overwrite the stored translation
pub fn should_write_back(result: &AssessmentResult, quality_threshold: f64, auto_update: bool) -> bool {
    auto_update && result.success && result.score().is_some_and(|score| score < quality_threshold)
}

/// Outcome of checking one record during a run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordCheck {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub result: AssessmentResult,
    pub auto_fixed: bool,
}

/// Result of `run_quality_check`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub success: bool,
    pub message: String,
    /// Set when another run was already in progress
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
    /// The first few per-record results
    pub results: Vec<RecordCheck>,
}

impl RunOutcome {
    fn skipped() -> Self {
        Self {
            success: false,
            message: "Quality check already in progress".to_string(),
            skipped: true,
            stats: None,
            summary: None,
            results: Vec::new(),
        }
    }
}

/// Clears the running flag when a run ends, however it ends
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs batch quality checks and owns the agent statistics
#[derive(Debug)]
pub struct BatchOrchestrator {
    assessor: Arc<QualityAssessor>,
    source: Arc<dyn ContentSource>,
    settings: OrchestratorSettings,
    stats: Mutex<AgentStats>,
    running: AtomicBool,
}

impl BatchOrchestrator {
    pub fn new(
        assessor: Arc<QualityAssessor>,
        source: Arc<dyn ContentSource>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            assessor,
            source,
            settings,
            stats: Mutex::new(AgentStats::new()),
            running: AtomicBool::new(false),
        }
    }

    pub fn assessor(&self) -> &Arc<QualityAssessor> {
        &self.assessor
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.lock().snapshot()
    }

    /// Most recent run summaries first
    pub fn history(&self, limit: usize) -> Vec<RunSummary> {
        self.stats.lock().recent_history(limit)
    }

    /// Total runs kept in history
    pub fn history_len(&self) -> usize {
        self.stats.lock().history().len()
    }

    /// Run one full pass over the content store.
    ///
    /// Returns immediately with `skipped: true` and no side effects if a run is
    /// already in progress.
    pub async fn run_quality_check(&self) -> RunOutcome {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            info!("Quality check already in progress, skipping");
            return RunOutcome::skipped();
        };

        let started = Instant::now();
        info!("Starting translation quality check");

        let records = match self.source.fetch_all().await {
            Ok(records) => records,
            Err(e) => {
                error!("Failed to fetch translations: {}", e);
                return RunOutcome {
                    success: false,
                    message: format!("Failed to fetch translations: {}", e),
                    skipped: false,
                    stats: Some(self.stats()),
                    summary: None,
                    results: Vec::new(),
                };
            }
        };

        let total = records.len();
        if total == 0 {
            info!("No translations to check");
        }

        let run = process_in_chunks(records, self.settings.max_concurrent, self.settings.chunk_delay, |record| {
            self.check_record(record)
        })
        .await;

        let checks = run.results;
        let successful = checks.iter().filter(|c| c.result.success).count();
        let issues_found = checks
            .iter()
            .filter_map(|c| c.result.analysis.as_ref())
            .map(|a| a.issues.len())
            .sum();
        let auto_fixed = checks.iter().filter(|c| c.auto_fixed).count();
        let scores: Vec<f64> = checks.iter().filter_map(|c| c.result.score()).collect();
        let average_score = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        };

        let summary = {
            let mut stats = self.stats.lock();
            let summary = RunSummary {
                run_id: Uuid::new_v4(),
                timestamp: chrono::Utc::now(),
                duration_ms: started.elapsed().as_millis() as u64,
                translations_checked: total,
                successful,
                failed: total - successful,
                issues_found,
                auto_fixed,
                average_score,
                chunks: run.chunks,
                stats: stats.snapshot(),
            };
            stats.record_run(summary.clone());
            summary
        };

        info!(
            "Quality check completed in {}ms: {} checked, {} failed, {} issue(s), {} auto-fixed",
            summary.duration_ms, total, summary.failed, issues_found, auto_fixed
        );

        let message = if total == 0 {
            "No translations to check".to_string()
        } else {
            format!("Checked {} translations", total)
        };

        RunOutcome {
            success: true,
            message,
            skipped: false,
            stats: Some(summary.stats.clone()),
            summary: Some(summary),
            results: checks.into_iter().take(RESULTS_PREVIEW_LEN).collect(),
        }
    }

    async fn check_record(&self, record: TranslationRecord) -> RecordCheck {
        let result = self.assessor.assess_record(&record).await;

        {
            let mut stats = self.stats.lock();
            match result.analysis.as_ref().filter(|_| result.success) {
                Some(analysis) => stats.record_success(analysis.quality_score, &analysis.issues),
                None => stats.record_failure(),
            }
        }

        let mut auto_fixed = false;
        if should_write_back(&result, self.settings.quality_threshold, self.settings.auto_update) {
            auto_fixed = self.write_back(&record, &result).await;
        }

        RecordCheck {
            id: record.id,
            context: record.context,
            result,
            auto_fixed,
        }
    }

    async fn write_back(&self, record: &TranslationRecord, result: &AssessmentResult) -> bool {
        let Some(analysis) = result.analysis.as_ref() else {
            return false;
        };
        if record.id.is_empty() {
            warn!("Cannot write back translation without an id ('{}')", record.english);
            return false;
        }
        if analysis.enhanced_translation.is_empty() {
            info!("No enhanced text proposed for translation {}, nothing to write back", record.id);
            return false;
        }

        let update = TranslationUpdate::from_analysis(analysis);
        match self.source.update(&record.id, &update).await {
            Ok(()) => {
                self.stats.lock().record_auto_fix();
                info!("Auto-enhanced translation {} (score {})", record.id, analysis.quality_score);
                true
            }
            Err(e) => {
                warn!("Failed to write back translation {}: {}", record.id, e);
                false
            }
        }
    }
}
