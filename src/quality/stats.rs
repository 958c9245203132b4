/*!
 * Running statistics for the assessor and the batch orchestrator.
 *
 * Counters only ever grow for the lifetime of the process. Recent scores and run
 * history are kept in bounded ring buffers that evict the oldest entry first.
 */

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, VecDeque};
use uuid::Uuid;

use super::model::Issue;

/// Scores kept for the running mean
pub const RECENT_SCORES_CAPACITY: usize = 100;

/// Batch runs kept in history
pub const HISTORY_CAPACITY: usize = 50;

/// Fixed-capacity FIFO buffer
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append, evicting the oldest entry when full
    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.items.iter()
    }
}

impl<T: Serialize> Serialize for RingBuffer<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.iter())
    }
}

/// Provider call counters kept by the assessor
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessorStats {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub rate_limit_hits: u64,
    /// Halving average of response times in milliseconds
    pub average_response_time: f64,
}

impl AssessorStats {
    pub fn record_attempt(&mut self) {
        self.total_calls += 1;
    }

    /// Count a finished call and fold its latency into the average.
    ///
    /// The average is the crude `(old + sample) / 2`; the first sample seeds it.
    pub fn record_outcome(&mut self, success: bool, response_time_ms: u64) {
        if success {
            self.successful_calls += 1;
        } else {
            self.failed_calls += 1;
        }

        let sample = response_time_ms as f64;
        self.average_response_time = if self.successful_calls + self.failed_calls == 1 {
            sample
        } else {
            (self.average_response_time + sample) / 2.0
        };
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.successful_calls as f64 / self.total_calls as f64 * 100.0
        }
    }
}

/// Summary of one batch run, kept in history
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub translations_checked: usize,
    pub successful: usize,
    pub failed: usize,
    pub issues_found: usize,
    pub auto_fixed: usize,
    pub average_score: Option<f64>,
    pub chunks: usize,
    pub stats: StatsSnapshot,
}

/// Serializable view of `AgentStats` without the history
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total_checks: u64,
    pub successful_checks: u64,
    pub failed_checks: u64,
    pub issues_found: u64,
    pub auto_fixed: u64,
    pub issues_by_severity: BTreeMap<String, u64>,
    pub average_quality_score: Option<f64>,
    pub recent_scores: usize,
    pub last_check: Option<DateTime<Utc>>,
    pub runs_completed: u64,
}

/// Process-wide quality statistics owned by the orchestrator
#[derive(Debug, Clone)]
pub struct AgentStats {
    pub total_checks: u64,
    pub successful_checks: u64,
    pub failed_checks: u64,
    pub issues_found: u64,
    pub auto_fixed: u64,
    pub issues_by_severity: BTreeMap<String, u64>,
    pub last_check: Option<DateTime<Utc>>,
    pub runs_completed: u64,
    recent_scores: RingBuffer<f64>,
    history: RingBuffer<RunSummary>,
}

impl Default for AgentStats {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentStats {
    pub fn new() -> Self {
        Self {
            total_checks: 0,
            successful_checks: 0,
            failed_checks: 0,
            issues_found: 0,
            auto_fixed: 0,
            issues_by_severity: BTreeMap::new(),
            last_check: None,
            runs_completed: 0,
            recent_scores: RingBuffer::new(RECENT_SCORES_CAPACITY),
            history: RingBuffer::new(HISTORY_CAPACITY),
        }
    }

    /// Count a successful assessment with its score and issues
    pub fn record_success(&mut self, score: f64, issues: &[Issue]) {
        self.total_checks += 1;
        self.successful_checks += 1;
        self.issues_found += issues.len() as u64;
        for issue in issues {
            *self.issues_by_severity.entry(severity_bucket(&issue.severity)).or_insert(0) += 1;
        }
        self.recent_scores.push(score);
        self.last_check = Some(Utc::now());
    }

    pub fn record_failure(&mut self) {
        self.total_checks += 1;
        self.failed_checks += 1;
        self.last_check = Some(Utc::now());
    }

    pub fn record_auto_fix(&mut self) {
        self.auto_fixed += 1;
    }

    /// Append a finished run to history
    pub fn record_run(&mut self, summary: RunSummary) {
        self.runs_completed += 1;
        self.history.push(summary);
    }

    /// Mean of the recent score window
    pub fn average_score(&self) -> Option<f64> {
        if self.recent_scores.is_empty() {
            return None;
        }
        let sum: f64 = self.recent_scores.iter().sum();
        Some(sum / self.recent_scores.len() as f64)
    }

    pub fn recent_scores(&self) -> &RingBuffer<f64> {
        &self.recent_scores
    }

    pub fn history(&self) -> &RingBuffer<RunSummary> {
        &self.history
    }

    /// Most recent runs first, at most `limit`
    pub fn recent_history(&self, limit: usize) -> Vec<RunSummary> {
        self.history.iter().rev().take(limit).cloned().collect()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_checks: self.total_checks,
            successful_checks: self.successful_checks,
            failed_checks: self.failed_checks,
            issues_found: self.issues_found,
            auto_fixed: self.auto_fixed,
            issues_by_severity: self.issues_by_severity.clone(),
            average_quality_score: self.average_score(),
            recent_scores: self.recent_scores.len(),
            last_check: self.last_check,
            runs_completed: self.runs_completed,
        }
    }
}

fn severity_bucket(severity: &str) -> String {
    match severity.trim().to_lowercase().as_str() {
        s @ ("critical" | "major" | "minor") => s.to_string(),
        "high" => "major".to_string(),
        "low" => "minor".to_string(),
        _ => "other".to_string(),
    }
}
