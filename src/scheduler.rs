/*!
 * Periodic scheduling of batch runs.
 *
 * The cadence is a cron expression evaluated with the `cron` crate. Classic
 * five-field expressions are accepted by assuming second 0. An expression that
 * cannot be parsed is reported with a warning and replaced by a fixed 30-minute
 * interval.
 *
 * Every tick spawns a run on its own task; ticks that land while a run is still
 * going are absorbed by the orchestrator's in-progress guard. A run that panics
 * is logged and, when a fault notifier is attached, reported through it.
 */

use chrono::{DateTime, Utc};
use cron::Schedule;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::orchestrator::BatchOrchestrator;

/// Interval used when the configured expression is unusable
pub const FALLBACK_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// When runs happen
#[derive(Debug, Clone)]
pub enum Cadence {
    Cron(Box<Schedule>),
    Fallback(Duration),
}

impl Cadence {
    /// Parse a five- or six/seven-field cron expression
    pub fn parse(expression: &str) -> Self {
        let normalized = normalize_expression(expression);
        match Schedule::from_str(&normalized) {
            Ok(schedule) => Cadence::Cron(Box::new(schedule)),
            Err(e) => {
                warn!(
                    "Unsupported schedule expression '{}' ({}), falling back to every {} minutes",
                    expression,
                    e,
                    FALLBACK_INTERVAL.as_secs() / 60
                );
                Cadence::Fallback(FALLBACK_INTERVAL)
            }
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Cadence::Fallback(_))
    }

    /// Next firing strictly after `now`
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let fallback = |interval: Duration| now + chrono::Duration::from_std(interval).unwrap_or(chrono::Duration::minutes(30));
        match self {
            Cadence::Cron(schedule) => schedule.after(&now).next().unwrap_or_else(|| fallback(FALLBACK_INTERVAL)),
            Cadence::Fallback(interval) => fallback(*interval),
        }
    }

    /// Next firing after both `now` and the tick that last fired
    ///
    /// Ticks strictly advance even if the wall clock still reads slightly before
    /// the previous tick when its timer wakes.
    pub fn next_tick(&self, previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
        self.next_after(previous.map_or(now, |p| p.max(now)))
    }
}

/// Prefix a seconds field onto classic five-field expressions
fn normalize_expression(expression: &str) -> String {
    let trimmed = expression.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Snapshot of the scheduler state for the API
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub running: bool,
    pub schedule: String,
    pub next_check: Option<DateTime<Utc>>,
    pub fallback: bool,
}

/// Starts and stops periodic batch runs
#[derive(Debug)]
pub struct Scheduler {
    orchestrator: Arc<BatchOrchestrator>,
    expression: String,
    cadence: Cadence,
    warmup: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
    next_check: Arc<Mutex<Option<DateTime<Utc>>>>,
    fault: Option<Arc<Notify>>,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<BatchOrchestrator>, expression: impl Into<String>, warmup: Duration) -> Self {
        let expression = expression.into();
        let cadence = Cadence::parse(&expression);
        Self {
            orchestrator,
            expression,
            cadence,
            warmup,
            task: Mutex::new(None),
            next_check: Arc::new(Mutex::new(None)),
            fault: None,
        }
    }

    /// Notify `fault` whenever a scheduled run panics
    pub fn with_fault_notify(mut self, fault: Arc<Notify>) -> Self {
        self.fault = Some(fault);
        self
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn status(&self) -> SchedulerStatus {
        let running = self.is_running();
        SchedulerStatus {
            running,
            schedule: self.expression.clone(),
            next_check: if running { *self.next_check.lock() } else { None },
            fallback: self.cadence.is_fallback(),
        }
    }

    /// Register the periodic job. Returns `false` if it was already registered.
    ///
    /// One extra run fires after the warm-up delay so the first check does not wait
    /// for the first tick.
    pub fn start(&self) -> bool {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            info!("Scheduler already running, ignoring start request");
            return false;
        }

        let first_tick = self.cadence.next_after(Utc::now());
        *self.next_check.lock() = Some(first_tick);
        info!(
            "Starting scheduler with '{}', next check at {}, initial check in {:?}",
            self.expression, first_tick, self.warmup
        );

        let orchestrator = Arc::clone(&self.orchestrator);
        let cadence = self.cadence.clone();
        let next_check = Arc::clone(&self.next_check);
        let fault = self.fault.clone();
        let warmup = self.warmup;

        *task = Some(tokio::spawn(async move {
            let initial = tokio::time::sleep(warmup);
            tokio::pin!(initial);
            let mut initial_pending = true;

            let mut previous: Option<DateTime<Utc>> = None;

            loop {
                let next = cadence.next_tick(previous, Utc::now());
                *next_check.lock() = Some(next);
                let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);

                tokio::select! {
                    _ = &mut initial, if initial_pending => {
                        initial_pending = false;
                        info!("Running initial quality check");
                        spawn_run(&orchestrator, fault.clone());
                    }
                    _ = tokio::time::sleep(wait) => {
                        previous = Some(next);
                        info!("Scheduled quality check triggered");
                        spawn_run(&orchestrator, fault.clone());
                    }
                }
            }
        }));

        true
    }

    /// Cancel future runs. Returns `false` if nothing was scheduled.
    ///
    /// A run that already started keeps going until it finishes.
    pub fn stop(&self) -> bool {
        match self.task.lock().take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                *self.next_check.lock() = None;
                info!("Scheduler stopped");
                true
            }
            _ => {
                info!("Scheduler is not running, nothing to stop");
                false
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
            debug!("Scheduler dropped - periodic task aborted");
        }
    }
}

/// Run a batch on its own task and watch it for panics
fn spawn_run(orchestrator: &Arc<BatchOrchestrator>, fault: Option<Arc<Notify>>) {
    let orchestrator = Arc::clone(orchestrator);
    let run = tokio::spawn(async move { orchestrator.run_quality_check().await });

    tokio::spawn(async move {
        match run.await {
            Ok(outcome) => debug!("Scheduled run finished: {}", outcome.message),
            Err(e) if e.is_panic() => {
                error!("Scheduled quality check panicked: {}", e);
                if let Some(fault) = fault {
                    fault.notify_one();
                }
            }
            Err(e) => warn!("Scheduled quality check was cancelled: {}", e),
        }
    });
}
