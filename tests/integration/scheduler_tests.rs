/*!
 * Tests for the scheduler lifecycle
 */

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use tqagent::providers::mock::MockProvider;
use tqagent::scheduler::Scheduler;

use crate::common::{marine_records, orchestrator, orchestrator_settings, InMemorySource, DISTANT_SCHEDULE};

#[tokio::test]
async fn test_start_calledTwice_shouldRegisterOnce() {
    let source = Arc::new(InMemorySource::with_records(marine_records(1)));
    let orch = orchestrator(MockProvider::working(), source, orchestrator_settings(false, 80.0));
    let scheduler = Scheduler::new(orch, DISTANT_SCHEDULE, Duration::from_secs(30));

    assert!(scheduler.start());
    assert!(!scheduler.start());
    assert!(scheduler.is_running());

    let status = scheduler.status();
    assert!(status.running);
    assert!(!status.fallback);
    assert!(status.next_check.is_some());
}

#[tokio::test]
async fn test_stop_shouldBeIdempotent() {
    let orch = orchestrator(MockProvider::working(), Arc::new(InMemorySource::default()), orchestrator_settings(false, 80.0));
    let scheduler = Scheduler::new(orch, DISTANT_SCHEDULE, Duration::from_secs(30));

    assert!(!scheduler.stop());
    scheduler.start();
    assert!(scheduler.stop());
    assert!(!scheduler.stop());
    assert!(!scheduler.status().running);
    assert_eq!(scheduler.status().next_check, None);

    // can be restarted after a stop
    assert!(scheduler.start());
    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn test_start_shouldRunInitialCheckAfterWarmup() {
    let provider = MockProvider::working();
    let source = Arc::new(InMemorySource::with_records(marine_records(2)));
    let orch = orchestrator(provider.clone(), Arc::clone(&source), orchestrator_settings(false, 80.0));
    let scheduler = Scheduler::new(Arc::clone(&orch), DISTANT_SCHEDULE, Duration::from_secs(30));

    scheduler.start();

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert_eq!(source.fetch_calls(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(source.fetch_calls(), 1);
    assert_eq!(orch.history_len(), 1);
    assert_eq!(provider.request_count(), 2);

    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn test_stop_beforeWarmup_shouldPreventInitialCheck() {
    let source = Arc::new(InMemorySource::with_records(marine_records(1)));
    let orch = orchestrator(MockProvider::working(), Arc::clone(&source), orchestrator_settings(false, 80.0));
    let scheduler = Scheduler::new(orch, DISTANT_SCHEDULE, Duration::from_secs(30));

    scheduler.start();
    tokio::time::sleep(Duration::from_secs(10)).await;
    scheduler.stop();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(source.fetch_calls(), 0);
}

#[tokio::test]
async fn test_new_withUnparseableSchedule_shouldFallBack() {
    let orch = orchestrator(MockProvider::working(), Arc::new(InMemorySource::default()), orchestrator_settings(false, 80.0));
    let scheduler = Scheduler::new(orch, "whenever you like", Duration::from_secs(30));

    let status = scheduler.status();

    assert!(status.fallback);
    assert!(!status.running);
    assert_eq!(status.schedule, "whenever you like");
}

#[tokio::test(start_paused = true)]
async fn test_start_whenRunPanics_shouldNotifyFault() {
    let orch = orchestrator(MockProvider::working(), Arc::new(InMemorySource::panicking()), orchestrator_settings(false, 80.0));
    let fault = Arc::new(Notify::new());
    let scheduler = Scheduler::new(Arc::clone(&orch), DISTANT_SCHEDULE, Duration::from_secs(30))
        .with_fault_notify(Arc::clone(&fault));

    scheduler.start();

    tokio::time::timeout(Duration::from_secs(60), fault.notified())
        .await
        .expect("panicking run reported as a fault");
    assert!(!orch.is_running());
    assert!(scheduler.is_running());

    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn test_start_whenRunPanicsWithoutFaultNotify_shouldKeepScheduling() {
    let orch = orchestrator(MockProvider::working(), Arc::new(InMemorySource::panicking()), orchestrator_settings(false, 80.0));
    let scheduler = Scheduler::new(Arc::clone(&orch), DISTANT_SCHEDULE, Duration::from_secs(30));

    scheduler.start();
    tokio::time::sleep(Duration::from_secs(31)).await;

    assert!(scheduler.is_running());
    assert!(!orch.is_running());
    scheduler.stop();
}
