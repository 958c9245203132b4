/*!
 * Tests for batch runs: re-entrancy, chunking, write-back and history
 */

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use tqagent::orchestrator::{BatchOrchestrator, OrchestratorSettings};
use tqagent::providers::mock::MockProvider;

use crate::common::{assessor, marine_records, orchestrator, orchestrator_settings, InMemorySource};

#[tokio::test(start_paused = true)]
async fn test_run_quality_check_whileRunning_shouldSkipWithoutNetworkCalls() {
    let provider = MockProvider::working();
    let source = Arc::new(InMemorySource::with_records(marine_records(2)).with_fetch_delay(Duration::from_secs(5)));
    let orch = orchestrator(provider.clone(), Arc::clone(&source), orchestrator_settings(false, 80.0));

    let first = {
        let orch = Arc::clone(&orch);
        tokio::spawn(async move { orch.run_quality_check().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(orch.is_running());

    let second = orch.run_quality_check().await;
    assert!(!second.success);
    assert!(second.skipped);
    assert_eq!(second.message, "Quality check already in progress");
    assert_eq!(source.fetch_calls(), 1);
    assert_eq!(provider.request_count(), 0);

    let first = first.await.unwrap();
    assert!(first.success);
    assert!(!orch.is_running());
    assert_eq!(provider.request_count(), 2);
    assert_eq!(orch.history_len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_quality_check_withSevenRecords_shouldUseThreeChunks() {
    let provider = MockProvider::working();
    let source = Arc::new(InMemorySource::with_records(marine_records(7)));
    let settings = OrchestratorSettings {
        chunk_delay: Duration::from_secs(1),
        ..orchestrator_settings(false, 80.0)
    };
    let orch = orchestrator(provider.clone(), source, settings);

    let started = Instant::now();
    let outcome = orch.run_quality_check().await;
    let elapsed = started.elapsed();

    assert!(outcome.success);
    let summary = outcome.summary.expect("summary for a completed run");
    assert_eq!(summary.chunks, 3);
    assert_eq!(summary.translations_checked, 7);
    assert_eq!(summary.successful, 7);
    // two pauses between three chunks
    assert!(elapsed >= Duration::from_secs(2), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(3), "elapsed {:?}", elapsed);

    let history = orch.history(20);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].translations_checked, 7);
    assert_eq!(provider.request_count(), 7);
}

#[tokio::test]
async fn test_run_quality_check_withLowScoresAndAutoUpdate_shouldWriteBack() {
    let source = Arc::new(InMemorySource::with_records(marine_records(4)));
    let orch = orchestrator(MockProvider::working().with_score(50.0), Arc::clone(&source), orchestrator_settings(true, 80.0));

    let outcome = orch.run_quality_check().await;

    assert!(outcome.success);
    assert_eq!(outcome.summary.as_ref().unwrap().auto_fixed, 4);
    assert!(outcome.results.iter().all(|check| check.auto_fixed));

    let updates = source.updates();
    assert_eq!(updates.len(), 4);
    let ids: Vec<&str> = updates.iter().map(|(id, _)| id.as_str()).collect();
    for id in ["t0", "t1", "t2", "t3"] {
        assert!(ids.contains(&id), "missing write-back for {}", id);
    }
    let (_, update) = &updates[0];
    assert_eq!(update.quality_score, 50.0);
    assert!(update.auto_enhanced);
    assert!(update.sinhala.is_some());
    assert_eq!(orch.stats().auto_fixed, 4);
}

#[tokio::test]
async fn test_run_quality_check_withAutoUpdateDisabled_shouldNotWriteBack() {
    let source = Arc::new(InMemorySource::with_records(marine_records(3)));
    let orch = orchestrator(MockProvider::working().with_score(50.0), Arc::clone(&source), orchestrator_settings(false, 80.0));

    let outcome = orch.run_quality_check().await;

    assert!(outcome.success);
    assert!(source.updates().is_empty());
    assert_eq!(outcome.summary.unwrap().auto_fixed, 0);
}

#[tokio::test]
async fn test_run_quality_check_withHighScores_shouldNotWriteBack() {
    let source = Arc::new(InMemorySource::with_records(marine_records(3)));
    let orch = orchestrator(MockProvider::working().with_score(80.0), Arc::clone(&source), orchestrator_settings(true, 80.0));

    orch.run_quality_check().await;

    assert!(source.updates().is_empty());
}

#[tokio::test]
async fn test_run_quality_check_withRejectedUpdates_shouldNotCountAutoFixes() {
    let source = Arc::new(InMemorySource::rejecting_updates(marine_records(3)));
    let orch = orchestrator(MockProvider::working().with_score(10.0), Arc::clone(&source), orchestrator_settings(true, 80.0));

    let outcome = orch.run_quality_check().await;

    assert!(outcome.success);
    let summary = outcome.summary.as_ref().unwrap();
    assert_eq!(summary.successful, 3);
    assert_eq!(summary.auto_fixed, 0);
    assert!(outcome.results.iter().all(|check| !check.auto_fixed));
    assert_eq!(orch.stats().auto_fixed, 0);
    assert!(source.updates().is_empty());
}

#[tokio::test]
async fn test_run_quality_check_withBlankEnhancedTexts_shouldSkipWriteBack() {
    let provider = MockProvider::working().with_custom_response(|_| MockProvider::assessment_reply(40.0, "", "  "));
    let source = Arc::new(InMemorySource::with_records(marine_records(2)));
    let orch = orchestrator(provider, Arc::clone(&source), orchestrator_settings(true, 80.0));

    let outcome = orch.run_quality_check().await;

    assert!(outcome.success);
    assert!(source.updates().is_empty());
    assert_eq!(outcome.summary.unwrap().auto_fixed, 0);
    assert_eq!(orch.stats().auto_fixed, 0);
}

#[tokio::test]
async fn test_run_quality_check_withFailingProvider_shouldNotWriteBack() {
    let source = Arc::new(InMemorySource::with_records(marine_records(3)));
    let orch = orchestrator(MockProvider::failing(), Arc::clone(&source), orchestrator_settings(true, 80.0));

    let outcome = orch.run_quality_check().await;

    assert!(outcome.success);
    assert!(source.updates().is_empty());
    let summary = outcome.summary.unwrap();
    assert_eq!(summary.failed, 3);
    assert_eq!(summary.average_score, None);
    assert_eq!(orch.stats().failed_checks, 3);
}

#[tokio::test]
async fn test_run_quality_check_withUnreachableSource_shouldFailWithoutHistory() {
    let provider = MockProvider::working();
    let orch = orchestrator(provider.clone(), Arc::new(InMemorySource::unreachable()), orchestrator_settings(true, 80.0));

    let outcome = orch.run_quality_check().await;

    assert!(!outcome.success);
    assert!(!outcome.skipped);
    assert!(outcome.message.starts_with("Failed to fetch translations:"), "{}", outcome.message);
    assert_eq!(orch.history_len(), 0);
    assert_eq!(provider.request_count(), 0);
    assert!(!orch.is_running());
}

#[tokio::test]
async fn test_run_quality_check_withEmptySource_shouldRecordEmptyRun() {
    let orch = orchestrator(MockProvider::working(), Arc::new(InMemorySource::default()), orchestrator_settings(true, 80.0));

    let outcome = orch.run_quality_check().await;

    assert!(outcome.success);
    assert_eq!(outcome.message, "No translations to check");
    let history = orch.history(20);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].translations_checked, 0);
    assert_eq!(history[0].chunks, 0);
}

#[tokio::test]
async fn test_run_quality_check_shouldTallyIssuesBySeverity() {
    let source = Arc::new(InMemorySource::with_records(marine_records(5)));
    let orch = orchestrator(MockProvider::working().with_score(72.0), source, orchestrator_settings(false, 80.0));

    orch.run_quality_check().await;
    let stats = orch.stats();

    assert_eq!(stats.total_checks, 5);
    assert_eq!(stats.successful_checks, 5);
    assert_eq!(stats.issues_found, 5);
    assert_eq!(stats.issues_by_severity.get("minor"), Some(&5));
    assert_eq!(stats.average_quality_score, Some(72.0));
    assert_eq!(stats.runs_completed, 1);
}

#[tokio::test]
async fn test_run_quality_check_shouldReturnAtMostTenResults() {
    let source = Arc::new(InMemorySource::with_records(marine_records(12)));
    let orch = Arc::new(BatchOrchestrator::new(
        assessor(MockProvider::working()),
        source,
        OrchestratorSettings {
            max_concurrent: 6,
            chunk_delay: Duration::ZERO,
            ..OrchestratorSettings::default()
        },
    ));

    let outcome = orch.run_quality_check().await;

    assert_eq!(outcome.results.len(), 10);
    assert_eq!(outcome.results[0].id, "t0");
    assert_eq!(outcome.summary.unwrap().translations_checked, 12);
}
