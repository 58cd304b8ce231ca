use super::*;
use dealwatch::models::NewTarget;
use dealwatch::scheduler::JobStatus;
use dealwatch::storage::{PriceLedger, TargetStore};
use rstest::rstest;

async fn tracked_target(harness: &Harness, target_price: Option<f64>) -> ScheduleContinuation {
    let target = harness
        .store
        .insert_target(NewTarget {
            owner_id: "+15550100".to_string(),
            url: PRODUCT_URL.to_string(),
            target_price,
        })
        .await
        .unwrap();
    ScheduleContinuation::immediate(target.id, target.url, target.target_price)
}

async fn assert_single_reschedule(harness: &Harness, target_id: &str) -> ScheduleContinuation {
    let enqueued = harness.queue.take().await;
    assert_eq!(enqueued.len(), 1, "expected exactly one continuation");
    let next = enqueued.into_iter().next().unwrap();
    assert_eq!(next.target_id, target_id);
    assert_eq!(next.url, PRODUCT_URL);
    assert!(
        (3000..=4200).contains(&next.delay_seconds),
        "delay {} outside [3000, 4200]",
        next.delay_seconds
    );
    next
}

#[rstest]
#[case::fetch_timeout(FetchFailure::Timeout, "extraction")]
#[case::session_start(FetchFailure::SessionStart, "resource")]
#[case::panic(FetchFailure::Panic, "panic")]
#[tokio::test]
async fn test_fetch_failures_reschedule_once(#[case] failure: FetchFailure, #[case] kind: &str) {
    let harness = HarnessBuilder::new(FailingFetcher(failure)).build();
    let job = tracked_target(&harness, Some(50.0)).await;

    harness.monitor.handle(job.clone()).await;

    let next = assert_single_reschedule(&harness, &job.target_id).await;
    assert_eq!(next.target_price, Some(50.0));
    let info = harness.monitor.get_job_info(&job.target_id).await.unwrap();
    assert!(info.last_error.unwrap().starts_with(kind));
    assert_eq!(info.status, JobStatus::Rescheduled);
    assert!(harness.store.latest(&job.target_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_extraction_without_price_reschedules_once() {
    let harness = HarnessBuilder::new(SequenceFetcher::new(vec!["<html><body><h1>Sold out</h1></body></html>".into()]))
        .build();
    let job = tracked_target(&harness, None).await;

    harness.monitor.handle(job.clone()).await;

    assert_single_reschedule(&harness, &job.target_id).await;
    let target = harness.store.lookup_target(&job.target_id).await.unwrap().unwrap();
    assert_eq!(target.target_price, None, "no threshold without a price");
}

#[tokio::test]
async fn test_ledger_failure_skips_notification_and_reschedules_once() {
    let notifier = Arc::new(RecordingNotifier::default());
    let harness = HarnessBuilder::new(SequenceFetcher::new(vec![product_page("Lamp", "10.00")]))
        .ledger(Arc::new(FailingLedger))
        .notifier(notifier.clone())
        .build();
    let job = tracked_target(&harness, Some(20.0)).await;

    let report = harness.monitor.run_cycle(&job).await;
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, "persistence");
    assert!(!report.notified);
    assert!(notifier.sent.lock().await.is_empty());

    harness.monitor.handle(job.clone()).await;
    assert_single_reschedule(&harness, &job.target_id).await;
}

#[rstest]
#[case::lookup(StoreFailure::Lookup)]
#[case::initial_threshold(StoreFailure::Threshold)]
#[tokio::test]
async fn test_target_store_failure_skips_record_and_notify(#[case] failure: StoreFailure) {
    let notifier = Arc::new(RecordingNotifier::default());
    let harness = HarnessBuilder::new(SequenceFetcher::new(vec![product_page("Lamp", "10.00")]))
        .store_failure(failure)
        .notifier(notifier.clone())
        .build();
    // No threshold yet, so the cycle has to derive and store one.
    let job = tracked_target(&harness, None).await;

    let report = harness.monitor.run_cycle(&job).await;
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, "persistence");
    assert!(report.observation.is_none());
    assert!(!report.notified);

    harness.monitor.handle(job.clone()).await;

    let next = assert_single_reschedule(&harness, &job.target_id).await;
    assert_eq!(next.target_price, None);
    assert!(harness.store.history(&job.target_id, 10).await.unwrap().is_empty());
    assert!(notifier.sent.lock().await.is_empty());
    let info = harness.monitor.get_job_info(&job.target_id).await.unwrap();
    assert!(info.last_error.unwrap().starts_with("persistence"));
}

#[tokio::test]
async fn test_notification_failure_reschedules_once() {
    let harness = HarnessBuilder::new(SequenceFetcher::new(vec![product_page("Lamp", "10.00")]))
        .notifier(Arc::new(FailingNotifier))
        .build();
    let job = tracked_target(&harness, Some(20.0)).await;

    harness.monitor.handle(job.clone()).await;

    assert_single_reschedule(&harness, &job.target_id).await;
    // The observation is recorded even though delivery failed.
    assert_eq!(harness.store.latest(&job.target_id).await.unwrap().unwrap().price, 10.0);
}

#[tokio::test]
async fn test_missing_destination_is_a_notification_failure() {
    let harness = HarnessBuilder::new(SequenceFetcher::new(vec![product_page("Lamp", "10.00")]))
        .destination(None)
        .build();
    let job = tracked_target(&harness, Some(20.0)).await;

    let report = harness.monitor.run_cycle(&job).await;
    assert_eq!(report.failures[0].kind, "notification");
    assert!(report.failures[0].message.contains("not configured"));
}

#[tokio::test]
async fn test_deleted_target_keeps_rescheduling_without_side_effects() {
    let notifier = Arc::new(RecordingNotifier::default());
    let harness = HarnessBuilder::new(SequenceFetcher::new(vec![product_page("Lamp", "1.00")]))
        .notifier(notifier.clone())
        .build();
    let job = tracked_target(&harness, Some(20.0)).await;
    assert!(harness.monitor.untrack(&job.target_id).await.unwrap());

    harness.monitor.handle(job.clone()).await;

    assert_single_reschedule(&harness, &job.target_id).await;
    assert!(notifier.sent.lock().await.is_empty());
    assert!(harness.store.history(&job.target_id, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_price_equal_to_threshold_notifies() {
    let notifier = Arc::new(RecordingNotifier::default());
    let harness = HarnessBuilder::new(SequenceFetcher::new(vec![product_page("Lamp", "90.00")]))
        .notifier(notifier.clone())
        .build();
    let job = tracked_target(&harness, Some(90.0)).await;

    let report = harness.monitor.run_cycle(&job).await;

    assert!(report.notified);
    assert_eq!(notifier.sent.lock().await.len(), 1);
}

#[tokio::test]
async fn test_check_all_summarises() {
    let harness = HarnessBuilder::new(SequenceFetcher::new(vec![product_page("Lamp", "30.00")])).build();
    for (url, target_price) in [("https://a.example/p", 40.0), ("https://b.example/p", 20.0)] {
        harness
            .store
            .insert_target(NewTarget {
                owner_id: "owner".to_string(),
                url: url.to_string(),
                target_price: Some(target_price),
            })
            .await
            .unwrap();
    }

    let summary = harness.monitor.check_all().await.unwrap();

    assert_eq!(summary.checked, 2);
    assert_eq!(summary.notified, 1);
    assert_eq!(summary.failed, 0);
    assert!(harness.queue.take().await.is_empty());
}

#[tokio::test]
async fn test_manual_checks_contain_panics() {
    let harness = HarnessBuilder::new(FailingFetcher(FetchFailure::Panic)).build();
    let mut ids = Vec::new();
    for url in ["https://a.example/p", "https://b.example/p"] {
        let target = harness
            .store
            .insert_target(NewTarget {
                owner_id: "owner".to_string(),
                url: url.to_string(),
                target_price: Some(10.0),
            })
            .await
            .unwrap();
        ids.push(target.id);
    }

    let report = harness.monitor.check_now(&ids[0]).await.unwrap();
    assert_eq!(report.failures[0].kind, "panic");

    let summary = harness.monitor.check_all().await.unwrap();
    assert_eq!(summary.checked, 2);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.notified, 0);

    for id in &ids {
        let info = harness.monitor.get_job_info(id).await.unwrap();
        assert_eq!(info.status, JobStatus::Idle);
        assert_eq!(info.last_error.as_deref(), Some("panic: renderer crashed"));
    }
    assert!(harness.queue.take().await.is_empty());
}

#[tokio::test]
async fn test_resume_all_spreads_first_cycles() {
    let harness = HarnessBuilder::new(SequenceFetcher::new(vec![])).build();
    for i in 0..5 {
        harness
            .store
            .insert_target(NewTarget {
                owner_id: "owner".to_string(),
                url: format!("https://shop.example/p/{}", i),
                target_price: None,
            })
            .await
            .unwrap();
    }

    assert_eq!(harness.monitor.resume_all().await.unwrap(), 5);

    let enqueued = harness.queue.take().await;
    assert_eq!(enqueued.len(), 5);
    assert!(enqueued.iter().all(|c| c.delay_seconds <= 600));
    assert_eq!(harness.monitor.get_stats().await.total_jobs, 5);
}
