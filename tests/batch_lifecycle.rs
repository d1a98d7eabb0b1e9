//! End-to-end batch runs against a real store file and artifact tree
//!
//! Collaborators are scripted fakes; everything else (store persistence,
//! directory layout, retry, state machine) is the real implementation.

mod common;

use common::*;
use project_harvest::{BatchEnd, Event, RecordId, RecordState, RecordStore, ingest_from};
use std::sync::Arc;

#[tokio::test]
async fn test_ingest_then_run_completes_everything() {
    let env = TestEnv::new().await;
    let ingest = ingest_from(&ListSource::named(&["Alpha", "Beta", "Gamma"]), &env.store)
        .await
        .unwrap();
    assert_eq!(ingest.new, 3);

    let fetcher = Arc::new(ScriptedFetcher::new());
    let processor = env.processor(Arc::new(ScriptedExtractor::new()), fetcher.clone());
    let summary = processor.run(None).await.unwrap();

    assert_eq!(summary.completed, 3);
    assert_eq!(summary.end, BatchEnd::Exhausted);
    assert_eq!(fetcher.seen(), vec!["Alpha", "Beta", "Gamma"]);

    let layout = env.layout();
    for record in env.store.snapshot().await {
        assert_eq!(record.state, RecordState::Completed);
        let dir = layout.dir_for(&record);
        assert_populated(&dir);
        // metadata file + two artifacts
        assert_eq!(count_files(&dir), 3);
    }
}

#[tokio::test]
async fn test_cancelled_record_is_parked_while_batch_moves_on() {
    let env = TestEnv::new().await;
    ingest_from(&ListSource::named(&["Alpha", "Beta", "Gamma"]), &env.store)
        .await
        .unwrap();

    let fetcher = Arc::new(
        ScriptedFetcher::new().script("Beta", &[Transfer::Cancelled, Transfer::Cancelled]),
    );
    let processor = env.processor(Arc::new(ScriptedExtractor::new()), fetcher.clone());
    let summary = processor.run(None).await.unwrap();

    assert_eq!(summary.completed, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(
        states(&env.store).await,
        vec![
            RecordState::Completed,
            RecordState::Failed,
            RecordState::Completed
        ]
    );
    assert_eq!(fetcher.seen(), vec!["Alpha", "Beta", "Beta", "Gamma"]);

    let beta = env.store.get_by_id(RecordId(2)).await.unwrap();
    assert_removed(&env.layout().dir_for(&beta));
}

#[tokio::test]
async fn test_single_cancellation_recovers_on_retry() {
    let env = TestEnv::new().await;
    ingest_from(&ListSource::named(&["Alpha"]), &env.store)
        .await
        .unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new().script("Alpha", &[Transfer::Cancelled]));
    let processor = env.processor(Arc::new(ScriptedExtractor::new()), fetcher.clone());
    let summary = processor.run(None).await.unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_abort_stops_batch_and_next_run_resumes() {
    let env = TestEnv::new().await;
    ingest_from(&ListSource::named(&["Alpha", "Beta", "Gamma"]), &env.store)
        .await
        .unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new().script("Beta", &[Transfer::Fail]));
    let processor = env.processor(Arc::new(ScriptedExtractor::new()), fetcher.clone());

    let first = processor.run(None).await.unwrap();
    assert_eq!(first.completed, 1);
    assert_eq!(first.aborted, 1);
    assert_eq!(first.end, BatchEnd::Aborted { id: RecordId(2) });
    assert_eq!(first.remaining_pending, 2);
    assert_eq!(
        states(&env.store).await,
        vec![
            RecordState::Completed,
            RecordState::Pending,
            RecordState::Pending
        ]
    );
    let beta = env.store.get_by_id(RecordId(2)).await.unwrap();
    assert_removed(&env.layout().dir_for(&beta));

    let second = processor.run(None).await.unwrap();
    assert_eq!(second.completed, 2);
    assert_eq!(second.end, BatchEnd::Exhausted);
    assert_eq!(fetcher.seen(), vec!["Alpha", "Beta", "Beta", "Gamma"]);
}

#[tokio::test]
async fn test_blank_metadata_aborts_after_attempting_transfer() {
    let env = TestEnv::new().await;
    ingest_from(&ListSource::named(&["Alpha", "Beta"]), &env.store)
        .await
        .unwrap();

    let extractor = Arc::new(ScriptedExtractor::new().blank_for("Alpha"));
    let fetcher = Arc::new(ScriptedFetcher::new());
    let processor = env.processor(extractor.clone(), fetcher.clone());

    let summary = processor.run(None).await.unwrap();
    assert_eq!(summary.end, BatchEnd::Aborted { id: RecordId(1) });
    assert_eq!(fetcher.calls(), 1);
    assert_nothing_in_progress(&env.store).await;

    extractor.heal("Alpha");
    let summary = processor.run(Some(RecordId(1))).await.unwrap();
    assert_eq!(summary.completed, 2);
}

#[tokio::test]
async fn test_extractor_failure_aborts_without_transfer() {
    let env = TestEnv::new().await;
    ingest_from(&ListSource::named(&["Alpha"]), &env.store)
        .await
        .unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new());
    let processor = env.processor(
        Arc::new(ScriptedExtractor::new().failing_for("Alpha")),
        fetcher.clone(),
    );
    let summary = processor.run(None).await.unwrap();

    assert_eq!(summary.end, BatchEnd::Aborted { id: RecordId(1) });
    assert_eq!(fetcher.calls(), 0);
    assert_eq!(states(&env.store).await, vec![RecordState::Pending]);
}

#[tokio::test]
async fn test_generic_transfer_error_aborts() {
    let env = TestEnv::new().await;
    ingest_from(&ListSource::named(&["Alpha", "Beta"]), &env.store)
        .await
        .unwrap();

    let fetcher = Arc::new(ScriptedFetcher::with_default(Transfer::Generic));
    let processor = env.processor(Arc::new(ScriptedExtractor::new()), fetcher.clone());
    let summary = processor.run(None).await.unwrap();

    assert_eq!(summary.end, BatchEnd::Aborted { id: RecordId(1) });
    assert_eq!(fetcher.calls(), 1, "generic errors are not retried");
}

#[tokio::test]
async fn test_disk_full_halts_run_and_releases_record() {
    let env = TestEnv::new().await;
    ingest_from(&ListSource::named(&["Alpha", "Beta"]), &env.store)
        .await
        .unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new().script("Alpha", &[Transfer::Exhausted]));
    let processor = env.processor(Arc::new(ScriptedExtractor::new()), fetcher.clone());
    let mut events = processor.subscribe();

    let err = processor.run(None).await.unwrap_err();
    assert!(err.is_resource_exhausted());
    assert_eq!(err.error_code(), "resource_exhausted");
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(
        states(&env.store).await,
        vec![RecordState::Pending, RecordState::Pending]
    );
    let alpha = env.store.get_by_id(RecordId(1)).await.unwrap();
    assert_removed(&env.layout().dir_for(&alpha));

    let mut reverted = false;
    while let Ok(event) = events.try_recv() {
        if let Event::RecordReverted { id, .. } = event {
            reverted |= id == RecordId(1);
        }
    }
    assert!(reverted);

    // Space freed: the next run picks up where this one stopped
    let summary = processor.run(None).await.unwrap();
    assert_eq!(summary.completed, 2);
}

#[tokio::test]
async fn test_disk_preflight_halts_run_before_any_transfer() {
    let mut env = TestEnv::new().await;
    env.config.disk_space.enabled = true;
    env.config.disk_space.min_free_space = u64::MAX;
    ingest_from(&ListSource::named(&["Alpha"]), &env.store)
        .await
        .unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new());
    let processor = env.processor(Arc::new(ScriptedExtractor::new()), fetcher.clone());

    let err = processor.run(None).await.unwrap_err();
    assert!(err.is_resource_exhausted());
    assert_eq!(fetcher.calls(), 0);
    assert_nothing_in_progress(&env.store).await;
}

#[tokio::test]
async fn test_requeued_failure_is_processed_again() {
    let env = TestEnv::new().await;
    ingest_from(&ListSource::named(&["Alpha"]), &env.store)
        .await
        .unwrap();

    let fetcher = Arc::new(ScriptedFetcher::with_default(Transfer::Cancelled));
    let processor = env.processor(Arc::new(ScriptedExtractor::new()), fetcher.clone());
    processor.run(None).await.unwrap();
    assert_eq!(states(&env.store).await, vec![RecordState::Failed]);

    // A failed record is not picked up again on its own
    let summary = processor.run(None).await.unwrap();
    assert_eq!(summary.processed, 0);

    fetcher.rescript("Alpha", &[Transfer::Ok]);
    assert!(env.store.requeue_failed(RecordId(1)).await.unwrap());
    let summary = processor.run(None).await.unwrap();
    assert_eq!(summary.completed, 1);
}

#[tokio::test]
async fn test_every_run_leaves_store_file_consistent() {
    let env = TestEnv::new().await;
    ingest_from(&ListSource::named(&["Alpha", "Beta", "Gamma", "Delta"]), &env.store)
        .await
        .unwrap();

    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .script("Beta", &[Transfer::Cancelled, Transfer::Cancelled])
            .script("Delta", &[Transfer::Fail]),
    );
    let processor = env.processor(Arc::new(ScriptedExtractor::new()), fetcher);
    processor.run(None).await.unwrap();

    let reloaded = RecordStore::load(env.store.path()).await;
    assert_eq!(reloaded.snapshot().await, env.store.snapshot().await);
    assert_eq!(
        states(&reloaded).await,
        vec![
            RecordState::Completed,
            RecordState::Failed,
            RecordState::Completed,
            RecordState::Pending
        ]
    );
}
