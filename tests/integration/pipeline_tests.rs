//! Busy-guard and run lifecycle against real and mock collaborators.

use std::{sync::Arc, time::Duration};

use leafscan::{
    Database, Error, IdentificationPipeline, MemoryRecordStore, RecordStore, RunStatus,
};

use crate::mocks::{fixed_predictions, GatedClassifier, ScriptedSource};

async fn memory_store() -> Arc<MemoryRecordStore> {
    let store = Arc::new(MemoryRecordStore::new());
    store.ensure_schema().await.unwrap();
    store
}

#[tokio::test]
async fn second_capture_while_classifying_is_rejected() {
    let store = memory_store().await;
    let classifier = Arc::new(GatedClassifier::new(fixed_predictions(0.9)));
    let pipeline = IdentificationPipeline::new(classifier.clone(), store.clone(), Duration::from_secs(5));

    let first = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            let source = ScriptedSource::ok();
            pipeline.identify(&source).await
        })
    };

    classifier.entered.notified().await;
    assert_eq!(pipeline.current().await.unwrap().status, RunStatus::Classifying);
    assert!(pipeline.is_active().await);

    let err = pipeline.identify(&ScriptedSource::ok()).await.unwrap_err();
    assert_eq!(err, Error::PipelineBusy);
    assert_eq!(pipeline.discard().await.unwrap_err(), Error::PipelineBusy);

    classifier.release.notify_one();
    let run = first.await.unwrap().unwrap();

    assert_eq!(run.status, RunStatus::Done);
    assert_eq!(run.result.as_ref().unwrap(), &fixed_predictions(0.9));
    let saved = store.list_recent(20).await.unwrap();
    assert_eq!(saved.len(), 1, "rejected capture must not write anything");
    assert_eq!(saved[0].species_label, "Species_4");
}

#[tokio::test]
async fn fresh_run_allowed_after_terminal_state() {
    let store = memory_store().await;
    let classifier = Arc::new(GatedClassifier::new(fixed_predictions(0.8)));
    let pipeline = IdentificationPipeline::new(classifier.clone(), store.clone(), Duration::from_secs(5));

    let failed = pipeline
        .identify(&ScriptedSource::failing("shutter jammed"))
        .await
        .unwrap();
    assert_eq!(failed.status, RunStatus::Failed);
    assert!(!pipeline.is_active().await);

    classifier.release.notify_one();
    let done = pipeline.identify(&ScriptedSource::ok()).await.unwrap();
    assert_eq!(done.status, RunStatus::Done);
    assert_ne!(done.id, failed.id);
}

#[tokio::test]
async fn status_updates_are_published_in_order() {
    let store = memory_store().await;
    let classifier = Arc::new(GatedClassifier::new(fixed_predictions(0.9)));
    let pipeline = IdentificationPipeline::new(classifier.clone(), store, Duration::from_secs(5));
    let mut updates = pipeline.subscribe();

    let handle = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            let source = ScriptedSource::ok();
            pipeline.identify(&source).await
        })
    };

    classifier.entered.notified().await;
    updates
        .wait_for(|run| run.as_ref().is_some_and(|r| r.status == RunStatus::Classifying))
        .await
        .unwrap();

    classifier.release.notify_one();
    handle.await.unwrap().unwrap();
    let last = updates.borrow_and_update().clone().unwrap();
    assert_eq!(last.status, RunStatus::Done);
    assert!(last.record.is_some());
}

#[tokio::test]
async fn sqlite_backed_run_is_durable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("leafscan.sqlite3");

    let expected = {
        let db = Database::open(path.clone()).unwrap();
        RecordStore::ensure_schema(&db).await.unwrap();
        let classifier = Arc::new(GatedClassifier::new(fixed_predictions(0.93)));
        classifier.release.notify_one();
        let pipeline = IdentificationPipeline::new(classifier, Arc::new(db), Duration::from_secs(5));
        pipeline.identify(&ScriptedSource::ok()).await.unwrap().record.unwrap()
    };

    let reopened = Database::open(path).unwrap();
    RecordStore::ensure_schema(&reopened).await.unwrap();
    let records = reopened.list_recent(20).await.unwrap();
    assert_eq!(records, vec![expected]);
}
