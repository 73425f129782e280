//! End-to-end user flows: intents in, screens and history out.

use std::{sync::Arc, time::Duration};

use leafscan::{
    bootstrap, capture::StaticPermission, App, AppConfig, Database, Error, FileImageSource,
    MemoryRecordStore, RecordStore, RunStatus, Screen, SimulatedClassifier,
};

use crate::mocks::{
    fixed_predictions, write_leaf_png, BrokenClassifier, GatedClassifier, ScriptedSource,
    SlowHistoryStore,
};

async fn app_with(classifier: Arc<dyn leafscan::Classifier>) -> (App, Arc<MemoryRecordStore>) {
    let store = Arc::new(MemoryRecordStore::new());
    let app = bootstrap(
        &AppConfig::default(),
        Arc::new(StaticPermission::granted()),
        store.clone(),
        classifier,
    )
    .await
    .unwrap();
    (app, store)
}

#[tokio::test]
async fn history_lists_newest_first_not_by_confidence() {
    let store = MemoryRecordStore::new();
    store.ensure_schema().await.unwrap();
    store.append("Species_4", 0.91).await.unwrap();
    store.append("Species_9", 0.88).await.unwrap();

    let records = store.list_recent(20).await.unwrap();
    let summary: Vec<_> = records
        .iter()
        .map(|r| (r.species_label.as_str(), r.confidence))
        .collect();
    assert_eq!(summary, [("Species_9", 0.88), ("Species_4", 0.91)]);
}

#[tokio::test]
async fn failed_classification_keeps_capture_screen() {
    let (app, store) = app_with(Arc::new(BrokenClassifier)).await;

    let snapshot = app.capture(&ScriptedSource::ok()).await.unwrap();
    assert_eq!(snapshot.screen, Screen::Capture);
    assert!(snapshot.result.is_none());
    assert!(snapshot.notice.unwrap().message.contains("tensor shape mismatch"));
    assert_eq!(store.count().await.unwrap(), 0);

    assert!(matches!(
        app.identify_another().await,
        Err(Error::InvalidTransition { from: Screen::Capture, .. })
    ));
}

#[tokio::test]
async fn failed_capture_surfaces_notice() {
    let classifier = Arc::new(SimulatedClassifier::new(&Default::default()));
    let (app, _) = app_with(classifier).await;

    let snapshot = app.capture(&ScriptedSource::failing("permission revoked")).await.unwrap();
    assert_eq!(snapshot.screen, Screen::Capture);
    assert!(snapshot.notice.unwrap().message.starts_with("capture failed"));

    // The next attempt starts clean.
    let snapshot = app.capture(&ScriptedSource::ok()).await.unwrap();
    assert_eq!(snapshot.screen, Screen::Results);
    assert!(snapshot.notice.is_none());
}

#[tokio::test]
async fn identify_another_keeps_saved_record() {
    let classifier = Arc::new(GatedClassifier::new(fixed_predictions(0.9)));
    classifier.release.notify_one();
    let (app, store) = app_with(classifier).await;

    let snapshot = app.capture(&ScriptedSource::ok()).await.unwrap();
    assert_eq!(snapshot.screen, Screen::Results);
    assert_eq!(snapshot.result.as_ref().unwrap().top().confidence, 0.9);

    let snapshot = app.identify_another().await.unwrap();
    assert_eq!(snapshot.screen, Screen::Capture);
    assert!(snapshot.result.is_none());

    let records = store.list_recent(20).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].species_label, "Species_4");
    assert_eq!(records[0].confidence, 0.9);
}

#[tokio::test]
async fn persistence_failure_still_shows_predictions() {
    let classifier = Arc::new(GatedClassifier::new(fixed_predictions(0.87)));
    classifier.release.notify_one();
    let (app, store) = app_with(classifier).await;
    store.set_fail_writes(true);

    let snapshot = app.capture(&ScriptedSource::ok()).await.unwrap();
    assert_eq!(snapshot.screen, Screen::Capture);
    let notice = snapshot.notice.unwrap();
    assert!(notice.message.starts_with("result could not be saved"));
    assert_eq!(notice.unsaved_result.unwrap().top().species_label, "Species_4");
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn concurrent_capture_is_busy_and_screens_are_locked() {
    let classifier = Arc::new(GatedClassifier::new(fixed_predictions(0.9)));
    let (app, store) = app_with(classifier.clone()).await;

    let first = {
        let app = app.clone();
        tokio::spawn(async move {
            let source = ScriptedSource::ok();
            app.capture(&source).await
        })
    };
    classifier.entered.notified().await;

    assert_eq!(app.capture(&ScriptedSource::ok()).await.unwrap_err(), Error::PipelineBusy);
    assert_eq!(app.show_history().await.unwrap_err(), Error::TransitionBlocked);
    assert_eq!(app.snapshot().await.screen, Screen::Capture);

    classifier.release.notify_one();
    let snapshot = first.await.unwrap().unwrap();
    assert_eq!(snapshot.screen, Screen::Results);
    assert_eq!(snapshot.result.unwrap(), fixed_predictions(0.9));
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn capture_during_history_read_cannot_start_a_run() {
    let store = Arc::new(SlowHistoryStore::new(Duration::from_millis(50)));
    let classifier = Arc::new(GatedClassifier::new(fixed_predictions(0.9)));
    classifier.release.notify_one();
    let app = bootstrap(
        &AppConfig::default(),
        Arc::new(StaticPermission::granted()),
        store.clone(),
        classifier,
    )
    .await
    .unwrap();

    let history = {
        let app = app.clone();
        tokio::spawn(async move { app.show_history().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let err = app.capture(&ScriptedSource::ok()).await.unwrap_err();
    assert_eq!(
        err,
        Error::InvalidTransition {
            from: Screen::History,
            action: "capture"
        }
    );

    assert_eq!(history.await.unwrap().unwrap().screen, Screen::History);
    assert!(app.pipeline().current().await.is_none());
    assert_eq!(store.inner.count().await.unwrap(), 0);

    assert_eq!(app.new_scan().await.unwrap().screen, Screen::Capture);
    assert_eq!(app.capture(&ScriptedSource::ok()).await.unwrap().screen, Screen::Results);
}

#[tokio::test]
async fn cancelled_capture_leaves_app_usable() {
    let classifier = Arc::new(GatedClassifier::new(fixed_predictions(0.9)));
    let (app, store) = app_with(classifier.clone()).await;

    let attempt =
        tokio::time::timeout(Duration::from_millis(20), app.capture(&ScriptedSource::ok())).await;
    assert!(attempt.is_err());

    assert_eq!(app.pipeline().current().await.unwrap().status, RunStatus::Failed);
    assert_eq!(app.snapshot().await.screen, Screen::Capture);
    assert_eq!(app.show_history().await.unwrap().screen, Screen::History);
    assert_eq!(app.new_scan().await.unwrap().screen, Screen::Capture);

    classifier.release.notify_one();
    let snapshot = app.capture(&ScriptedSource::ok()).await.unwrap();
    assert_eq!(snapshot.screen, Screen::Results);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn gallery_pick_through_sqlite_history() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_leaf_png(dir.path());

    let db = Database::open(dir.path().join("leafscan.sqlite3")).unwrap();
    let mut config = AppConfig::default();
    config.classifier.seed = Some(21);
    let app = bootstrap(
        &config,
        Arc::new(StaticPermission::granted()),
        Arc::new(db),
        Arc::new(SimulatedClassifier::new(&config.classifier)),
    )
    .await
    .unwrap();

    let results = app.capture(&FileImageSource::gallery(&image)).await.unwrap();
    let top = results.result.unwrap().top().clone();

    let history = app.show_history().await.unwrap();
    assert_eq!(history.screen, Screen::History);
    assert_eq!(history.history[0].species_label, top.species_label);
    assert_eq!(history.history[0].confidence, top.confidence);
    assert!(app.pipeline().current().await.is_none());

    let cleared = app.clear_history().await.unwrap();
    assert!(cleared.history.is_empty());
    assert!(app.store().list_recent(20).await.unwrap().is_empty());

    assert_eq!(app.new_scan().await.unwrap().screen, Screen::Capture);
}

#[tokio::test]
async fn history_limit_bounds_visible_records() {
    let store = Arc::new(MemoryRecordStore::new());
    let mut config = AppConfig::default();
    config.history_limit = 2;
    let classifier = Arc::new(SimulatedClassifier::new(&config.classifier));
    let app = bootstrap(&config, Arc::new(StaticPermission::granted()), store.clone(), classifier)
        .await
        .unwrap();

    for _ in 0..3 {
        app.capture(&ScriptedSource::ok()).await.unwrap();
        app.identify_another().await.unwrap();
    }

    assert_eq!(store.count().await.unwrap(), 3);
    assert_eq!(app.show_history().await.unwrap().history.len(), 2);
}
