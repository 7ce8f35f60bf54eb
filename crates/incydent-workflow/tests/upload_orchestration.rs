//! Orchestrator behavior: concurrency outcome, aggregation, failure
//! semantics.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{evidence_files, MockStorage};
use incydent_core::{AccessCredential, MediaBuffer, UploadPhase};
use incydent_workflow::{UploadError, UploadOrchestrator};

const POLL: Duration = Duration::from_millis(10);

fn buffer_with(paths: &[std::path::PathBuf]) -> MediaBuffer {
    let mut buffer = MediaBuffer::new();
    for path in paths {
        buffer.add_file(path).unwrap();
    }
    buffer
}

#[tokio::test]
async fn successful_upload_completes_every_record_at_one_hundred() {
    let (_dir, paths) = evidence_files(&["a.jpg", "b.mp4", "c.pdf"]);
    let buffer = buffer_with(&paths);
    let storage = MockStorage::new();
    let orchestrator = UploadOrchestrator::new(storage.clone(), POLL);

    let task = orchestrator.start(buffer.items(), &AccessCredential::new("tok"));
    let progress = task.progress();
    let outcome = task.outcome().await.expect("upload succeeds");

    assert_eq!(outcome.folder.shareable_url, "https://drive.example/folder");
    assert_eq!(outcome.records.len(), 3);
    for record in &outcome.records {
        assert_eq!(record.phase(), UploadPhase::Completed);
        assert_eq!(record.percent(), 100);
        assert!(record.remote_reference().is_some());
    }
    // Final published aggregate is exactly 100.
    assert_eq!(*progress.borrow(), 100);
    assert_eq!(storage.upload_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn partial_failure_lists_exactly_the_failed_ids() {
    let (_dir, paths) = evidence_files(&["a.jpg", "b.jpg", "c.jpg"]);
    let buffer = buffer_with(&paths);
    let failed_id = buffer
        .items()
        .iter()
        .find(|i| i.display_name == "b.jpg")
        .unwrap()
        .id;

    let storage = MockStorage::new();
    storage.fail_file("b.jpg");
    let orchestrator = UploadOrchestrator::new(storage.clone(), POLL);

    let error = orchestrator
        .upload_all(buffer.items(), &AccessCredential::new("tok"))
        .await
        .expect_err("one file fails");

    match error {
        UploadError::PartialUploadFailure { failed } => assert_eq!(failed, vec![failed_id]),
        other => panic!("unexpected error: {other:?}"),
    }
    // Completed files stay uploaded; nothing is rolled back.
    let mut completed = storage.completed.lock().unwrap().clone();
    completed.sort();
    assert_eq!(completed, ["a.jpg", "c.jpg"]);
}

#[tokio::test]
async fn missing_credential_fails_before_any_network_activity() {
    let (_dir, paths) = evidence_files(&["a.jpg"]);
    let buffer = buffer_with(&paths);
    let storage = MockStorage::new();
    let orchestrator = UploadOrchestrator::new(storage.clone(), POLL);

    let error = orchestrator
        .upload_all(buffer.items(), &AccessCredential::new("  "))
        .await
        .expect_err("credential gate");

    assert!(matches!(error, UploadError::MissingCredential));
    assert_eq!(storage.folder_calls.load(Ordering::SeqCst), 0);
    assert_eq!(storage.upload_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn folder_failure_attempts_no_per_file_uploads() {
    let (_dir, paths) = evidence_files(&["a.jpg", "b.jpg"]);
    let buffer = buffer_with(&paths);
    let storage = MockStorage::failing_folder();
    let orchestrator = UploadOrchestrator::new(storage.clone(), POLL);

    let error = orchestrator
        .upload_all(buffer.items(), &AccessCredential::new("tok"))
        .await
        .expect_err("folder creation fails");

    assert!(matches!(error, UploadError::FolderCreationFailed(_)));
    assert_eq!(storage.folder_calls.load(Ordering::SeqCst), 1);
    assert_eq!(storage.upload_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_buffer_is_refused() {
    let storage = MockStorage::new();
    let orchestrator = UploadOrchestrator::new(storage.clone(), POLL);

    let error = orchestrator
        .upload_all(&[], &AccessCredential::new("tok"))
        .await
        .expect_err("nothing to upload");
    assert!(matches!(error, UploadError::NothingToUpload));
}

#[tokio::test]
async fn aggregate_progress_is_the_rounded_mean_and_never_decreases() {
    let (_dir, paths) = evidence_files(&["a.jpg", "b.jpg"]);
    let buffer = buffer_with(&paths);

    let storage = MockStorage::new();
    storage.set_steps("a.jpg", vec![40]);
    storage.set_steps("b.jpg", vec![80]);
    let gate_a = storage.hold_file("a.jpg");
    let gate_b = storage.hold_file("b.jpg");

    let orchestrator = UploadOrchestrator::new(storage.clone(), POLL);
    let task = orchestrator.start(buffer.items(), &AccessCredential::new("tok"));
    let mut progress = task.progress();

    // Both transfers are parked mid-flight at 40 % and 80 %; the aggregate
    // must settle on the rounded mean.
    let mut samples = vec![*progress.borrow()];
    while *progress.borrow() < 60 {
        tokio::time::timeout(Duration::from_secs(2), progress.changed())
            .await
            .expect("aggregate reaches the mean")
            .unwrap();
        samples.push(*progress.borrow());
    }
    assert_eq!(*progress.borrow(), 60);

    gate_a.notify_one();
    gate_b.notify_one();
    let outcome = task.outcome().await.expect("upload succeeds");
    assert_eq!(outcome.records.len(), 2);
    samples.push(*progress.borrow());

    assert_eq!(*samples.last().unwrap(), 100);
    assert!(
        samples.windows(2).all(|w| w[0] <= w[1]),
        "aggregate decreased: {samples:?}"
    );
    assert!(samples.iter().all(|&s| s <= 100));
}
