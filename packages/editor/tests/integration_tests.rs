//! Integration tests for the editing session
//!
//! Time is paused in every async test, so quiet periods and backend latency
//! advance deterministically.

use folio_editor::{
    EditorConfig, EditorError, FinalWrite, MemoryBackend, MemorySurface, NotifyKind, PersistError,
    RecordingNotifier, SaveState, SessionBuilder, SessionHandle, SessionPhase, SurfaceAdapter,
    VersionOrigin,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const DOC: &str = "essay-7";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Fixture {
    backend: Arc<MemoryBackend>,
    notifier: Arc<RecordingNotifier>,
    session: SessionHandle,
}

async fn open_with(config: EditorConfig, content: &str) -> Fixture {
    init_tracing();
    let backend = Arc::new(MemoryBackend::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let session = SessionBuilder::new(DOC, backend.clone())
        .config(config)
        .notifier(notifier.clone())
        .open(content)
        .await;
    Fixture {
        backend,
        notifier,
        session,
    }
}

async fn open(content: &str) -> Fixture {
    open_with(EditorConfig::default(), content).await
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[tokio::test(start_paused = true)]
async fn test_edit_then_autosave_scenario() -> anyhow::Result<()> {
    let Fixture { backend, session, .. } = open("<p>Hello</p>").await;

    session.on_editor_change("<p>Hello world</p>")?;
    sleep(ms(3100)).await;
    let versions = session.versions().await?;

    let saves = backend.saves();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].content, "<p>Hello world</p>");
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].change_note, "Auto-saved");
    assert_eq!(versions[0].content, "<p>Hello world</p>");
    assert_eq!(versions[1].change_note, "Initial version");

    let status = session.status();
    assert_eq!(status.phase, SessionPhase::Clean);
    assert!(status.last_saved_at.is_some());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_debounce_writes_once_after_last_edit() -> anyhow::Result<()> {
    let Fixture { backend, session, .. } = open("<p>a</p>").await;

    for (i, content) in ["<p>ab</p>", "<p>abc</p>", "<p>abcd</p>"].iter().enumerate() {
        if i > 0 {
            sleep(ms(1000)).await;
        }
        session.on_editor_change(content)?;
    }

    // Last edit at 2s: nothing before 5s
    sleep(ms(2900)).await;
    session.versions().await?;
    assert_eq!(backend.save_count(), 0);
    assert_eq!(session.status().save_state, SaveState::Armed);

    sleep(ms(200)).await;
    session.versions().await?;
    let saves = backend.saves();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].content, "<p>abcd</p>");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_manual_save_queues_behind_autosave() -> anyhow::Result<()> {
    let Fixture { backend, session, .. } = open("<p>a</p>").await;
    backend.set_latency(ms(2000));

    session.on_editor_change("<p>b</p>")?;
    sleep(ms(3100)).await;
    assert!(session.status().saving);

    session.on_editor_change("<p>c</p>")?;
    let report = session.manual_save().await?;

    assert!(report.written);
    assert_eq!(backend.max_concurrent_saves(), 1);
    let contents: Vec<_> = backend.saves().into_iter().map(|s| s.content).collect();
    assert_eq!(contents, vec!["<p>b</p>", "<p>c</p>"]);

    let notes: Vec<_> = session.versions().await?.into_iter().map(|v| v.change_note).collect();
    assert_eq!(notes, vec!["Manual save", "Auto-saved", "Initial version"]);

    // Nothing left to write
    sleep(ms(10_000)).await;
    session.versions().await?;
    assert_eq!(backend.save_count(), 2);
    assert!(!session.status().dirty);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_manual_save_covered_by_running_autosave() -> anyhow::Result<()> {
    let Fixture { backend, session, .. } = open("<p>a</p>").await;
    backend.set_latency(ms(2000));

    session.on_editor_change("<p>b</p>")?;
    sleep(ms(3100)).await;

    let report = session.manual_save().await?;
    assert!(!report.written);
    assert!(report.saved_at.is_some());
    assert_eq!(backend.save_count(), 1);
    assert_eq!(backend.max_concurrent_saves(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_manual_save_on_clean_document_does_not_write() -> anyhow::Result<()> {
    let Fixture { backend, notifier, session } = open("<p>a</p>").await;

    let report = session.manual_save().await?;
    assert!(!report.written);
    assert_eq!(backend.save_count(), 0);
    assert_eq!(notifier.count(NotifyKind::Success), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_dirty_lifecycle_with_failed_manual_save() -> anyhow::Result<()> {
    let Fixture { backend, notifier, session } = open("<p>a</p>").await;
    session.content().await?;
    assert!(!session.status().dirty);

    session.on_editor_change("<p>b</p>")?;
    session.content().await?;
    assert!(session.status().dirty);

    backend.fail_next(PersistError::io("connection reset"));
    let err = session.manual_save().await.unwrap_err();
    assert!(err.is_retryable());

    let status = session.status();
    assert!(status.dirty);
    assert_eq!(status.phase, SessionPhase::Dirty);
    assert!(status.last_error.as_deref().unwrap_or("").contains("connection reset"));
    assert!(status.last_saved_at.is_none());
    assert_eq!(notifier.count(NotifyKind::Error), 1);

    let report = session.manual_save().await?;
    assert!(report.written);
    let status = session.status();
    assert!(!status.dirty);
    assert!(status.last_error.is_none());
    assert_eq!(backend.document(DOC).as_deref(), Some("<p>b</p>"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failed_autosave_retries_on_next_tick() -> anyhow::Result<()> {
    let Fixture { backend, notifier, session } = open("<p>a</p>").await;
    backend.fail_next(PersistError::rejected("quota exceeded"));

    session.on_editor_change("<p>b</p>")?;
    sleep(ms(3100)).await;
    session.versions().await?;
    assert_eq!(backend.save_count(), 0);
    assert!(session.status().dirty);
    assert_eq!(session.status().save_state, SaveState::Armed);
    assert_eq!(notifier.count(NotifyKind::Error), 1);

    sleep(ms(3000)).await;
    session.versions().await?;
    assert_eq!(backend.save_count(), 1);
    assert!(!session.status().dirty);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_edit_during_write_rearms() -> anyhow::Result<()> {
    let Fixture { backend, session, .. } = open("<p>a</p>").await;
    backend.set_latency(ms(1000));

    session.on_editor_change("<p>b</p>")?;
    sleep(ms(3500)).await;
    session.on_editor_change("<p>c</p>")?;

    // First write lands at 4s; the document moved on, so it stays dirty
    sleep(ms(1000)).await;
    session.versions().await?;
    assert_eq!(backend.save_count(), 1);
    assert!(session.status().dirty);

    // Re-armed from the edit at 3.5s
    sleep(ms(1900)).await;
    session.versions().await?;
    assert_eq!(backend.save_count(), 1);

    sleep(ms(2000)).await;
    session.versions().await?;
    let saves = backend.saves();
    assert_eq!(saves.len(), 2);
    assert_eq!(saves[1].content, "<p>c</p>");
    assert!(!session.status().dirty);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_restore_records_restore_note() -> anyhow::Result<()> {
    let Fixture { backend, session, .. } = open("<p>first</p>").await;

    session.on_editor_change("<p>second</p>")?;
    session.manual_save().await?;

    let versions = session.versions().await?;
    let initial = versions.last().cloned().expect("initial version");
    let content = session.restore(&initial.id).await?;
    assert_eq!(content, "<p>first</p>");
    assert_eq!(session.content().await?, "<p>first</p>");
    assert!(session.status().dirty);

    let report = session.manual_save().await?;
    let entry = report.version.expect("version recorded");
    assert!(entry.change_note.starts_with("Restored version from "));
    assert_eq!(entry.origin, VersionOrigin::Restore { from: initial.created_at });
    assert_eq!(backend.document(DOC).as_deref(), Some("<p>first</p>"));

    // The following save is an ordinary one again
    session.on_editor_change("<p>third</p>")?;
    let report = session.manual_save().await?;
    assert_eq!(report.version.map(|v| v.change_note).as_deref(), Some("Manual save"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_restore_evicted_version_is_not_found() -> anyhow::Result<()> {
    let config = EditorConfig::default().with_version_capacity(2);
    let Fixture { notifier, session, .. } = open_with(config, "<p>v1</p>").await;

    let initial = session.versions().await?[0].clone();
    session.on_editor_change("<p>v2</p>")?;
    session.manual_save().await?;
    session.on_editor_change("<p>v3</p>")?;
    session.manual_save().await?;
    assert_eq!(session.versions().await?.len(), 2);

    let result = session.restore(&initial.id).await;
    assert!(matches!(result, Err(EditorError::VersionNotFound(id)) if id == initial.id));
    assert_eq!(session.content().await?, "<p>v3</p>");
    assert!(!session.status().dirty);

    let last = notifier.last().expect("notification");
    assert_eq!(last.kind, NotifyKind::Error);
    assert_eq!(last.title, "Version unavailable");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_version_history_is_capped() -> anyhow::Result<()> {
    let Fixture { session, .. } = open("<p>0</p>").await;

    for i in 1..=15 {
        session.on_editor_change(&format!("<p>{}</p>", i))?;
        session.manual_save().await?;
    }

    let versions = session.versions().await?;
    assert_eq!(versions.len(), 10);
    assert_eq!(versions[0].content, "<p>15</p>");
    assert_eq!(versions[9].content, "<p>6</p>");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_load_during_write_writes_loaded_content_back() -> anyhow::Result<()> {
    let Fixture { backend, session, .. } = open("<p>old</p>").await;
    backend.set_latency(ms(2000));

    session.on_editor_change("<p>old edited</p>")?;
    sleep(ms(3100)).await;
    session.load("<p>fresh</p>").await?;

    // The earlier write lands at 5s and leaves the store behind the session
    sleep(ms(2000)).await;
    let versions = session.versions().await?;
    assert_eq!(backend.document(DOC).as_deref(), Some("<p>old edited</p>"));
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].content, "<p>fresh</p>");
    let status = session.status();
    assert!(status.dirty);
    assert_eq!(status.save_state, SaveState::Armed);

    // Re-armed at 5s, written 8s..10s
    sleep(ms(6000)).await;
    session.versions().await?;
    assert_eq!(backend.save_count(), 2);
    assert_eq!(backend.document(DOC).as_deref(), Some("<p>fresh</p>"));
    assert_eq!(backend.max_concurrent_saves(), 1);
    assert!(!session.status().dirty);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_load_matching_running_write_stays_clean() -> anyhow::Result<()> {
    let Fixture { backend, session, .. } = open("<p>old</p>").await;
    backend.set_latency(ms(2000));

    session.on_editor_change("<p>same</p>")?;
    sleep(ms(3100)).await;
    session.load("<p>same</p>").await?;

    sleep(ms(20_000)).await;
    let versions = session.versions().await?;
    assert_eq!(backend.save_count(), 1);
    assert_eq!(versions.len(), 1);
    let status = session.status();
    assert!(!status.dirty);
    assert_eq!(status.save_state, SaveState::Idle);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_close_writes_unsaved_changes() -> anyhow::Result<()> {
    let Fixture { backend, session, .. } = open("<p>a</p>").await;

    session.on_editor_change("<p>unsaved</p>")?;
    let report = session.close().await?;

    assert_eq!(report.final_write, FinalWrite::Saved);
    assert_eq!(report.discarded_versions, 2);
    assert!(!report.archived);
    assert_eq!(backend.document(DOC).as_deref(), Some("<p>unsaved</p>"));

    assert!(matches!(session.versions().await, Err(EditorError::SessionClosed)));
    assert!(matches!(session.on_editor_change("<p>x</p>"), Err(EditorError::SessionClosed)));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_close_waits_for_running_write() -> anyhow::Result<()> {
    let Fixture { backend, session, .. } = open("<p>a</p>").await;
    backend.set_latency(ms(2000));

    session.on_editor_change("<p>b</p>")?;
    sleep(ms(3100)).await;
    let report = session.close().await?;

    assert_eq!(report.final_write, FinalWrite::NotNeeded);
    assert_eq!(backend.save_count(), 1);
    assert_eq!(backend.max_concurrent_saves(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failed_final_write_is_reported() -> anyhow::Result<()> {
    let Fixture { backend, session, .. } = open("<p>a</p>").await;
    backend.fail_next(PersistError::io("offline"));

    session.on_editor_change("<p>b</p>")?;
    let report = session.close().await?;
    assert!(matches!(report.final_write, FinalWrite::Failed(ref message) if message.contains("offline")));
    assert_eq!(backend.document(DOC), None);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handles_closes_session() -> anyhow::Result<()> {
    let Fixture { backend, session, .. } = open("<p>a</p>").await;

    session.on_editor_change("<p>b</p>")?;
    drop(session);

    sleep(ms(10)).await;
    assert_eq!(backend.document(DOC).as_deref(), Some("<p>b</p>"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_history_archive_round_trip() -> anyhow::Result<()> {
    init_tracing();
    let backend = Arc::new(MemoryBackend::new());

    let session = SessionBuilder::new(DOC, backend.clone())
        .archive(backend.clone())
        .open("<p>a</p>")
        .await;
    session.on_editor_change("<p>b</p>")?;
    session.manual_save().await?;
    let report = session.close().await?;
    assert!(report.archived);
    assert_eq!(backend.archived_history(DOC).len(), 2);

    let reopened = SessionBuilder::new(DOC, backend.clone())
        .archive(backend.clone())
        .open_from_store()
        .await?;
    assert_eq!(reopened.content().await?, "<p>b</p>");
    let notes: Vec<_> = reopened.versions().await?.into_iter().map(|v| v.change_note).collect();
    assert_eq!(notes, vec!["Manual save", "Initial version"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_archive_writes_leave_save_failures_alone() -> anyhow::Result<()> {
    init_tracing();
    let backend = Arc::new(MemoryBackend::new());
    let session = SessionBuilder::new(DOC, backend.clone())
        .archive(backend.clone())
        .open("<p>a</p>")
        .await;

    session.on_editor_change("<p>b</p>")?;
    session.manual_save().await?;

    backend.fail_next(PersistError::io("offline"));
    session.on_editor_change("<p>c</p>")?;
    sleep(ms(10)).await;
    assert!(session.manual_save().await.is_err());
    assert_eq!(backend.document(DOC).as_deref(), Some("<p>b</p>"));

    // One for the store after the final write, one for the closing store
    backend.fail_next_archive(PersistError::rejected("archive offline"));
    backend.fail_next_archive(PersistError::rejected("archive offline"));
    let report = session.close().await?;
    assert_eq!(report.final_write, FinalWrite::Saved);
    assert!(!report.archived);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_open_from_store_without_content() -> anyhow::Result<()> {
    let backend = Arc::new(MemoryBackend::new());
    let session = SessionBuilder::new("blank", backend).open_from_store().await?;

    assert_eq!(session.content().await?, "");
    assert!(session.versions().await?.is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_saved_callback_runs_for_manual_saves_only() -> anyhow::Result<()> {
    let backend = Arc::new(MemoryBackend::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let session = SessionBuilder::new(DOC, backend.clone())
        .on_saved(move |report| {
            assert!(report.saved_at.is_some());
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .open("<p>a</p>")
        .await;

    session.on_editor_change("<p>b</p>")?;
    sleep(ms(3100)).await;
    session.versions().await?;
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    session.on_editor_change("<p>c</p>")?;
    session.manual_save().await?;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_status_subscription_sees_dirty() -> anyhow::Result<()> {
    let Fixture { session, .. } = open("<p>a</p>").await;
    let mut status = session.subscribe();
    session.content().await?;
    status.borrow_and_update();

    session.on_editor_change("<p>b</p>")?;
    status.changed().await?;
    let current = status.borrow_and_update().clone();
    assert_eq!(current.phase, SessionPhase::Dirty);
    assert_eq!(current.revision, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_attached_adapter_drives_session() -> anyhow::Result<()> {
    let Fixture { backend, session, .. } = open("<p>Hello</p>").await;
    let mut adapter = SurfaceAdapter::mount(MemorySurface::from_markup("<p>Hello</p>"));
    session.attach(&mut adapter);

    assert!(adapter.apply_command("bold", None));
    assert!(!adapter.apply_command("noSuchCommand", None));
    assert_eq!(session.content().await?, "<p><strong>Hello</strong></p>");

    sleep(ms(3100)).await;
    session.versions().await?;
    assert_eq!(backend.document(DOC).as_deref(), Some("<p><strong>Hello</strong></p>"));

    // Restoring pushes content back into the surface without an echo
    let initial = session.versions().await?.last().cloned().expect("initial version");
    let restored = session.restore(&initial.id).await?;
    adapter.set_content(&restored);
    assert_eq!(adapter.get_content(), "<p>Hello</p>");
    assert_eq!(session.status().revision, 2);
    Ok(())
}
