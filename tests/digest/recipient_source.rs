use std::sync::Arc;
use std::time::Duration;

use market_digest::digest::PortFuture;
use market_digest::{
    Aggregator, DigestConfig, DigestError, DigestOrchestrator, Recipient, RecipientSource,
    StaticRecipients,
};

use crate::common::{FakeSummarizer, RecordingDispatcher, ScriptedSource, raws_for};

struct BrokenStore;

impl RecipientSource for BrokenStore {
    fn list_digest_recipients(&self) -> PortFuture<'_, Vec<Recipient>> {
        Box::pin(async { Err(DigestError::InvalidParams("connection refused".into())) })
    }
}

struct HangingStore;

impl RecipientSource for HangingStore {
    fn list_digest_recipients(&self) -> PortFuture<'_, Vec<Recipient>> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Vec::new())
        })
    }
}

fn orchestrator(dispatcher: Arc<RecordingDispatcher>) -> DigestOrchestrator {
    let source = ScriptedSource::new().general(raws_for("Markets", 1, 3, 1_760_000_000));
    DigestOrchestrator::new(
        Aggregator::new(Arc::new(source)),
        Arc::new(FakeSummarizer::new()),
        dispatcher,
    )
}

#[tokio::test]
async fn unavailable_source_attempts_nobody() {
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let err = orchestrator(dispatcher.clone())
        .run_from_source(&BrokenStore)
        .await
        .unwrap_err();

    match err {
        DigestError::RecipientSource(msg) => assert!(msg.contains("connection refused")),
        other => panic!("expected RecipientSource, got {other:?}"),
    }
    assert_eq!(dispatcher.attempt_count(), 0);
}

#[tokio::test]
async fn hanging_source_times_out() {
    let orch = orchestrator(Arc::new(RecordingDispatcher::new())).with_config(DigestConfig {
        lookup_deadline: Duration::from_millis(50),
        ..DigestConfig::default()
    });

    let err = orch.run_from_source(&HangingStore).await.unwrap_err();
    assert!(matches!(err, DigestError::RecipientSource(_)));
}

#[tokio::test]
async fn static_recipients_feed_a_full_run() {
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let source = StaticRecipients(vec![
        Recipient::new("1", "one@example.com", "One"),
        Recipient::new("2", "two@example.com", "Two"),
    ]);

    let report = orchestrator(dispatcher.clone())
        .run_from_source(&source)
        .await
        .unwrap();

    assert_eq!((report.attempted, report.summarized, report.sent), (2, 2, 2));
    assert_eq!(dispatcher.sent_emails().len(), 2);
}
