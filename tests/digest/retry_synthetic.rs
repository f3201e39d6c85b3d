use std::sync::Arc;

use market_digest::{Aggregator, DigestConfig, DigestOrchestrator, Recipient, RetryConfig};

use crate::common::{FakeSummarizer, RecordingDispatcher, ScriptedSource, quick_retry, raws_for};

fn orchestrator(
    summarizer: Arc<FakeSummarizer>,
    dispatcher: Arc<RecordingDispatcher>,
    retry: RetryConfig,
) -> DigestOrchestrator {
    let source = ScriptedSource::new().topic("AAPL", raws_for("AAPL", 1, 2, 1_760_000_000));
    DigestOrchestrator::new(Aggregator::new(Arc::new(source)), summarizer, dispatcher)
        .with_config(DigestConfig {
            retry,
            ..DigestConfig::default()
        })
}

fn ann() -> Vec<Recipient> {
    vec![Recipient::new("a", "ann@example.com", "Ann").with_topics(["AAPL"])]
}

#[tokio::test]
async fn transient_inference_failure_is_retried() {
    let summarizer = Arc::new(FakeSummarizer::new().failing_first(1));
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let orch = orchestrator(summarizer.clone(), dispatcher.clone(), quick_retry(2));

    let report = orch.run_digest_batch(ann()).await;

    assert_eq!(report.sent, 1);
    assert_eq!(summarizer.call_count(), 2);
}

#[tokio::test]
async fn persistent_delivery_failure_stops_after_max_retries() {
    let dispatcher = Arc::new(RecordingDispatcher::new().failing_for("ann@example.com"));
    let orch = orchestrator(Arc::new(FakeSummarizer::new()), dispatcher.clone(), quick_retry(3));

    let report = orch.run_digest_batch(ann()).await;

    assert_eq!((report.summarized, report.sent), (1, 0));
    assert_eq!(dispatcher.attempt_count(), 4);
}

#[tokio::test]
async fn disabled_retry_makes_a_single_attempt() {
    let summarizer = Arc::new(FakeSummarizer::new().failing_first(1));
    let orch = orchestrator(
        summarizer.clone(),
        Arc::new(RecordingDispatcher::new()),
        RetryConfig::disabled(),
    );

    let report = orch.run_digest_batch(ann()).await;

    assert_eq!(report.summarized, 0);
    assert_eq!(summarizer.call_count(), 1);
}

#[test]
fn only_transient_errors_are_retryable() {
    use market_digest::DigestError;

    let retry = RetryConfig::default();
    assert!(retry.should_retry(&DigestError::Inference("busy".into())));
    assert!(retry.should_retry(&DigestError::Status {
        status: 503,
        endpoint: "news".into()
    }));
    assert!(!retry.should_retry(&DigestError::Status {
        status: 401,
        endpoint: "news".into()
    }));
    assert!(!retry.should_retry(&DigestError::InvalidParams("bad".into())));
    assert!(!RetryConfig::disabled().should_retry(&DigestError::Delivery("x".into())));
}

#[test]
fn exponential_backoff_is_capped() {
    use market_digest::Backoff;
    use std::time::Duration;

    let b = Backoff::Exponential {
        base: Duration::from_secs(1),
        factor: 2.0,
        max: Duration::from_secs(5),
        jitter: false,
    };
    assert_eq!(b.delay_for(0), Duration::from_secs(1));
    assert_eq!(b.delay_for(2), Duration::from_secs(4));
    assert_eq!(b.delay_for(10), Duration::from_secs(5));
    assert_eq!(Backoff::Fixed(Duration::from_millis(7)).delay_for(3), Duration::from_millis(7));
}

#[test]
fn jittered_backoff_spreads_around_the_capped_delay() {
    use market_digest::Backoff;
    use std::collections::BTreeSet;
    use std::time::Duration;

    let b = Backoff::Exponential {
        base: Duration::from_secs(2),
        factor: 2.0,
        max: Duration::from_secs(4),
        jitter: true,
    };
    let draws: Vec<Duration> = (0..64).map(|_| b.delay_for(1)).collect();
    assert!(
        draws
            .iter()
            .all(|d| *d >= Duration::from_secs(2) && *d < Duration::from_secs(6))
    );
    let distinct: BTreeSet<Duration> = draws.into_iter().collect();
    assert!(distinct.len() > 1, "jitter produced a single value");
}
