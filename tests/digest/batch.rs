use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use market_digest::{
    Aggregator, Digest, DigestConfig, DigestOrchestrator, OutcomeStatus, Phase, Recipient,
    SkipReason,
};

use crate::common::{
    FakeSummarizer, MapTopics, RecordingDispatcher, ScriptedSource, quick_retry, raws_for,
};

const NOW: i64 = 1_760_000_000;

fn market_source() -> ScriptedSource {
    ScriptedSource::new()
        .topic("AAPL", raws_for("AAPL", 100, 3, NOW))
        .topic("TSLA", raws_for("TSLA", 200, 3, NOW - 600))
        .topic("MSFT", raws_for("MSFT", 300, 3, NOW - 1_200))
        .general(raws_for("Markets", 900, 4, NOW))
}

fn orchestrator(
    source: Arc<ScriptedSource>,
    summarizer: Arc<FakeSummarizer>,
    dispatcher: Arc<RecordingDispatcher>,
) -> DigestOrchestrator {
    DigestOrchestrator::new(Aggregator::new(source), summarizer, dispatcher).with_config(
        DigestConfig {
            retry: quick_retry(2),
            ..DigestConfig::default()
        },
    )
}

fn three_recipients() -> Vec<Recipient> {
    vec![
        Recipient::new("a", "a@example.com", "Ann").with_topics(["AAPL"]),
        Recipient::new("b", "b@example.com", "Ben").with_topics(["TSLA"]),
        Recipient::new("c", "c@example.com", "Cy").with_topics(["MSFT"]),
    ]
}

#[tokio::test]
async fn one_summarizer_failure_does_not_block_the_others() {
    let summarizer = Arc::new(FakeSummarizer::new().failing_on("TSLA"));
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let orch = orchestrator(Arc::new(market_source()), summarizer, dispatcher.clone());

    let report = orch.run_digest_batch(three_recipients()).await;

    assert_eq!((report.attempted, report.summarized, report.sent), (3, 2, 2));
    assert!(!report.cancelled);
    assert_eq!(
        dispatcher.sent_emails(),
        BTreeSet::from(["a@example.com".to_string(), "c@example.com".to_string()])
    );
    match &report.outcome("b").unwrap().status {
        OutcomeStatus::Skipped {
            phase: Phase::Summarize,
            reason: SkipReason::Failed(msg),
        } => assert!(msg.contains("inference"), "{msg}"),
        other => panic!("unexpected outcome for b: {other:?}"),
    }
    assert_eq!(report.outcome("a").unwrap().status, OutcomeStatus::Sent);
    let ids: Vec<_> = report.outcomes.iter().map(|o| o.recipient_id.as_str()).collect();
    assert_eq!(ids, ["a", "b", "c"]);
}

#[tokio::test]
async fn recipients_without_topics_get_the_general_feed() {
    let source = Arc::new(market_source());
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let orch = orchestrator(
        source.clone(),
        Arc::new(FakeSummarizer::new()),
        dispatcher.clone(),
    );

    let report = orch
        .run_digest_batch(vec![Recipient::new("g", "g@example.com", "Gil")])
        .await;

    assert_eq!(report.sent, 1);
    assert_eq!(source.topic_calls(), 0);
    assert_eq!(source.general_calls(), 1);
    let (contact, digest) = dispatcher.sent().remove(0);
    assert_eq!(contact.display_name, "Gil");
    assert_eq!(digest.article_count, 4);
    assert!(digest.content.starts_with("Today: Markets story 0"));
}

#[tokio::test]
async fn nothing_to_summarize_is_a_skip_not_a_failure() {
    let source = Arc::new(ScriptedSource::new().topic("ZZZZ", vec![]));
    let summarizer = Arc::new(FakeSummarizer::new());
    let orch = orchestrator(
        source,
        summarizer.clone(),
        Arc::new(RecordingDispatcher::new()),
    );

    let report = orch
        .run_digest_batch(vec![
            Recipient::new("q", "q@example.com", "Quinn").with_topics(["ZZZZ"]),
        ])
        .await;

    assert_eq!((report.attempted, report.summarized, report.sent), (1, 0, 0));
    assert_eq!(
        report.outcome("q").unwrap().status,
        OutcomeStatus::Skipped {
            phase: Phase::Summarize,
            reason: SkipReason::NoArticles,
        }
    );
    assert_eq!(summarizer.call_count(), 0);
}

#[tokio::test]
async fn fetch_failure_skips_only_that_recipient() {
    let source = Arc::new(
        ScriptedSource::new()
            .topic("AAPL", raws_for("AAPL", 100, 2, NOW))
            .script("DOWN", vec![crate::common::Step::Fail(500); 6])
            .general_fails(503),
    );
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let orch = orchestrator(source, Arc::new(FakeSummarizer::new()), dispatcher.clone());

    let report = orch
        .run_digest_batch(vec![
            Recipient::new("ok", "ok@example.com", "Ok").with_topics(["AAPL"]),
            Recipient::new("down", "down@example.com", "Down").with_topics(["DOWN"]),
        ])
        .await;

    assert_eq!((report.attempted, report.summarized, report.sent), (2, 1, 1));
    assert!(matches!(
        report.outcome("down").unwrap().status,
        OutcomeStatus::Skipped {
            phase: Phase::Fetch,
            ..
        }
    ));
}

#[tokio::test]
async fn delivery_failure_still_counts_as_summarized() {
    let dispatcher = Arc::new(RecordingDispatcher::new().failing_for("b@example.com"));
    let orch = orchestrator(
        Arc::new(market_source()),
        Arc::new(FakeSummarizer::new()),
        dispatcher.clone(),
    );

    let report = orch.run_digest_batch(three_recipients()).await;

    assert_eq!((report.attempted, report.summarized, report.sent), (3, 3, 2));
    assert!(matches!(
        report.outcome("b").unwrap().status,
        OutcomeStatus::Skipped {
            phase: Phase::Dispatch,
            ..
        }
    ));
    // Two deliveries plus one initial attempt and two retries for b.
    assert_eq!(dispatcher.attempt_count(), 5);
}

#[tokio::test]
async fn blank_summary_is_rejected() {
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let orch = orchestrator(
        Arc::new(market_source()),
        Arc::new(FakeSummarizer::new().returning_empty()),
        dispatcher.clone(),
    )
    .with_config(DigestConfig {
        retry: market_digest::RetryConfig::disabled(),
        ..DigestConfig::default()
    });

    let report = orch.run_digest_batch(three_recipients()).await;

    assert_eq!((report.summarized, report.sent), (0, 0));
    assert!(dispatcher.sent().is_empty());
    assert!(report.outcomes.iter().all(|o| matches!(
        &o.status,
        OutcomeStatus::Skipped { phase: Phase::Summarize, reason: SkipReason::Failed(m) }
            if m.contains("empty summary")
    )));
}

#[tokio::test]
async fn topic_resolver_overrides_recipient_topics() {
    let source = Arc::new(market_source());
    let resolver = MapTopics(HashMap::from([(
        "a".to_string(),
        BTreeSet::from(["MSFT".to_string()]),
    )]));
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let orch = orchestrator(
        source.clone(),
        Arc::new(FakeSummarizer::new()),
        dispatcher.clone(),
    )
    .with_topic_resolver(Arc::new(resolver));

    let report = orch
        .run_digest_batch(vec![
            Recipient::new("a", "a@example.com", "Ann").with_topics(["AAPL"]),
            Recipient::new("nobody", "n@example.com", "Nobody").with_topics(["AAPL"]),
        ])
        .await;

    assert_eq!(report.sent, 1);
    assert_eq!(source.topic_calls_for("AAPL"), 0);
    assert!(source.topic_calls_for("MSFT") > 0);
    assert!(dispatcher.sent()[0].1.content.contains("MSFT story 0"));
    assert!(matches!(
        report.outcome("nobody").unwrap().status,
        OutcomeStatus::Skipped {
            phase: Phase::Fetch,
            ..
        }
    ));
}

#[tokio::test]
async fn summarize_phase_respects_concurrency_limit() {
    let summarizer = Arc::new(FakeSummarizer::new().delayed(Duration::from_millis(40)));
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let orch = DigestOrchestrator::new(
        Aggregator::new(Arc::new(market_source())),
        summarizer.clone(),
        dispatcher.clone(),
    )
    .with_config(DigestConfig {
        concurrency: 3,
        ..DigestConfig::default()
    });

    let recipients: Vec<Recipient> = (0..10)
        .map(|i| {
            Recipient::new(format!("r{i}"), format!("r{i}@example.com"), format!("R{i}"))
                .with_topics(["AAPL", "MSFT"])
        })
        .collect();
    let report = orch.run_digest_batch(recipients).await;

    assert_eq!(report.sent, 10);
    assert_eq!(summarizer.call_count(), 10);
    assert!(summarizer.max_in_flight() <= 3);
    assert!(summarizer.max_in_flight() > 1, "phase ran sequentially");
}

#[tokio::test]
async fn every_digest_of_a_run_shares_the_dated_subject() {
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let orch = orchestrator(
        Arc::new(market_source()),
        Arc::new(FakeSummarizer::new()),
        dispatcher.clone(),
    );
    orch.run_digest_batch(three_recipients()).await;

    let sent = dispatcher.sent();
    assert_eq!(sent.len(), 3);
    let subject = &sent[0].1.subject;
    assert!(subject.starts_with("Market News Summary Today - "));
    assert!(sent.iter().all(|(_, d)| &d.subject == subject));
    assert!(sent.iter().all(|(_, d)| d.article_count == 3));
}

#[test]
fn digest_subject_spells_out_the_date() {
    let d = Digest::new(NaiveDate::from_ymd_opt(2025, 10, 9).unwrap(), "body", 6);
    assert_eq!(d.subject, "Market News Summary Today - October 9, 2025");
    assert_eq!(d.article_count, 6);
}
