use std::sync::Arc;

use chrono::NaiveTime;
use market_digest::{
    Aggregator, DailySchedule, DigestOrchestrator, DigestScheduler, GeminiSummarizerBuilder,
    NewsClientBuilder, Recipient, StaticRecipients, Trigger, WebhookDispatcher,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    market_digest::init_tracing();

    // 1. Provider client and summarizer from FINNHUB_* / GEMINI_* environment variables.
    let news = NewsClientBuilder::from_env()?.build()?;
    let summarizer = GeminiSummarizerBuilder::from_env().build()?;

    // 2. Deliver through a webhook relay (defaults to a local one).
    let webhook = std::env::var("DIGEST_WEBHOOK_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:8025/send".to_string());
    let mut dispatcher = WebhookDispatcher::builder(webhook.parse()?);
    if let Ok(token) = std::env::var("DIGEST_WEBHOOK_TOKEN") {
        dispatcher = dispatcher.bearer_token(token);
    }

    let orchestrator = DigestOrchestrator::new(
        Aggregator::new(Arc::new(news)),
        Arc::new(summarizer),
        Arc::new(dispatcher.build()?),
    );

    // 3. A fixed recipient list; a real deployment would read its subscriber store.
    let recipients = StaticRecipients(vec![
        Recipient::new("1", "ada@example.com", "Ada").with_topics(["AAPL", "MSFT", "NVDA"]),
        Recipient::new("2", "grace@example.com", "Grace").with_topics(["TSLA"]),
        Recipient::new("3", "linus@example.com", "Linus"),
    ]);

    let schedule = DailySchedule::new(
        NaiveTime::from_hms_opt(12, 0, 0).ok_or("bad time")?,
        chrono_tz::UTC,
    );
    let scheduler = DigestScheduler::new(orchestrator, Arc::new(recipients), schedule);

    if std::env::args().any(|a| a == "--now") {
        let report = scheduler.run_once(Trigger::OnDemand).await?;
        println!(
            "attempted {}, summarized {}, sent {}",
            report.attempted, report.summarized, report.sent
        );
        for outcome in &report.outcomes {
            println!("  {}", serde_json::to_string(outcome)?);
        }
        return Ok(());
    }

    println!("Waiting for {} UTC daily. Ctrl-C to stop.", schedule.at());
    scheduler
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;
    Ok(())
}
