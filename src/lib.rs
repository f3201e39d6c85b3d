//! market-digest: personalized market news digests.
//!
//! The crate has two halves:
//! - [`news`]: a provider client plus the round-robin [`Aggregator`] that turns a recipient's
//!   topic symbols into a small, fair, freshness-ordered [`ArticleBatch`].
//! - [`digest`]: the [`DigestOrchestrator`], which fetches, summarizes, and dispatches one
//!   digest per recipient, so that a failure for one recipient never holds up the others.
//!
//! Summarization and delivery are ports ([`Summarizer`], [`Dispatcher`]); [`summarize`] and
//! [`dispatch`] ship HTTP-backed implementations. [`schedule`] runs batches daily or on demand.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use market_digest::{Aggregator, DigestOrchestrator, NewsClient, Recipient};
//! # use market_digest::{GeminiSummarizerBuilder, WebhookDispatcher};
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = NewsClient::builder().api_key("provider-key").build()?;
//! let summarizer = GeminiSummarizerBuilder::from_env().build()?;
//! let dispatcher = WebhookDispatcher::builder("https://relay.example/send".parse()?).build()?;
//!
//! let orchestrator = DigestOrchestrator::new(
//!     Aggregator::new(Arc::new(client)),
//!     Arc::new(summarizer),
//!     Arc::new(dispatcher),
//! );
//! let recipients = vec![Recipient::new("u1", "ada@example.com", "Ada").with_topics(["AAPL", "MSFT"])];
//! let report = orchestrator.run_digest_batch(recipients).await;
//! println!("sent {} of {}", report.sent, report.attempted);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod digest;
pub mod dispatch;
pub mod news;
pub mod schedule;
pub mod summarize;

#[cfg(feature = "tracing-subscriber")]
mod trace;
#[cfg(feature = "tracing-subscriber")]
pub use trace::init_tracing;

pub use crate::core::{
    Backoff, CachePolicy, DigestError, NewsClient, NewsClientBuilder, NewsRequest, NewsSource,
    RetryConfig,
};
pub use digest::{
    BatchResult, Contact, Digest, DigestConfig, DigestOrchestrator, DigestOutcome, Dispatcher,
    OutcomeStatus, Phase, Recipient, RecipientSource, SkipReason, StaticRecipients, Summarizer,
    TopicResolver,
};
pub use dispatch::WebhookDispatcher;
pub use news::{
    Aggregator, AggregatorConfig, Article, ArticleBatch, RawArticle, dedupe, format, validate,
};
pub use schedule::{DailySchedule, DigestScheduler, Trigger, TriggerHandle};
pub use summarize::{GeminiSummarizer, GeminiSummarizerBuilder};
