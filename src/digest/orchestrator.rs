use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use futures::stream::{self, StreamExt};

use crate::core::client::retry::call_with_retry;
use crate::core::{DigestError, RetryConfig};
use crate::digest::job::{BatchResult, DigestJob, JobState, Phase, SkipReason};
use crate::digest::ports::{Digest, Dispatcher, Recipient, RecipientSource, Summarizer, TopicResolver};
use crate::news::{Aggregator, ArticleBatch};

/// Tunables for [`DigestOrchestrator`].
#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// Maximum recipients processed at once within a phase.
    pub concurrency: usize,
    /// Deadline for listing recipients and for one recipient's topic lookup. Aggregation is
    /// bounded by the aggregator's own per-call deadline and topic budget.
    pub lookup_deadline: Duration,
    /// Deadline for one summarization attempt.
    pub summarize_deadline: Duration,
    /// Deadline for one delivery attempt.
    pub dispatch_deadline: Duration,
    /// Re-attempt policy for summarize and dispatch calls.
    pub retry: RetryConfig,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            lookup_deadline: Duration::from_secs(30),
            summarize_deadline: Duration::from_secs(60),
            dispatch_deadline: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }
}

/// Runs fetch, summarize, and dispatch for a set of recipients.
///
/// Each phase fans out over recipients with bounded concurrency. A failure only ever
/// affects the recipient it happened to, and nothing is persisted between runs, so a crashed
/// run can simply be started again.
#[derive(Clone)]
pub struct DigestOrchestrator {
    aggregator: Aggregator,
    summarizer: Arc<dyn Summarizer>,
    dispatcher: Arc<dyn Dispatcher>,
    topics: Option<Arc<dyn TopicResolver>>,
    config: DigestConfig,
}

impl DigestOrchestrator {
    pub fn new(
        aggregator: Aggregator,
        summarizer: Arc<dyn Summarizer>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            aggregator,
            summarizer,
            dispatcher,
            topics: None,
            config: DigestConfig::default(),
        }
    }

    /// Looks topics up through `resolver` instead of using `Recipient::topic_symbols`.
    #[must_use]
    pub fn with_topic_resolver(mut self, resolver: Arc<dyn TopicResolver>) -> Self {
        self.topics = Some(resolver);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: DigestConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &DigestConfig {
        &self.config
    }

    /// Runs a full batch. Never fails: per-recipient errors are recorded in the report.
    pub async fn run_digest_batch(&self, recipients: Vec<Recipient>) -> BatchResult {
        self.run_digest_batch_until(recipients, std::future::pending())
            .await
    }

    /// Runs a batch that stops early when `shutdown` resolves.
    ///
    /// On cancellation the report counts only the phases that completed; recipients caught
    /// mid-phase are reported as interrupted.
    #[tracing::instrument(skip_all, fields(recipients = recipients.len()))]
    pub async fn run_digest_batch_until<F>(
        &self,
        recipients: Vec<Recipient>,
        shutdown: F,
    ) -> BatchResult
    where
        F: Future<Output = ()>,
    {
        let date = Utc::now().date_naive();
        let mut jobs: Vec<DigestJob> = recipients.into_iter().map(DigestJob::new).collect();
        tracing::info!(attempted = jobs.len(), %date, "digest batch started");

        let cancelled = tokio::select! {
            () = self.drive(&mut jobs, date) => false,
            () = shutdown => true,
        };

        let result = BatchResult::from_jobs(&jobs, cancelled);
        if cancelled {
            tracing::warn!(
                attempted = result.attempted,
                summarized = result.summarized,
                sent = result.sent,
                "digest batch cancelled"
            );
        } else {
            tracing::info!(
                attempted = result.attempted,
                summarized = result.summarized,
                sent = result.sent,
                "digest batch finished"
            );
        }
        result
    }

    /// Lists recipients from `source` and runs a batch for them.
    ///
    /// # Errors
    ///
    /// Returns `DigestError::RecipientSource` when the recipient list cannot be obtained; no
    /// recipient is attempted in that case.
    pub async fn run_from_source(
        &self,
        source: &dyn RecipientSource,
    ) -> Result<BatchResult, DigestError> {
        self.run_from_source_until(source, std::future::pending())
            .await
    }

    /// [`run_from_source`](Self::run_from_source) with external cancellation.
    ///
    /// # Errors
    ///
    /// See [`run_from_source`](Self::run_from_source).
    pub async fn run_from_source_until<F>(
        &self,
        source: &dyn RecipientSource,
        shutdown: F,
    ) -> Result<BatchResult, DigestError>
    where
        F: Future<Output = ()>,
    {
        let mut shutdown = std::pin::pin!(shutdown);
        let deadline = self.config.lookup_deadline;
        let listed = tokio::select! {
            r = tokio::time::timeout(deadline, source.list_digest_recipients()) => r,
            () = &mut shutdown => {
                return Ok(BatchResult { cancelled: true, ..BatchResult::default() });
            }
        };
        let recipients = match listed {
            Ok(Ok(r)) => r,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "recipient source failed, nothing attempted");
                return Err(match e {
                    DigestError::RecipientSource(_) => e,
                    other => DigestError::RecipientSource(other.to_string()),
                });
            }
            Err(_) => {
                tracing::error!(?deadline, "recipient source timed out, nothing attempted");
                return Err(DigestError::RecipientSource(format!(
                    "listing recipients timed out after {deadline:?}"
                )));
            }
        };
        Ok(self.run_digest_batch_until(recipients, shutdown).await)
    }

    async fn drive(&self, jobs: &mut [DigestJob], date: NaiveDate) {
        let limit = self.config.concurrency.max(1);

        stream::iter(jobs.iter_mut().filter(|j| j.pending_phase() == Some(Phase::Fetch)))
            .for_each_concurrent(limit, |job| self.fetch_step(job))
            .await;

        stream::iter(jobs.iter_mut().filter(|j| j.pending_phase() == Some(Phase::Summarize)))
            .for_each_concurrent(limit, |job| self.summarize_step(job, date))
            .await;

        stream::iter(jobs.iter_mut().filter(|j| j.pending_phase() == Some(Phase::Dispatch)))
            .for_each_concurrent(limit, |job| self.dispatch_step(job))
            .await;
    }

    #[tracing::instrument(skip_all, fields(recipient = %job.recipient().id))]
    async fn fetch_step(&self, job: &mut DigestJob) {
        let result = self.fetch_articles(job.recipient()).await;
        match result {
            Ok(batch) => {
                tracing::debug!(articles = batch.len(), "fetched");
                job.fetched(batch);
            }
            Err(e) => {
                tracing::warn!(phase = "fetch", error = %e, "recipient skipped");
                job.skip(Phase::Fetch, SkipReason::Failed(e.to_string()));
            }
        }
    }

    async fn fetch_articles(&self, recipient: &Recipient) -> Result<ArticleBatch, DigestError> {
        let deadline = self.config.lookup_deadline;
        let symbols = match &self.topics {
            Some(resolver) => {
                match tokio::time::timeout(deadline, resolver.topics_for(&recipient.id)).await {
                    Ok(r) => r?,
                    Err(_) => return Err(DigestError::timeout("topic lookup", deadline)),
                }
            }
            None => recipient.topic_symbols.clone(),
        };
        self.aggregator.aggregate(symbols).await
    }

    #[tracing::instrument(skip_all, fields(recipient = %job.recipient().id))]
    async fn summarize_step(&self, job: &mut DigestJob, date: NaiveDate) {
        let JobState::Summarizing(batch) = job.state() else {
            return;
        };
        if batch.is_empty() {
            tracing::debug!("no articles, nothing to summarize");
            job.skip(Phase::Summarize, SkipReason::NoArticles);
            return;
        }

        let count = batch.len();
        let result = call_with_retry(
            &self.config.retry,
            self.config.summarize_deadline,
            "summarize",
            || async move {
                let text = self.summarizer.summarize(batch).await?;
                if text.trim().is_empty() {
                    return Err(DigestError::Inference("empty summary".into()));
                }
                Ok(text)
            },
        )
        .await;

        match result {
            Ok(text) => job.summarized_into(Digest::new(date, text, count)),
            Err(e) => {
                tracing::warn!(phase = "summarize", error = %e, "recipient skipped");
                job.skip(Phase::Summarize, SkipReason::Failed(e.to_string()));
            }
        }
    }

    #[tracing::instrument(skip_all, fields(recipient = %job.recipient().id))]
    async fn dispatch_step(&self, job: &mut DigestJob) {
        let JobState::Dispatching(digest) = job.state() else {
            return;
        };
        let contact = job.recipient().contact();
        let contact = &contact;
        let result = call_with_retry(
            &self.config.retry,
            self.config.dispatch_deadline,
            "dispatch",
            || self.dispatcher.send(contact, digest),
        )
        .await;

        match result {
            Ok(()) => job.delivered(),
            Err(e) => {
                tracing::warn!(phase = "dispatch", error = %e, "delivery failed");
                job.skip(Phase::Dispatch, SkipReason::Failed(e.to_string()));
            }
        }
    }
}
