use serde::Serialize;

use crate::digest::ports::{Digest, Recipient};
use crate::news::ArticleBatch;

/// The three stages a digest passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Fetch,
    Summarize,
    Dispatch,
}

/// Why a recipient got no digest this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The fetch succeeded but produced no articles.
    NoArticles,
    /// An upstream, inference, delivery, or timeout error.
    Failed(String),
}

/// Where a recipient's digest currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Fetching,
    Summarizing(ArticleBatch),
    Dispatching(Digest),
    Done(Digest),
    /// Absorbing: nothing further happens for this recipient in this run.
    Skipped { phase: Phase, reason: SkipReason },
}

/// Ephemeral per-recipient state for one batch run. Never persisted: a rerun starts over.
#[derive(Debug, Clone)]
pub struct DigestJob {
    recipient: Recipient,
    state: JobState,
}

impl DigestJob {
    #[must_use]
    pub const fn new(recipient: Recipient) -> Self {
        Self {
            recipient,
            state: JobState::Fetching,
        }
    }

    #[must_use]
    pub const fn recipient(&self) -> &Recipient {
        &self.recipient
    }

    #[must_use]
    pub const fn state(&self) -> &JobState {
        &self.state
    }

    /// The phase this job is waiting on, or `None` once it is finished or skipped.
    #[must_use]
    pub const fn pending_phase(&self) -> Option<Phase> {
        match self.state {
            JobState::Fetching => Some(Phase::Fetch),
            JobState::Summarizing(_) => Some(Phase::Summarize),
            JobState::Dispatching(_) => Some(Phase::Dispatch),
            JobState::Done(_) | JobState::Skipped { .. } => None,
        }
    }

    /// True once a summary exists, whether or not it was delivered.
    #[must_use]
    pub const fn summarized(&self) -> bool {
        matches!(
            self.state,
            JobState::Dispatching(_)
                | JobState::Done(_)
                | JobState::Skipped {
                    phase: Phase::Dispatch,
                    ..
                }
        )
    }

    #[must_use]
    pub const fn sent(&self) -> bool {
        matches!(self.state, JobState::Done(_))
    }

    pub(crate) fn fetched(&mut self, batch: ArticleBatch) {
        if matches!(self.state, JobState::Fetching) {
            self.state = JobState::Summarizing(batch);
        }
    }

    pub(crate) fn summarized_into(&mut self, digest: Digest) {
        if matches!(self.state, JobState::Summarizing(_)) {
            self.state = JobState::Dispatching(digest);
        }
    }

    pub(crate) fn delivered(&mut self) {
        let state = std::mem::replace(&mut self.state, JobState::Fetching);
        self.state = match state {
            JobState::Dispatching(d) => JobState::Done(d),
            other => other,
        };
    }

    pub(crate) fn skip(&mut self, phase: Phase, reason: SkipReason) {
        self.state = JobState::Skipped { phase, reason };
    }
}

/// How one recipient fared in a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Sent,
    Skipped { phase: Phase, reason: SkipReason },
    /// The run was cancelled before this phase completed.
    Interrupted { phase: Phase },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestOutcome {
    pub recipient_id: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl From<&DigestJob> for DigestOutcome {
    fn from(job: &DigestJob) -> Self {
        let status = match &job.state {
            JobState::Done(_) => OutcomeStatus::Sent,
            JobState::Skipped { phase, reason } => OutcomeStatus::Skipped {
                phase: *phase,
                reason: reason.clone(),
            },
            JobState::Fetching => OutcomeStatus::Interrupted {
                phase: Phase::Fetch,
            },
            JobState::Summarizing(_) => OutcomeStatus::Interrupted {
                phase: Phase::Summarize,
            },
            JobState::Dispatching(_) => OutcomeStatus::Interrupted {
                phase: Phase::Dispatch,
            },
        };
        Self {
            recipient_id: job.recipient.id.clone(),
            status,
        }
    }
}

/// Best-effort report for one batch run: `sent <= summarized <= attempted`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub attempted: usize,
    pub summarized: usize,
    pub sent: usize,
    /// Set when the run was cut short; the counts reflect work completed before that.
    pub cancelled: bool,
    pub outcomes: Vec<DigestOutcome>,
}

impl BatchResult {
    pub(crate) fn from_jobs(jobs: &[DigestJob], cancelled: bool) -> Self {
        Self {
            attempted: jobs.len(),
            summarized: jobs.iter().filter(|j| j.summarized()).count(),
            sent: jobs.iter().filter(|j| j.sent()).count(),
            cancelled,
            outcomes: jobs.iter().map(DigestOutcome::from).collect(),
        }
    }

    /// The outcome recorded for `recipient_id`, if it was part of the run.
    #[must_use]
    pub fn outcome(&self, recipient_id: &str) -> Option<&DigestOutcome> {
        self.outcomes.iter().find(|o| o.recipient_id == recipient_id)
    }
}
