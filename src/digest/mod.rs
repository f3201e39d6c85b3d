//! Per-recipient digest batches: ports to the outside world, job state, and orchestration.

mod job;
mod orchestrator;
mod ports;

pub use job::{BatchResult, DigestJob, DigestOutcome, JobState, OutcomeStatus, Phase, SkipReason};
pub use orchestrator::{DigestConfig, DigestOrchestrator};
pub use ports::{
    Contact, Digest, Dispatcher, PortFuture, Recipient, RecipientSource, StaticRecipients,
    Summarizer, TopicResolver,
};
