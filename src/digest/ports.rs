use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::DigestError;
use crate::news::ArticleBatch;

/// Boxed future returned by every port method.
pub type PortFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DigestError>> + Send + 'a>>;

/// A subscriber eligible for a digest. Owned by the subscriber store; read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: String,
    pub email: String,
    pub display_name: String,
    /// Topic symbols the recipient follows; may be empty.
    #[serde(default)]
    pub topic_symbols: BTreeSet<String>,
}

impl Recipient {
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            display_name: display_name.into(),
            topic_symbols: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_topics<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topic_symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    /// Where this recipient's digest should be delivered.
    #[must_use]
    pub fn contact(&self) -> Contact {
        Contact {
            email: self.email.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// Delivery address for a digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub email: String,
    pub display_name: String,
}

/// The rendered, per-recipient content handed to a [`Dispatcher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Digest {
    /// Message subject, e.g. `Market News Summary Today - October 19, 2026`.
    pub subject: String,
    /// Day the digest covers.
    pub date: NaiveDate,
    /// Summary text produced by the [`Summarizer`].
    pub content: String,
    /// Number of articles the summary was built from.
    pub article_count: usize,
}

impl Digest {
    #[must_use]
    pub fn new(date: NaiveDate, content: impl Into<String>, article_count: usize) -> Self {
        Self {
            subject: format!("Market News Summary Today - {}", date.format("%B %-d, %Y")),
            date,
            content: content.into(),
            article_count,
        }
    }
}

/// Lists every recipient currently eligible for a digest.
pub trait RecipientSource: Send + Sync {
    fn list_digest_recipients(&self) -> PortFuture<'_, Vec<Recipient>>;
}

/// Resolves the topic symbols a recipient follows. An empty set selects the general feed.
pub trait TopicResolver: Send + Sync {
    fn topics_for<'a>(&'a self, recipient_id: &'a str) -> PortFuture<'a, BTreeSet<String>>;
}

/// Turns an article batch into digest text. Failures surface as [`DigestError::Inference`].
pub trait Summarizer: Send + Sync {
    fn summarize<'a>(&'a self, articles: &'a ArticleBatch) -> PortFuture<'a, String>;
}

/// Delivers a digest. Failures surface as [`DigestError::Delivery`].
pub trait Dispatcher: Send + Sync {
    fn send<'a>(&'a self, contact: &'a Contact, digest: &'a Digest) -> PortFuture<'a, ()>;
}

/// A fixed recipient list, handy for on-demand runs and demos.
#[derive(Debug, Clone, Default)]
pub struct StaticRecipients(pub Vec<Recipient>);

impl RecipientSource for StaticRecipients {
    fn list_digest_recipients(&self) -> PortFuture<'_, Vec<Recipient>> {
        let recipients = self.0.clone();
        Box::pin(async move { Ok(recipients) })
    }
}
