//! Delivery adapter that posts each digest to a webhook (mail relay, chat bot, ...).

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::core::DigestError;
use crate::digest::{Contact, Digest, Dispatcher, PortFuture};

#[derive(Serialize)]
struct DeliveryPayload<'a> {
    from: &'a str,
    to: &'a Contact,
    subject: &'a str,
    date: NaiveDate,
    content: &'a str,
    article_count: usize,
}

/// A [`Dispatcher`] that POSTs a JSON message per recipient to a delivery service.
#[derive(Debug, Clone)]
pub struct WebhookDispatcher {
    http: Client,
    endpoint: Url,
    bearer: Option<String>,
    sender: String,
}

impl WebhookDispatcher {
    pub fn builder(endpoint: Url) -> WebhookDispatcherBuilder {
        WebhookDispatcherBuilder {
            endpoint,
            bearer: None,
            sender: None,
            timeout: None,
        }
    }

    async fn deliver(&self, contact: &Contact, digest: &Digest) -> Result<(), DigestError> {
        let payload = DeliveryPayload {
            from: &self.sender,
            to: contact,
            subject: &digest.subject,
            date: digest.date,
            content: &digest.content,
            article_count: digest.article_count,
        };

        let mut req = self.http.post(self.endpoint.clone()).json(&payload);
        if let Some(token) = &self.bearer {
            req = req.bearer_auth(token);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| DigestError::Delivery(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(DigestError::Delivery(format!(
                "delivery endpoint returned {}",
                resp.status().as_u16()
            )));
        }
        Ok(())
    }
}

impl Dispatcher for WebhookDispatcher {
    fn send<'a>(&'a self, contact: &'a Contact, digest: &'a Digest) -> PortFuture<'a, ()> {
        Box::pin(self.deliver(contact, digest))
    }
}

pub struct WebhookDispatcherBuilder {
    endpoint: Url,
    bearer: Option<String>,
    sender: Option<String>,
    timeout: Option<Duration>,
}

impl WebhookDispatcherBuilder {
    /// Authenticate with `Authorization: Bearer <token>`.
    #[must_use]
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Display name used as the message sender. Default: `Market Digest`.
    #[must_use]
    pub fn sender(mut self, name: impl Into<String>) -> Self {
        self.sender = Some(name.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, dur: Duration) -> Self {
        self.timeout = Some(dur);
        self
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn build(self) -> Result<WebhookDispatcher, DigestError> {
        let mut httpb = Client::builder();
        if let Some(t) = self.timeout {
            httpb = httpb.timeout(t);
        }
        Ok(WebhookDispatcher {
            http: httpb.build()?,
            endpoint: self.endpoint,
            bearer: self.bearer,
            sender: self.sender.unwrap_or_else(|| "Market Digest".to_string()),
        })
    }
}
