//! Summarization adapter backed by the Gemini `generateContent` REST endpoint.

mod prompt;
mod wire;

use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::core::DigestError;
use crate::digest::{PortFuture, Summarizer};
use crate::news::ArticleBatch;

const DEFAULT_BASE_GEMINI: &str = "https://generativelanguage.googleapis.com/v1beta/";
const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";
const API_KEY_HEADER: &str = "x-goog-api-key";
const ENV_API_KEY: &str = "GEMINI_API_KEY";
const ENV_MODEL: &str = "GEMINI_MODEL";

/// A [`Summarizer`] that asks a Gemini model to write the digest text.
#[derive(Debug, Clone)]
pub struct GeminiSummarizer {
    http: Client,
    endpoint: Url,
    api_key: String,
}

impl GeminiSummarizer {
    pub fn builder() -> GeminiSummarizerBuilder {
        GeminiSummarizerBuilder::default()
    }

    async fn generate(&self, articles: &ArticleBatch) -> Result<String, DigestError> {
        let prompt = prompt::news_summary_prompt(articles)?;
        let body = wire::GenerateRequest {
            contents: [wire::RequestContent {
                role: "user",
                parts: [wire::RequestPart { text: &prompt }],
            }],
        };

        let resp = self
            .http
            .post(self.endpoint.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DigestError::Inference(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(DigestError::Inference(format!(
                "generateContent returned {}",
                resp.status().as_u16()
            )));
        }

        let envelope: wire::GenerateEnvelope = resp
            .json()
            .await
            .map_err(|e| DigestError::Inference(e.to_string()))?;
        envelope
            .into_text()
            .ok_or_else(|| DigestError::Inference("model returned no text".into()))
    }
}

impl Summarizer for GeminiSummarizer {
    fn summarize<'a>(&'a self, articles: &'a ArticleBatch) -> PortFuture<'a, String> {
        Box::pin(self.generate(articles))
    }
}

#[derive(Default)]
pub struct GeminiSummarizerBuilder {
    base_url: Option<Url>,
    api_key: Option<String>,
    model: Option<String>,
    timeout: Option<Duration>,
}

impl GeminiSummarizerBuilder {
    /// Starts from `GEMINI_API_KEY` and, when set, `GEMINI_MODEL`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var(ENV_API_KEY).ok().filter(|k| !k.trim().is_empty()),
            model: std::env::var(ENV_MODEL).ok().filter(|m| !m.trim().is_empty()),
            ..Self::default()
        }
    }

    /// Override the API base (e.g., `https://generativelanguage.googleapis.com/v1beta/`).
    #[must_use]
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set a request timeout. Default: none (the orchestrator applies its own deadline).
    #[must_use]
    pub fn timeout(mut self, dur: Duration) -> Self {
        self.timeout = Some(dur);
        self
    }

    /// # Errors
    ///
    /// Returns `DigestError::InvalidParams` when no API key was configured, or an error if the
    /// endpoint URL or HTTP client cannot be built.
    pub fn build(self) -> Result<GeminiSummarizer, DigestError> {
        let api_key = self
            .api_key
            .ok_or_else(|| DigestError::InvalidParams(format!("{ENV_API_KEY} is not set")))?;
        let base = match self.base_url {
            Some(u) => u,
            None => Url::parse(DEFAULT_BASE_GEMINI)?,
        };
        let model = self.model.as_deref().unwrap_or(DEFAULT_MODEL);
        let endpoint = base.join(&format!("models/{model}:generateContent"))?;

        let mut httpb = Client::builder();
        if let Some(t) = self.timeout {
            httpb = httpb.timeout(t);
        }

        Ok(GeminiSummarizer {
            http: httpb.build()?,
            endpoint,
            api_key,
        })
    }
}
