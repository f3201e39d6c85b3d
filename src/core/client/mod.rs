//! Public client surface + builder.
//! Internals are split into `constants` (UA + defaults) and `retry` (policies shared with the
//! orchestrator).

mod constants;
pub mod retry;

pub use retry::{Backoff, CachePolicy, RetryConfig};

use crate::core::services::{NewsFuture, NewsRequest, NewsSource};
use crate::core::{DigestError, net};
use crate::news::RawArticle;
use constants::{
    API_KEY_HEADER, DEFAULT_BASE_NEWS, ENV_API_KEY, ENV_BASE_URL, MAX_RESPONSE_ARTICLES,
    USER_AGENT,
};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use url::Url;

#[derive(Debug)]
struct CacheEntry {
    body: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct CacheStore {
    map: RwLock<HashMap<String, CacheEntry>>,
}

/// HTTP client for the market-data provider's news endpoints.
///
/// Cloning is cheap: clones share the connection pool and the response cache.
#[derive(Debug, Clone)]
pub struct NewsClient {
    http: Client,
    base_news: Url,
    api_key: Option<String>,
    cache: Arc<CacheStore>,
}

impl NewsClient {
    /// Create a new builder.
    pub fn builder() -> NewsClientBuilder {
        NewsClientBuilder::default()
    }

    pub(crate) fn base_news(&self) -> &Url {
        &self.base_news
    }

    /// Fetches one provider endpoint and decodes it into raw records.
    ///
    /// Non-success responses surface as [`DigestError::Status`]. The client makes exactly
    /// one upstream attempt per call; retrying is the caller's decision.
    ///
    /// # Errors
    ///
    /// Returns a `DigestError` on transport failure, a non-success status, or an
    /// undecodable body.
    pub async fn fetch(
        &self,
        request: &NewsRequest,
        policy: CachePolicy,
    ) -> Result<Vec<RawArticle>, DigestError> {
        let mut url = self.base_news().join(request.endpoint())?;
        {
            let mut q = url.query_pairs_mut();
            for (k, v) in request.params() {
                q.append_pair(k, &v);
            }
        }

        if let CachePolicy::Cacheable(_) = policy
            && let Some(body) = self.cache_get(&url).await
        {
            tracing::debug!(url = %url, "news cache hit");
            return decode_articles(&body);
        }

        let mut req = self.http.get(url.clone());
        if let Some(key) = &self.api_key {
            req = req.header(API_KEY_HEADER, key);
        }
        let resp = req.send().await?;

        if !resp.status().is_success() {
            return Err(DigestError::Status {
                status: resp.status().as_u16(),
                endpoint: request.endpoint().to_string(),
            });
        }

        let body = net::get_text(resp, request.endpoint(), request.fixture_key(), "json").await?;
        let articles = decode_articles(&body)?;

        if let CachePolicy::Cacheable(ttl) = policy {
            self.cache_put(&url, &body, ttl).await;
        }
        Ok(articles)
    }

    async fn cache_get(&self, url: &Url) -> Option<String> {
        let guard = self.cache.map.read().await;
        if let Some(entry) = guard.get(url.as_str())
            && Instant::now() <= entry.expires_at
        {
            return Some(entry.body.clone());
        }
        None
    }

    async fn cache_put(&self, url: &Url, body: &str, ttl: Duration) {
        let entry = CacheEntry {
            body: body.to_string(),
            expires_at: Instant::now() + ttl,
        };
        let mut guard = self.cache.map.write().await;
        guard.retain(|_, e| Instant::now() <= e.expires_at);
        guard.insert(url.as_str().to_string(), entry);
    }

    /// Drops every cached response.
    pub async fn clear_cache(&self) {
        self.cache.map.write().await.clear();
    }
}

impl NewsSource for NewsClient {
    fn fetch_news<'a>(&'a self, request: &'a NewsRequest, policy: CachePolicy) -> NewsFuture<'a> {
        Box::pin(self.fetch(request, policy))
    }
}

fn decode_articles(body: &str) -> Result<Vec<RawArticle>, DigestError> {
    let mut articles: Vec<RawArticle> = serde_json::from_str(body)?;
    articles.truncate(MAX_RESPONSE_ARTICLES);
    Ok(articles)
}

/* ----------------------- Builder ----------------------- */

#[derive(Default)]
pub struct NewsClientBuilder {
    user_agent: Option<String>,
    base_news: Option<Url>,
    api_key: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl NewsClientBuilder {
    /// Starts from the environment: `FINNHUB_API_KEY` and, when set, `FINNHUB_BASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns `DigestError::Url` if `FINNHUB_BASE_URL` is not a valid URL.
    pub fn from_env() -> Result<Self, DigestError> {
        let mut b = Self::default();
        if let Ok(key) = std::env::var(ENV_API_KEY)
            && !key.trim().is_empty()
        {
            b.api_key = Some(key);
        }
        if let Ok(base) = std::env::var(ENV_BASE_URL) {
            b.base_news = Some(Url::parse(&base)?);
        }
        Ok(b)
    }

    /// Override the User-Agent.
    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Override the provider base (e.g., `https://finnhub.io/api/v1/`).
    #[must_use]
    pub fn base_news(mut self, url: Url) -> Self {
        self.base_news = Some(url);
        self
    }

    /// Set the provider credential, sent as a request header.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set a global request timeout (overall). Default: none.
    #[must_use]
    pub fn timeout(mut self, dur: Duration) -> Self {
        self.timeout = Some(dur);
        self
    }

    /// Set a connect timeout. Default: none.
    #[must_use]
    pub fn connect_timeout(mut self, dur: Duration) -> Self {
        self.connect_timeout = Some(dur);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the default base URL fails to parse or the HTTP client cannot be
    /// constructed.
    pub fn build(self) -> Result<NewsClient, DigestError> {
        let mut base_news = match self.base_news {
            Some(u) => u,
            None => Url::parse(DEFAULT_BASE_NEWS)?,
        };
        // `Url::join` drops the last path segment unless the base ends with '/'.
        if !base_news.path().ends_with('/') {
            let path = format!("{}/", base_news.path());
            base_news.set_path(&path);
        }

        let mut httpb = reqwest::Client::builder()
            .user_agent(self.user_agent.as_deref().unwrap_or(USER_AGENT));
        if let Some(t) = self.timeout {
            httpb = httpb.timeout(t);
        }
        if let Some(ct) = self.connect_timeout {
            httpb = httpb.connect_timeout(ct);
        }
        let http = httpb.build()?;

        Ok(NewsClient {
            http,
            base_news,
            api_key: self.api_key,
            cache: Arc::new(CacheStore::default()),
        })
    }
}
