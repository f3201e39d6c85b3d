use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate, Utc};
use futures::future::join_all;
use tokio::time::Instant;

use crate::core::{CachePolicy, DigestError, NewsRequest, NewsSource};
use crate::news::{Article, ArticleBatch, RawArticle, dedupe, format, validate};

/// Tunables for [`Aggregator`].
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Length of the topic-news window, in days ending today.
    pub window_days: u32,
    /// Upper bound on articles per batch; also the number of round-robin rounds.
    pub max_articles: usize,
    /// Deadline applied to every single provider call.
    pub fetch_deadline: Duration,
    /// Time allowed for all topic rounds together. When it runs out the articles picked so
    /// far are kept; the general feed still gets its own `fetch_deadline`.
    pub topic_budget: Duration,
    /// Provider category used for the general feed.
    pub general_category: String,
    /// How long a general-feed response may be reused.
    pub general_cache_ttl: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            window_days: 5,
            max_articles: ArticleBatch::DEFAULT_MAX,
            fetch_deadline: Duration::from_secs(10),
            topic_budget: Duration::from_secs(30),
            general_category: "general".to_string(),
            general_cache_ttl: Duration::from_secs(300),
        }
    }
}

/// Builds fair, bounded article batches from a set of topic symbols.
///
/// Each round asks every topic symbol for one more article before any symbol gets a second
/// turn, so a symbol with abundant news cannot crowd out the rest. Worst case the
/// aggregator issues `max_articles * symbols` provider calls and spends
/// `topic_budget + fetch_deadline` waiting on the provider.
#[derive(Clone)]
pub struct Aggregator {
    source: Arc<dyn NewsSource>,
    config: AggregatorConfig,
}

impl Aggregator {
    /// Creates an aggregator over `source` with the default configuration.
    pub fn new(source: Arc<dyn NewsSource>) -> Self {
        Self {
            source,
            config: AggregatorConfig::default(),
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: AggregatorConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Aggregates news for `symbols` into a batch of at most `max_articles`, newest first.
    ///
    /// An empty symbol set (after normalization) takes the general feed. So does a topic
    /// pass that produced nothing at all. Per-symbol fetch failures and timeouts are logged
    /// and skipped.
    ///
    /// # Errors
    ///
    /// Returns `DigestError::InvalidParams` when `max_articles` is zero, and propagates the
    /// general feed's error when that path is taken and fails.
    #[tracing::instrument(skip_all)]
    pub async fn aggregate<I, S>(&self, symbols: I) -> Result<ArticleBatch, DigestError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.check_config()?;
        let symbols = normalize_symbols(symbols);
        if symbols.is_empty() {
            tracing::debug!("no topic symbols, using general feed");
            return self.general_feed().await;
        }

        let picked = self.round_robin(&symbols, Utc::now().date_naive()).await;
        if picked.is_empty() {
            tracing::debug!(?symbols, "topic rounds produced nothing, using general feed");
            return self.general_feed().await;
        }
        Ok(ArticleBatch::new(picked, self.config.max_articles))
    }

    /// [`aggregate`](Self::aggregate) with a per-call window and batch size, overriding
    /// `window_days` and `max_articles` from the configuration.
    ///
    /// # Errors
    ///
    /// See [`aggregate`](Self::aggregate).
    pub async fn aggregate_with<I, S>(
        &self,
        symbols: I,
        window_days: u32,
        max_articles: usize,
    ) -> Result<ArticleBatch, DigestError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let scoped = self.clone().with_config(AggregatorConfig {
            window_days,
            max_articles,
            ..self.config.clone()
        });
        scoped.aggregate(symbols).await
    }

    /// Fetches the general feed, validates, deduplicates, and truncates it.
    ///
    /// # Errors
    ///
    /// Returns the provider error (or a timeout) when the feed cannot be fetched.
    #[tracing::instrument(skip(self), fields(category = %self.config.general_category))]
    pub async fn general_feed(&self) -> Result<ArticleBatch, DigestError> {
        self.check_config()?;
        let request = NewsRequest::General {
            category: self.config.general_category.clone(),
        };
        let policy = CachePolicy::Cacheable(self.config.general_cache_ttl);
        let raws = self.fetch_with_deadline(&request, policy).await?;

        let formatted = raws
            .iter()
            .filter(|r| validate(r))
            .map(|r| format(r, false, None, None));
        let mut articles = dedupe(formatted);
        articles.truncate(self.config.max_articles);
        for (i, a) in articles.iter_mut().enumerate() {
            a.ordinal = Some(i);
        }
        Ok(ArticleBatch::new(articles, self.config.max_articles))
    }

    async fn round_robin(&self, symbols: &[String], today: NaiveDate) -> Vec<Article> {
        let max = self.config.max_articles;
        let from = today
            .checked_sub_days(Days::new(u64::from(self.config.window_days)))
            .unwrap_or(today);
        let budget_ends = Instant::now() + self.config.topic_budget;

        let mut picked: Vec<Article> = Vec::with_capacity(max);
        let mut seen: HashSet<String> = HashSet::new();
        let mut exhausted: HashSet<&str> = HashSet::new();

        'rounds: for round in 0..max {
            let live: Vec<&String> = symbols
                .iter()
                .filter(|s| !exhausted.contains(s.as_str()))
                .collect();
            if live.is_empty() {
                break;
            }

            // A chunk never holds more symbols than there are free slots, so a round costs at
            // most one call per live symbol and stops as soon as the batch is full.
            let mut rest = live.as_slice();
            while !rest.is_empty() {
                let remaining = max - picked.len();
                if remaining == 0 {
                    break 'rounds;
                }
                let left = budget_ends.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    tracing::debug!(round, picked = picked.len(), "topic budget spent");
                    break 'rounds;
                }
                let (chunk, tail) = rest.split_at(remaining.min(rest.len()));
                rest = tail;

                let requests: Vec<NewsRequest> = chunk
                    .iter()
                    .map(|s| NewsRequest::Topic {
                        symbol: (*s).clone(),
                        from,
                        to: today,
                    })
                    .collect();
                let deadline = self.config.fetch_deadline.min(left);
                let results = join_all(
                    requests
                        .iter()
                        .map(|r| self.fetch_within(r, CachePolicy::Fresh, deadline)),
                )
                .await;

                for (symbol, result) in chunk.iter().copied().zip(results) {
                    match result {
                        Ok(raws) => match next_unseen(&raws, symbol, picked.len(), &seen) {
                            Some(article) => {
                                seen.insert(article.dedupe_key());
                                picked.push(article);
                            }
                            None => {
                                tracing::debug!(%symbol, round, "no unseen articles left for symbol");
                                exhausted.insert(symbol.as_str());
                            }
                        },
                        Err(e) => {
                            tracing::warn!(%symbol, round, error = %e, "topic news fetch failed, skipping");
                        }
                    }
                }
            }
        }
        picked
    }

    async fn fetch_with_deadline(
        &self,
        request: &NewsRequest,
        policy: CachePolicy,
    ) -> Result<Vec<RawArticle>, DigestError> {
        self.fetch_within(request, policy, self.config.fetch_deadline)
            .await
    }

    async fn fetch_within(
        &self,
        request: &NewsRequest,
        policy: CachePolicy,
        deadline: Duration,
    ) -> Result<Vec<RawArticle>, DigestError> {
        match tokio::time::timeout(deadline, self.source.fetch_news(request, policy)).await {
            Ok(r) => r,
            Err(_) => Err(DigestError::timeout(
                format!("{} {}", request.endpoint(), request.fixture_key()),
                deadline,
            )),
        }
    }

    fn check_config(&self) -> Result<(), DigestError> {
        if self.config.max_articles == 0 {
            return Err(DigestError::InvalidParams(
                "max_articles must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn next_unseen(
    raws: &[RawArticle],
    symbol: &str,
    ordinal: usize,
    seen: &HashSet<String>,
) -> Option<Article> {
    raws.iter()
        .filter(|r| validate(r))
        .map(|r| format(r, true, Some(symbol), Some(ordinal)))
        .find(|a| !seen.contains(&a.dedupe_key()))
}

/// Trims and uppercases symbols, dropping empties and repeats. First-seen order is kept.
pub fn normalize_symbols<I, S>(symbols: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    symbols
        .into_iter()
        .map(|s| s.as_ref().trim().to_uppercase())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}
