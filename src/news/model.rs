use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::news::dedupe::dedupe;

/// A canonical, validated news article.
///
/// Produced only by [`format`](crate::news::format); `headline` and `url` are never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    /// Provider identifier.
    pub id: String,
    /// The headline of the article.
    pub headline: String,
    /// Provider-supplied abstract; may be empty.
    pub summary: String,
    /// The publisher (e.g., "Reuters").
    pub source: String,
    /// A direct link to the article.
    pub url: String,
    /// Publication time in Unix seconds. `0` when the provider sent an unusable timestamp.
    pub published_at: i64,
    /// Provider category, or `company` for topic news.
    pub category: String,
    /// Symbols the article relates to, uppercased.
    pub related_symbols: BTreeSet<String>,
    /// The topic symbol this article was fetched for, when it came from a topic fetch.
    pub origin_symbol: Option<String>,
    /// Position at which the aggregator selected the article.
    pub ordinal: Option<usize>,
}

impl Article {
    /// Identity used for deduplication: `id-url-headline`.
    #[must_use]
    pub fn dedupe_key(&self) -> String {
        format!("{}-{}-{}", self.id, self.url, self.headline)
    }

    /// Publication time as a UTC datetime.
    #[must_use]
    pub fn published(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.published_at, 0)
    }
}

/// An ordered, bounded, duplicate-free list of articles, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ArticleBatch(Vec<Article>);

impl ArticleBatch {
    /// The default cap on articles per batch.
    pub const DEFAULT_MAX: usize = 6;

    /// Builds a batch: removes duplicates (first wins), keeps at most `max` articles, then
    /// orders them by `published_at` descending. Ties keep their relative order.
    #[must_use]
    pub fn new(articles: Vec<Article>, max: usize) -> Self {
        let mut articles = dedupe(articles);
        articles.truncate(max);
        articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Self(articles)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Article] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Article> {
        self.0.iter()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Article> {
        self.0
    }
}

impl<'a> IntoIterator for &'a ArticleBatch {
    type Item = &'a Article;
    type IntoIter = std::slice::Iter<'a, Article>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
