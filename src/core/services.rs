use std::future::Future;
use std::pin::Pin;

use chrono::NaiveDate;

use crate::core::DigestError;
use crate::core::client::CachePolicy;
use crate::news::RawArticle;

/// One call against the provider's two read endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewsRequest {
    /// News about a single topic symbol published inside `[from, to]`.
    Topic {
        /// Normalized topic symbol (e.g. `AAPL`).
        symbol: String,
        /// First day of the window, inclusive.
        from: NaiveDate,
        /// Last day of the window, inclusive.
        to: NaiveDate,
    },
    /// The provider's general feed for a news category.
    General {
        /// Category name understood by the provider (e.g. `general`).
        category: String,
    },
}

impl NewsRequest {
    /// Path of the endpoint relative to the provider base URL.
    #[must_use]
    pub const fn endpoint(&self) -> &'static str {
        match self {
            Self::Topic { .. } => "company-news",
            Self::General { .. } => "news",
        }
    }

    /// Query parameters for this request, in a stable order.
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Topic { symbol, from, to } => vec![
                ("symbol", symbol.clone()),
                ("from", from.format("%Y-%m-%d").to_string()),
                ("to", to.format("%Y-%m-%d").to_string()),
            ],
            Self::General { category } => vec![("category", category.clone())],
        }
    }

    pub(crate) fn fixture_key(&self) -> &str {
        match self {
            Self::Topic { symbol, .. } => symbol,
            Self::General { category } => category,
        }
    }
}

/// Boxed future returned by [`NewsSource::fetch_news`].
pub type NewsFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<RawArticle>, DigestError>> + Send + 'a>>;

/// A trait for anything that can answer provider news requests.
///
/// The aggregator depends on this seam rather than on [`NewsClient`](crate::NewsClient)
/// directly, so tests and alternative providers can stand in for the HTTP client.
pub trait NewsSource: Send + Sync {
    /// Performs one upstream call. Implementations must not retry internally.
    fn fetch_news<'a>(&'a self, request: &'a NewsRequest, policy: CachePolicy) -> NewsFuture<'a>;
}
