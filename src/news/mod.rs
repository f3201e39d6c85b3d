//! News records, validation, deduplication, and round-robin aggregation.

mod aggregate;
mod dedupe;
mod model;
mod validate;
mod wire;

pub use aggregate::{Aggregator, AggregatorConfig, normalize_symbols};
pub use dedupe::dedupe;
pub use model::{Article, ArticleBatch};
pub use validate::{format, validate};
pub use wire::RawArticle;
