use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::news::{Article, RawArticle};

/// Returns `false` when the record lacks a headline, a url, or an identifier.
#[must_use]
pub fn validate(raw: &RawArticle) -> bool {
    non_empty(raw.headline.as_deref()) && non_empty(raw.url.as_deref()) && raw.id_string().is_some()
}

/// Maps a validated raw record into a canonical [`Article`].
///
/// Topic news is stamped with its `symbol`, which is also folded into the related
/// symbols. An unusable timestamp becomes `0`; timestamps in the future are clamped to now.
#[must_use]
pub fn format(
    raw: &RawArticle,
    is_topic_news: bool,
    symbol: Option<&str>,
    ordinal: Option<usize>,
) -> Article {
    let mut related_symbols = parse_related(raw.related.as_deref());
    let origin_symbol = if is_topic_news {
        symbol.map(|s| s.trim().to_uppercase()).filter(|s| !s.is_empty())
    } else {
        None
    };
    if let Some(sym) = &origin_symbol {
        related_symbols.insert(sym.clone());
    }

    let category = if is_topic_news {
        "company".to_string()
    } else {
        text(raw.category.as_deref()).unwrap_or_else(|| "general".to_string())
    };

    Article {
        id: raw.id_string().unwrap_or_default(),
        headline: text(raw.headline.as_deref()).unwrap_or_default(),
        summary: text(raw.summary.as_deref()).unwrap_or_default(),
        source: text(raw.source.as_deref()).unwrap_or_default(),
        url: text(raw.url.as_deref()).unwrap_or_default(),
        published_at: coerce_timestamp(raw.published_at.as_ref(), Utc::now()),
        category,
        related_symbols,
        origin_symbol,
        ordinal,
    }
}

fn non_empty(s: Option<&str>) -> bool {
    s.is_some_and(|s| !s.trim().is_empty())
}

fn text(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn parse_related(related: Option<&str>) -> BTreeSet<String> {
    related
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[allow(clippy::cast_possible_truncation)]
fn coerce_timestamp(value: Option<&Value>, now: DateTime<Utc>) -> i64 {
    let ts = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|dt| dt.timestamp())
            })
        }
        _ => None,
    };
    match ts {
        Some(t) if t > 0 => t.min(now.timestamp()),
        _ => 0,
    }
}
