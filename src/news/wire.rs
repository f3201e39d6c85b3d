use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A provider-native news record, exactly as decoded from the wire.
///
/// Every field is optional: nothing downstream may assume a field is present until the
/// record has passed [`validate`](crate::news::validate).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawArticle {
    /// Numeric on the provider today, but strings are accepted too.
    pub id: Option<Value>,
    pub headline: Option<String>,
    pub summary: Option<String>,
    pub url: Option<String>,
    pub source: Option<String>,
    /// Epoch seconds, or occasionally an RFC 3339 string.
    #[serde(rename = "datetime")]
    pub published_at: Option<Value>,
    pub category: Option<String>,
    /// Comma-separated related symbols.
    pub related: Option<String>,
    pub image: Option<String>,
}

impl RawArticle {
    /// The record's identifier rendered as a string, if present and non-empty.
    #[must_use]
    pub fn id_string(&self) -> Option<String> {
        let id = match self.id.as_ref()? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!id.is_empty()).then_some(id)
    }
}
