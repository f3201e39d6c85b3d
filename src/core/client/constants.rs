//! Centralized constants for default endpoints and UA.

/// Identifies this crate to upstream providers.
pub(crate) const USER_AGENT: &str = concat!("market-digest/", env!("CARGO_PKG_VERSION"));

/// Market-data provider REST base (endpoint paths are joined onto it).
pub(crate) const DEFAULT_BASE_NEWS: &str = "https://finnhub.io/api/v1/";

/// Header carrying the provider credential, so it never lands in a URL or cache key.
pub(crate) const API_KEY_HEADER: &str = "X-Finnhub-Token";

/// Environment variable holding the provider credential.
pub(crate) const ENV_API_KEY: &str = "FINNHUB_API_KEY";

/// Optional environment override for the provider base URL.
pub(crate) const ENV_BASE_URL: &str = "FINNHUB_BASE_URL";

/// Upper bound on records decoded from one provider response.
pub(crate) const MAX_RESPONSE_ARTICLES: usize = 250;
