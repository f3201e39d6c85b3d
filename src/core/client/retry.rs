use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::core::DigestError;

/// Specifies the backoff strategy for retrying failed calls.
#[derive(Clone, Debug)]
pub enum Backoff {
    /// Uses a fixed delay between retries.
    Fixed(Duration),
    /// Uses an exponential delay between retries.
    /// The delay is calculated as `base * (factor ^ attempt)`.
    Exponential {
        /// The initial backoff duration.
        base: Duration,
        /// The multiplicative factor for each subsequent retry.
        factor: f64,
        /// The maximum duration to wait between retries.
        max: Duration,
        /// Whether to apply random jitter (+/- 50%) to the delay.
        jitter: bool,
    },
}

impl Backoff {
    /// The delay to wait before retry number `attempt` (zero-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(d) => *d,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let exp = factor.powi(i32::try_from(attempt).unwrap_or(i32::MAX));
                let raw = base.as_secs_f64() * exp;
                let capped = raw.min(max.as_secs_f64());
                let secs = if *jitter {
                    capped * rand::thread_rng().gen_range(0.5..1.5)
                } else {
                    capped
                };
                Duration::from_secs_f64(secs.max(0.0))
            }
        }
    }
}

/// Configuration for re-attempting a failed summarize or dispatch call.
///
/// The news fetch client never retries on its own; this policy is applied by the
/// digest orchestrator around its port calls.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Enables or disables the retry mechanism.
    pub enabled: bool,
    /// The maximum number of retries to attempt. The total number of attempts will be `max_retries + 1`.
    pub max_retries: u32,
    /// The backoff strategy to use between retries.
    pub backoff: Backoff,
    /// A list of HTTP status codes that should trigger a retry.
    pub retry_on_status: Vec<u16>,
    /// Whether to retry when an attempt exceeds its deadline.
    pub retry_on_timeout: bool,
    /// Whether to retry on connection errors.
    pub retry_on_connect: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 2,
            backoff: Backoff::Exponential {
                base: Duration::from_millis(500),
                factor: 2.0,
                max: Duration::from_secs(5),
                jitter: true,
            },
            retry_on_status: vec![408, 429, 500, 502, 503, 504],
            retry_on_timeout: true,
            retry_on_connect: true,
        }
    }
}

impl RetryConfig {
    /// A policy that makes exactly one attempt.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Whether `err` is worth another attempt under this policy.
    #[must_use]
    pub fn should_retry(&self, err: &DigestError) -> bool {
        if !self.enabled {
            return false;
        }
        match err {
            DigestError::Timeout { .. } => self.retry_on_timeout,
            DigestError::Status { status, .. } => self.retry_on_status.contains(status),
            DigestError::Http(e) => {
                (self.retry_on_timeout && e.is_timeout())
                    || (self.retry_on_connect && e.is_connect())
            }
            DigestError::Inference(_) | DigestError::Delivery(_) => true,
            DigestError::Url(_)
            | DigestError::Json(_)
            | DigestError::RecipientSource(_)
            | DigestError::InvalidParams(_) => false,
        }
    }
}

/// Runs `op` under a per-attempt deadline, re-attempting according to `retry`.
pub(crate) async fn call_with_retry<T, F, Fut>(
    retry: &RetryConfig,
    deadline: Duration,
    operation: &str,
    mut op: F,
) -> Result<T, DigestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DigestError>>,
{
    let mut attempt = 0u32;
    loop {
        let result = match tokio::time::timeout(deadline, op()).await {
            Ok(r) => r,
            Err(_) => Err(DigestError::timeout(operation, deadline)),
        };
        match result {
            Ok(v) => return Ok(v),
            Err(e) if attempt < retry.max_retries && retry.should_retry(&e) => {
                let delay = retry.backoff.delay_for(attempt);
                tracing::debug!(operation, attempt, ?delay, error = %e, "retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Declares whether a news fetch may reuse a previous response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CachePolicy {
    /// Always hit upstream; never read or write the cache.
    Fresh,
    /// Reuse a cached body younger than the given TTL; otherwise fetch and store it.
    Cacheable(Duration),
}
