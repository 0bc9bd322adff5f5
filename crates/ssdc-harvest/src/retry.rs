//! Back-off loop shared by every Twitter API request.
//!
//! A request is repeated while it keeps failing with something the platform
//! may clear on its own: rate limiting, a 5xx, or a dropped connection.
//! Lookups of missing accounts and undecodable bodies fail on the first try.

use std::future::Future;
use std::time::Duration;

use crate::error::HarvestError;

/// Longest single wait between two attempts.
const MAX_DELAY: Duration = Duration::from_secs(60);

/// Whether a fresh attempt could plausibly succeed where `err` did not.
pub(crate) fn is_retriable(err: &HarvestError) -> bool {
    match err {
        HarvestError::RateLimited { .. } => true,
        HarvestError::UnexpectedStatus { status, .. } => (500..600).contains(status),
        HarvestError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        HarvestError::NotFound { .. }
        | HarvestError::Deserialize { .. }
        | HarvestError::InvalidBaseUrl { .. } => false,
    }
}

/// Wait before retry number `retry` (1-based): the base doubled per earlier
/// retry, clamped to [`MAX_DELAY`], then scaled by `jitter` (expected in
/// `0.75..1.25`).
pub(crate) fn backoff_delay(retry: u32, base_ms: u64, jitter: f64) -> Duration {
    let doubled = base_ms.saturating_mul(1u64 << retry.saturating_sub(1).min(16));
    let clamped = Duration::from_millis(doubled).min(MAX_DELAY);
    clamped.mul_f64(jitter.max(0.0))
}

/// Await `request` until it succeeds, fails with a non-retriable error, or has
/// been repeated `max_retries` times after the first attempt.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    base_ms: u64,
    mut request: F,
) -> Result<T, HarvestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, HarvestError>>,
{
    let mut retry = 0u32;
    loop {
        let err = match request().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if retry == max_retries || !is_retriable(&err) {
            return Err(err);
        }
        retry += 1;

        let delay = backoff_delay(retry, base_ms, 0.75 + rand::random::<f64>() * 0.5);
        tracing::warn!(
            retry,
            max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "request failed, backing off"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn not_found() -> HarvestError {
        HarvestError::NotFound {
            account: "ghost".to_owned(),
            detail: "Could not find user".to_owned(),
        }
    }

    #[test]
    fn rate_limited_is_retriable() {
        assert!(is_retriable(&HarvestError::RateLimited {
            retry_after_secs: 60
        }));
    }

    #[test]
    fn server_error_is_retriable_client_error_is_not() {
        assert!(is_retriable(&HarvestError::UnexpectedStatus {
            status: 503,
            url: "https://api.twitter.com/".to_owned()
        }));
        assert!(!is_retriable(&HarvestError::UnexpectedStatus {
            status: 401,
            url: "https://api.twitter.com/".to_owned()
        }));
    }

    #[test]
    fn backoff_doubles_then_clamps() {
        assert_eq!(backoff_delay(1, 1_000, 1.0), Duration::from_millis(1_000));
        assert_eq!(backoff_delay(3, 1_000, 1.0), Duration::from_millis(4_000));
        assert_eq!(backoff_delay(12, 1_000, 1.0), MAX_DELAY);
        assert_eq!(backoff_delay(40, u64::MAX, 1.0), MAX_DELAY);
    }

    #[test]
    fn backoff_applies_jitter_and_zero_base() {
        assert_eq!(backoff_delay(2, 1_000, 0.75), Duration::from_millis(1_500));
        assert_eq!(backoff_delay(2, 1_000, 1.25), Duration::from_millis(2_500));
        assert_eq!(backoff_delay(5, 0, 1.2), Duration::ZERO);
    }

    #[test]
    fn not_found_is_not_retriable() {
        assert!(!is_retriable(&not_found()));
    }

    #[tokio::test]
    async fn does_not_retry_not_found() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(not_found())
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(HarvestError::NotFound { .. })));
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt < 3 {
                    Err::<u32, _>(HarvestError::RateLimited {
                        retry_after_secs: 1,
                    })
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(HarvestError::UnexpectedStatus {
                    status: 500,
                    url: "u".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3, "1 attempt + 2 retries");
        assert!(matches!(
            result,
            Err(HarvestError::UnexpectedStatus { status: 500, .. })
        ));
    }
}
