//! Retry policy for Storage API requests with error classification.

use log::{debug, warn};
use reqwest::StatusCode;
use std::time::Duration;

use crate::error::ClientError;

/// Default number of attempts for a single API call.
pub const DEFAULT_BACKOFF_MAX_TRIES: usize = 11;

/// Default delay before the first retry.
pub const DEFAULT_BACKOFF_BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound for a single retry delay.
pub const DEFAULT_BACKOFF_MAX_DELAY: Duration = Duration::from_secs(60);

/// Errors that should not be retried.
#[derive(Debug)]
pub enum NonRetryableError {
    /// Invalid or expired token (HTTP 401)
    AuthenticationFailed(ClientError),
    /// Token lacks permission for the resource (HTTP 403)
    Forbidden(ClientError),
    /// Resource not found (HTTP 404)
    NotFound(ClientError),
    /// Other client errors that won't succeed on retry
    ClientError(ClientError),
}

impl NonRetryableError {
    /// Returns the API error carried by this classification.
    pub fn into_inner(self) -> ClientError {
        match self {
            NonRetryableError::AuthenticationFailed(e)
            | NonRetryableError::Forbidden(e)
            | NonRetryableError::NotFound(e)
            | NonRetryableError::ClientError(e) => e,
        }
    }
}

impl std::fmt::Display for NonRetryableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NonRetryableError::AuthenticationFailed(e) => {
                write!(f, "Authentication failed: {}. Check your storage token.", e)
            }
            NonRetryableError::Forbidden(e) => write!(f, "Access forbidden: {}", e),
            NonRetryableError::NotFound(e) => write!(f, "Not found: {}", e),
            NonRetryableError::ClientError(e) => write!(f, "Request error: {}", e),
        }
    }
}

impl std::error::Error for NonRetryableError {}

/// Classifies an HTTP error status as retryable or non-retryable.
/// Returns the error back in `Ok` if the request may be retried.
pub fn classify_status(status: StatusCode, error: ClientError) -> Result<ClientError, NonRetryableError> {
    match status {
        StatusCode::UNAUTHORIZED => Err(NonRetryableError::AuthenticationFailed(error)),
        StatusCode::FORBIDDEN => Err(NonRetryableError::Forbidden(error)),
        StatusCode::NOT_FOUND => Err(NonRetryableError::NotFound(error)),
        // The API is throttling us, backing off helps
        StatusCode::TOO_MANY_REQUESTS => Ok(error),
        // Feature not available for the project backend, retrying can't help
        StatusCode::NOT_IMPLEMENTED => Err(NonRetryableError::ClientError(error)),
        s if s.is_client_error() => Err(NonRetryableError::ClientError(error)),
        // 5xx server errors are retryable
        _ => Ok(error),
    }
}

/// Converts an error response into an `anyhow::Error`, marking it
/// non-retryable where appropriate.
pub fn check_retryable(status: StatusCode, error: ClientError) -> anyhow::Error {
    match classify_status(status, error) {
        Ok(retryable) => anyhow::Error::from(retryable),
        Err(non_retryable) => anyhow::Error::from(non_retryable),
    }
}

/// Exponential backoff settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_tries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_tries: DEFAULT_BACKOFF_MAX_TRIES,
            base_delay: DEFAULT_BACKOFF_BASE_DELAY,
            max_delay: DEFAULT_BACKOFF_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: usize) -> Duration {
        let exp = attempt.saturating_sub(1).min(31) as u32;
        self.base_delay
            .checked_mul(1u32 << exp)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Executes an async operation, retrying transient failures.
    ///
    /// A [`NonRetryableError`] stops immediately and is unwrapped into the
    /// [`ClientError`] it carries.
    pub async fn run<F, Fut, T>(&self, operation_name: &str, operation: F) -> anyhow::Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = anyhow::Result<T>>,
    {
        let max_tries = self.max_tries.max(1);
        let mut last_error = None;

        for attempt in 1..=max_tries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    let e = match e.downcast::<NonRetryableError>() {
                        Ok(non_retryable) => {
                            debug!("{}: non-retryable error: {}", operation_name, non_retryable);
                            return Err(anyhow::Error::from(non_retryable.into_inner()));
                        }
                        Err(e) => e,
                    };

                    if attempt < max_tries {
                        let delay = self.delay_after(attempt);
                        warn!(
                            "{}: attempt {}/{} failed ({}), retrying in {}ms...",
                            operation_name,
                            attempt,
                            max_tries,
                            e,
                            delay.as_millis()
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            anyhow::anyhow!("{}: failed after {} attempts", operation_name, max_tries)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_policy(max_tries: usize) -> RetryPolicy {
        RetryPolicy {
            max_tries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_non_retryable_error_display() {
        let err = NonRetryableError::AuthenticationFailed(ClientError::new("Invalid access token"));
        assert!(err.to_string().contains("Authentication"));
        assert!(err.to_string().contains("Invalid access token"));

        let err = NonRetryableError::NotFound(ClientError::new("Bucket not found"));
        assert!(err.to_string().contains("Not found"));

        let err = NonRetryableError::Forbidden(ClientError::new("test"));
        assert!(err.to_string().contains("forbidden"));

        let err = NonRetryableError::ClientError(ClientError::new("HTTP 400"));
        assert!(err.to_string().contains("Request error"));
    }

    #[test]
    fn test_classify_status() {
        let e = || ClientError::new("x");
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, e()),
            Err(NonRetryableError::AuthenticationFailed(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, e()),
            Err(NonRetryableError::Forbidden(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, e()),
            Err(NonRetryableError::NotFound(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, e()),
            Err(NonRetryableError::ClientError(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_IMPLEMENTED, e()),
            Err(NonRetryableError::ClientError(_))
        ));
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, e()).is_ok());
        assert!(classify_status(StatusCode::INTERNAL_SERVER_ERROR, e()).is_ok());
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, e()).is_ok());
    }

    #[test]
    fn test_check_retryable() {
        let err = check_retryable(StatusCode::NOT_FOUND, ClientError::new("x"));
        assert!(err.downcast_ref::<NonRetryableError>().is_some());

        let err = check_retryable(StatusCode::BAD_GATEWAY, ClientError::new("x"));
        assert!(err.downcast_ref::<NonRetryableError>().is_none());
        assert!(err.downcast_ref::<ClientError>().is_some());
    }

    #[test]
    fn test_delay_after_is_exponential_and_capped() {
        let policy = RetryPolicy {
            max_tries: 11,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        };
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(4), Duration::from_secs(8));
        assert_eq!(policy.delay_after(7), Duration::from_secs(60));
        assert_eq!(policy.delay_after(100), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_run_success() {
        let result = fast_policy(3)
            .run("test", || async { Ok::<_, anyhow::Error>(42) })
            .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_run_stops_on_non_retryable_and_unwraps() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result = fast_policy(5)
            .run("test", || {
                let attempts = Arc::clone(&attempts_clone);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>(anyhow::Error::from(NonRetryableError::NotFound(
                        ClientError::new("gone").with_status(404),
                    )))
                }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        let client_error = err.downcast_ref::<ClientError>().unwrap();
        assert_eq!(client_error.status, Some(404));
    }

    #[tokio::test]
    async fn test_run_retries_transient_errors() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result = fast_policy(5)
            .run("test", || {
                let attempts = Arc::clone(&attempts_clone);
                async move {
                    let count = attempts.fetch_add(1, Ordering::SeqCst);
                    if count < 2 {
                        Err::<i32, _>(anyhow::anyhow!("connection reset"))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_exhausts_retries() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result = fast_policy(4)
            .run("test", || {
                let attempts = Arc::clone(&attempts_clone);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>(anyhow::anyhow!("connection timeout"))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_run_zero_tries_still_attempts_once() {
        let result = fast_policy(0)
            .run("test", || async { Ok::<_, anyhow::Error>("ok") })
            .await;
        assert_eq!(result.unwrap(), "ok");
    }
}
