//! HTTP transport with retry logic and error handling.

mod client;
mod retry;

pub use client::{DEFAULT_EXTENDED_TIMEOUT, DEFAULT_TIMEOUT, HttpClient, HttpRequest, RawResponse};
pub use retry::{
    DEFAULT_BACKOFF_BASE_DELAY, DEFAULT_BACKOFF_MAX_DELAY, DEFAULT_BACKOFF_MAX_TRIES,
    NonRetryableError, RetryPolicy, check_retryable, classify_status,
};
