//! HTTP client module with retry logic and error classification.

mod client;
mod retry;

pub use client::{HttpClient, mask_token};
pub use retry::{RetryPolicy, Retryable, is_retryable_status, status_hint, with_retry};
